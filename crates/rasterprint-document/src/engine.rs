// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Rendering engine seam.
//
// An `EngineProvider` starts an engine; the engine opens documents from
// bytes; a document reports page geometry and draws pages into a caller-owned
// buffer. Closing a document and shutting an engine down happen on drop.

use rasterprint_core::types::PageSize;
use thiserror::Error;

/// Failure reported by a rendering engine. The caller decides which
/// pipeline error it becomes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct EngineError(pub String);

impl EngineError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self(detail.into())
    }
}

/// Layers and quality flags requested from the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderOptions {
    /// Draw annotation appearance streams.
    pub annotations: bool,
    /// Sub-pixel anti-aliased text.
    pub lcd_text: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            annotations: true,
            lcd_text: true,
        }
    }
}

/// A BGRA32 top-down pixel buffer the engine draws into. The buffer is
/// already cleared to the background colour.
#[derive(Debug)]
pub struct RasterTarget<'a> {
    pub data: &'a mut [u8],
    pub width: u32,
    pub height: u32,
    /// Bytes per row in `data`.
    pub stride: usize,
}

/// Starts a rendering engine.
pub trait EngineProvider {
    /// Short backend name for logs (e.g. "pdfium").
    fn name(&self) -> &str;

    fn initialize(&self) -> Result<Box<dyn RenderEngine>, EngineError>;
}

/// A running rendering engine.
pub trait RenderEngine {
    /// Parse `bytes` into a document.
    fn open_document(&self, bytes: Vec<u8>) -> Result<Box<dyn EngineDocument + '_>, EngineError>;
}

/// An open document.
pub trait EngineDocument {
    fn page_count(&self) -> usize;

    /// Page size in points. `index` is always below `page_count()`.
    fn page_size(&self, index: usize) -> Result<PageSize, EngineError>;

    /// Draw page `index` scaled to exactly `target.width` x `target.height`.
    fn render_page(
        &self,
        index: usize,
        target: &mut RasterTarget<'_>,
        options: RenderOptions,
    ) -> Result<(), EngineError>;
}
