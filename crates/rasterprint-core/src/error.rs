// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Unified error types for the raster print pipeline.

use thiserror::Error;

use crate::types::ErrorClass;

/// A failed call into the device subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{operation} failed{}: {message}", os_code_suffix(.os_code))]
pub struct DeviceError {
    /// Name of the device primitive that failed (e.g. "StartPage").
    pub operation: &'static str,
    /// OS error code when the platform reports one.
    pub os_code: Option<u32>,
    pub message: String,
}

impl DeviceError {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            os_code: None,
            message: message.into(),
        }
    }

    pub fn with_os_code(mut self, code: u32) -> Self {
        self.os_code = Some(code);
        self
    }
}

fn os_code_suffix(code: &Option<u32>) -> String {
    code.map(|c| format!(" (os error {c})")).unwrap_or_default()
}

/// Why a document could not be loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadFailureKind {
    /// The file could not be opened or read.
    Io,
    /// The file was readable but contained no bytes.
    Empty,
    /// The rendering engine rejected the bytes.
    Parse,
}

/// Why a page could not be rasterized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFailureKind {
    /// Computed pixel size was not strictly positive.
    InvalidDimensions,
    /// The pixel buffer could not be allocated.
    Allocation,
    /// The rendering engine failed to draw the page.
    Render,
}

/// Top-level error type for all pipeline operations.
#[derive(Debug, Error)]
pub enum RasterPrintError {
    // -- Input validation --
    #[error("DPI must be between 72 and 1200, got {0}")]
    InvalidDpi(u32),

    // -- Rendering engine / document --
    #[error("rendering engine initialisation failed: {0}")]
    EngineInit(String),

    #[error("failed to load document {path} ({kind:?}): {detail}")]
    DocumentLoad {
        path: String,
        kind: LoadFailureKind,
        detail: String,
    },

    #[error("no document is open")]
    NoDocumentOpen,

    #[error("document has no pages")]
    NoPages,

    #[error("page index {index} out of range (document has {page_count} pages)")]
    InvalidPageIndex { index: usize, page_count: usize },

    #[error("rasterization of page index {index} failed ({kind:?}): {detail}")]
    Rasterization {
        index: usize,
        kind: RasterFailureKind,
        detail: String,
    },

    #[error("bitmap conversion failed: {0}")]
    BitmapConversion(String),

    // -- Geometry --
    #[error("cannot fit {src_width}x{src_height} into printable area {printable_width}x{printable_height}")]
    InvalidGeometry {
        src_width: i64,
        src_height: i64,
        printable_width: i64,
        printable_height: i64,
    },

    // -- Printer / device --
    #[error("no default printer configured: {0}")]
    PrinterResolution(DeviceError),

    #[error("printer {name:?} could not be opened: {source}")]
    PrinterOpen { name: String, source: DeviceError },

    #[error("device context for {name:?} could not be created: {source}")]
    DeviceContext { name: String, source: DeviceError },

    #[error("document frame could not be started: {0}")]
    DocFrameStart(DeviceError),

    #[error("document frame could not be ended: {0}")]
    DocFrameEnd(DeviceError),

    #[error("page frame could not be started: {0}")]
    PageFrameStart(DeviceError),

    #[error("page frame could not be ended: {0}")]
    PageFrameEnd(DeviceError),

    #[error("blit to device failed: {0}")]
    Blit(DeviceError),

    #[error("print job is {actual}, operation requires {expected}")]
    InvalidJobState {
        expected: crate::types::JobState,
        actual: crate::types::JobState,
    },

    #[error("run cancelled")]
    Cancelled,

    #[error("feature not available on this platform")]
    PlatformUnavailable,

    // -- Configuration --
    #[error("configuration error: {0}")]
    Config(String),

    #[error("file I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl RasterPrintError {
    /// OS error code of the underlying device failure, if any.
    pub fn os_code(&self) -> Option<u32> {
        self.device_error().and_then(|e| e.os_code)
    }

    /// The device failure wrapped by this error, if any.
    pub fn device_error(&self) -> Option<&DeviceError> {
        match self {
            Self::PrinterResolution(e)
            | Self::DocFrameStart(e)
            | Self::DocFrameEnd(e)
            | Self::PageFrameStart(e)
            | Self::PageFrameEnd(e)
            | Self::Blit(e) => Some(e),
            Self::PrinterOpen { source, .. } | Self::DeviceContext { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Classify for caller-side retry decisions. The pipeline never retries.
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::PrinterOpen { .. }
            | Self::DeviceContext { .. }
            | Self::DocFrameStart(_)
            | Self::DocFrameEnd(_)
            | Self::PageFrameStart(_)
            | Self::PageFrameEnd(_)
            | Self::Blit(_) => ErrorClass::Transient,

            Self::Rasterization {
                kind: RasterFailureKind::Allocation,
                ..
            } => ErrorClass::Transient,

            Self::PrinterResolution(_) | Self::Cancelled => ErrorClass::UserAction,

            Self::DocumentLoad { kind, .. } => match kind {
                LoadFailureKind::Io => ErrorClass::UserAction,
                LoadFailureKind::Empty | LoadFailureKind::Parse => ErrorClass::Permanent,
            },

            Self::Io(io_err) => match io_err.kind() {
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                    ErrorClass::UserAction
                }
                _ => ErrorClass::Transient,
            },

            _ => ErrorClass::Permanent,
        }
    }
}

/// Alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, RasterPrintError>;
