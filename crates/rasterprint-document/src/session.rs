// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Document session owning at most one open document.

use std::path::{Path, PathBuf};

use rasterprint_core::error::{LoadFailureKind, RasterPrintError, Result};
use tracing::{debug, info, instrument};

use crate::engine::{EngineDocument, RenderEngine};

/// A per-run document session bound to one rendering engine.
///
/// Loading a new document closes the previous one first. Dropping the
/// session closes whatever is open.
pub struct DocumentSession<'e> {
    engine: &'e dyn RenderEngine,
    document: Option<Box<dyn EngineDocument + 'e>>,
    path: Option<PathBuf>,
}

impl<'e> DocumentSession<'e> {
    pub fn new(engine: &'e dyn RenderEngine) -> Self {
        Self {
            engine,
            document: None,
            path: None,
        }
    }

    /// Read `path` fully and hand the bytes to the engine.
    ///
    /// I/O failures, empty files, and engine parse failures are reported as
    /// distinct [`LoadFailureKind`]s. On failure the session is left closed.
    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.close();

        let load_error = |kind, detail: String| RasterPrintError::DocumentLoad {
            path: path.display().to_string(),
            kind,
            detail,
        };

        let bytes = std::fs::read(path).map_err(|e| load_error(LoadFailureKind::Io, e.to_string()))?;
        if bytes.is_empty() {
            return Err(load_error(LoadFailureKind::Empty, "file contains no bytes".into()));
        }
        debug!(bytes = bytes.len(), "document read");

        let document = self
            .engine
            .open_document(bytes)
            .map_err(|e| load_error(LoadFailureKind::Parse, e.to_string()))?;
        info!(pages = document.page_count(), "document opened");

        self.document = Some(document);
        self.path = Some(path.to_path_buf());
        Ok(())
    }

    /// Pages in the open document, or 0 when closed.
    pub fn page_count(&self) -> usize {
        self.document.as_ref().map_or(0, |d| d.page_count())
    }

    pub fn is_open(&self) -> bool {
        self.document.is_some()
    }

    /// Path of the open document.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Close the open document. Does nothing when already closed.
    pub fn close(&mut self) {
        if let Some(document) = self.document.take() {
            drop(document);
            debug!(path = ?self.path, "document closed");
        }
        self.path = None;
    }

    pub(crate) fn document(&self) -> Option<&(dyn EngineDocument + 'e)> {
        self.document.as_deref()
    }
}

impl Drop for DocumentSession<'_> {
    fn drop(&mut self) {
        self.close();
    }
}
