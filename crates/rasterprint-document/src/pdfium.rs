// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// PDFium rendering backend using the `pdfium-render` crate.

use std::path::{Path, PathBuf};

use pdfium_render::prelude::*;
use rasterprint_core::types::PageSize;
use tracing::{debug, info, instrument};

use crate::engine::{EngineDocument, EngineError, EngineProvider, RasterTarget, RenderEngine, RenderOptions};

/// Environment variable naming the PDFium shared library.
pub const PDFIUM_LIBRARY_ENV: &str = "PDFIUM_DYNAMIC_LIB_PATH";

/// Binds the PDFium shared library at runtime.
///
/// Search order:
/// 1. the configured path (a library file or its directory)
/// 2. `PDFIUM_DYNAMIC_LIB_PATH`
/// 3. the directory of the running executable
/// 4. the system library search path
#[derive(Debug, Clone, Default)]
pub struct PdfiumProvider {
    library_path: Option<PathBuf>,
}

impl PdfiumProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_library_path(path: impl Into<PathBuf>) -> Self {
        Self {
            library_path: Some(path.into()),
        }
    }

    fn bind(&self) -> Result<Pdfium, EngineError> {
        if let Some(path) = &self.library_path {
            return bind_at(path);
        }
        if let Ok(path) = std::env::var(PDFIUM_LIBRARY_ENV) {
            return bind_at(Path::new(&path));
        }
        if let Some(dir) = std::env::current_exe().ok().as_deref().and_then(Path::parent) {
            let lib = Pdfium::pdfium_platform_library_name_at_path(dir.to_string_lossy().as_ref());
            if let Ok(bindings) = Pdfium::bind_to_library(&lib) {
                debug!(dir = %dir.display(), "PDFium bound next to executable");
                return Ok(Pdfium::new(bindings));
            }
        }
        let bindings = Pdfium::bind_to_system_library().map_err(|e| {
            EngineError::new(format!(
                "PDFium library not found; set {PDFIUM_LIBRARY_ENV} or install PDFium: {e}"
            ))
        })?;
        Ok(Pdfium::new(bindings))
    }
}

fn bind_at(path: &Path) -> Result<Pdfium, EngineError> {
    let bound = if path.is_dir() {
        let lib = Pdfium::pdfium_platform_library_name_at_path(path.to_string_lossy().as_ref());
        Pdfium::bind_to_library(&lib)
    } else {
        Pdfium::bind_to_library(path.to_string_lossy().as_ref())
    };
    let bindings = bound
        .map_err(|e| EngineError::new(format!("cannot bind PDFium at {}: {e}", path.display())))?;
    debug!(path = %path.display(), "PDFium bound");
    Ok(Pdfium::new(bindings))
}

impl EngineProvider for PdfiumProvider {
    fn name(&self) -> &str {
        "pdfium"
    }

    #[instrument(skip_all, fields(engine = "pdfium"))]
    fn initialize(&self) -> Result<Box<dyn RenderEngine>, EngineError> {
        let pdfium = self.bind()?;
        info!("PDFium initialised");
        Ok(Box::new(PdfiumEngine { pdfium }))
    }
}

/// A bound PDFium library. The library is released when dropped.
pub struct PdfiumEngine {
    pdfium: Pdfium,
}

impl RenderEngine for PdfiumEngine {
    fn open_document(&self, bytes: Vec<u8>) -> Result<Box<dyn EngineDocument + '_>, EngineError> {
        let document = self
            .pdfium
            .load_pdf_from_byte_vec(bytes, None)
            .map_err(|e| EngineError::new(format!("PDFium rejected the document: {e}")))?;
        Ok(Box::new(PdfiumDocument { document }))
    }
}

/// An open PDFium document.
pub struct PdfiumDocument<'a> {
    document: PdfDocument<'a>,
}

impl PdfiumDocument<'_> {
    fn page(&self, index: usize) -> Result<PdfPage<'_>, EngineError> {
        let index = u16::try_from(index)
            .map_err(|_| EngineError::new(format!("page index {index} exceeds PDFium's limit")))?;
        self.document
            .pages()
            .get(index)
            .map_err(|e| EngineError::new(format!("cannot load page {index}: {e}")))
    }
}

impl EngineDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.document.pages().len() as usize
    }

    fn page_size(&self, index: usize) -> Result<PageSize, EngineError> {
        let page = self.page(index)?;
        Ok(PageSize {
            width_pts: page.width().value,
            height_pts: page.height().value,
        })
    }

    fn render_page(
        &self,
        index: usize,
        target: &mut RasterTarget<'_>,
        options: RenderOptions,
    ) -> Result<(), EngineError> {
        let page = self.page(index)?;
        let (Ok(width), Ok(height)) = (i32::try_from(target.width), i32::try_from(target.height))
        else {
            return Err(EngineError::new("target size exceeds PDFium's limit"));
        };
        let config = PdfRenderConfig::new()
            .set_target_width(width)
            .set_target_height(height)
            .set_format(PdfBitmapFormat::BGRA)
            .set_clear_color(PdfColor::WHITE)
            .render_annotations(options.annotations)
            .use_lcd_text_rendering(options.lcd_text);
        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| EngineError::new(format!("PDFium failed to render page {index}: {e}")))?;

        let bytes = bitmap.as_raw_bytes();
        let rows = target.height as usize;
        let src_stride = bytes.len() / rows.max(1);
        let row_len = target.width as usize * 4;
        if src_stride < row_len {
            return Err(EngineError::new(format!(
                "PDFium bitmap row of {src_stride} bytes is shorter than {row_len}"
            )));
        }
        for (dst, src) in target
            .data
            .chunks_mut(target.stride)
            .zip(bytes.chunks(src_stride))
            .take(rows)
        {
            dst[..row_len].copy_from_slice(&src[..row_len]);
        }
        debug!(page = index, width, height, src_stride, "page rendered");
        Ok(())
    }
}
