// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// rasterprint-document — Document loading and page rasterization.
//
// The rendering engine sits behind the traits in `engine`; `pdfium` binds the
// PDFium library and `mock` provides a scriptable engine for tests. A
// `DocumentSession` owns at most one open document and `PageRasterizer`
// turns its pages into BGRA32 rasters at a requested DPI.

pub mod engine;
pub mod mock;
pub mod raster;
pub mod session;

#[cfg(feature = "pdfium")]
pub mod pdfium;

pub use engine::{EngineDocument, EngineError, EngineProvider, RasterTarget, RenderEngine, RenderOptions};
pub use mock::MockEngineProvider;
pub use raster::{PageRaster, PageRasterizer};
pub use session::DocumentSession;

#[cfg(feature = "pdfium")]
pub use pdfium::PdfiumProvider;
