// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Page rasterizer: renders one page at a target DPI into a BGRA32 buffer.

use rasterprint_core::error::{RasterFailureKind, RasterPrintError, Result};
use rasterprint_core::types::{BGRA32_BYTES_PER_PIXEL, Dpi, PixelFormat};
use tracing::{debug, instrument, warn};

use crate::engine::{RasterTarget, RenderOptions};
use crate::session::DocumentSession;

/// Owned, top-down BGRA32 pixels for one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRaster {
    data: Vec<u8>,
    width: u32,
    height: u32,
    stride: usize,
    format: PixelFormat,
}

impl PageRaster {
    /// Wrap an existing BGRA32 buffer.
    ///
    /// Fails when `stride` is shorter than a row or `data` does not hold
    /// exactly `height` rows. Zero-sized rasters are accepted here and
    /// rejected by the bitmap adapter.
    pub fn new(data: Vec<u8>, width: u32, height: u32, stride: usize) -> Result<Self> {
        let row = width as usize * BGRA32_BYTES_PER_PIXEL;
        if stride < row {
            return Err(RasterPrintError::BitmapConversion(format!(
                "stride {stride} shorter than row of {row} bytes"
            )));
        }
        if Some(data.len()) != stride.checked_mul(height as usize) {
            return Err(RasterPrintError::BitmapConversion(format!(
                "buffer of {} bytes does not match {height} rows of {stride}",
                data.len()
            )));
        }
        Ok(Self {
            data,
            width,
            height,
            stride,
            format: PixelFormat::Bgra32,
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes per row.
    pub fn stride(&self) -> usize {
        self.stride
    }

    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// One row of pixels, without stride padding.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    pub fn row(&self, y: u32) -> &[u8] {
        assert!(y < self.height, "row {y} out of range for height {}", self.height);
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize * BGRA32_BYTES_PER_PIXEL]
    }

    /// BGRA bytes of pixel (x, y).
    ///
    /// # Panics
    ///
    /// Panics if `x >= width` or `y >= height`.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        assert!(
            x < self.width && y < self.height,
            "pixel ({x}, {y}) out of range for {}x{}",
            self.width,
            self.height
        );
        let at = y as usize * self.stride + x as usize * BGRA32_BYTES_PER_PIXEL;
        [self.data[at], self.data[at + 1], self.data[at + 2], self.data[at + 3]]
    }
}

/// Renders pages of a [`DocumentSession`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PageRasterizer {
    options: RenderOptions,
}

impl PageRasterizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: RenderOptions) -> Self {
        Self { options }
    }

    /// Render page `index` (0-based) at `dpi`.
    ///
    /// Target size is `round(points * dpi / 72)` on each axis. The buffer is
    /// cleared to opaque white before the engine draws into it. No buffer is
    /// allocated when the index is out of range.
    #[instrument(skip(self, session, dpi), fields(dpi = dpi.get()))]
    pub fn render(&self, session: &DocumentSession<'_>, index: usize, dpi: Dpi) -> Result<PageRaster> {
        let document = session.document().ok_or(RasterPrintError::NoDocumentOpen)?;
        let page_count = document.page_count();
        if index >= page_count {
            return Err(RasterPrintError::InvalidPageIndex { index, page_count });
        }

        let raster_error = |kind, detail: String| RasterPrintError::Rasterization { index, kind, detail };

        let size = document
            .page_size(index)
            .map_err(|e| raster_error(RasterFailureKind::Render, e.to_string()))?;
        let width_px = dpi.points_to_pixels(size.width_pts);
        let height_px = dpi.points_to_pixels(size.height_pts);
        let (Some(width), Some(height)) = (pixel_extent(width_px), pixel_extent(height_px)) else {
            return Err(raster_error(
                RasterFailureKind::InvalidDimensions,
                format!("page computes to {width_px}x{height_px} pixels"),
            ));
        };

        let stride = width as usize * BGRA32_BYTES_PER_PIXEL;
        let len = stride.checked_mul(height as usize).ok_or_else(|| {
            raster_error(
                RasterFailureKind::Allocation,
                format!("{width}x{height} buffer size overflows"),
            )
        })?;
        let mut data = Vec::new();
        data.try_reserve_exact(len).map_err(|e| {
            raster_error(RasterFailureKind::Allocation, format!("{len} bytes: {e}"))
        })?;
        data.resize(len, 0xFF);
        debug!(width, height, stride, bytes = len, "raster buffer allocated");

        let mut target = RasterTarget {
            data: &mut data,
            width,
            height,
            stride,
        };
        if let Err(e) = document.render_page(index, &mut target, self.options) {
            warn!(error = %e, "engine failed to render page, buffer released");
            return Err(raster_error(RasterFailureKind::Render, e.to_string()));
        }

        PageRaster::new(data, width, height, stride)
    }
}

/// A strictly positive pixel count that fits the device's signed extents.
fn pixel_extent(pixels: i64) -> Option<u32> {
    u32::try_from(pixels).ok().filter(|p| *p > 0 && *p <= i32::MAX as u32)
}
