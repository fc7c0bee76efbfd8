// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Bitmap format adapter: copies a page raster into a device-native bitmap.

use rasterprint_bridge::{BitmapHandle, BitmapInfo, PrintDevice};
use rasterprint_core::error::{RasterPrintError, Result};
use rasterprint_core::types::BGRA32_BYTES_PER_PIXEL;
use rasterprint_document::PageRaster;
use tracing::{debug, instrument};

/// A device bitmap released when dropped.
pub struct DeviceBitmap<'d> {
    device: &'d dyn PrintDevice,
    handle: BitmapHandle,
    info: BitmapInfo,
}

impl DeviceBitmap<'_> {
    pub fn handle(&self) -> BitmapHandle {
        self.handle
    }

    /// Native layout reported by the device.
    pub fn info(&self) -> BitmapInfo {
        self.info
    }
}

impl Drop for DeviceBitmap<'_> {
    fn drop(&mut self) {
        self.device.delete_bitmap(self.handle);
        debug!(handle = self.handle.0, "device bitmap released");
    }
}

/// Build a top-down 32-bit device bitmap holding a copy of `raster`.
///
/// Rows are read with the raster's stride and written with the bitmap's own
/// stride. The raster is left untouched.
#[instrument(skip_all, fields(width = raster.width(), height = raster.height()))]
pub fn to_device_bitmap<'d>(device: &'d dyn PrintDevice, raster: &PageRaster) -> Result<DeviceBitmap<'d>> {
    if raster.width() == 0 || raster.height() == 0 || raster.data().is_empty() {
        return Err(RasterPrintError::BitmapConversion(format!(
            "raster is empty ({}x{})",
            raster.width(),
            raster.height()
        )));
    }

    let conversion = |e: rasterprint_core::DeviceError| RasterPrintError::BitmapConversion(e.to_string());

    let handle = device
        .create_bitmap(raster.width(), raster.height())
        .map_err(conversion)?;
    let mut bitmap = DeviceBitmap {
        device,
        handle,
        info: BitmapInfo {
            width: raster.width(),
            height: raster.height(),
            stride: 0,
        },
    };
    bitmap.info = device.bitmap_info(handle).map_err(conversion)?;

    let row_len = raster.width() as usize * BGRA32_BYTES_PER_PIXEL;
    let info = bitmap.info;
    if info.width != raster.width() || info.height != raster.height() || info.stride < row_len {
        return Err(RasterPrintError::BitmapConversion(format!(
            "device allocated {}x{} (stride {}) for a {}x{} raster",
            info.width,
            info.height,
            info.stride,
            raster.width(),
            raster.height()
        )));
    }

    for y in 0..raster.height() {
        device
            .write_bitmap(handle, y as usize * info.stride, raster.row(y))
            .map_err(conversion)?;
    }
    debug!(
        handle = handle.0,
        src_stride = raster.stride(),
        dst_stride = info.stride,
        "raster copied into device bitmap"
    );
    Ok(bitmap)
}
