// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Aspect-preserving fit of a source raster into a device's printable area.

use rasterprint_core::error::{RasterPrintError, Result};
use rasterprint_core::types::Rect;

/// Where and how large a source raster lands on the device page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScalingTransform {
    /// Uniform scale factor applied to both axes.
    pub scale: f64,
    /// Destination rectangle in device units, including the physical margin.
    pub dest: Rect,
}

/// Fit `src` into the printable area and center it.
///
/// `scale = min(printable_w / src_w, printable_h / src_h)`; the scaled size
/// is rounded and the leftover space split evenly (integer division), then
/// shifted by the device's physical margin. All four extents must be positive.
pub fn fit(
    src_width: i64,
    src_height: i64,
    printable_width: i64,
    printable_height: i64,
    margin_x: i64,
    margin_y: i64,
) -> Result<ScalingTransform> {
    let invalid = || RasterPrintError::InvalidGeometry {
        src_width,
        src_height,
        printable_width,
        printable_height,
    };
    if src_width <= 0 || src_height <= 0 || printable_width <= 0 || printable_height <= 0 {
        return Err(invalid());
    }

    let scale = (printable_width as f64 / src_width as f64)
        .min(printable_height as f64 / src_height as f64);
    // A sliver source can round to nothing on its short axis; keep one unit.
    let print_width = ((src_width as f64 * scale).round() as i64).clamp(1, printable_width);
    let print_height = ((src_height as f64 * scale).round() as i64).clamp(1, printable_height);
    let x = margin_x + (printable_width - print_width) / 2;
    let y = margin_y + (printable_height - print_height) / 2;

    let to_i32 = |v: i64| i32::try_from(v).map_err(|_| invalid());
    Ok(ScalingTransform {
        scale,
        dest: Rect {
            x: to_i32(x)?,
            y: to_i32(y)?,
            width: to_i32(print_width)?,
            height: to_i32(print_height)?,
        },
    })
}
