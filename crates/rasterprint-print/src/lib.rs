// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// rasterprint-print — Raster-to-device printing.
//
// Adapts page rasters into device bitmaps, fits them to the printable area,
// drives the device print job, and sequences a whole document through the
// pipeline with full teardown on every exit path.

pub mod adapter;
pub mod job;
pub mod pipeline;
pub mod scaling;

pub use adapter::{DeviceBitmap, to_device_bitmap};
pub use job::PrintJob;
pub use pipeline::{CancelToken, Pipeline, PipelineFailure, PrintReport, RunOptions, Stage};
pub use scaling::{ScalingTransform, fit};
