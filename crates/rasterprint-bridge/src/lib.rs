// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// rasterprint-bridge — Printer device abstractions.
//
// `PrintDevice` is the seam between the print job controller and the OS
// print spooler. Windows gets the GDI backend; other platforms get a stub
// that reports itself unavailable. `VirtualPrinter` records everything it is
// sent and works everywhere.

pub mod memory;
pub mod traits;

#[cfg(target_os = "windows")]
pub mod windows;

#[cfg(not(target_os = "windows"))]
pub mod stub;

pub use memory::{DeviceOp, PaperGeometry, VirtualPrinter};
pub use traits::*;

/// Returns the native device implementation for the target operating system.
pub fn platform_device() -> Box<dyn PrintDevice> {
    #[cfg(target_os = "windows")]
    {
        Box::new(windows::GdiDevice::new())
    }
    #[cfg(not(target_os = "windows"))]
    {
        Box::new(stub::StubDevice)
    }
}
