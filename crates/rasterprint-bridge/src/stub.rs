// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Stub device for platforms without a native print backend.
//
// Every primitive fails; the real implementation lives in the `windows`
// module. Use `VirtualPrinter` to print on these platforms.

use rasterprint_core::error::DeviceError;
use rasterprint_core::types::Rect;

use crate::traits::*;

const UNAVAILABLE: &str = "no native print backend on this platform";

/// No-op device returned on non-Windows platforms.
pub struct StubDevice;

fn unavailable<T>(operation: &'static str) -> DeviceResult<T> {
    tracing::warn!(operation, "PrintDevice called on stub backend");
    Err(DeviceError::new(operation, UNAVAILABLE))
}

impl PrintDevice for StubDevice {
    fn platform_name(&self) -> &str {
        "Unsupported platform (stub)"
    }

    fn is_available(&self) -> bool {
        false
    }

    fn default_printer(&self) -> DeviceResult<String> {
        unavailable("default_printer")
    }

    fn open_printer(&self, _name: &str) -> DeviceResult<PrinterHandle> {
        unavailable("open_printer")
    }

    fn close_printer(&self, _printer: PrinterHandle) {}

    fn create_context(&self, _printer_name: &str) -> DeviceResult<ContextHandle> {
        unavailable("create_context")
    }

    fn delete_context(&self, _context: ContextHandle) {}

    fn start_document(&self, _context: ContextHandle, _document_name: &str) -> DeviceResult<()> {
        unavailable("start_document")
    }

    fn end_document(&self, _context: ContextHandle) -> DeviceResult<()> {
        unavailable("end_document")
    }

    fn start_page(&self, _context: ContextHandle) -> DeviceResult<()> {
        unavailable("start_page")
    }

    fn end_page(&self, _context: ContextHandle) -> DeviceResult<()> {
        unavailable("end_page")
    }

    fn capabilities(&self, _context: ContextHandle) -> DeviceResult<DeviceCaps> {
        unavailable("capabilities")
    }

    fn create_bitmap(&self, _width: u32, _height: u32) -> DeviceResult<BitmapHandle> {
        unavailable("create_bitmap")
    }

    fn bitmap_info(&self, _bitmap: BitmapHandle) -> DeviceResult<BitmapInfo> {
        unavailable("bitmap_info")
    }

    fn write_bitmap(&self, _bitmap: BitmapHandle, _offset: usize, _bytes: &[u8]) -> DeviceResult<()> {
        unavailable("write_bitmap")
    }

    fn delete_bitmap(&self, _bitmap: BitmapHandle) {}

    fn stretch_blit(
        &self,
        _context: ContextHandle,
        _bitmap: BitmapHandle,
        _dest: Rect,
        _mode: StretchMode,
    ) -> DeviceResult<()> {
        unavailable("stretch_blit")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_reports_unavailable() {
        let device = StubDevice;
        assert!(!device.is_available());
        assert!(device.default_printer().is_err());
        assert!(device.open_printer("anything").is_err());
    }

    #[test]
    fn primitives_name_the_failed_operation() {
        let device = StubDevice;
        let err = device.start_page(ContextHandle(1)).unwrap_err();
        assert_eq!(err.operation, "start_page");
        assert_eq!(err.os_code, None);
        assert_eq!(err.message, UNAVAILABLE);
    }
}
