// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Platform-agnostic device primitives used by the print job controller.
//
// Methods take `&self` so that several scoped guards (bitmap, print job) can
// hold the same device at once; implementations use interior mutability
// where they keep state.

use rasterprint_core::error::DeviceError;
use rasterprint_core::types::Rect;

/// Result alias for device primitives.
pub type DeviceResult<T> = std::result::Result<T, DeviceError>;

/// Opaque printer handle issued by a [`PrintDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrinterHandle(pub usize);

/// Opaque device-context handle issued by a [`PrintDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextHandle(pub usize);

/// Opaque device bitmap handle issued by a [`PrintDevice`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitmapHandle(pub usize);

/// Printable area and physical margins of a device context, in device units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCaps {
    pub printable_width: i32,
    pub printable_height: i32,
    /// Distance from the physical page's left edge to the printable area.
    pub offset_x: i32,
    /// Distance from the physical page's top edge to the printable area.
    pub offset_y: i32,
}

/// Native layout of a device bitmap. Rows are top-down, 32 bits per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BitmapInfo {
    pub width: u32,
    pub height: u32,
    /// Bytes per row in device memory; at least `width * 4`.
    pub stride: usize,
}

impl BitmapInfo {
    pub fn byte_len(&self) -> usize {
        self.stride * self.height as usize
    }
}

/// Resampling used when the device stretches a bitmap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StretchMode {
    /// Area-averaging, highest quality.
    Halftone,
    /// Drops rows and columns, fastest.
    ColorOnColor,
}

/// Spooler and graphics-device primitives.
///
/// Framing follows the conventional begin-document / begin-page / draw /
/// end-page / end-document order. Release methods (`close_printer`,
/// `delete_context`, `delete_bitmap`) never fail from the caller's point of
/// view; implementations log problems instead.
pub trait PrintDevice {
    /// Human-readable backend name (e.g. "Windows GDI").
    fn platform_name(&self) -> &str;

    /// Whether this backend can print at all on the current platform.
    fn is_available(&self) -> bool {
        true
    }

    /// Name of the system default printer.
    fn default_printer(&self) -> DeviceResult<String>;

    fn open_printer(&self, name: &str) -> DeviceResult<PrinterHandle>;

    fn close_printer(&self, printer: PrinterHandle);

    fn create_context(&self, printer_name: &str) -> DeviceResult<ContextHandle>;

    fn delete_context(&self, context: ContextHandle);

    fn start_document(&self, context: ContextHandle, document_name: &str) -> DeviceResult<()>;

    fn end_document(&self, context: ContextHandle) -> DeviceResult<()>;

    fn start_page(&self, context: ContextHandle) -> DeviceResult<()>;

    fn end_page(&self, context: ContextHandle) -> DeviceResult<()>;

    /// Printable area and physical offsets, queried per job.
    fn capabilities(&self, context: ContextHandle) -> DeviceResult<DeviceCaps>;

    /// Allocate a top-down 32-bit bitmap of the given size.
    fn create_bitmap(&self, width: u32, height: u32) -> DeviceResult<BitmapHandle>;

    fn bitmap_info(&self, bitmap: BitmapHandle) -> DeviceResult<BitmapInfo>;

    /// Copy `bytes` into the bitmap's pixel memory starting at byte `offset`.
    fn write_bitmap(&self, bitmap: BitmapHandle, offset: usize, bytes: &[u8]) -> DeviceResult<()>;

    fn delete_bitmap(&self, bitmap: BitmapHandle);

    /// Draw the whole bitmap into `dest` on the open page.
    fn stretch_blit(
        &self,
        context: ContextHandle,
        bitmap: BitmapHandle,
        dest: Rect,
        mode: StretchMode,
    ) -> DeviceResult<()>;
}
