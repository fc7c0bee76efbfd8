// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Windows print backend built on the spooler and GDI.
//
// Handles cross the trait boundary as integers; they are converted back to
// the Win32 pointer types at each call.

use std::ffi::c_void;
use std::ptr;

use tracing::{debug, warn};
use windows_sys::Win32::Foundation::GetLastError;
use windows_sys::Win32::Graphics::Gdi::{
    BI_RGB, BITMAP, BITMAPINFO, BITMAPINFOHEADER, COLORONCOLOR, CreateCompatibleDC,
    CreateDCW, CreateDIBSection, DIB_RGB_COLORS, DeleteDC, DeleteObject, GetDeviceCaps,
    GetObjectW, HALFTONE, HBITMAP, HDC, HORZRES, PHYSICALOFFSETX, PHYSICALOFFSETY, SRCCOPY,
    SelectObject, SetBrushOrgEx, SetStretchBltMode, StretchBlt, VERTRES,
};
use windows_sys::Win32::Graphics::Printing::{
    ClosePrinter, GetDefaultPrinterW, OpenPrinterW, PRINTER_ACCESS_USE, PRINTER_DEFAULTSW,
};
use windows_sys::Win32::Storage::Xps::{DOCINFOW, EndDoc, EndPage, StartDocW, StartPage};

use rasterprint_core::error::DeviceError;
use rasterprint_core::types::Rect;

use crate::traits::*;

/// Spooler + GDI device. Stateless; every handle is owned by the caller.
#[derive(Default)]
pub struct GdiDevice;

impl GdiDevice {
    pub fn new() -> Self {
        Self
    }
}

/// NUL-terminated UTF-16 copy of `s`.
fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

fn last_error(operation: &'static str, message: &str) -> DeviceError {
    // SAFETY: GetLastError reads thread-local state only.
    let code = unsafe { GetLastError() };
    let err = DeviceError::new(operation, message);
    if code == 0 { err } else { err.with_os_code(code) }
}

fn hdc(context: ContextHandle) -> HDC {
    context.0 as HDC
}

fn hbitmap(bitmap: BitmapHandle) -> HBITMAP {
    bitmap.0 as HBITMAP
}

fn query_bitmap(bitmap: BitmapHandle) -> DeviceResult<BITMAP> {
    // SAFETY: BITMAP is plain data; GetObjectW fills at most size_of::<BITMAP>() bytes.
    unsafe {
        let mut info: BITMAP = std::mem::zeroed();
        let written = GetObjectW(
            hbitmap(bitmap),
            std::mem::size_of::<BITMAP>() as i32,
            (&mut info as *mut BITMAP).cast::<c_void>(),
        );
        if written == 0 || info.bmBits.is_null() {
            return Err(last_error("GetObjectW", "not a DIB section"));
        }
        Ok(info)
    }
}

impl PrintDevice for GdiDevice {
    fn platform_name(&self) -> &str {
        "Windows GDI"
    }

    fn default_printer(&self) -> DeviceResult<String> {
        // SAFETY: the first call only reports the required length; the
        // second writes at most `len` UTF-16 units into `buf`.
        unsafe {
            let mut len = 0u32;
            GetDefaultPrinterW(ptr::null_mut(), &mut len);
            if len == 0 {
                return Err(last_error("GetDefaultPrinterW", "no default printer configured"));
            }
            let mut buf = vec![0u16; len as usize];
            if GetDefaultPrinterW(buf.as_mut_ptr(), &mut len) == 0 {
                return Err(last_error("GetDefaultPrinterW", "no default printer configured"));
            }
            let end = buf.iter().position(|&c| c == 0).unwrap_or(buf.len());
            let name = String::from_utf16_lossy(&buf[..end]);
            debug!(printer = %name, "default printer resolved");
            Ok(name)
        }
    }

    fn open_printer(&self, name: &str) -> DeviceResult<PrinterHandle> {
        let wname = wide(name);
        let defaults = PRINTER_DEFAULTSW {
            pDatatype: ptr::null_mut(),
            pDevMode: ptr::null_mut(),
            DesiredAccess: PRINTER_ACCESS_USE,
        };
        let mut handle = ptr::null_mut();
        // SAFETY: `wname` and `defaults` outlive the call.
        let ok = unsafe { OpenPrinterW(wname.as_ptr(), &mut handle, &defaults) };
        if ok == 0 || handle.is_null() {
            return Err(last_error("OpenPrinterW", "printer not found or not accessible"));
        }
        Ok(PrinterHandle(handle as usize))
    }

    fn close_printer(&self, printer: PrinterHandle) {
        // SAFETY: handle came from OpenPrinterW and is closed once.
        if unsafe { ClosePrinter(printer.0 as _) } == 0 {
            warn!(error = %last_error("ClosePrinter", "close failed"), "printer handle leak");
        }
    }

    fn create_context(&self, printer_name: &str) -> DeviceResult<ContextHandle> {
        let driver = wide("WINSPOOL");
        let device = wide(printer_name);
        // SAFETY: both strings are NUL-terminated and outlive the call.
        let dc = unsafe { CreateDCW(driver.as_ptr(), device.as_ptr(), ptr::null(), ptr::null()) };
        if dc.is_null() {
            return Err(last_error("CreateDCW", "device context creation failed"));
        }
        Ok(ContextHandle(dc as usize))
    }

    fn delete_context(&self, context: ContextHandle) {
        // SAFETY: context came from CreateDCW and is deleted once.
        if unsafe { DeleteDC(hdc(context)) } == 0 {
            warn!(error = %last_error("DeleteDC", "delete failed"), "device context leak");
        }
    }

    fn start_document(&self, context: ContextHandle, document_name: &str) -> DeviceResult<()> {
        let name = wide(document_name);
        let info = DOCINFOW {
            cbSize: std::mem::size_of::<DOCINFOW>() as i32,
            lpszDocName: name.as_ptr(),
            lpszOutput: ptr::null(),
            lpszDatatype: ptr::null(),
            fwType: 0,
        };
        // SAFETY: `info` and `name` outlive the call.
        if unsafe { StartDocW(hdc(context), &info) } <= 0 {
            return Err(last_error("StartDocW", "spooler rejected the document"));
        }
        Ok(())
    }

    fn end_document(&self, context: ContextHandle) -> DeviceResult<()> {
        // SAFETY: valid DC with an open document.
        if unsafe { EndDoc(hdc(context)) } <= 0 {
            return Err(last_error("EndDoc", "spooler rejected end of document"));
        }
        Ok(())
    }

    fn start_page(&self, context: ContextHandle) -> DeviceResult<()> {
        // SAFETY: valid DC with an open document.
        if unsafe { StartPage(hdc(context)) } <= 0 {
            return Err(last_error("StartPage", "spooler rejected the page"));
        }
        Ok(())
    }

    fn end_page(&self, context: ContextHandle) -> DeviceResult<()> {
        // SAFETY: valid DC with an open page.
        if unsafe { EndPage(hdc(context)) } <= 0 {
            return Err(last_error("EndPage", "spooler rejected end of page"));
        }
        Ok(())
    }

    fn capabilities(&self, context: ContextHandle) -> DeviceResult<DeviceCaps> {
        let dc = hdc(context);
        // SAFETY: GetDeviceCaps only reads from the DC.
        let caps = unsafe {
            DeviceCaps {
                printable_width: GetDeviceCaps(dc, HORZRES),
                printable_height: GetDeviceCaps(dc, VERTRES),
                offset_x: GetDeviceCaps(dc, PHYSICALOFFSETX),
                offset_y: GetDeviceCaps(dc, PHYSICALOFFSETY),
            }
        };
        if caps.printable_width <= 0 || caps.printable_height <= 0 {
            return Err(last_error("GetDeviceCaps", "device reported no printable area"));
        }
        debug!(?caps, "device capabilities");
        Ok(caps)
    }

    fn create_bitmap(&self, width: u32, height: u32) -> DeviceResult<BitmapHandle> {
        let (Ok(w), Ok(h)) = (i32::try_from(width), i32::try_from(height)) else {
            return Err(DeviceError::new("CreateDIBSection", "bitmap size out of range"));
        };
        // SAFETY: BITMAPINFO is plain data; the bits pointer is owned by the
        // returned HBITMAP and released with DeleteObject.
        unsafe {
            let mut info: BITMAPINFO = std::mem::zeroed();
            info.bmiHeader = BITMAPINFOHEADER {
                biSize: std::mem::size_of::<BITMAPINFOHEADER>() as u32,
                biWidth: w,
                // Negative height selects a top-down DIB.
                biHeight: -h,
                biPlanes: 1,
                biBitCount: 32,
                biCompression: BI_RGB,
                ..std::mem::zeroed()
            };
            let mut bits: *mut c_void = ptr::null_mut();
            let bitmap = CreateDIBSection(
                ptr::null_mut(),
                &info,
                DIB_RGB_COLORS,
                &mut bits,
                ptr::null_mut(),
                0,
            );
            if bitmap.is_null() || bits.is_null() {
                return Err(last_error("CreateDIBSection", "bitmap allocation failed"));
            }
            Ok(BitmapHandle(bitmap as usize))
        }
    }

    fn bitmap_info(&self, bitmap: BitmapHandle) -> DeviceResult<BitmapInfo> {
        let bm = query_bitmap(bitmap)?;
        Ok(BitmapInfo {
            width: bm.bmWidth.unsigned_abs(),
            height: bm.bmHeight.unsigned_abs(),
            stride: bm.bmWidthBytes.unsigned_abs() as usize,
        })
    }

    fn write_bitmap(&self, bitmap: BitmapHandle, offset: usize, bytes: &[u8]) -> DeviceResult<()> {
        let bm = query_bitmap(bitmap)?;
        let capacity = bm.bmWidthBytes.unsigned_abs() as usize * bm.bmHeight.unsigned_abs() as usize;
        if offset.checked_add(bytes.len()).is_none_or(|end| end > capacity) {
            return Err(DeviceError::new("WriteBitmap", "write exceeds bitmap memory"));
        }
        // SAFETY: bounds checked against the DIB section size above.
        unsafe {
            ptr::copy_nonoverlapping(bytes.as_ptr(), bm.bmBits.cast::<u8>().add(offset), bytes.len());
        }
        Ok(())
    }

    fn delete_bitmap(&self, bitmap: BitmapHandle) {
        // SAFETY: bitmap came from CreateDIBSection and is deleted once.
        if unsafe { DeleteObject(hbitmap(bitmap)) } == 0 {
            warn!(handle = bitmap.0, "DeleteObject failed, bitmap leaked");
        }
    }

    fn stretch_blit(
        &self,
        context: ContextHandle,
        bitmap: BitmapHandle,
        dest: Rect,
        mode: StretchMode,
    ) -> DeviceResult<()> {
        let info = self.bitmap_info(bitmap)?;
        let dc = hdc(context);
        // SAFETY: the memory DC is created, used, and deleted within this
        // block, and the previous selection is restored before deletion.
        unsafe {
            let mem_dc = CreateCompatibleDC(dc);
            if mem_dc.is_null() {
                return Err(last_error("CreateCompatibleDC", "memory DC creation failed"));
            }
            let previous = SelectObject(mem_dc, hbitmap(bitmap));
            let gdi_mode = match mode {
                StretchMode::Halftone => HALFTONE,
                StretchMode::ColorOnColor => COLORONCOLOR,
            };
            SetStretchBltMode(dc, gdi_mode);
            // HALFTONE requires the brush origin to be reset.
            SetBrushOrgEx(dc, 0, 0, ptr::null_mut());
            let ok = StretchBlt(
                dc,
                dest.x,
                dest.y,
                dest.width,
                dest.height,
                mem_dc,
                0,
                0,
                info.width as i32,
                info.height as i32,
                SRCCOPY,
            );
            let result = if ok == 0 {
                Err(last_error("StretchBlt", "blit to device failed"))
            } else {
                Ok(())
            };
            SelectObject(mem_dc, previous);
            DeleteDC(mem_dc);
            result
        }
    }
}
