// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// In-memory virtual printer.
//
// Spools every document it receives, keeps the bitmaps blitted onto each
// page, and can export committed pages as PNG files. It also counts live
// handles and accepts scripted failures at any primitive, which makes it the
// device used by the pipeline tests.

use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use tracing::{debug, info, warn};

use rasterprint_core::error::{DeviceError, RasterPrintError};
use rasterprint_core::types::{BGRA32_BYTES_PER_PIXEL, Rect};

use crate::traits::*;

/// Device primitives, for failure scripting and call logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceOp {
    DefaultPrinter,
    OpenPrinter,
    ClosePrinter,
    CreateContext,
    DeleteContext,
    StartDocument,
    EndDocument,
    StartPage,
    EndPage,
    Capabilities,
    CreateBitmap,
    WriteBitmap,
    DeleteBitmap,
    StretchBlit,
}

impl DeviceOp {
    fn name(self) -> &'static str {
        match self {
            Self::DefaultPrinter => "GetDefaultPrinter",
            Self::OpenPrinter => "OpenPrinter",
            Self::ClosePrinter => "ClosePrinter",
            Self::CreateContext => "CreateDC",
            Self::DeleteContext => "DeleteDC",
            Self::StartDocument => "StartDoc",
            Self::EndDocument => "EndDoc",
            Self::StartPage => "StartPage",
            Self::EndPage => "EndPage",
            Self::Capabilities => "GetDeviceCaps",
            Self::CreateBitmap => "CreateDIBSection",
            Self::WriteBitmap => "WriteBitmap",
            Self::DeleteBitmap => "DeleteObject",
            Self::StretchBlit => "StretchBlt",
        }
    }
}

/// Page geometry of a virtual printer, in device units.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaperGeometry {
    pub physical_width: u32,
    pub physical_height: u32,
    pub offset_x: u32,
    pub offset_y: u32,
    pub printable_width: u32,
    pub printable_height: u32,
}

impl PaperGeometry {
    /// US Letter at 300 dpi with quarter-inch margins.
    pub fn letter_300dpi() -> Self {
        Self {
            physical_width: 2550,
            physical_height: 3300,
            offset_x: 75,
            offset_y: 75,
            printable_width: 2400,
            printable_height: 3150,
        }
    }

    /// ISO A4 at 300 dpi with 4.23 mm margins.
    pub fn a4_300dpi() -> Self {
        Self {
            physical_width: 2480,
            physical_height: 3508,
            offset_x: 50,
            offset_y: 50,
            printable_width: 2380,
            printable_height: 3408,
        }
    }

    fn caps(&self) -> DeviceCaps {
        DeviceCaps {
            printable_width: self.printable_width as i32,
            printable_height: self.printable_height as i32,
            offset_x: self.offset_x as i32,
            offset_y: self.offset_y as i32,
        }
    }
}

/// One bitmap drawn onto a page.
#[derive(Debug, Clone)]
pub struct BlitRecord {
    pub dest: Rect,
    pub mode: StretchMode,
    pub width: u32,
    pub height: u32,
    pub stride: usize,
    /// BGRA pixel copy taken at blit time.
    pub pixels: Vec<u8>,
}

impl BlitRecord {
    /// BGRA bytes of pixel (x, y).
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let at = y as usize * self.stride + x as usize * BGRA32_BYTES_PER_PIXEL;
        [
            self.pixels[at],
            self.pixels[at + 1],
            self.pixels[at + 2],
            self.pixels[at + 3],
        ]
    }

    fn to_rgba_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let [b, g, r, a] = self.pixel(x, y);
            Rgba([r, g, b, a])
        })
    }
}

/// A page closed with `end_page`.
#[derive(Debug, Clone)]
pub struct PrintedPage {
    pub geometry: PaperGeometry,
    pub blits: Vec<BlitRecord>,
}

impl PrintedPage {
    /// Composite the page onto a white sheet of the physical page size.
    pub fn render(&self) -> RgbaImage {
        let mut sheet = RgbaImage::from_pixel(
            self.geometry.physical_width,
            self.geometry.physical_height,
            Rgba([255, 255, 255, 255]),
        );
        for blit in &self.blits {
            if blit.dest.width <= 0 || blit.dest.height <= 0 {
                continue;
            }
            let filter = match blit.mode {
                StretchMode::Halftone => FilterType::Triangle,
                StretchMode::ColorOnColor => FilterType::Nearest,
            };
            let scaled = imageops::resize(
                &blit.to_rgba_image(),
                blit.dest.width as u32,
                blit.dest.height as u32,
                filter,
            );
            imageops::overlay(&mut sheet, &scaled, i64::from(blit.dest.x), i64::from(blit.dest.y));
        }
        sheet
    }
}

/// A document received by the virtual printer.
#[derive(Debug, Clone)]
pub struct SpooledDocument {
    pub name: String,
    pub printer: String,
    /// Pages committed with `end_page`, in order.
    pub pages: Vec<PrintedPage>,
    /// `true` once `end_document` succeeded.
    pub completed: bool,
}

impl SpooledDocument {
    /// Write every committed page to `dir` as `page-001.png`, `page-002.png`, ...
    pub fn export_png(&self, dir: impl AsRef<Path>) -> Result<Vec<PathBuf>, RasterPrintError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;
        let mut written = Vec::with_capacity(self.pages.len());
        for (index, page) in self.pages.iter().enumerate() {
            let path = dir.join(format!("page-{:03}.png", index + 1));
            page.render()
                .save(&path)
                .map_err(|e| RasterPrintError::Io(std::io::Error::other(e)))?;
            debug!(path = %path.display(), "virtual page exported");
            written.push(path);
        }
        info!(pages = written.len(), dir = %dir.display(), "spooled document exported");
        Ok(written)
    }
}

struct ContextState {
    printer: String,
    geometry: PaperGeometry,
    spool: Option<usize>,
    page: Option<PrintedPage>,
}

struct StoredBitmap {
    info: BitmapInfo,
    data: Vec<u8>,
}

struct ScriptedFailure {
    op: DeviceOp,
    on_call: usize,
    os_code: Option<u32>,
}

#[derive(Default)]
struct State {
    printers: BTreeMap<String, PaperGeometry>,
    default_printer: Option<String>,
    row_alignment: usize,
    next_handle: usize,
    open_printers: HashMap<usize, String>,
    contexts: HashMap<usize, ContextState>,
    bitmaps: HashMap<usize, StoredBitmap>,
    spools: Vec<SpooledDocument>,
    calls: HashMap<DeviceOp, usize>,
    failures: Vec<ScriptedFailure>,
    log: Vec<DeviceOp>,
}

impl State {
    /// Record a call and fire any failure scripted for it.
    fn enter(&mut self, op: DeviceOp) -> DeviceResult<()> {
        self.log.push(op);
        let count = self.calls.entry(op).or_insert(0);
        *count += 1;
        let count = *count;
        if let Some(pos) = self
            .failures
            .iter()
            .position(|f| f.op == op && f.on_call == count)
        {
            let failure = self.failures.remove(pos);
            let mut err = DeviceError::new(op.name(), "scripted failure");
            if let Some(code) = failure.os_code {
                err = err.with_os_code(code);
            }
            debug!(?op, count, "virtual printer injecting failure");
            return Err(err);
        }
        Ok(())
    }

    fn issue_handle(&mut self) -> usize {
        self.next_handle += 1;
        self.next_handle
    }

    fn context(&mut self, op: DeviceOp, context: ContextHandle) -> DeviceResult<&mut ContextState> {
        self.contexts
            .get_mut(&context.0)
            .ok_or_else(|| DeviceError::new(op.name(), format!("unknown context {}", context.0)))
    }
}

/// Recording in-memory printer. Cheap to share by reference; all state sits
/// behind one mutex.
pub struct VirtualPrinter {
    state: Mutex<State>,
}

impl Default for VirtualPrinter {
    fn default() -> Self {
        Self::new()
    }
}

impl VirtualPrinter {
    /// Display name of the printer created by [`VirtualPrinter::letter`].
    pub const DEFAULT_NAME: &'static str = "Virtual Printer";

    /// A device with no printers installed.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State {
                row_alignment: 4,
                ..State::default()
            }),
        }
    }

    /// A device with one US Letter printer set as the default.
    pub fn letter() -> Self {
        Self::new().with_default_printer(Self::DEFAULT_NAME, PaperGeometry::letter_300dpi())
    }

    pub fn with_printer(self, name: impl Into<String>, geometry: PaperGeometry) -> Self {
        self.lock().printers.insert(name.into(), geometry);
        self
    }

    pub fn with_default_printer(self, name: impl Into<String>, geometry: PaperGeometry) -> Self {
        let name = name.into();
        {
            let mut state = self.lock();
            state.printers.insert(name.clone(), geometry);
            state.default_printer = Some(name);
        }
        self
    }

    /// Round bitmap rows up to a multiple of `alignment` bytes.
    pub fn with_row_alignment(self, alignment: usize) -> Self {
        self.lock().row_alignment = alignment.max(1);
        self
    }

    /// Fail the `on_call`-th (1-based) call of `op`.
    pub fn fail_on(&self, op: DeviceOp, on_call: usize) {
        self.push_failure(op, on_call, None);
    }

    /// Like [`VirtualPrinter::fail_on`], reporting `os_code`.
    pub fn fail_on_with_code(&self, op: DeviceOp, on_call: usize, os_code: u32) {
        self.push_failure(op, on_call, Some(os_code));
    }

    fn push_failure(&self, op: DeviceOp, on_call: usize, os_code: Option<u32>) {
        self.lock().failures.push(ScriptedFailure {
            op,
            on_call,
            os_code,
        });
    }

    pub fn live_printer_handles(&self) -> usize {
        self.lock().open_printers.len()
    }

    pub fn live_contexts(&self) -> usize {
        self.lock().contexts.len()
    }

    pub fn live_bitmaps(&self) -> usize {
        self.lock().bitmaps.len()
    }

    /// `true` when no printer, context or bitmap handle is outstanding.
    pub fn all_released(&self) -> bool {
        let state = self.lock();
        state.open_printers.is_empty() && state.contexts.is_empty() && state.bitmaps.is_empty()
    }

    pub fn spooled_documents(&self) -> Vec<SpooledDocument> {
        self.lock().spools.clone()
    }

    /// Every primitive called so far, in order.
    pub fn call_log(&self) -> Vec<DeviceOp> {
        self.lock().log.clone()
    }

    /// How many times `op` has been called.
    pub fn call_count(&self, op: DeviceOp) -> usize {
        self.lock().calls.get(&op).copied().unwrap_or(0)
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl PrintDevice for VirtualPrinter {
    fn platform_name(&self) -> &str {
        "Virtual printer"
    }

    fn default_printer(&self) -> DeviceResult<String> {
        let mut state = self.lock();
        state.enter(DeviceOp::DefaultPrinter)?;
        state.default_printer.clone().ok_or_else(|| {
            DeviceError::new(DeviceOp::DefaultPrinter.name(), "no default printer configured")
                .with_os_code(ERROR_INVALID_PRINTER_NAME)
        })
    }

    fn open_printer(&self, name: &str) -> DeviceResult<PrinterHandle> {
        let mut state = self.lock();
        state.enter(DeviceOp::OpenPrinter)?;
        if !state.printers.contains_key(name) {
            return Err(
                DeviceError::new(DeviceOp::OpenPrinter.name(), format!("no printer named {name:?}"))
                    .with_os_code(ERROR_INVALID_PRINTER_NAME),
            );
        }
        let handle = state.issue_handle();
        state.open_printers.insert(handle, name.to_string());
        debug!(handle, printer = name, "virtual printer opened");
        Ok(PrinterHandle(handle))
    }

    fn close_printer(&self, printer: PrinterHandle) {
        let mut state = self.lock();
        let _ = state.enter(DeviceOp::ClosePrinter);
        if state.open_printers.remove(&printer.0).is_none() {
            warn!(handle = printer.0, "close of unknown printer handle");
        }
    }

    fn create_context(&self, printer_name: &str) -> DeviceResult<ContextHandle> {
        let mut state = self.lock();
        state.enter(DeviceOp::CreateContext)?;
        let geometry = *state.printers.get(printer_name).ok_or_else(|| {
            DeviceError::new(
                DeviceOp::CreateContext.name(),
                format!("no printer named {printer_name:?}"),
            )
        })?;
        let handle = state.issue_handle();
        state.contexts.insert(
            handle,
            ContextState {
                printer: printer_name.to_string(),
                geometry,
                spool: None,
                page: None,
            },
        );
        Ok(ContextHandle(handle))
    }

    fn delete_context(&self, context: ContextHandle) {
        let mut state = self.lock();
        let _ = state.enter(DeviceOp::DeleteContext);
        match state.contexts.remove(&context.0) {
            Some(ctx) if ctx.spool.is_some() => {
                warn!(handle = context.0, "context deleted with document still open");
            }
            Some(_) => {}
            None => warn!(handle = context.0, "delete of unknown context"),
        }
    }

    fn start_document(&self, context: ContextHandle, document_name: &str) -> DeviceResult<()> {
        let mut state = self.lock();
        state.enter(DeviceOp::StartDocument)?;
        let op = DeviceOp::StartDocument;
        let spool_index = state.spools.len();
        let ctx = state.context(op, context)?;
        if ctx.spool.is_some() {
            return Err(DeviceError::new(op.name(), "document already started"));
        }
        ctx.spool = Some(spool_index);
        let printer = ctx.printer.clone();
        state.spools.push(SpooledDocument {
            name: document_name.to_string(),
            printer,
            pages: Vec::new(),
            completed: false,
        });
        Ok(())
    }

    fn end_document(&self, context: ContextHandle) -> DeviceResult<()> {
        let mut state = self.lock();
        state.enter(DeviceOp::EndDocument)?;
        let op = DeviceOp::EndDocument;
        let ctx = state.context(op, context)?;
        if ctx.page.is_some() {
            return Err(DeviceError::new(op.name(), "page still open"));
        }
        let spool = ctx
            .spool
            .take()
            .ok_or_else(|| DeviceError::new(op.name(), "no document started"))?;
        state.spools[spool].completed = true;
        Ok(())
    }

    fn start_page(&self, context: ContextHandle) -> DeviceResult<()> {
        let mut state = self.lock();
        state.enter(DeviceOp::StartPage)?;
        let op = DeviceOp::StartPage;
        let ctx = state.context(op, context)?;
        if ctx.spool.is_none() {
            return Err(DeviceError::new(op.name(), "no document started"));
        }
        if ctx.page.is_some() {
            return Err(DeviceError::new(op.name(), "page already open"));
        }
        ctx.page = Some(PrintedPage {
            geometry: ctx.geometry,
            blits: Vec::new(),
        });
        Ok(())
    }

    fn end_page(&self, context: ContextHandle) -> DeviceResult<()> {
        let mut state = self.lock();
        state.enter(DeviceOp::EndPage)?;
        let op = DeviceOp::EndPage;
        let ctx = state.context(op, context)?;
        let page = ctx
            .page
            .take()
            .ok_or_else(|| DeviceError::new(op.name(), "no page open"))?;
        let spool = ctx
            .spool
            .ok_or_else(|| DeviceError::new(op.name(), "no document started"))?;
        state.spools[spool].pages.push(page);
        Ok(())
    }

    fn capabilities(&self, context: ContextHandle) -> DeviceResult<DeviceCaps> {
        let mut state = self.lock();
        state.enter(DeviceOp::Capabilities)?;
        Ok(state.context(DeviceOp::Capabilities, context)?.geometry.caps())
    }

    fn create_bitmap(&self, width: u32, height: u32) -> DeviceResult<BitmapHandle> {
        let mut state = self.lock();
        state.enter(DeviceOp::CreateBitmap)?;
        if width == 0 || height == 0 {
            return Err(DeviceError::new(
                DeviceOp::CreateBitmap.name(),
                format!("invalid bitmap size {width}x{height}"),
            ));
        }
        let stride = (width as usize * BGRA32_BYTES_PER_PIXEL).next_multiple_of(state.row_alignment);
        let info = BitmapInfo {
            width,
            height,
            stride,
        };
        let handle = state.issue_handle();
        state.bitmaps.insert(
            handle,
            StoredBitmap {
                info,
                data: vec![0; info.byte_len()],
            },
        );
        Ok(BitmapHandle(handle))
    }

    fn bitmap_info(&self, bitmap: BitmapHandle) -> DeviceResult<BitmapInfo> {
        self.lock()
            .bitmaps
            .get(&bitmap.0)
            .map(|b| b.info)
            .ok_or_else(|| DeviceError::new("GetObject", format!("unknown bitmap {}", bitmap.0)))
    }

    fn write_bitmap(&self, bitmap: BitmapHandle, offset: usize, bytes: &[u8]) -> DeviceResult<()> {
        let mut state = self.lock();
        state.enter(DeviceOp::WriteBitmap)?;
        let op = DeviceOp::WriteBitmap;
        let stored = state
            .bitmaps
            .get_mut(&bitmap.0)
            .ok_or_else(|| DeviceError::new(op.name(), format!("unknown bitmap {}", bitmap.0)))?;
        let end = offset
            .checked_add(bytes.len())
            .filter(|end| *end <= stored.data.len())
            .ok_or_else(|| {
                DeviceError::new(
                    op.name(),
                    format!(
                        "write of {} bytes at {offset} exceeds bitmap of {} bytes",
                        bytes.len(),
                        stored.data.len()
                    ),
                )
            })?;
        stored.data[offset..end].copy_from_slice(bytes);
        Ok(())
    }

    fn delete_bitmap(&self, bitmap: BitmapHandle) {
        let mut state = self.lock();
        let _ = state.enter(DeviceOp::DeleteBitmap);
        if state.bitmaps.remove(&bitmap.0).is_none() {
            warn!(handle = bitmap.0, "delete of unknown bitmap");
        }
    }

    fn stretch_blit(
        &self,
        context: ContextHandle,
        bitmap: BitmapHandle,
        dest: Rect,
        mode: StretchMode,
    ) -> DeviceResult<()> {
        let mut state = self.lock();
        state.enter(DeviceOp::StretchBlit)?;
        let op = DeviceOp::StretchBlit;
        let record = {
            let stored = state
                .bitmaps
                .get(&bitmap.0)
                .ok_or_else(|| DeviceError::new(op.name(), format!("unknown bitmap {}", bitmap.0)))?;
            BlitRecord {
                dest,
                mode,
                width: stored.info.width,
                height: stored.info.height,
                stride: stored.info.stride,
                pixels: stored.data.clone(),
            }
        };
        let page = state
            .context(op, context)?
            .page
            .as_mut()
            .ok_or_else(|| DeviceError::new(op.name(), "no page open"))?;
        page.blits.push(record);
        Ok(())
    }
}

/// Win32 `ERROR_INVALID_PRINTER_NAME`, reported for unknown printers.
const ERROR_INVALID_PRINTER_NAME: u32 = 1801;

#[cfg(test)]
mod tests {
    use super::*;

    fn open_page(device: &VirtualPrinter) -> (PrinterHandle, ContextHandle) {
        let name = device.default_printer().expect("default");
        let printer = device.open_printer(&name).expect("open");
        let ctx = device.create_context(&name).expect("dc");
        device.start_document(ctx, "test").expect("start doc");
        device.start_page(ctx).expect("start page");
        (printer, ctx)
    }

    #[test]
    fn full_frame_sequence_commits_page() {
        let device = VirtualPrinter::letter();
        let (printer, ctx) = open_page(&device);
        let bmp = device.create_bitmap(2, 2).expect("bitmap");
        device
            .stretch_blit(ctx, bmp, Rect { x: 0, y: 0, width: 4, height: 4 }, StretchMode::Halftone)
            .expect("blit");
        device.end_page(ctx).expect("end page");
        device.end_document(ctx).expect("end doc");
        device.delete_bitmap(bmp);
        device.delete_context(ctx);
        device.close_printer(printer);

        let docs = device.spooled_documents();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].completed);
        assert_eq!(docs[0].pages.len(), 1);
        assert_eq!(docs[0].pages[0].blits[0].dest.width, 4);
        assert!(device.all_released());
    }

    #[test]
    fn unknown_printer_fails_with_os_code() {
        let device = VirtualPrinter::letter();
        let err = device.open_printer("Nope").unwrap_err();
        assert_eq!(err.os_code, Some(ERROR_INVALID_PRINTER_NAME));
    }

    #[test]
    fn no_default_printer() {
        let device = VirtualPrinter::new();
        assert!(device.default_printer().is_err());
    }

    #[test]
    fn scripted_failure_fires_on_nth_call_only() {
        let device = VirtualPrinter::letter();
        device.fail_on_with_code(DeviceOp::StartPage, 2, 6);
        let (_, ctx) = open_page(&device);
        device.end_page(ctx).expect("end page");

        let err = device.start_page(ctx).unwrap_err();
        assert_eq!(err.operation, "StartPage");
        assert_eq!(err.os_code, Some(6));
        device.start_page(ctx).expect("third call succeeds");
    }

    #[test]
    fn page_frames_require_open_document() {
        let device = VirtualPrinter::letter();
        let ctx = device.create_context(VirtualPrinter::DEFAULT_NAME).expect("dc");
        assert!(device.start_page(ctx).is_err());
        device.delete_context(ctx);
    }

    #[test]
    fn rows_are_aligned() {
        let device = VirtualPrinter::letter().with_row_alignment(64);
        let bmp = device.create_bitmap(3, 2).expect("bitmap");
        let info = device.bitmap_info(bmp).expect("info");
        assert_eq!(info.stride, 64);
        assert!(device.write_bitmap(bmp, 120, &[0; 16]).is_err());
        device.delete_bitmap(bmp);
        assert_eq!(device.live_bitmaps(), 0);
    }

    #[test]
    fn rendered_page_places_blit_on_white_sheet() {
        let geometry = PaperGeometry {
            physical_width: 10,
            physical_height: 10,
            offset_x: 1,
            offset_y: 1,
            printable_width: 8,
            printable_height: 8,
        };
        let mut pixels = vec![0u8; 4 * 4];
        for px in pixels.chunks_mut(4) {
            px.copy_from_slice(&[0, 0, 255, 255]); // BGRA red
        }
        let page = PrintedPage {
            geometry,
            blits: vec![BlitRecord {
                dest: Rect { x: 2, y: 2, width: 4, height: 4 },
                mode: StretchMode::Halftone,
                width: 2,
                height: 2,
                stride: 8,
                pixels,
            }],
        };
        let sheet = page.render();
        assert_eq!(sheet.dimensions(), (10, 10));
        assert_eq!(sheet.get_pixel(0, 0), &Rgba([255, 255, 255, 255]));
        assert_eq!(sheet.get_pixel(3, 3), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn export_writes_one_png_per_page() {
        let device = VirtualPrinter::letter();
        let (printer, ctx) = open_page(&device);
        device.end_page(ctx).expect("end page");
        device.end_document(ctx).expect("end doc");
        device.delete_context(ctx);
        device.close_printer(printer);

        let dir = tempfile::tempdir().expect("tempdir");
        let written = device.spooled_documents()[0]
            .export_png(dir.path())
            .expect("export");
        assert_eq!(written.len(), 1);
        assert!(written[0].ends_with("page-001.png"));
        assert!(written[0].exists());
    }
}
