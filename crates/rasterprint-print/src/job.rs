// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Print job controller: the Closed / DocOpen / PageOpen state machine over a
// print device.
//
// The job owns its printer and context handles. They are released in reverse
// acquisition order by `close`, which also runs on drop, so every early return
// in `open` or the pipeline unwinds without leaking a handle.

use rasterprint_bridge::{ContextHandle, PrintDevice, PrinterHandle, StretchMode};
use rasterprint_core::error::{RasterPrintError, Result};
use rasterprint_core::types::JobState;
use tracing::{debug, info, instrument, warn};

use crate::adapter::DeviceBitmap;
use crate::scaling::{ScalingTransform, fit};

/// One print job on one printer.
pub struct PrintJob<'d> {
    device: &'d dyn PrintDevice,
    printer_name: String,
    printer: Option<PrinterHandle>,
    context: Option<ContextHandle>,
    state: JobState,
    pages_printed: usize,
}

impl<'d> PrintJob<'d> {
    /// Acquire the printer and a device context, then start the document
    /// frame. `printer = None` selects the device's default printer.
    ///
    /// On failure everything acquired so far is released and the distinct
    /// error for the failing step is returned.
    #[instrument(skip(device), fields(platform = device.platform_name()))]
    pub fn open(device: &'d dyn PrintDevice, printer: Option<&str>, document_name: &str) -> Result<Self> {
        if !device.is_available() {
            return Err(RasterPrintError::PlatformUnavailable);
        }
        let printer_name = match printer {
            Some(name) => name.to_string(),
            None => device
                .default_printer()
                .map_err(RasterPrintError::PrinterResolution)?,
        };

        let handle = device
            .open_printer(&printer_name)
            .map_err(|source| RasterPrintError::PrinterOpen {
                name: printer_name.clone(),
                source,
            })?;
        let mut job = Self {
            device,
            printer_name,
            printer: Some(handle),
            context: None,
            state: JobState::Closed,
            pages_printed: 0,
        };

        let context = device
            .create_context(&job.printer_name)
            .map_err(|source| RasterPrintError::DeviceContext {
                name: job.printer_name.clone(),
                source,
            })?;
        job.context = Some(context);

        device
            .start_document(context, document_name)
            .map_err(RasterPrintError::DocFrameStart)?;
        job.state = JobState::DocOpen;

        info!(printer = %job.printer_name, "print job opened");
        Ok(job)
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn printer_name(&self) -> &str {
        &self.printer_name
    }

    /// Pages whose frame completed without error.
    pub fn pages_printed(&self) -> usize {
        self.pages_printed
    }

    /// Print `bitmap` as one page, scaled to fit and centered.
    ///
    /// The page frame is ended whether or not drawing succeeded; a drawing
    /// error is still returned. A frame-start failure leaves the job in
    /// `DocOpen` with no page consumed.
    #[instrument(skip_all, fields(page = self.pages_printed + 1))]
    pub fn print_frame(&mut self, bitmap: &DeviceBitmap<'_>) -> Result<ScalingTransform> {
        let context = match (self.state, self.context) {
            (JobState::DocOpen, Some(context)) => context,
            (actual, _) => {
                return Err(RasterPrintError::InvalidJobState {
                    expected: JobState::DocOpen,
                    actual,
                });
            }
        };

        self.device
            .start_page(context)
            .map_err(RasterPrintError::PageFrameStart)?;
        self.state = JobState::PageOpen;

        let drawn = self.draw(context, bitmap);
        let ended = self.device.end_page(context);
        self.state = JobState::DocOpen;

        let transform = drawn?;
        ended.map_err(RasterPrintError::PageFrameEnd)?;
        self.pages_printed += 1;
        Ok(transform)
    }

    fn draw(&self, context: ContextHandle, bitmap: &DeviceBitmap<'_>) -> Result<ScalingTransform> {
        let info = self
            .device
            .bitmap_info(bitmap.handle())
            .map_err(RasterPrintError::Blit)?;
        let caps = self
            .device
            .capabilities(context)
            .map_err(RasterPrintError::Blit)?;
        let transform = fit(
            i64::from(info.width),
            i64::from(info.height),
            i64::from(caps.printable_width),
            i64::from(caps.printable_height),
            i64::from(caps.offset_x),
            i64::from(caps.offset_y),
        )?;
        debug!(scale = transform.scale, dest = ?transform.dest, "page fitted");
        self.device
            .stretch_blit(context, bitmap.handle(), transform.dest, StretchMode::Halftone)
            .map_err(RasterPrintError::Blit)?;
        Ok(transform)
    }

    /// End the document frame and release the context and printer handle.
    ///
    /// Handles are released even when ending the document fails. Calling
    /// `close` on a closed job does nothing.
    #[instrument(skip_all, fields(printer = %self.printer_name))]
    pub fn close(&mut self) -> Result<()> {
        let mut result = Ok(());
        if let Some(context) = self.context {
            if self.state == JobState::PageOpen
                && let Err(e) = self.device.end_page(context)
            {
                warn!(error = %e, "open page could not be ended during close");
            }
            if self.state != JobState::Closed {
                result = self
                    .device
                    .end_document(context)
                    .map_err(RasterPrintError::DocFrameEnd);
            }
        }
        self.state = JobState::Closed;
        self.release();
        if result.is_ok() {
            debug!(pages = self.pages_printed, "print job closed");
        }
        result
    }

    fn release(&mut self) {
        if let Some(context) = self.context.take() {
            self.device.delete_context(context);
        }
        if let Some(printer) = self.printer.take() {
            self.device.close_printer(printer);
        }
    }
}

impl Drop for PrintJob<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "print job closed with error during unwind");
        }
    }
}
