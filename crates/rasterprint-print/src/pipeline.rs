// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Pipeline orchestrator: prints every page of one document.
//
// Sequence: validate DPI, start the engine, load the document, open the print
// job once, then rasterize / adapt / print each page in order. The first page
// failure stops the loop. Teardown always runs (job, then document, then
// engine) before the result is returned. Pages committed before a failure
// stay submitted to the device.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use rasterprint_bridge::PrintDevice;
use rasterprint_core::config::{DEFAULT_DOCUMENT_NAME, PrintConfig};
use rasterprint_core::error::RasterPrintError;
use rasterprint_core::types::{Dpi, JobId};
use rasterprint_document::{DocumentSession, EngineProvider, PageRasterizer};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::adapter::to_device_bitmap;
use crate::job::PrintJob;

/// Cooperative cancellation flag, checked before each page.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-run parameters.
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// `None` uses 300 dpi.
    pub dpi: Option<u32>,
    /// `None` uses the device's default printer.
    pub printer: Option<String>,
    pub document_name: String,
    pub cancel: Option<CancelToken>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            dpi: None,
            printer: None,
            document_name: DEFAULT_DOCUMENT_NAME.to_string(),
            cancel: None,
        }
    }
}

impl From<&PrintConfig> for RunOptions {
    fn from(config: &PrintConfig) -> Self {
        Self {
            dpi: Some(config.dpi),
            printer: config.printer.clone(),
            document_name: config.document_name.clone(),
            cancel: None,
        }
    }
}

/// Pipeline step a failure happened in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Validate,
    EngineInit,
    DocumentLoad,
    JobOpen,
    Rasterize,
    Adapt,
    PrintFrame,
    JobClose,
    Cancelled,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Validate => "validate",
            Self::EngineInit => "engine-init",
            Self::DocumentLoad => "document-load",
            Self::JobOpen => "job-open",
            Self::Rasterize => "rasterize",
            Self::Adapt => "adapt",
            Self::PrintFrame => "print-frame",
            Self::JobClose => "job-close",
            Self::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

/// Outcome of a successful run.
#[derive(Debug, Clone, Serialize)]
pub struct PrintReport {
    pub job_id: JobId,
    pub document: PathBuf,
    pub printer: String,
    pub dpi: Dpi,
    pub pages_printed: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

/// Outcome of a failed run. All resources were released before it was built.
#[derive(Debug, Error)]
#[error("{stage} failed{}: {error}", page_suffix(.page))]
pub struct PipelineFailure {
    pub job_id: JobId,
    pub stage: Stage,
    /// 1-based page number, for per-page failures.
    pub page: Option<usize>,
    /// Pages fully submitted to the device before the failure.
    pub pages_committed: usize,
    #[source]
    pub error: RasterPrintError,
}

impl PipelineFailure {
    /// OS error code of the underlying device failure, if any.
    pub fn os_code(&self) -> Option<u32> {
        self.error.os_code()
    }
}

fn page_suffix(page: &Option<usize>) -> String {
    page.map(|p| format!(" on page {p}")).unwrap_or_default()
}

struct PageFailure {
    stage: Stage,
    index: usize,
    error: RasterPrintError,
}

/// Prints documents from one engine provider onto one device.
pub struct Pipeline<'a> {
    provider: &'a dyn EngineProvider,
    device: &'a dyn PrintDevice,
    rasterizer: PageRasterizer,
}

impl<'a> Pipeline<'a> {
    pub fn new(provider: &'a dyn EngineProvider, device: &'a dyn PrintDevice) -> Self {
        Self {
            provider,
            device,
            rasterizer: PageRasterizer::new(),
        }
    }

    pub fn with_rasterizer(mut self, rasterizer: PageRasterizer) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    /// Print every page of the document at `path`.
    #[instrument(skip_all, fields(path = %path.as_ref().display(), engine = self.provider.name()))]
    pub fn run(&self, path: impl AsRef<Path>, options: &RunOptions) -> Result<PrintReport, PipelineFailure> {
        let path = path.as_ref();
        let job_id = JobId::new();
        let started_at = Utc::now();
        let fail = |stage, page, pages_committed, error| PipelineFailure {
            job_id,
            stage,
            page,
            pages_committed,
            error,
        };

        let dpi = Dpi::resolve(options.dpi).map_err(|e| fail(Stage::Validate, None, 0, e))?;
        info!(%job_id, %dpi, "print run started");

        let engine = self.provider.initialize().map_err(|e| {
            fail(Stage::EngineInit, None, 0, RasterPrintError::EngineInit(e.to_string()))
        })?;
        let mut session = DocumentSession::new(engine.as_ref());
        session
            .load(path)
            .map_err(|e| fail(Stage::DocumentLoad, None, 0, e))?;
        let page_count = session.page_count();
        if page_count == 0 {
            return Err(fail(Stage::DocumentLoad, None, 0, RasterPrintError::NoPages));
        }

        let mut job = PrintJob::open(
            self.device,
            options.printer.as_deref(),
            &options.document_name,
        )
        .map_err(|e| fail(Stage::JobOpen, None, 0, e))?;

        let printed = self.print_pages(&session, &mut job, page_count, dpi, options.cancel.as_ref());
        let pages_committed = job.pages_printed();
        let printer = job.printer_name().to_string();
        let closed = job.close();
        drop(job);
        session.close();
        drop(session);
        drop(engine);

        match (printed, closed) {
            (Err(failure), closed) => {
                if let Err(e) = closed {
                    warn!(error = %e, "print job close failed after an earlier error");
                }
                warn!(
                    stage = %failure.stage,
                    page = failure.index + 1,
                    pages_committed,
                    error = %failure.error,
                    "print run stopped"
                );
                Err(fail(failure.stage, Some(failure.index + 1), pages_committed, failure.error))
            }
            (Ok(()), Err(e)) => Err(fail(Stage::JobClose, None, pages_committed, e)),
            (Ok(()), Ok(())) => {
                info!(%job_id, pages = pages_committed, printer = %printer, "print run finished");
                Ok(PrintReport {
                    job_id,
                    document: path.to_path_buf(),
                    printer,
                    dpi,
                    pages_printed: pages_committed,
                    started_at,
                    finished_at: Utc::now(),
                })
            }
        }
    }

    fn print_pages(
        &self,
        session: &DocumentSession<'_>,
        job: &mut PrintJob<'_>,
        page_count: usize,
        dpi: Dpi,
        cancel: Option<&CancelToken>,
    ) -> Result<(), PageFailure> {
        for index in 0..page_count {
            let at = |stage: Stage| move |error: RasterPrintError| PageFailure { stage, index, error };

            if cancel.is_some_and(CancelToken::is_cancelled) {
                return Err(at(Stage::Cancelled)(RasterPrintError::Cancelled));
            }
            let raster = self
                .rasterizer
                .render(session, index, dpi)
                .map_err(at(Stage::Rasterize))?;
            let bitmap = to_device_bitmap(self.device, &raster).map_err(at(Stage::Adapt))?;
            drop(raster);
            job.print_frame(&bitmap).map_err(at(Stage::PrintFrame))?;
            info!(page = index + 1, of = page_count, "page submitted");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_are_kebab_case() {
        assert_eq!(Stage::PrintFrame.to_string(), "print-frame");
        assert_eq!(
            serde_json::to_string(&Stage::EngineInit).expect("serialize"),
            "\"engine-init\""
        );
    }

    #[test]
    fn failure_display_names_stage_and_page() {
        let failure = PipelineFailure {
            job_id: JobId::new(),
            stage: Stage::PrintFrame,
            page: Some(2),
            pages_committed: 1,
            error: RasterPrintError::NoPages,
        };
        assert_eq!(failure.to_string(), "print-frame failed on page 2: document has no pages");
    }

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn options_follow_config() {
        let config = PrintConfig {
            dpi: 600,
            printer: Some("Office".into()),
            ..Default::default()
        };
        let options = RunOptions::from(&config);
        assert_eq!(options.dpi, Some(600));
        assert_eq!(options.printer.as_deref(), Some("Office"));
        assert_eq!(options.document_name, DEFAULT_DOCUMENT_NAME);
    }
}
