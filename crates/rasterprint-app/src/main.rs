// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// rasterprint — command-line host.
//
// Entry point. Initialises logging, merges the config file with command-line
// flags, and runs the print pipeline on either the native printer backend or
// the virtual printer.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;
use rasterprint_bridge::{PrintDevice, VirtualPrinter, platform_device};
use rasterprint_core::PrintConfig;
use rasterprint_core::error::{RasterPrintError, Result};
use rasterprint_core::human_errors::{HumanError, humanize_error};
use rasterprint_document::PdfiumProvider;
use rasterprint_print::{Pipeline, PipelineFailure, PrintReport, RunOptions};

/// Print a PDF by rasterizing each page and sending it to a printer.
#[derive(Parser, Debug)]
#[command(name = "rasterprint", version)]
struct Cli {
    /// Document to print
    document: PathBuf,

    /// Rasterization resolution, 72 to 1200 dpi [default: 300]
    #[arg(long)]
    dpi: Option<u32>,

    /// Target printer [default: the system default printer]
    #[arg(long)]
    printer: Option<String>,

    /// JSON settings file; flags override its values
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print to a US Letter 300 dpi virtual printer and write one PNG per page
    #[arg(long, value_name = "DIR")]
    virtual_output: Option<PathBuf>,

    /// Job name shown in the print queue
    #[arg(long)]
    document_name: Option<String>,

    /// PDFium shared library, or the directory containing it
    #[arg(long, value_name = "PATH")]
    pdfium: Option<PathBuf>,

    /// Write the run report to stdout as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            report_error(&humanize_error(&e), None);
            return ExitCode::from(2);
        }
    };

    let provider = match &config.pdfium_library_path {
        Some(path) => PdfiumProvider::with_library_path(path),
        None => PdfiumProvider::new(),
    };

    let result = match &cli.virtual_output {
        Some(dir) => print_virtual(&cli.document, &config, &provider, dir),
        None => {
            let device = platform_device();
            tracing::info!(backend = device.platform_name(), "using native print backend");
            run(&cli.document, &config, &provider, device.as_ref()).map_err(Into::into)
        }
    };

    match result {
        Ok(report) => {
            if cli.json {
                match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{json}"),
                    Err(e) => tracing::error!(error = %e, "report serialization failed"),
                }
            } else {
                println!(
                    "Printed {} page(s) of {} to {} at {}.",
                    report.pages_printed,
                    report.document.display(),
                    report.printer,
                    report.dpi
                );
            }
            ExitCode::SUCCESS
        }
        Err(RunError::Pipeline(failure)) => {
            let detail = match failure.page {
                Some(page) => format!(
                    "Stopped at page {page} during {} ({} page(s) already sent).",
                    failure.stage, failure.pages_committed
                ),
                None => format!("Stopped during {}.", failure.stage),
            };
            tracing::debug!(error = %failure, os_code = ?failure.os_code(), "run failed");
            report_error(&humanize_error(&failure.error), Some(&detail));
            ExitCode::FAILURE
        }
        Err(RunError::Export(e)) => {
            report_error(&humanize_error(&e), Some("Printing finished but the pages could not be saved."));
            ExitCode::FAILURE
        }
    }
}

/// Config file (if any) overridden by flags, then validated.
fn load_config(cli: &Cli) -> Result<PrintConfig> {
    let mut config = match &cli.config {
        Some(path) => PrintConfig::from_json_file(path)?,
        None => PrintConfig::default(),
    };
    if let Some(dpi) = cli.dpi {
        config.dpi = dpi;
    }
    if let Some(printer) = &cli.printer {
        config.printer = Some(printer.clone());
    }
    if let Some(name) = &cli.document_name {
        config.document_name = name.clone();
    }
    if let Some(path) = &cli.pdfium {
        config.pdfium_library_path = Some(path.clone());
    }
    config.validate()?;
    Ok(config)
}

enum RunError {
    Pipeline(PipelineFailure),
    Export(RasterPrintError),
}

impl From<PipelineFailure> for RunError {
    fn from(failure: PipelineFailure) -> Self {
        Self::Pipeline(failure)
    }
}

fn run(
    document: &Path,
    config: &PrintConfig,
    provider: &PdfiumProvider,
    device: &dyn PrintDevice,
) -> std::result::Result<PrintReport, PipelineFailure> {
    Pipeline::new(provider, device).run(document, &RunOptions::from(config))
}

fn print_virtual(
    document: &Path,
    config: &PrintConfig,
    provider: &PdfiumProvider,
    out_dir: &Path,
) -> std::result::Result<PrintReport, RunError> {
    let device = VirtualPrinter::letter();
    let mut config = config.clone();
    if let Some(printer) = config.printer.take() {
        tracing::warn!(%printer, "ignoring printer name; the virtual printer is used");
    }
    let report = run(document, &config, provider, &device)?;
    for spooled in device.spooled_documents() {
        let written = spooled.export_png(out_dir).map_err(RunError::Export)?;
        tracing::info!(pages = written.len(), dir = %out_dir.display(), "virtual pages written");
    }
    Ok(report)
}

fn report_error(human: &HumanError, detail: Option<&str>) {
    eprintln!("Error: {}", human.message);
    if let Some(detail) = detail {
        eprintln!("       {detail}");
    }
    eprintln!("Hint:  {}", human.suggestion);
    if human.retriable {
        eprintln!("       Running the same command again may succeed.");
    }
}
