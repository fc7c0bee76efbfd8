// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Human-readable error messages for the command-line host.
//
// Every technical error maps to a plain-English message with a suggestion.

use crate::error::{LoadFailureKind, RasterFailureKind, RasterPrintError};
use crate::types::ErrorClass;

/// Severity of an error from the user's perspective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Busy spooler or device; running the job again may work.
    Transient,
    /// User must do something (choose a printer, fix the file path).
    ActionRequired,
    /// Cannot be fixed by retrying (bad file, unsupported platform).
    Permanent,
}

/// A human-readable error with a plain English message and a suggestion.
#[derive(Debug, Clone)]
pub struct HumanError {
    pub message: String,
    pub suggestion: String,
    /// Whether re-running the same job could succeed.
    pub retriable: bool,
    pub severity: Severity,
}

impl HumanError {
    fn new(message: &str, suggestion: impl Into<String>, class: ErrorClass) -> Self {
        let severity = match class {
            ErrorClass::Transient => Severity::Transient,
            ErrorClass::UserAction => Severity::ActionRequired,
            ErrorClass::Permanent => Severity::Permanent,
        };
        Self {
            message: message.into(),
            suggestion: suggestion.into(),
            retriable: class == ErrorClass::Transient,
            severity,
        }
    }
}

/// Convert a `RasterPrintError` into a `HumanError`.
pub fn humanize_error(err: &RasterPrintError) -> HumanError {
    let class = err.class();
    match err {
        RasterPrintError::InvalidDpi(dpi) => HumanError::new(
            "That print resolution isn't supported.",
            format!("Choose a DPI between 72 and 1200 (you asked for {dpi}). 300 is a good default."),
            class,
        ),

        RasterPrintError::EngineInit(_) => HumanError::new(
            "The PDF renderer couldn't be started.",
            "Make sure the PDFium library is installed next to the program, or set PDFIUM_DYNAMIC_LIB_PATH.",
            class,
        ),

        RasterPrintError::DocumentLoad { kind, path, .. } => match kind {
            LoadFailureKind::Io => HumanError::new(
                "The document couldn't be opened.",
                format!("Check that {path} exists and that you have permission to read it."),
                class,
            ),
            LoadFailureKind::Empty => HumanError::new(
                "The document is empty.",
                "The file has no content. Try exporting it again.",
                class,
            ),
            LoadFailureKind::Parse => HumanError::new(
                "There's a problem with this PDF file.",
                "The file may be damaged or password protected. Try opening it in a PDF viewer first.",
                class,
            ),
        },

        RasterPrintError::NoDocumentOpen | RasterPrintError::InvalidJobState { .. } => {
            HumanError::new(
                "The print job got out of step.",
                "This is a bug in the calling program. Please report it.",
                class,
            )
        }

        RasterPrintError::NoPages => HumanError::new(
            "This document has no pages to print.",
            "Check that the right file was chosen.",
            class,
        ),

        RasterPrintError::InvalidPageIndex { page_count, .. } => HumanError::new(
            "That page doesn't exist.",
            format!("The document has {page_count} page(s)."),
            class,
        ),

        RasterPrintError::Rasterization { kind, .. } => match kind {
            RasterFailureKind::Allocation => HumanError::new(
                "There wasn't enough memory to prepare the page.",
                "Try a lower DPI, or close other programs and try again.",
                class,
            ),
            RasterFailureKind::InvalidDimensions => HumanError::new(
                "A page in this document has no printable size.",
                "The file may be damaged. Try re-exporting it.",
                class,
            ),
            RasterFailureKind::Render => HumanError::new(
                "A page couldn't be drawn.",
                "The file may be damaged. Try opening it in a PDF viewer first.",
                class,
            ),
        },

        RasterPrintError::BitmapConversion(_) | RasterPrintError::InvalidGeometry { .. } => {
            HumanError::new(
                "The page image couldn't be prepared for the printer.",
                "Try a different DPI or a different printer.",
                class,
            )
        }

        RasterPrintError::PrinterResolution(_) => HumanError::new(
            "No default printer is set up.",
            "Set a default printer in your system settings, or name one with --printer.",
            class,
        ),

        RasterPrintError::PrinterOpen { name, .. } => HumanError::new(
            "The printer couldn't be found.",
            format!("Check that \"{name}\" is installed and spelled exactly as the system shows it."),
            class,
        ),

        RasterPrintError::DeviceContext { .. }
        | RasterPrintError::DocFrameStart(_)
        | RasterPrintError::DocFrameEnd(_)
        | RasterPrintError::PageFrameStart(_)
        | RasterPrintError::PageFrameEnd(_) => HumanError::new(
            "The printer isn't accepting jobs right now.",
            "Make sure the printer is on and not paused, then print again.",
            class,
        ),

        RasterPrintError::Blit(_) => HumanError::new(
            "A page couldn't be sent to the printer.",
            "Pages before it may already be printing. Check the printer, then print the remaining pages.",
            class,
        ),

        RasterPrintError::Cancelled => HumanError::new(
            "Printing was cancelled.",
            "Pages sent before cancelling may still print.",
            class,
        ),

        RasterPrintError::PlatformUnavailable => HumanError::new(
            "Printing isn't available on this system.",
            "Use --virtual-output to print pages to image files instead.",
            class,
        ),

        RasterPrintError::Config(detail) => HumanError::new(
            "The settings file has a problem.",
            format!("Fix the configuration and try again. ({detail})"),
            class,
        ),

        RasterPrintError::Io(_) => HumanError::new(
            "There was a problem reading or writing a file.",
            "Check the path and available disk space.",
            class,
        ),

        RasterPrintError::Serialization(_) => HumanError::new(
            "The settings file isn't valid JSON.",
            "Check for missing commas or quotes.",
            class,
        ),
    }
}
