// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// End-to-end pipeline runs against the mock engine and the virtual printer.

use std::io::Write;

use rasterprint_bridge::{DeviceOp, VirtualPrinter};
use rasterprint_core::error::{LoadFailureKind, RasterFailureKind, RasterPrintError};
use rasterprint_core::types::{PageSize, Rect};
use rasterprint_document::MockEngineProvider;
use rasterprint_print::{CancelToken, Pipeline, RunOptions, Stage};

fn pdf_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(b"%PDF-1.7\n%fixture\n").expect("write");
    file
}

fn at_dpi(dpi: u32) -> RunOptions {
    RunOptions {
        dpi: Some(dpi),
        ..Default::default()
    }
}

fn assert_released(provider: &MockEngineProvider, device: &VirtualPrinter) {
    assert_eq!(provider.live_engines(), 0, "engine left running");
    assert_eq!(provider.live_documents(), 0, "document left open");
    assert_eq!(device.live_printer_handles(), 0, "printer handle leaked");
    assert_eq!(device.live_contexts(), 0, "device context leaked");
    assert_eq!(device.live_bitmaps(), 0, "device bitmap leaked");
}

#[test]
fn prints_every_page_in_order() {
    let provider = MockEngineProvider::new(vec![PageSize::US_LETTER, PageSize::A4, PageSize::US_LETTER]);
    let device = VirtualPrinter::letter();
    let file = pdf_file();

    let report = Pipeline::new(&provider, &device)
        .run(file.path(), &at_dpi(72))
        .expect("run");
    assert_eq!(report.pages_printed, 3);
    assert_eq!(report.printer, VirtualPrinter::DEFAULT_NAME);
    assert_eq!(report.dpi.get(), 72);
    assert!(report.finished_at >= report.started_at);

    let docs = device.spooled_documents();
    assert_eq!(docs.len(), 1, "one job for the whole document");
    assert!(docs[0].completed);
    assert_eq!(docs[0].name, "PDF Print Job");
    assert_eq!(docs[0].pages.len(), 3);

    // 612x792 raster onto a 2400x3150 printable area with 75-unit margins.
    let letter = Rect {
        x: 75,
        y: 97,
        width: 2400,
        height: 3106,
    };
    assert_eq!(docs[0].pages[0].blits[0].dest, letter);
    assert_eq!((docs[0].pages[1].blits[0].width, docs[0].pages[1].blits[0].height), (595, 842));
    assert_eq!(docs[0].pages[2].blits[0].dest, letter);

    assert_eq!(provider.renders(), 3);
    assert_released(&provider, &device);
}

#[test]
fn default_resolution_is_300_dpi() {
    let provider = MockEngineProvider::with_pages(1, PageSize::US_LETTER);
    let device = VirtualPrinter::letter();
    let file = pdf_file();

    let report = Pipeline::new(&provider, &device)
        .run(file.path(), &RunOptions::default())
        .expect("run");
    assert_eq!(report.dpi.get(), 300);
    let blit = &device.spooled_documents()[0].pages[0].blits[0];
    assert_eq!((blit.width, blit.height), (2550, 3300));
}

#[test]
fn out_of_range_dpi_touches_nothing() {
    for dpi in [0, 71, 1201] {
        let provider = MockEngineProvider::with_pages(1, PageSize::A4);
        let device = VirtualPrinter::letter();

        let failure = Pipeline::new(&provider, &device)
            .run("/nonexistent/never-read.pdf", &at_dpi(dpi))
            .unwrap_err();
        assert_eq!(failure.stage, Stage::Validate);
        assert!(matches!(failure.error, RasterPrintError::InvalidDpi(d) if d == dpi));
        assert_eq!(provider.initializations(), 0);
        assert!(device.call_log().is_empty());
    }
}

#[test]
fn dpi_bounds_are_inclusive() {
    for dpi in [72, 1200] {
        let provider = MockEngineProvider::with_pages(1, PageSize { width_pts: 36.0, height_pts: 36.0 });
        let device = VirtualPrinter::letter();
        let file = pdf_file();
        Pipeline::new(&provider, &device)
            .run(file.path(), &at_dpi(dpi))
            .expect("bound is valid");
    }
}

#[test]
fn empty_document_never_opens_a_job() {
    let provider = MockEngineProvider::new(Vec::new());
    let device = VirtualPrinter::letter();
    let file = pdf_file();

    let failure = Pipeline::new(&provider, &device)
        .run(file.path(), &RunOptions::default())
        .unwrap_err();
    assert_eq!(failure.stage, Stage::DocumentLoad);
    assert!(matches!(failure.error, RasterPrintError::NoPages));
    assert_eq!(failure.page, None);
    assert!(device.call_log().is_empty());
    assert_released(&provider, &device);
}

#[test]
fn blit_failure_on_second_page_keeps_first_page() {
    let provider = MockEngineProvider::with_pages(2, PageSize::US_LETTER);
    let device = VirtualPrinter::letter();
    device.fail_on_with_code(DeviceOp::StretchBlit, 2, 1804);
    let file = pdf_file();

    let failure = Pipeline::new(&provider, &device)
        .run(file.path(), &at_dpi(300))
        .unwrap_err();
    assert_eq!(failure.stage, Stage::PrintFrame);
    assert_eq!(failure.page, Some(2));
    assert_eq!(failure.pages_committed, 1);
    assert!(matches!(failure.error, RasterPrintError::Blit(_)));
    assert_eq!(failure.os_code(), Some(1804));
    assert!(failure.to_string().contains("on page 2"));

    let docs = device.spooled_documents();
    assert!(docs[0].completed, "job is still closed properly");
    // The failed page's frame was still ended, so it is spooled without content.
    assert_eq!(docs[0].pages.len(), 2);
    assert_eq!(docs[0].pages[0].blits.len(), 1);
    assert!(docs[0].pages[1].blits.is_empty());
    assert_released(&provider, &device);
}

#[test]
fn render_failure_stops_before_later_pages() {
    let provider = MockEngineProvider::with_pages(3, PageSize::A4).failing_render_on(1);
    let device = VirtualPrinter::letter();
    let file = pdf_file();

    let failure = Pipeline::new(&provider, &device)
        .run(file.path(), &at_dpi(72))
        .unwrap_err();
    assert_eq!(failure.stage, Stage::Rasterize);
    assert_eq!(failure.page, Some(2));
    assert_eq!(failure.pages_committed, 1);
    assert!(matches!(
        failure.error,
        RasterPrintError::Rasterization {
            index: 1,
            kind: RasterFailureKind::Render,
            ..
        }
    ));
    assert_eq!(provider.renders(), 2, "page 3 never rendered");
    assert_eq!(device.spooled_documents()[0].pages.len(), 1);
    assert_released(&provider, &device);
}

#[test]
fn adapter_failure_is_reported_per_page() {
    let provider = MockEngineProvider::with_pages(2, PageSize::A4);
    let device = VirtualPrinter::letter();
    device.fail_on(DeviceOp::CreateBitmap, 1);
    let file = pdf_file();

    let failure = Pipeline::new(&provider, &device)
        .run(file.path(), &at_dpi(72))
        .unwrap_err();
    assert_eq!(failure.stage, Stage::Adapt);
    assert_eq!(failure.page, Some(1));
    assert_eq!(failure.pages_committed, 0);
    assert!(matches!(failure.error, RasterPrintError::BitmapConversion(_)));
    assert_released(&provider, &device);
}

#[test]
fn page_frame_start_failure() {
    let provider = MockEngineProvider::with_pages(2, PageSize::A4);
    let device = VirtualPrinter::letter();
    device.fail_on(DeviceOp::StartPage, 1);
    let file = pdf_file();

    let failure = Pipeline::new(&provider, &device)
        .run(file.path(), &at_dpi(72))
        .unwrap_err();
    assert_eq!(failure.stage, Stage::PrintFrame);
    assert!(matches!(failure.error, RasterPrintError::PageFrameStart(_)));
    assert!(device.spooled_documents()[0].pages.is_empty());
    assert_released(&provider, &device);
}

#[test]
fn page_frame_end_failure_commits_nothing() {
    let provider = MockEngineProvider::with_pages(2, PageSize::A4);
    let device = VirtualPrinter::letter();
    device.fail_on(DeviceOp::EndPage, 1);
    let file = pdf_file();

    let failure = Pipeline::new(&provider, &device)
        .run(file.path(), &at_dpi(72))
        .unwrap_err();
    assert_eq!(failure.stage, Stage::PrintFrame);
    assert_eq!(failure.page, Some(1));
    assert_eq!(failure.pages_committed, 0);
    assert!(matches!(failure.error, RasterPrintError::PageFrameEnd(_)));
    assert_eq!(provider.renders(), 1, "page 2 never rendered");
    assert!(device.all_released());
    assert_released(&provider, &device);
}

#[test]
fn blit_failure_takes_priority_over_page_frame_end_failure() {
    let provider = MockEngineProvider::with_pages(1, PageSize::A4);
    let device = VirtualPrinter::letter();
    device.fail_on(DeviceOp::StretchBlit, 1);
    device.fail_on(DeviceOp::EndPage, 1);
    let file = pdf_file();

    let failure = Pipeline::new(&provider, &device)
        .run(file.path(), &at_dpi(72))
        .unwrap_err();
    assert_eq!(failure.stage, Stage::PrintFrame);
    assert_eq!(failure.pages_committed, 0);
    assert!(matches!(failure.error, RasterPrintError::Blit(_)));
    assert_released(&provider, &device);
}

#[test]
fn job_open_failure_unwinds_in_reverse_order() {
    let provider = MockEngineProvider::with_pages(2, PageSize::A4);
    let device = VirtualPrinter::letter();
    device.fail_on(DeviceOp::StartDocument, 1);
    let file = pdf_file();

    let failure = Pipeline::new(&provider, &device)
        .run(file.path(), &at_dpi(72))
        .unwrap_err();
    assert_eq!(failure.stage, Stage::JobOpen);
    assert!(matches!(failure.error, RasterPrintError::DocFrameStart(_)));
    assert_eq!(
        device.call_log(),
        vec![
            DeviceOp::DefaultPrinter,
            DeviceOp::OpenPrinter,
            DeviceOp::CreateContext,
            DeviceOp::StartDocument,
            DeviceOp::DeleteContext,
            DeviceOp::ClosePrinter,
        ]
    );
    assert_eq!(provider.renders(), 0);
    assert_released(&provider, &device);
}

#[test]
fn missing_default_printer() {
    let provider = MockEngineProvider::with_pages(1, PageSize::A4);
    let device = VirtualPrinter::new();
    let file = pdf_file();

    let failure = Pipeline::new(&provider, &device)
        .run(file.path(), &RunOptions::default())
        .unwrap_err();
    assert_eq!(failure.stage, Stage::JobOpen);
    assert!(matches!(failure.error, RasterPrintError::PrinterResolution(_)));
    assert_released(&provider, &device);
}

#[test]
fn named_printer_not_found() {
    let provider = MockEngineProvider::with_pages(1, PageSize::A4);
    let device = VirtualPrinter::letter();
    let file = pdf_file();
    let options = RunOptions {
        printer: Some("Basement Laser".into()),
        ..Default::default()
    };

    let failure = Pipeline::new(&provider, &device)
        .run(file.path(), &options)
        .unwrap_err();
    assert!(matches!(
        failure.error,
        RasterPrintError::PrinterOpen { ref name, .. } if name == "Basement Laser"
    ));
    assert_released(&provider, &device);
}

#[test]
fn engine_init_failure() {
    let provider = MockEngineProvider::with_pages(1, PageSize::A4).failing_initialize();
    let device = VirtualPrinter::letter();
    let file = pdf_file();

    let failure = Pipeline::new(&provider, &device)
        .run(file.path(), &RunOptions::default())
        .unwrap_err();
    assert_eq!(failure.stage, Stage::EngineInit);
    assert!(matches!(failure.error, RasterPrintError::EngineInit(_)));
    assert!(device.call_log().is_empty());
}

#[test]
fn unreadable_and_unparseable_documents() {
    let provider = MockEngineProvider::with_pages(1, PageSize::A4);
    let device = VirtualPrinter::letter();
    let pipeline = Pipeline::new(&provider, &device);

    let failure = pipeline
        .run("/nonexistent/missing.pdf", &RunOptions::default())
        .unwrap_err();
    assert!(matches!(
        failure.error,
        RasterPrintError::DocumentLoad {
            kind: LoadFailureKind::Io,
            ..
        }
    ));

    let mut garbage = tempfile::NamedTempFile::new().expect("temp file");
    garbage.write_all(b"GIF89a").expect("write");
    let failure = pipeline
        .run(garbage.path(), &RunOptions::default())
        .unwrap_err();
    assert_eq!(failure.stage, Stage::DocumentLoad);
    assert!(matches!(
        failure.error,
        RasterPrintError::DocumentLoad {
            kind: LoadFailureKind::Parse,
            ..
        }
    ));
    assert!(device.call_log().is_empty());
    assert_released(&provider, &device);
}

#[test]
fn end_document_failure_after_clean_loop() {
    let provider = MockEngineProvider::with_pages(1, PageSize::A4);
    let device = VirtualPrinter::letter();
    device.fail_on(DeviceOp::EndDocument, 1);
    let file = pdf_file();

    let failure = Pipeline::new(&provider, &device)
        .run(file.path(), &at_dpi(72))
        .unwrap_err();
    assert_eq!(failure.stage, Stage::JobClose);
    assert_eq!(failure.page, None);
    assert_eq!(failure.pages_committed, 1);
    assert!(matches!(failure.error, RasterPrintError::DocFrameEnd(_)));
    assert_released(&provider, &device);
}

#[test]
fn earlier_failure_wins_over_end_document_failure() {
    let provider = MockEngineProvider::with_pages(2, PageSize::A4);
    let device = VirtualPrinter::letter();
    device.fail_on(DeviceOp::StretchBlit, 1);
    device.fail_on(DeviceOp::EndDocument, 1);
    let file = pdf_file();

    let failure = Pipeline::new(&provider, &device)
        .run(file.path(), &at_dpi(72))
        .unwrap_err();
    assert_eq!(failure.stage, Stage::PrintFrame);
    assert!(matches!(failure.error, RasterPrintError::Blit(_)));
    assert_released(&provider, &device);
}

#[test]
fn cancelled_run_tears_down_cleanly() {
    let provider = MockEngineProvider::with_pages(2, PageSize::A4);
    let device = VirtualPrinter::letter();
    let file = pdf_file();
    let cancel = CancelToken::new();
    cancel.cancel();
    let options = RunOptions {
        cancel: Some(cancel),
        ..at_dpi(72)
    };

    let failure = Pipeline::new(&provider, &device)
        .run(file.path(), &options)
        .unwrap_err();
    assert_eq!(failure.stage, Stage::Cancelled);
    assert_eq!(failure.page, Some(1));
    assert!(matches!(failure.error, RasterPrintError::Cancelled));
    assert_eq!(provider.renders(), 0);
    assert!(device.spooled_documents()[0].completed);
    assert_released(&provider, &device);
}

#[test]
fn pipeline_is_reusable_across_runs() {
    let provider = MockEngineProvider::with_pages(1, PageSize::A4);
    let device = VirtualPrinter::letter();
    let pipeline = Pipeline::new(&provider, &device);
    let file = pdf_file();

    let first = pipeline.run(file.path(), &at_dpi(72)).expect("first run");
    let second = pipeline.run(file.path(), &at_dpi(72)).expect("second run");
    assert_ne!(first.job_id, second.job_id);
    assert_eq!(device.spooled_documents().len(), 2);
    assert_eq!(provider.initializations(), 2);
    assert_released(&provider, &device);
}

#[test]
fn exported_pages_are_written_as_png() {
    let provider = MockEngineProvider::with_pages(2, PageSize::US_LETTER);
    let device = VirtualPrinter::letter();
    let file = pdf_file();
    Pipeline::new(&provider, &device)
        .run(file.path(), &at_dpi(72))
        .expect("run");

    let out = tempfile::tempdir().expect("tempdir");
    let written = device.spooled_documents()[0]
        .export_png(out.path())
        .expect("export");
    assert_eq!(written.len(), 2);
    let page = image::open(&written[1]).expect("decode").to_rgba8();
    assert_eq!(page.dimensions(), (2550, 3300));
    // Outside the printable area stays paper white.
    assert_eq!(page.get_pixel(10, 10).0, [255, 255, 255, 255]);
    // Top-left quarter of the page carries the mock renderer's ink.
    assert_eq!(page.get_pixel(600, 800).0, [0x20, 0x20, 0x20, 0xFF]);
}
