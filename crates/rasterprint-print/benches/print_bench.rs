// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the scaling transform, the raster-to-device-bitmap
// copy, and a whole pipeline run against the virtual printer.

use std::io::Write;

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use rasterprint_bridge::VirtualPrinter;
use rasterprint_core::types::PageSize;
use rasterprint_document::{MockEngineProvider, PageRaster};
use rasterprint_print::{Pipeline, RunOptions, fit, to_device_bitmap};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// US Letter at `dpi`, filled with mid grey.
fn letter_raster(dpi: u32) -> PageRaster {
    let width = 612 * dpi / 72;
    let height = 792 * dpi / 72;
    let stride = width as usize * 4;
    PageRaster::new(vec![0x80; stride * height as usize], width, height, stride)
        .expect("raster layout")
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_fit(c: &mut Criterion) {
    c.bench_function("fit_letter_into_printable_area", |b| {
        b.iter(|| {
            fit(
                black_box(2550),
                black_box(3300),
                black_box(2400),
                black_box(3150),
                black_box(75),
                black_box(75),
            )
        })
    });
}

fn bench_adapt(c: &mut Criterion) {
    let mut group = c.benchmark_group("to_device_bitmap");
    group.sample_size(20);
    for dpi in [72u32, 150, 300] {
        let raster = letter_raster(dpi);
        // Padded destination rows force the stride-aware copy path.
        let device = VirtualPrinter::letter().with_row_alignment(64);
        group.bench_with_input(BenchmarkId::from_parameter(dpi), &raster, |b, raster| {
            b.iter(|| to_device_bitmap(&device, black_box(raster)).expect("adapt"))
        });
    }
    group.finish();
}

fn bench_pipeline(c: &mut Criterion) {
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    file.write_all(b"%PDF-1.7\n").expect("write");
    let provider = MockEngineProvider::with_pages(4, PageSize::US_LETTER);
    let options = RunOptions {
        dpi: Some(72),
        ..Default::default()
    };

    let mut group = c.benchmark_group("pipeline");
    group.sample_size(10);
    group.bench_function("four_letter_pages_72dpi", |b| {
        b.iter(|| {
            let device = VirtualPrinter::letter();
            Pipeline::new(&provider, &device)
                .run(file.path(), &options)
                .expect("run")
        })
    });
    group.finish();
}

criterion_group!(benches, bench_fit, bench_adapt, bench_pipeline);
criterion_main!(benches);
