// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Scriptable in-memory rendering engine.
//
// Accepts any byte stream starting with the `%PDF-` magic, reports the page
// sizes it was built with, and paints a dark block into the top-left quarter
// of every rendered page. Engines and documents are counted while alive so
// tests can assert that everything was released.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use rasterprint_core::types::PageSize;

use crate::engine::{EngineDocument, EngineError, EngineProvider, RasterTarget, RenderEngine, RenderOptions};

/// Header every document accepted by the mock must start with.
pub const PDF_MAGIC: &[u8] = b"%PDF-";

/// BGRA value painted by the mock renderer.
pub const INK: [u8; 4] = [0x20, 0x20, 0x20, 0xFF];

#[derive(Default)]
struct Counters {
    live_engines: AtomicUsize,
    live_documents: AtomicUsize,
    initializations: AtomicUsize,
    size_queries: AtomicUsize,
    renders: AtomicUsize,
}

/// Builder and observer for the mock engine. Clones share counters.
#[derive(Clone)]
pub struct MockEngineProvider {
    pages: Vec<PageSize>,
    fail_initialize: bool,
    fail_open: bool,
    fail_render_on: Option<usize>,
    counters: Arc<Counters>,
}

impl MockEngineProvider {
    /// An engine whose documents have the given page sizes.
    pub fn new(pages: Vec<PageSize>) -> Self {
        Self {
            pages,
            fail_initialize: false,
            fail_open: false,
            fail_render_on: None,
            counters: Arc::default(),
        }
    }

    /// `count` pages of the same size.
    pub fn with_pages(count: usize, size: PageSize) -> Self {
        Self::new(vec![size; count])
    }

    pub fn failing_initialize(mut self) -> Self {
        self.fail_initialize = true;
        self
    }

    /// Reject every document as unparseable.
    pub fn failing_open(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Fail when rendering page `index` (0-based).
    pub fn failing_render_on(mut self, index: usize) -> Self {
        self.fail_render_on = Some(index);
        self
    }

    pub fn live_engines(&self) -> usize {
        self.counters.live_engines.load(Ordering::SeqCst)
    }

    pub fn live_documents(&self) -> usize {
        self.counters.live_documents.load(Ordering::SeqCst)
    }

    pub fn initializations(&self) -> usize {
        self.counters.initializations.load(Ordering::SeqCst)
    }

    /// Number of `page_size` calls served.
    pub fn size_queries(&self) -> usize {
        self.counters.size_queries.load(Ordering::SeqCst)
    }

    pub fn renders(&self) -> usize {
        self.counters.renders.load(Ordering::SeqCst)
    }
}

impl EngineProvider for MockEngineProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn initialize(&self) -> Result<Box<dyn RenderEngine>, EngineError> {
        self.counters.initializations.fetch_add(1, Ordering::SeqCst);
        if self.fail_initialize {
            return Err(EngineError::new("mock engine configured to fail initialisation"));
        }
        self.counters.live_engines.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockEngine {
            config: self.clone(),
        }))
    }
}

struct MockEngine {
    config: MockEngineProvider,
}

impl Drop for MockEngine {
    fn drop(&mut self) {
        self.config.counters.live_engines.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RenderEngine for MockEngine {
    fn open_document(&self, bytes: Vec<u8>) -> Result<Box<dyn EngineDocument + '_>, EngineError> {
        if self.config.fail_open || !bytes.starts_with(PDF_MAGIC) {
            return Err(EngineError::new("not a PDF document"));
        }
        self.config.counters.live_documents.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockDocument { engine: self }))
    }
}

struct MockDocument<'e> {
    engine: &'e MockEngine,
}

impl MockDocument<'_> {
    fn counters(&self) -> &Counters {
        &self.engine.config.counters
    }
}

impl Drop for MockDocument<'_> {
    fn drop(&mut self) {
        self.counters().live_documents.fetch_sub(1, Ordering::SeqCst);
    }
}

impl EngineDocument for MockDocument<'_> {
    fn page_count(&self) -> usize {
        self.engine.config.pages.len()
    }

    fn page_size(&self, index: usize) -> Result<PageSize, EngineError> {
        self.counters().size_queries.fetch_add(1, Ordering::SeqCst);
        self.engine
            .config
            .pages
            .get(index)
            .copied()
            .ok_or_else(|| EngineError::new(format!("no page {index}")))
    }

    fn render_page(
        &self,
        index: usize,
        target: &mut RasterTarget<'_>,
        _options: RenderOptions,
    ) -> Result<(), EngineError> {
        self.counters().renders.fetch_add(1, Ordering::SeqCst);
        if self.engine.config.fail_render_on == Some(index) {
            return Err(EngineError::new(format!("mock render failure on page {index}")));
        }
        let ink_cols = (target.width / 2) as usize;
        let ink_rows = (target.height / 2) as usize;
        for row in target.data.chunks_mut(target.stride).take(ink_rows) {
            for px in row.chunks_exact_mut(4).take(ink_cols) {
                px.copy_from_slice(&INK);
            }
        }
        Ok(())
    }
}
