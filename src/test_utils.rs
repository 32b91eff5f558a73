//! In-memory PDF backend for tests
//!
//! Pages are plain rectangles; rasterization produces white bitmaps of the
//! requested size. Selected pages can be made to fail, and every call is
//! counted so tests can observe caching and cancellation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{DocumentLoadError, PageRenderError};
use crate::pdf::{Bitmap, LoadedDocument, PageSize, PdfBackend, TextRun};

#[derive(Default, Debug)]
pub struct FakeStats {
    opens: AtomicUsize,
    rasterized: Mutex<HashMap<usize, usize>>,
}

impl FakeStats {
    /// Number of document handles opened (loader plus one per worker)
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Number of times a 1-based page was rasterized
    pub fn rasterized(&self, page: usize) -> usize {
        self.rasterized
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&page)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_rasterized(&self) -> usize {
        self.rasterized
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .values()
            .sum()
    }
}

#[derive(Clone, Debug)]
pub struct FakeBackend {
    sizes: Arc<Vec<PageSize>>,
    failing: Arc<Vec<usize>>,
    delay: Duration,
    stats: Arc<FakeStats>,
}

impl FakeBackend {
    /// Document of `pages` US Letter pages
    pub fn letter(pages: usize) -> Self {
        Self::with_sizes(vec![PageSize::LETTER; pages])
    }

    pub fn with_sizes(sizes: Vec<PageSize>) -> Self {
        Self {
            sizes: Arc::new(sizes),
            failing: Arc::new(Vec::new()),
            delay: Duration::ZERO,
            stats: Arc::new(FakeStats::default()),
        }
    }

    /// Make rasterization of a 1-based page fail
    pub fn failing_page(mut self, page: usize) -> Self {
        Arc::make_mut(&mut self.failing).push(page);
        self
    }

    /// Slow every rasterization down
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn stats(&self) -> Arc<FakeStats> {
        Arc::clone(&self.stats)
    }

    /// Bytes that pass the loader's header check
    pub fn pdf_bytes() -> Vec<u8> {
        b"%PDF-1.7\n% in-memory test document\n%%EOF\n".to_vec()
    }
}

impl PdfBackend for FakeBackend {
    type Document = FakeDocument;

    fn open(&self, bytes: &[u8]) -> Result<FakeDocument, DocumentLoadError> {
        if bytes.windows(5).any(|w| w == b"BROKE") {
            return Err(DocumentLoadError::malformed("corrupt xref table"));
        }
        self.stats.opens.fetch_add(1, Ordering::SeqCst);
        Ok(FakeDocument {
            backend: self.clone(),
        })
    }
}

pub struct FakeDocument {
    backend: FakeBackend,
}

impl LoadedDocument for FakeDocument {
    fn page_count(&self) -> usize {
        self.backend.sizes.len()
    }

    fn page_size(&self, index: usize) -> Result<PageSize, PageRenderError> {
        self.backend
            .sizes
            .get(index)
            .copied()
            .ok_or(PageRenderError::NoSuchPage(index + 1))
    }

    fn rasterize(&self, index: usize, scale: f32) -> Result<Bitmap, PageRenderError> {
        let size = self.page_size(index)?;
        if !self.backend.delay.is_zero() {
            std::thread::sleep(self.backend.delay);
        }
        *self
            .backend
            .stats
            .rasterized
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .entry(index + 1)
            .or_default() += 1;

        if self.backend.failing.contains(&(index + 1)) {
            return Err(PageRenderError::Engine(format!(
                "corrupt content stream on page {}",
                index + 1
            )));
        }

        let width = ((size.width * scale).round() as u32).max(1);
        let height = ((size.height * scale).round() as u32).max(1);
        Ok(Bitmap::blank(width, height))
    }

    fn text_runs(&self, index: usize) -> Result<Vec<TextRun>, PageRenderError> {
        self.page_size(index)?;
        Ok(vec![TextRun {
            text: format!("Page {} heading", index + 1),
            x: 72.0,
            y: 72.0,
            width: 200.0,
            height: 12.0,
        }])
    }
}
