//! Render service - manages worker pool and cache

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use flume::{Receiver, RecvTimeoutError, Sender};
use log::{debug, trace};

use super::cache::{CacheKey, PageCache};
use super::document::{Document, PdfBackend};
use super::request::{Generation, RenderParams, RenderRequest, RenderResponse, RequestId};
use super::types::RenderedPage;
use super::worker::{WorkerContext, render_worker};

#[derive(Debug)]
struct PendingRequest {
    generation: Generation,
    key: CacheKey,
}

/// Manages PDF rendering with worker threads and caching.
///
/// Every request carries the generation it was issued under. Starting a new
/// generation cancels queued work from older ones and makes [`poll`] drop any
/// result that still arrives for them.
///
/// [`poll`]: RenderService::poll
pub struct RenderService {
    request_tx: Sender<RenderRequest>,
    response_rx: Receiver<RenderResponse>,
    next_request_id: u64,
    pending_requests: HashMap<RequestId, PendingRequest>,
    cache: Arc<Mutex<PageCache>>,
    current_generation: Arc<AtomicU64>,
    num_workers: usize,
    discarded: usize,
}

impl RenderService {
    /// Create a new render service with custom configuration
    #[must_use]
    pub fn with_config<B: PdfBackend>(
        doc: &Document<B>,
        num_workers: usize,
        cache_size: usize,
    ) -> Self {
        let cache = Arc::new(Mutex::new(PageCache::new(cache_size)));
        let current_generation = Arc::new(AtomicU64::new(0));

        // flume gives us MPMC: every worker clones the request receiver and
        // pulls from the shared queue.
        let (request_tx, request_rx) = flume::unbounded();
        let (response_tx, response_rx) = flume::unbounded();

        let num_workers = num_workers.max(1);
        for n in 0..num_workers {
            let ctx = WorkerContext {
                backend: doc.backend().clone(),
                bytes: doc.bytes(),
                requests: request_rx.clone(),
                responses: response_tx.clone(),
                cache: Arc::clone(&cache),
                current_generation: Arc::clone(&current_generation),
            };

            let spawned = std::thread::Builder::new()
                .name(format!("pdfpane-render-{n}"))
                .spawn(move || render_worker(ctx));
            if let Err(e) = spawned {
                log::error!("Failed to spawn render worker {n}: {e}");
            }
        }
        debug!("Started {num_workers} render workers");

        Self {
            request_tx,
            response_rx,
            next_request_id: 1,
            pending_requests: HashMap::new(),
            cache,
            current_generation,
            num_workers,
            discarded: 0,
        }
    }

    /// Newest generation requests are accepted for
    #[must_use]
    pub fn generation(&self) -> Generation {
        Generation(self.current_generation.load(Ordering::Acquire))
    }

    /// Start a new generation. Queued work from older generations is skipped
    /// by the workers; results already in flight are discarded on arrival.
    pub fn begin_generation(&mut self, generation: Generation) {
        let previous = self
            .current_generation
            .fetch_max(generation.0, Ordering::AcqRel);
        if generation.0 > previous {
            let before = self.pending_requests.len();
            self.pending_requests
                .retain(|_, pending| pending.generation >= generation);
            debug!(
                "Generation {} started, abandoned {} pending renders",
                generation.0,
                before - self.pending_requests.len()
            );
        }
    }

    /// Request a page to be rendered unless the same output is already queued
    /// for the current generation
    pub fn request_page(&mut self, page: usize, params: RenderParams) -> Option<RequestId> {
        let generation = self.generation();
        let key = CacheKey::from_params(page, &params);
        let queued = self
            .pending_requests
            .values()
            .any(|p| p.generation == generation && p.key == key);
        if queued {
            return None;
        }

        let id = self.next_id();
        trace!("Queue page {page} as {id:?} in generation {}", generation.0);
        let _ = self.request_tx.send(RenderRequest::Page {
            id,
            generation,
            page,
            params,
        });
        self.pending_requests
            .insert(id, PendingRequest { generation, key });
        Some(id)
    }

    /// Get a cached page if available
    #[must_use]
    pub fn cached_page(&self, page: usize, params: &RenderParams) -> Option<Arc<RenderedPage>> {
        let key = CacheKey::from_params(page, params);
        self.cache
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .get(&key)
    }

    /// Whether any current-generation work is outstanding
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.pending_requests.is_empty()
    }

    /// Results dropped because their generation had ended
    #[must_use]
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Poll for completed render responses of the current generation
    pub fn poll(&mut self) -> Vec<RenderResponse> {
        let mut responses = vec![];
        while let Ok(response) = self.response_rx.try_recv() {
            self.accept(response, &mut responses);
        }
        responses
    }

    /// Block until at least one response arrives or the timeout passes, then
    /// drain like [`RenderService::poll`]
    pub fn wait(&mut self, timeout: Duration) -> Vec<RenderResponse> {
        let deadline = Instant::now() + timeout;
        let mut responses = vec![];
        while responses.is_empty() {
            match self.response_rx.recv_deadline(deadline) {
                Ok(response) => self.accept(response, &mut responses),
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => break,
            }
        }
        responses.extend(self.poll());
        responses
    }

    fn accept(&mut self, response: RenderResponse, out: &mut Vec<RenderResponse>) {
        self.pending_requests.remove(&response.id());
        if response.generation() < self.generation() {
            self.discarded += 1;
            debug!(
                "Discarding result {:?} from stale generation {}",
                response.id(),
                response.generation().0
            );
            return;
        }
        out.push(response);
    }

    /// Shutdown all workers
    pub fn shutdown(&self) {
        for _ in 0..self.num_workers {
            let _ = self.request_tx.send(RenderRequest::Shutdown);
        }
    }

    fn next_id(&mut self) -> RequestId {
        let id = RequestId::new(self.next_request_id);
        self.next_request_id += 1;
        id
    }
}

impl Drop for RenderService {
    fn drop(&mut self) {
        self.shutdown();
    }
}
