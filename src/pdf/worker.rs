//! PDF render worker - runs in separate thread(s)

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use flume::{Receiver, Sender};
use log::{debug, error, warn};

use crate::error::PageRenderError;

use super::cache::{CacheKey, PageCache};
use super::document::{LoadedDocument, PdfBackend};
use super::request::{Generation, RenderParams, RenderRequest, RenderResponse, RequestId};
use super::types::{RenderedPage, TextLayer};

/// Everything a worker thread owns
pub struct WorkerContext<B: PdfBackend> {
    pub backend: B,
    pub bytes: Arc<[u8]>,
    pub requests: Receiver<RenderRequest>,
    pub responses: Sender<RenderResponse>,
    pub cache: Arc<Mutex<PageCache>>,
    /// Newest generation announced by the controller
    pub current_generation: Arc<AtomicU64>,
}

/// Main worker function - runs in a dedicated thread
pub fn render_worker<B: PdfBackend>(ctx: WorkerContext<B>) {
    let doc = match ctx.backend.open(&ctx.bytes) {
        Ok(d) => d,
        Err(e) => {
            error!("Render worker could not open document: {e}");
            fail_all(&ctx, &e.to_string());
            return;
        }
    };

    for request in &ctx.requests {
        match request {
            RenderRequest::Page {
                id,
                generation,
                page,
                params,
            } => {
                if is_stale(generation, &ctx.current_generation) {
                    debug!("Skipping page {page} from stale generation {}", generation.0);
                    let _ = ctx.responses.send(RenderResponse::Cancelled {
                        id,
                        generation,
                        page,
                    });
                    continue;
                }
                handle_page_request(&doc, &ctx, id, generation, page, params);
            }

            RenderRequest::Shutdown => break,
        }
    }
}

fn is_stale(generation: Generation, current: &AtomicU64) -> bool {
    generation.0 < current.load(Ordering::Acquire)
}

/// Drain the queue answering every page with a failure until shutdown
fn fail_all<B: PdfBackend>(ctx: &WorkerContext<B>, detail: &str) {
    for request in &ctx.requests {
        match request {
            RenderRequest::Page {
                id,
                generation,
                page,
                params,
            } => {
                let _ = ctx.responses.send(RenderResponse::Failed {
                    id,
                    generation,
                    page,
                    params,
                    error: PageRenderError::generic(detail),
                });
            }
            RenderRequest::Shutdown => break,
        }
    }
}

fn handle_page_request<B: PdfBackend>(
    doc: &B::Document,
    ctx: &WorkerContext<B>,
    id: RequestId,
    generation: Generation,
    page: usize,
    params: RenderParams,
) {
    let key = CacheKey::from_params(page, &params);

    let cached = ctx
        .cache
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
        .get(&key);
    if let Some(cached) = cached {
        let _ = ctx.responses.send(RenderResponse::Page {
            id,
            generation,
            page,
            params,
            data: cached,
        });
        return;
    }

    match render_page(doc, page, &params) {
        Ok(data) => {
            let cached = ctx
                .cache
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .insert(key, data);
            let _ = ctx.responses.send(RenderResponse::Page {
                id,
                generation,
                page,
                params,
                data: cached,
            });
        }
        Err(e) => {
            warn!("Failed to render page {page}: {e}");
            let _ = ctx.responses.send(RenderResponse::Failed {
                id,
                generation,
                page,
                params,
                error: e,
            });
        }
    }
}

/// Render a single page (1-based).
///
/// The bitmap is rasterized at `scale * resolution_boost`; the text layer is
/// positioned at the layout scale so it overlays the displayed canvas.
pub fn render_page<D: LoadedDocument>(
    doc: &D,
    page: usize,
    params: &RenderParams,
) -> Result<RenderedPage, PageRenderError> {
    if page == 0 || page > doc.page_count() {
        return Err(PageRenderError::NoSuchPage(page));
    }
    let index = page - 1;

    let bitmap = doc.rasterize(index, params.raster_scale())?;

    let text_layer = if params.render_text {
        match doc.text_runs(index) {
            Ok(runs) => Some(TextLayer::from_runs(&runs, params.scale)),
            Err(e) => {
                warn!("Text extraction failed on page {page}: {e}");
                None
            }
        }
    } else {
        None
    };

    Ok(RenderedPage {
        page,
        scale: params.scale,
        resolution_boost: params.resolution_boost,
        bitmap,
        text_layer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::PageSize;
    use crate::test_utils::FakeBackend;

    fn params(scale: f32, boost: u8, render_text: bool) -> RenderParams {
        RenderParams {
            scale,
            resolution_boost: boost,
            render_text,
        }
    }

    #[test]
    fn bitmap_is_layout_size_times_boost() {
        let backend = FakeBackend::with_sizes(vec![PageSize::new(400.0, 300.0)]);
        let doc = backend.open(&FakeBackend::pdf_bytes()).unwrap();

        let one = render_page(&doc, 1, &params(1.5, 1, false)).unwrap();
        assert_eq!((one.bitmap.width_px, one.bitmap.height_px), (600, 450));

        let three = render_page(&doc, 1, &params(1.5, 3, false)).unwrap();
        assert_eq!((three.bitmap.width_px, three.bitmap.height_px), (1800, 1350));
    }

    #[test]
    fn text_layer_only_when_requested() {
        let doc = FakeBackend::letter(2)
            .open(&FakeBackend::pdf_bytes())
            .unwrap();

        let plain = render_page(&doc, 2, &params(1.0, 1, false)).unwrap();
        assert!(plain.text_layer.is_none());

        let with_text = render_page(&doc, 2, &params(2.0, 2, true)).unwrap();
        let layer = with_text.text_layer.unwrap();
        assert_eq!(layer.text(), "Page 2 heading");
        // positioned at the layout scale, not the raster scale
        assert_eq!(layer.spans[0].rect.x, 144.0);
    }

    #[test]
    fn out_of_range_pages_are_errors() {
        let doc = FakeBackend::letter(2)
            .open(&FakeBackend::pdf_bytes())
            .unwrap();
        assert!(matches!(
            render_page(&doc, 0, &params(1.0, 1, false)),
            Err(PageRenderError::NoSuchPage(0))
        ));
        assert!(matches!(
            render_page(&doc, 3, &params(1.0, 1, false)),
            Err(PageRenderError::NoSuchPage(3))
        ));
    }

    #[test]
    fn stale_requests_are_cancelled() {
        let backend = FakeBackend::letter(2);
        let stats = backend.stats();
        let (req_tx, req_rx) = flume::unbounded();
        let (resp_tx, resp_rx) = flume::unbounded();
        let current = Arc::new(AtomicU64::new(5));

        req_tx
            .send(RenderRequest::Page {
                id: RequestId::new(1),
                generation: Generation(4),
                page: 1,
                params: params(1.0, 1, false),
            })
            .unwrap();
        req_tx
            .send(RenderRequest::Page {
                id: RequestId::new(2),
                generation: Generation(5),
                page: 2,
                params: params(1.0, 1, false),
            })
            .unwrap();
        req_tx.send(RenderRequest::Shutdown).unwrap();

        render_worker(WorkerContext {
            backend,
            bytes: Arc::from(FakeBackend::pdf_bytes()),
            requests: req_rx,
            responses: resp_tx,
            cache: Arc::new(Mutex::new(PageCache::new(4))),
            current_generation: current,
        });

        let responses: Vec<_> = resp_rx.drain().collect();
        assert!(matches!(responses[0], RenderResponse::Cancelled { page: 1, .. }));
        assert!(matches!(responses[1], RenderResponse::Page { page: 2, .. }));
        assert_eq!(stats.rasterized(1), 0);
        assert_eq!(stats.rasterized(2), 1);
    }
}
