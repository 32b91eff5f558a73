//! PDF rendering infrastructure

mod cache;
mod document;
mod layout;
mod request;
mod service;
mod state;
mod types;
mod worker;
mod zoom;

pub use cache::{CacheKey, PageCache};
#[cfg(feature = "pdf")]
pub use document::{MupdfBackend, MupdfDocument};
pub use document::{
    Document, DocumentInfo, DocumentSource, InputSource, LoadedDocument, PdfBackend,
    check_pdf_header,
};
pub use layout::{
    ContainerSize, DocumentLayout, PageLayout, SEPARATOR_HEIGHT, compute_layout, page_scale,
    resolve_width,
};
pub use request::{Generation, RenderParams, RenderRequest, RenderResponse, RequestId};
pub use service::RenderService;
pub use state::{Command, Effect, Phase, RenderState};
pub use types::*;
pub use worker::render_page;
pub use zoom::*;

/// Default number of render worker threads
pub const DEFAULT_WORKERS: usize = 2;

/// Default number of rendered pages kept in the LRU cache
pub const DEFAULT_CACHE_SIZE: usize = 32;

/// Default distance, in CSS pixels, beyond the viewport that is rendered ahead
pub const DEFAULT_PREFETCH_MARGIN: f32 = 800.0;

/// Default quiet period before a container resize triggers a relayout
pub const DEFAULT_RESIZE_DEBOUNCE_MS: u64 = 150;
