//! Render request and response types

use std::sync::Arc;

use crate::error::PageRenderError;

use super::layout::PageLayout;
use super::types::RenderedPage;

/// Unique identifier for render requests
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RequestId(pub u64);

impl RequestId {
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

/// Layout epoch. Bumped on every configuration or container change; results
/// stamped with an older generation are stale.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(pub u64);

impl Generation {
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Parameters for rendering a page
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderParams {
    /// Layout scale
    pub scale: f32,
    /// Oversampling factor for the bitmap
    pub resolution_boost: u8,
    /// Whether to build the text layer
    pub render_text: bool,
}

impl RenderParams {
    #[must_use]
    pub fn for_page(layout: &PageLayout, resolution_boost: u8, render_text: bool) -> Self {
        Self {
            scale: layout.scale,
            resolution_boost,
            render_text,
        }
    }

    /// Scale handed to the rasterizer
    #[must_use]
    pub fn raster_scale(&self) -> f32 {
        self.scale * f32::from(self.resolution_boost.max(1))
    }

    /// Scale stored as millionths for stable comparison and hashing
    #[must_use]
    pub fn scale_millionths(&self) -> u32 {
        (self.scale * 1_000_000.0).round() as u32
    }

    /// Whether a surface rendered with `self` can be reused for `other`
    /// without re-rasterizing
    #[must_use]
    pub fn same_output(&self, other: &Self) -> bool {
        self.scale_millionths() == other.scale_millionths()
            && self.resolution_boost == other.resolution_boost
            && self.render_text == other.render_text
    }
}

/// Request sent to render workers
#[derive(Debug)]
pub enum RenderRequest {
    /// Render a page (1-based)
    Page {
        id: RequestId,
        generation: Generation,
        page: usize,
        params: RenderParams,
    },

    /// Shutdown the worker
    Shutdown,
}

/// Response from render workers
#[derive(Debug)]
pub enum RenderResponse {
    /// Rendered page data
    Page {
        id: RequestId,
        generation: Generation,
        page: usize,
        params: RenderParams,
        data: Arc<RenderedPage>,
    },

    /// Rasterization failed for this page only
    Failed {
        id: RequestId,
        generation: Generation,
        page: usize,
        params: RenderParams,
        error: PageRenderError,
    },

    /// Skipped because a newer generation started before the worker got to it
    Cancelled {
        id: RequestId,
        generation: Generation,
        page: usize,
    },
}

impl RenderResponse {
    #[must_use]
    pub fn id(&self) -> RequestId {
        match self {
            Self::Page { id, .. } | Self::Failed { id, .. } | Self::Cancelled { id, .. } => *id,
        }
    }

    #[must_use]
    pub fn generation(&self) -> Generation {
        match self {
            Self::Page { generation, .. }
            | Self::Failed { generation, .. }
            | Self::Cancelled { generation, .. } => *generation,
        }
    }
}
