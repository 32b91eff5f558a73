//! Page layout for the continuous vertical viewer
//!
//! Layout is a pure function of the document's page sizes, the configuration
//! snapshot and the container size. Nothing here depends on what has been
//! rasterized, so calling it twice with the same inputs yields the same result.

use crate::config::{Align, Height, ViewerConfig};
use crate::error::ConfigError;

use super::document::DocumentInfo;
use super::types::{PageSize, Rect};
use super::zoom::ZoomMode;

/// Thickness of the divider drawn between consecutive pages
pub const SEPARATOR_HEIGHT: f32 = 1.0;

/// Size of the element hosting the viewer, in CSS pixels
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ContainerSize {
    pub width: f32,
    pub height: f32,
}

impl ContainerSize {
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

/// Geometry of one page inside the scrollable viewer
#[derive(Clone, Debug, PartialEq)]
pub struct PageLayout {
    /// Page number (1-based)
    pub page: usize,
    /// Intrinsic size in document units
    pub intrinsic: PageSize,
    /// Layout scale, intrinsic units to CSS pixels
    pub scale: f32,
    /// Layout width in CSS pixels
    pub width: f32,
    /// Layout height in CSS pixels
    pub height: f32,
    /// Horizontal offset within the viewer
    pub left: f32,
    /// Vertical offset within the viewer
    pub top: f32,
    /// A separator follows this page
    pub separator_visible: bool,
    /// The page is in the render subset; otherwise it is reserved blank space
    pub render: bool,
}

impl PageLayout {
    #[must_use]
    pub fn rect(&self) -> Rect {
        Rect::new(self.left, self.top, self.width, self.height)
    }

    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    /// Native bitmap size for the given oversampling factor.
    ///
    /// Only the bitmap grows with the boost; the layout box does not.
    #[must_use]
    pub fn bitmap_size(&self, resolution_boost: u8) -> (u32, u32) {
        let boost = f32::from(resolution_boost.max(1));
        (
            ((self.width * boost).round() as u32).max(1),
            ((self.height * boost).round() as u32).max(1),
        )
    }
}

/// Layout of every page in the document plus the viewer geometry
#[derive(Clone, Debug, PartialEq)]
pub struct DocumentLayout {
    pub pages: Vec<PageLayout>,
    /// Resolved viewer width; the visible width of the container
    pub viewer_width: f32,
    /// Height of the scroll container box
    pub viewport_height: f32,
    /// Height of the band the host actually shows. Equals `viewport_height`
    /// for a fixed height; for a viewer grown to its content it is the
    /// host's visible height, so rendering stays limited to what is on screen.
    pub visible_height: f32,
    /// Scrollable content width (wider than the viewer when zoomed in)
    pub content_width: f32,
    /// Scrollable content height
    pub content_height: f32,
    /// Gap between pages, excluding the separator
    pub spacing: f32,
    /// Separator thickness, zero when separators are hidden
    pub separator_height: f32,
}

impl DocumentLayout {
    /// Look up a page by 1-based number
    #[must_use]
    pub fn page(&self, page: usize) -> Option<&PageLayout> {
        page.checked_sub(1).and_then(|idx| self.pages.get(idx))
    }

    /// Divider rectangles, one per page that is followed by another page
    #[must_use]
    pub fn separators(&self) -> Vec<Rect> {
        self.pages
            .iter()
            .filter(|p| p.separator_visible)
            .map(|p| {
                Rect::new(
                    0.0,
                    p.bottom() + self.spacing / 2.0,
                    self.content_width,
                    self.separator_height,
                )
            })
            .collect()
    }

    /// Pages whose box intersects the vertical band `[top, bottom)`
    #[must_use]
    pub fn pages_in_band(&self, top: f32, bottom: f32) -> Vec<usize> {
        self.pages
            .iter()
            .filter(|p| p.top < bottom && p.bottom() > top)
            .map(|p| p.page)
            .collect()
    }

    /// Page whose band (page plus the gap after it) contains the offset
    #[must_use]
    pub fn page_at_offset(&self, y: f32) -> Option<usize> {
        let gap = self.spacing + self.separator_height;
        self.pages
            .iter()
            .find(|p| y < p.bottom() + gap)
            .or_else(|| self.pages.last())
            .map(|p| p.page)
    }

    /// Largest valid scroll offset
    #[must_use]
    pub fn max_scroll_top(&self) -> f32 {
        (self.content_height - self.visible_height).max(0.0)
    }

    /// Pages intersecting the visible band starting at `scroll_top`
    #[must_use]
    pub fn visible_pages(&self, scroll_top: f32) -> Vec<usize> {
        self.pages_in_band(scroll_top, scroll_top + self.visible_height)
    }
}

/// Resolve the viewer width from the configuration and the container
#[must_use]
pub fn resolve_width(config: &ViewerConfig, container: ContainerSize) -> f32 {
    config.width.resolve(container.width)
}

/// Scale for a single page under the given zoom mode
pub fn page_scale(
    zoom: ZoomMode,
    intrinsic: PageSize,
    resolved_width: f32,
    height: Height,
) -> Result<f32, ConfigError> {
    match zoom {
        ZoomMode::Factor(z) => Ok(z),
        ZoomMode::FitWidth => Ok(resolved_width / intrinsic.width),
        ZoomMode::FitHeight => match height {
            Height::Pixels(h) => Ok(h / intrinsic.height),
            Height::FitContent | Height::Fill => Err(ConfigError::FitHeightWithoutHeight),
        },
    }
}

/// Compute the layout of every page.
///
/// Pages outside `pages_to_render` still get a layout record so scroll
/// geometry stays correct; they are only flagged as not rendered.
pub fn compute_layout(
    doc: &DocumentInfo,
    config: &ViewerConfig,
    container: ContainerSize,
) -> Result<DocumentLayout, ConfigError> {
    let viewer_width = resolve_width(config, container);
    let spacing = config.pages_vertical_spacing;
    let separator_height = if config.show_page_separator {
        SEPARATOR_HEIGHT
    } else {
        0.0
    };
    let page_count = doc.page_count();

    let mut pages = Vec::with_capacity(page_count);
    let mut top = 0.0_f32;
    for (idx, &intrinsic) in doc.page_sizes.iter().enumerate() {
        let page = idx + 1;
        let scale = page_scale(config.zoom, intrinsic, viewer_width, config.height)?;
        let size = intrinsic.scaled(scale);
        let left = match config.align {
            Align::Left => 0.0,
            Align::Center => ((viewer_width - size.width) / 2.0).max(0.0),
            Align::Right => (viewer_width - size.width).max(0.0),
        };

        pages.push(PageLayout {
            page,
            intrinsic,
            scale,
            width: size.width,
            height: size.height,
            left,
            top,
            separator_visible: config.show_page_separator && page < page_count,
            render: config.renders_page(page),
        });

        top += size.height + spacing + separator_height;
    }

    let content_height = pages.last().map_or(0.0, PageLayout::bottom);
    let content_width = pages
        .iter()
        .map(|p| p.width)
        .fold(viewer_width, f32::max);
    let viewport_height = match config.height {
        Height::Pixels(h) => h,
        Height::FitContent => content_height,
        Height::Fill => container.height,
    };
    // A host that reports no height shows the whole content
    let visible_height = match config.height {
        Height::FitContent if container.height > 0.0 => container.height.min(content_height),
        _ => viewport_height,
    };

    Ok(DocumentLayout {
        pages,
        viewer_width,
        viewport_height,
        visible_height,
        content_width,
        content_height,
        spacing,
        separator_height,
    })
}
