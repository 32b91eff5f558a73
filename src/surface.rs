//! Presentation surface
//!
//! A serializable description of what the component puts on screen. The
//! element identifiers and class names are what automated UI tests look for,
//! so they must stay stable.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;

use crate::annotations::AnnotationOverlay;
use crate::config::{Align, RenderingMode, ViewerConfig};
use crate::pdf::{ContainerSize, DocumentLayout, Rect, RenderedPage, TextSpan, ZoomMode};

pub const CONTAINER_ID: &str = "pdfContainer";
pub const VIEWER_ID: &str = "pdfViewer";
pub const ANNOTATIONS_ID: &str = "pdfAnnotations";
pub const WRAPPER_CLASS: &str = "container-wrapper";
pub const PAGE_CLASS: &str = "page";
pub const SEPARATOR_CLASS: &str = "page-separator";
pub const TEXT_LAYER_CLASS: &str = "textLayer";
pub const ANNOTATION_LAYER_CLASS: &str = "annotationLayer";
pub const ZOOM_BUTTON_CLASS: &str = "zoom-button";
pub const ZOOM_PANEL_CLASS: &str = "zoom-panel";
pub const ZOOM_INPUT_CLASS: &str = "zoom-input";

/// Everything the component shows
#[derive(Clone, Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Surface {
    /// Nothing mounted, or the document failed to load
    Empty,
    Viewer(ViewerSurface),
    Legacy(LegacySurface),
}

impl Surface {
    #[must_use]
    pub fn as_viewer(&self) -> Option<&ViewerSurface> {
        match self {
            Self::Viewer(v) => Some(v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_legacy(&self) -> Option<&LegacySurface> {
        match self {
            Self::Legacy(l) => Some(l),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct ViewerSurface {
    pub wrapper: WrapperNode,
    /// Viewport element
    pub container: BoxNode,
    /// Scrollable content element
    pub viewer: BoxNode,
    pub pages: Vec<PageNode>,
    pub separators: Vec<SeparatorNode>,
    pub annotations: AnnotationsNode,
    pub zoom: ZoomControls,
}

impl ViewerSurface {
    #[must_use]
    pub fn canvas_count(&self) -> usize {
        self.pages.iter().filter(|p| p.canvas.is_some()).count()
    }

    #[must_use]
    pub fn painted_count(&self) -> usize {
        self.pages
            .iter()
            .filter_map(|p| p.canvas.as_ref())
            .filter(|c| c.state == CanvasState::Painted)
            .count()
    }

    #[must_use]
    pub fn separator_count(&self) -> usize {
        self.separators.len()
    }

    #[must_use]
    pub fn page(&self, page: usize) -> Option<&PageNode> {
        self.pages.iter().find(|p| p.page == page)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct WrapperNode {
    pub class: &'static str,
    pub width: f32,
    pub margin_left: f32,
    pub margin_right: f32,
}

#[derive(Clone, Debug, Serialize)]
pub struct BoxNode {
    pub id: &'static str,
    pub width: f32,
    pub height: f32,
}

#[derive(Clone, Debug, Serialize)]
pub struct PageNode {
    pub class: &'static str,
    pub page: usize,
    pub rect: Rect,
    /// Present for pages in the render subset
    pub canvas: Option<CanvasNode>,
    pub text_layer: Option<TextLayerNode>,
    pub annotation_layer: AnnotationLayerNode,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CanvasState {
    /// Not rasterized yet
    Blank,
    Painted,
    /// Rasterization failed; kept blank at full size
    Failed,
}

#[derive(Clone, Debug, Serialize)]
pub struct CanvasNode {
    /// Backing bitmap size
    pub width_px: u32,
    pub height_px: u32,
    /// Displayed size
    pub css_width: f32,
    pub css_height: f32,
    pub state: CanvasState,
}

#[derive(Clone, Debug, Serialize)]
pub struct TextLayerNode {
    pub class: &'static str,
    pub spans: Vec<TextSpan>,
}

#[derive(Clone, Debug, Serialize)]
pub struct AnnotationLayerNode {
    pub class: &'static str,
    pub boxes: Vec<AnnotationBoxNode>,
}

#[derive(Clone, Debug, Serialize)]
pub struct AnnotationBoxNode {
    /// Index in the host's annotation list
    pub index: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Relative to the page box
    pub rect: Rect,
    pub color: String,
    pub outline: f32,
}

#[derive(Clone, Debug, Serialize)]
pub struct SeparatorNode {
    pub class: &'static str,
    pub rect: Rect,
}

#[derive(Clone, Debug, Serialize)]
pub struct AnnotationsNode {
    pub id: &'static str,
    pub visible: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct ZoomControls {
    pub button_class: &'static str,
    pub panel_class: &'static str,
    pub input_class: &'static str,
    pub mode: ZoomMode,
    /// Text shown on the zoom button
    pub label: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct LegacySurface {
    /// `iframe` or `embed`
    pub element: &'static str,
    pub width: String,
    pub height: String,
    #[serde(rename = "type")]
    pub mime: &'static str,
    pub src: String,
}

/// What a page's canvas currently shows
#[derive(Clone, Copy, Debug)]
pub enum PageContent<'a> {
    Pending,
    Painted(&'a RenderedPage),
    Failed,
}

/// Horizontal margins placing the viewer inside the host width
#[must_use]
pub fn wrapper_margins(align: Align, host_width: f32, viewer_width: f32) -> (f32, f32) {
    let free = (host_width - viewer_width).max(0.0);
    match align {
        Align::Left => (0.0, free),
        Align::Center => (free / 2.0, free / 2.0),
        Align::Right => (free, 0.0),
    }
}

#[must_use]
pub fn zoom_label(mode: ZoomMode) -> String {
    match mode {
        ZoomMode::Factor(f) => format!("{}%", (f * 100.0).round()),
        ZoomMode::FitWidth => "Fit width".to_string(),
        ZoomMode::FitHeight => "Fit height".to_string(),
    }
}

/// Describe the engine-rendered viewer
pub fn viewer_surface<'a>(
    layout: &DocumentLayout,
    config: &ViewerConfig,
    container: ContainerSize,
    overlay: &AnnotationOverlay,
    content: impl Fn(usize) -> PageContent<'a>,
) -> ViewerSurface {
    let (margin_left, margin_right) =
        wrapper_margins(config.align, container.width, layout.viewer_width);

    let pages = layout
        .pages
        .iter()
        .map(|page| {
            let (canvas, text_layer) = if page.render {
                let (placeholder_w, placeholder_h) = page.bitmap_size(config.resolution_boost);
                let (state, width_px, height_px, text_layer) = match content(page.page) {
                    PageContent::Pending => (CanvasState::Blank, placeholder_w, placeholder_h, None),
                    PageContent::Failed => (CanvasState::Failed, placeholder_w, placeholder_h, None),
                    PageContent::Painted(rendered) => (
                        CanvasState::Painted,
                        rendered.bitmap.width_px,
                        rendered.bitmap.height_px,
                        rendered.text_layer.as_ref().map(|layer| TextLayerNode {
                            class: TEXT_LAYER_CLASS,
                            spans: layer.spans.clone(),
                        }),
                    ),
                };
                let canvas = CanvasNode {
                    width_px,
                    height_px,
                    css_width: page.width,
                    css_height: page.height,
                    state,
                };
                (Some(canvas), text_layer)
            } else {
                (None, None)
            };

            let boxes = overlay
                .boxes_on_page(page.page)
                .map(|b| AnnotationBoxNode {
                    index: b.index,
                    id: b.annotation.id.clone(),
                    rect: b.page_rect,
                    color: b.annotation.color.clone(),
                    outline: overlay.outline(),
                })
                .collect();

            PageNode {
                class: PAGE_CLASS,
                page: page.page,
                rect: page.rect(),
                canvas,
                text_layer,
                annotation_layer: AnnotationLayerNode {
                    class: ANNOTATION_LAYER_CLASS,
                    boxes,
                },
            }
        })
        .collect();

    let separators = layout
        .separators()
        .into_iter()
        .map(|rect| SeparatorNode {
            class: SEPARATOR_CLASS,
            rect,
        })
        .collect();

    ViewerSurface {
        wrapper: WrapperNode {
            class: WRAPPER_CLASS,
            width: container.width,
            margin_left,
            margin_right,
        },
        container: BoxNode {
            id: CONTAINER_ID,
            width: layout.viewer_width,
            height: layout.viewport_height,
        },
        viewer: BoxNode {
            id: VIEWER_ID,
            width: layout.content_width,
            height: layout.content_height,
        },
        pages,
        separators,
        annotations: AnnotationsNode {
            id: ANNOTATIONS_ID,
            visible: !overlay.boxes().is_empty(),
        },
        zoom: ZoomControls {
            button_class: ZOOM_BUTTON_CLASS,
            panel_class: ZOOM_PANEL_CLASS,
            input_class: ZOOM_INPUT_CLASS,
            mode: config.zoom,
            label: zoom_label(config.zoom),
        },
    }
}

/// Describe the delegated embed/iframe presentation
#[must_use]
pub fn legacy_surface(config: &ViewerConfig, bytes: &[u8]) -> LegacySurface {
    let element = match config.rendering_mode {
        RenderingMode::LegacyEmbed => "embed",
        RenderingMode::LegacyIframe | RenderingMode::Unwrap => "iframe",
    };
    LegacySurface {
        element,
        width: config.width.css(),
        height: config.height.css(),
        mime: "application/pdf",
        src: format!("data:application/pdf;base64,{}", BASE64.encode(bytes)),
    }
}
