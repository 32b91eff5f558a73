//! Host configuration
//!
//! The host sends a loosely typed JSON object; [`ViewerConfig::from_host`]
//! turns it into an immutable, validated snapshot. Validation is all-or-nothing:
//! an invalid field rejects the whole configuration before anything renders.

use serde::Deserialize;

use crate::annotations::Annotation;
use crate::error::ConfigError;
use crate::pdf::{Zoom, ZoomMode};

pub const DEFAULT_PAGES_VERTICAL_SPACING: i64 = 2;
pub const DEFAULT_ANNOTATION_OUTLINE_SIZE: i64 = 1;
pub const DEFAULT_RESOLUTION_BOOST: i64 = 1;
pub const MAX_RESOLUTION_BOOST: i64 = 10;

/// Requested viewer width
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Width {
    Pixels(f32),
    /// Percentage of the container width
    Percent(f32),
}

impl Default for Width {
    fn default() -> Self {
        Self::Percent(100.0)
    }
}

impl Width {
    #[must_use]
    pub fn resolve(self, container_width: f32) -> f32 {
        match self {
            Self::Pixels(px) => px,
            Self::Percent(pct) => container_width * pct / 100.0,
        }
    }

    /// CSS length for the legacy embed/iframe element
    #[must_use]
    pub fn css(self) -> String {
        match self {
            Self::Pixels(px) => format!("{px}px"),
            Self::Percent(pct) => format!("{pct}%"),
        }
    }
}

/// Requested viewer height
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum Height {
    Pixels(f32),
    /// The viewer grows to its content
    #[default]
    FitContent,
    /// Fill the available height; legacy modes only
    Fill,
}

impl Height {
    /// CSS length for the legacy embed/iframe element
    #[must_use]
    pub fn css(self) -> String {
        match self {
            Self::Pixels(px) => format!("{px}px"),
            Self::FitContent | Self::Fill => "100%".to_string(),
        }
    }
}

/// Horizontal placement of pages narrower than the viewer
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Align {
    Left,
    #[default]
    Center,
    Right,
}

/// How the document is presented
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RenderingMode {
    /// Pages are laid out and rasterized by the engine
    #[default]
    Unwrap,
    /// Delegate to the browser's viewer through an iframe
    LegacyIframe,
    /// Delegate to the browser's viewer through an embed element
    LegacyEmbed,
}

impl RenderingMode {
    #[must_use]
    pub fn is_legacy(self) -> bool {
        !matches!(self, Self::Unwrap)
    }
}

/// One-shot initial scroll instruction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollTarget {
    /// 1-based page number
    Page(usize),
    /// 1-based index into the annotation list
    Annotation(usize),
}

/// A width/height/zoom value as the host sends it
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Dimension {
    Number(f64),
    Text(String),
}

impl std::fmt::Display for Dimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// Configuration exactly as received from the host
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HostConfig {
    /// Base64 document payload
    pub source: Option<String>,
    pub width: Option<Dimension>,
    pub height: Option<Dimension>,
    pub zoom_level: Option<Dimension>,
    pub viewer_align: Option<String>,
    pub show_page_separator: Option<bool>,
    pub pages_vertical_spacing: Option<i64>,
    pub annotation_outline_size: Option<i64>,
    pub render_text: Option<bool>,
    pub resolution_boost: Option<i64>,
    pub rendering_mode: Option<String>,
    pub pages_to_render: Option<Vec<i64>>,
    pub scroll_to_page: Option<i64>,
    pub scroll_to_annotation: Option<i64>,
    pub annotations: Vec<Annotation>,
    /// Whether annotation clicks are forwarded to subscribers
    pub on_annotation_click: Option<bool>,
}

impl HostConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Validated, immutable configuration snapshot
#[derive(Clone, Debug, PartialEq)]
pub struct ViewerConfig {
    pub width: Width,
    pub height: Height,
    pub zoom: ZoomMode,
    pub resolution_boost: u8,
    pub pages_vertical_spacing: f32,
    pub annotation_outline_size: f32,
    pub align: Align,
    pub show_page_separator: bool,
    pub render_text: bool,
    pub rendering_mode: RenderingMode,
    /// Sorted, deduplicated page numbers; empty means every page
    pub pages_to_render: Vec<usize>,
    pub scroll_target: Option<ScrollTarget>,
    pub annotations: Vec<Annotation>,
    pub emit_annotation_clicks: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            width: Width::default(),
            height: Height::default(),
            zoom: ZoomMode::default(),
            resolution_boost: DEFAULT_RESOLUTION_BOOST as u8,
            pages_vertical_spacing: DEFAULT_PAGES_VERTICAL_SPACING as f32,
            annotation_outline_size: DEFAULT_ANNOTATION_OUTLINE_SIZE as f32,
            align: Align::default(),
            show_page_separator: true,
            render_text: false,
            rendering_mode: RenderingMode::default(),
            pages_to_render: Vec::new(),
            scroll_target: None,
            annotations: Vec::new(),
            emit_annotation_clicks: true,
        }
    }
}

impl ViewerConfig {
    /// Parse and validate a host JSON configuration
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Self::from_host(HostConfig::from_json(json)?)
    }

    /// Validate a host configuration.
    ///
    /// Checks that need the document (page ranges) happen later in
    /// [`ViewerConfig::check_against`].
    pub fn from_host(host: HostConfig) -> Result<Self, ConfigError> {
        let rendering_mode = parse_rendering_mode(host.rendering_mode.as_deref())?;
        let width = match &host.width {
            None => Width::default(),
            Some(dim) => parse_width(dim)?,
        };
        let height = match &host.height {
            None => Height::FitContent,
            Some(dim) => parse_height(dim, rendering_mode)?,
        };
        let zoom = parse_zoom(host.zoom_level.as_ref())?;
        if zoom == ZoomMode::FitHeight && !matches!(height, Height::Pixels(_)) {
            return Err(ConfigError::FitHeightWithoutHeight);
        }

        let boost = host.resolution_boost.unwrap_or(DEFAULT_RESOLUTION_BOOST);
        if !(1..=MAX_RESOLUTION_BOOST).contains(&boost) {
            return Err(ConfigError::ResolutionBoostOutOfRange(boost));
        }

        let spacing = non_negative(
            "pagesVerticalSpacing",
            host.pages_vertical_spacing
                .unwrap_or(DEFAULT_PAGES_VERTICAL_SPACING),
        )?;
        let outline = non_negative(
            "annotationOutlineSize",
            host.annotation_outline_size
                .unwrap_or(DEFAULT_ANNOTATION_OUTLINE_SIZE),
        )?;

        let align = match host.viewer_align.as_deref() {
            None => Align::default(),
            Some("left") => Align::Left,
            Some("center") => Align::Center,
            Some("right") => Align::Right,
            Some(other) => {
                return Err(ConfigError::UnknownVariant {
                    field: "viewerAlign",
                    value: other.to_string(),
                });
            }
        };

        let mut pages_to_render = Vec::new();
        for &page in host.pages_to_render.iter().flatten() {
            if page < 1 {
                return Err(ConfigError::NonPositivePage(page));
            }
            pages_to_render.push(page as usize);
        }
        pages_to_render.sort_unstable();
        pages_to_render.dedup();

        let scroll_target = match (host.scroll_to_page, host.scroll_to_annotation) {
            (Some(_), Some(_)) => return Err(ConfigError::ConflictingScrollTarget),
            // Indices below 1 mean "no target" rather than an error
            (Some(page), None) if page >= 1 => Some(ScrollTarget::Page(page as usize)),
            (None, Some(idx)) if idx >= 1 => Some(ScrollTarget::Annotation(idx as usize)),
            _ => None,
        };

        Ok(Self {
            width,
            height,
            zoom,
            resolution_boost: boost as u8,
            pages_vertical_spacing: spacing,
            annotation_outline_size: outline,
            align,
            show_page_separator: host.show_page_separator.unwrap_or(true),
            render_text: host.render_text.unwrap_or(false),
            rendering_mode,
            pages_to_render,
            scroll_target,
            annotations: host.annotations,
            emit_annotation_clicks: host.on_annotation_click.unwrap_or(true),
        })
    }

    /// Validate the parts of the configuration that depend on the document
    pub fn check_against(&self, page_count: usize) -> Result<(), ConfigError> {
        if let Some(&page) = self.pages_to_render.iter().find(|&&p| p > page_count) {
            return Err(ConfigError::PageOutOfRange { page, page_count });
        }

        match self.scroll_target {
            Some(ScrollTarget::Page(page)) => {
                if page > page_count {
                    return Err(ConfigError::ScrollTargetOutOfRange {
                        target: page,
                        max: page_count,
                    });
                }
                if !self.renders_page(page) {
                    return Err(ConfigError::ScrollTargetNotRendered(page));
                }
            }
            Some(ScrollTarget::Annotation(idx)) if idx > self.annotations.len() => {
                return Err(ConfigError::ScrollTargetOutOfRange {
                    target: idx,
                    max: self.annotations.len(),
                });
            }
            _ => {}
        }

        Ok(())
    }

    /// Whether the page is part of the render subset
    #[must_use]
    pub fn renders_page(&self, page: usize) -> bool {
        self.pages_to_render.is_empty() || self.pages_to_render.binary_search(&page).is_ok()
    }

    /// Same snapshot with a different zoom mode
    pub fn with_zoom(&self, zoom: ZoomMode) -> Result<Self, ConfigError> {
        match zoom {
            ZoomMode::Factor(z) if !Zoom::in_range(z) => Err(ConfigError::ZoomOutOfRange(z)),
            ZoomMode::FitHeight if !matches!(self.height, Height::Pixels(_)) => {
                Err(ConfigError::FitHeightWithoutHeight)
            }
            _ => Ok(Self {
                zoom,
                ..self.clone()
            }),
        }
    }
}

fn non_negative(field: &'static str, value: i64) -> Result<f32, ConfigError> {
    if value < 0 {
        Err(ConfigError::Negative { field, value })
    } else {
        Ok(value as f32)
    }
}

fn parse_rendering_mode(value: Option<&str>) -> Result<RenderingMode, ConfigError> {
    match value {
        None | Some("unwrap") => Ok(RenderingMode::Unwrap),
        Some("legacy_iframe") => Ok(RenderingMode::LegacyIframe),
        Some("legacy_embed") => Ok(RenderingMode::LegacyEmbed),
        Some(other) => Err(ConfigError::UnknownVariant {
            field: "renderingMode",
            value: other.to_string(),
        }),
    }
}

fn positive_pixels(value: f64) -> Option<f32> {
    (value.is_finite() && value > 0.0).then_some(value as f32)
}

fn parse_width(dim: &Dimension) -> Result<Width, ConfigError> {
    let invalid = || ConfigError::InvalidWidth(dim.to_string());
    match dim {
        Dimension::Number(n) => positive_pixels(*n).map(Width::Pixels).ok_or_else(invalid),
        Dimension::Text(text) => {
            let text = text.trim();
            if let Some(pct) = text.strip_suffix('%') {
                pct.trim()
                    .parse::<f64>()
                    .ok()
                    .and_then(positive_pixels)
                    .map(Width::Percent)
                    .ok_or_else(invalid)
            } else {
                text.parse::<f64>()
                    .ok()
                    .and_then(positive_pixels)
                    .map(Width::Pixels)
                    .ok_or_else(invalid)
            }
        }
    }
}

fn parse_height(dim: &Dimension, mode: RenderingMode) -> Result<Height, ConfigError> {
    let invalid = || ConfigError::InvalidHeight(dim.to_string());
    match dim {
        Dimension::Number(n) => positive_pixels(*n).map(Height::Pixels).ok_or_else(invalid),
        Dimension::Text(text) => match text.trim() {
            "100%" if mode.is_legacy() => Ok(Height::Fill),
            other => other
                .parse::<f64>()
                .ok()
                .and_then(positive_pixels)
                .map(Height::Pixels)
                .ok_or_else(invalid),
        },
    }
}

fn parse_zoom(dim: Option<&Dimension>) -> Result<ZoomMode, ConfigError> {
    match dim {
        None => Ok(ZoomMode::FitWidth),
        Some(Dimension::Number(n)) => {
            let z = *n as f32;
            if Zoom::in_range(z) {
                Ok(ZoomMode::Factor(z))
            } else {
                Err(ConfigError::ZoomOutOfRange(z))
            }
        }
        Some(Dimension::Text(text)) => match text.as_str() {
            "auto" => Ok(ZoomMode::FitWidth),
            "auto-height" => Ok(ZoomMode::FitHeight),
            other => Err(ConfigError::UnknownZoom(other.to_string())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> Result<ViewerConfig, ConfigError> {
        ViewerConfig::from_json(json)
    }

    #[test]
    fn defaults_match_host_contract() {
        let cfg = parse("{}").unwrap();
        assert_eq!(cfg, ViewerConfig::default());
        assert_eq!(cfg.width, Width::Percent(100.0));
        assert_eq!(cfg.height, Height::FitContent);
        assert_eq!(cfg.zoom, ZoomMode::FitWidth);
        assert_eq!(cfg.pages_vertical_spacing, 2.0);
        assert!(cfg.show_page_separator);
    }

    #[test]
    fn resolution_boost_bounds() {
        assert_eq!(
            parse(r#"{"resolutionBoost": 0}"#),
            Err(ConfigError::ResolutionBoostOutOfRange(0))
        );
        assert_eq!(
            parse(r#"{"resolutionBoost": 11}"#),
            Err(ConfigError::ResolutionBoostOutOfRange(11))
        );
        assert_eq!(parse(r#"{"resolutionBoost": 1}"#).unwrap().resolution_boost, 1);
        assert_eq!(parse(r#"{"resolutionBoost": 10}"#).unwrap().resolution_boost, 10);
    }

    #[test]
    fn zoom_values() {
        assert_eq!(parse(r#"{"zoomLevel": "auto"}"#).unwrap().zoom, ZoomMode::FitWidth);
        assert_eq!(parse(r#"{"zoomLevel": null}"#).unwrap().zoom, ZoomMode::FitWidth);
        assert_eq!(parse(r#"{"zoomLevel": 0.1}"#).unwrap().zoom, ZoomMode::Factor(0.1));
        assert_eq!(parse(r#"{"zoomLevel": 10}"#).unwrap().zoom, ZoomMode::Factor(10.0));
        assert_eq!(
            parse(r#"{"zoomLevel": 10.5}"#),
            Err(ConfigError::ZoomOutOfRange(10.5))
        );
        assert_eq!(
            parse(r#"{"zoomLevel": "huge"}"#),
            Err(ConfigError::UnknownZoom("huge".into()))
        );
    }

    #[test]
    fn fit_height_requires_height() {
        assert_eq!(
            parse(r#"{"zoomLevel": "auto-height"}"#),
            Err(ConfigError::FitHeightWithoutHeight)
        );
        let cfg = parse(r#"{"zoomLevel": "auto-height", "height": "800"}"#).unwrap();
        assert_eq!(cfg.height, Height::Pixels(800.0));
    }

    #[test]
    fn width_and_height_forms() {
        assert_eq!(parse(r#"{"width": 400}"#).unwrap().width, Width::Pixels(400.0));
        assert_eq!(parse(r#"{"width": "700"}"#).unwrap().width, Width::Pixels(700.0));
        assert_eq!(parse(r#"{"width": "75%"}"#).unwrap().width, Width::Percent(75.0));
        assert!(matches!(
            parse(r#"{"width": "wide"}"#),
            Err(ConfigError::InvalidWidth(_))
        ));
        assert!(matches!(
            parse(r#"{"width": -3}"#),
            Err(ConfigError::InvalidWidth(_))
        ));
        assert!(matches!(
            parse(r#"{"height": "100%"}"#),
            Err(ConfigError::InvalidHeight(_))
        ));
        let legacy = parse(r#"{"height": "100%", "renderingMode": "legacy_embed"}"#).unwrap();
        assert_eq!(legacy.height, Height::Fill);
    }

    #[test]
    fn scroll_targets() {
        assert_eq!(
            parse(r#"{"scrollToPage": 2, "scrollToAnnotation": 1}"#),
            Err(ConfigError::ConflictingScrollTarget)
        );
        assert_eq!(parse(r#"{"scrollToPage": 0}"#).unwrap().scroll_target, None);
        assert_eq!(parse(r#"{"scrollToAnnotation": -1}"#).unwrap().scroll_target, None);
        assert_eq!(
            parse(r#"{"scrollToPage": 3}"#).unwrap().scroll_target,
            Some(ScrollTarget::Page(3))
        );
    }

    #[test]
    fn document_dependent_checks() {
        let cfg = parse(r#"{"pagesToRender": [3, 1, 3]}"#).unwrap();
        assert_eq!(cfg.pages_to_render, vec![1, 3]);
        assert!(cfg.check_against(3).is_ok());
        assert_eq!(
            cfg.check_against(2),
            Err(ConfigError::PageOutOfRange {
                page: 3,
                page_count: 2
            })
        );

        let cfg = parse(r#"{"pagesToRender": [1, 2], "scrollToPage": 4}"#).unwrap();
        assert_eq!(cfg.check_against(8), Err(ConfigError::ScrollTargetNotRendered(4)));
        assert_eq!(
            cfg.check_against(3),
            Err(ConfigError::ScrollTargetOutOfRange { target: 4, max: 3 })
        );

        assert_eq!(
            parse(r#"{"pagesToRender": [0]}"#),
            Err(ConfigError::NonPositivePage(0))
        );
    }

    #[test]
    fn unknown_variants_are_rejected() {
        assert!(matches!(
            parse(r#"{"viewerAlign": "justify"}"#),
            Err(ConfigError::UnknownVariant { field: "viewerAlign", .. })
        ));
        assert!(matches!(
            parse(r#"{"renderingMode": "pdfjs"}"#),
            Err(ConfigError::UnknownVariant { field: "renderingMode", .. })
        ));
        assert!(matches!(
            parse(r#"{"pagesVerticalSpacing": -1}"#),
            Err(ConfigError::Negative { .. })
        ));
    }
}
