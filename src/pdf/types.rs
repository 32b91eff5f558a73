//! Core types for PDF rendering

/// Intrinsic page size in document units (points, 1/72 inch)
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

impl PageSize {
    /// US Letter, used by tests and as a fallback for unreadable page boxes
    pub const LETTER: Self = Self::new(612.0, 792.0);

    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Size after applying a uniform scale
    #[must_use]
    pub fn scaled(self, scale: f32) -> Self {
        Self::new(self.width * scale, self.height * scale)
    }

    pub(crate) fn is_usable(self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

/// Axis-aligned rectangle in CSS pixels
#[derive(Clone, Copy, Debug, Default, PartialEq, serde::Serialize)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    #[must_use]
    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    /// Half-open containment: the right and bottom edges are outside
    #[must_use]
    pub fn contains(&self, x: f32, y: f32) -> bool {
        x >= self.x && x < self.right() && y >= self.y && y < self.bottom()
    }

    #[must_use]
    pub fn translate(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }
}

/// Raw rasterized page before it is handed to the presentation layer.
///
/// RGB pixel data at the boosted resolution.
#[derive(Clone)]
pub struct Bitmap {
    /// Raw RGB pixel data (3 bytes per pixel: R, G, B)
    pub pixels: Vec<u8>,
    /// Bitmap width in pixels
    pub width_px: u32,
    /// Bitmap height in pixels
    pub height_px: u32,
}

impl Bitmap {
    /// Blank white bitmap
    #[must_use]
    pub fn blank(width_px: u32, height_px: u32) -> Self {
        Self {
            pixels: vec![0xFF; width_px as usize * height_px as usize * 3],
            width_px,
            height_px,
        }
    }
}

impl std::fmt::Debug for Bitmap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bitmap")
            .field("width_px", &self.width_px)
            .field("height_px", &self.height_px)
            .field("bytes", &self.pixels.len())
            .finish()
    }
}

/// A line of text in page-intrinsic units, as reported by the PDF engine
#[derive(Clone, Debug, PartialEq)]
pub struct TextRun {
    pub text: String,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A positioned, selectable text span in layout pixels
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
pub struct TextSpan {
    pub text: String,
    pub rect: Rect,
}

/// Invisible text overlay registered with the canvas at layout size
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct TextLayer {
    pub spans: Vec<TextSpan>,
}

impl TextLayer {
    /// Project intrinsic text runs into layout pixels.
    ///
    /// The scale is the layout scale, never the boosted one, so the layer lines
    /// up with the canvas as displayed.
    #[must_use]
    pub fn from_runs(runs: &[TextRun], scale: f32) -> Self {
        let spans = runs
            .iter()
            .filter(|run| !run.text.trim().is_empty())
            .map(|run| TextSpan {
                text: run.text.clone(),
                rect: Rect::new(
                    run.x * scale,
                    run.y * scale,
                    run.width * scale,
                    run.height * scale,
                ),
            })
            .collect();
        Self { spans }
    }

    #[must_use]
    pub fn text(&self) -> String {
        self.spans
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Complete rendered page data
#[derive(Clone)]
pub struct RenderedPage {
    /// Page number (1-based)
    pub page: usize,
    /// Layout scale the page was rendered for
    pub scale: f32,
    /// Oversampling factor applied on top of the layout scale
    pub resolution_boost: u8,
    /// Bitmap at `layout size × resolution_boost`
    pub bitmap: Bitmap,
    /// Text overlay when text rendering was requested
    pub text_layer: Option<TextLayer>,
}

impl std::fmt::Debug for RenderedPage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderedPage")
            .field("page", &self.page)
            .field("scale", &self.scale)
            .field("resolution_boost", &self.resolution_boost)
            .field("bitmap", &self.bitmap)
            .field(
                "text_spans",
                &self.text_layer.as_ref().map_or(0, |t| t.spans.len()),
            )
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_layer_uses_layout_scale() {
        let runs = vec![
            TextRun {
                text: "Hello".into(),
                x: 10.0,
                y: 20.0,
                width: 30.0,
                height: 5.0,
            },
            TextRun {
                text: "   ".into(),
                x: 0.0,
                y: 0.0,
                width: 1.0,
                height: 1.0,
            },
        ];
        let layer = TextLayer::from_runs(&runs, 2.0);
        assert_eq!(layer.spans.len(), 1);
        assert_eq!(layer.spans[0].rect, Rect::new(20.0, 40.0, 60.0, 10.0));
    }

    #[test]
    fn rect_contains_is_half_open() {
        let r = Rect::new(10.0, 10.0, 5.0, 5.0);
        assert!(r.contains(10.0, 10.0));
        assert!(r.contains(14.9, 14.9));
        assert!(!r.contains(15.0, 12.0));
        assert!(!r.contains(9.9, 12.0));
    }
}
