//! Annotation projection and click dispatch
//!
//! Annotations arrive in page-intrinsic units and are projected onto the
//! current layout. Clicks are hit-tested against the projected boxes and
//! broadcast to subscribers as [`OverlayEvent`]s; the embedding layer decides
//! what a "callback" means.

use flume::{Receiver, Sender};
use log::{debug, trace};
use serde::{Deserialize, Deserializer, Serialize};

use crate::pdf::{PageLayout, Rect};

/// Host-supplied annotation record
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Annotation {
    /// Target page (1-based). Pages outside the document, zero and negative
    /// ones included, are dropped at projection.
    pub page: i64,
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub color: String,
    #[serde(
        default,
        deserialize_with = "deserialize_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
}

/// Hosts send identifiers as strings or numbers
fn deserialize_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(Option::<RawId>::deserialize(deserializer)?.map(|raw| match raw {
        RawId::Text(s) => s,
        RawId::Int(n) => n.to_string(),
        RawId::Float(f) => f.to_string(),
    }))
}

/// An annotation projected into viewer pixels
#[derive(Clone, Debug, PartialEq)]
pub struct PositionedBox {
    /// Position in the host's annotation list (0-based)
    pub index: usize,
    /// Page the box sits on (1-based)
    pub page: usize,
    pub annotation: Annotation,
    /// Box in viewer content coordinates
    pub rect: Rect,
    /// Same box relative to its page's top-left corner
    pub page_rect: Rect,
}

/// Project annotations onto laid-out pages.
///
/// Annotations on pages that are not part of `pages` are dropped silently.
#[must_use]
pub fn project_annotations(annotations: &[Annotation], pages: &[PageLayout]) -> Vec<PositionedBox> {
    annotations
        .iter()
        .enumerate()
        .filter_map(|(index, annotation)| {
            let layout = usize::try_from(annotation.page)
                .ok()
                .and_then(|page| pages.iter().find(|p| p.page == page));
            let Some(layout) = layout else {
                trace!(
                    "Dropping annotation {index}: page {} not laid out",
                    annotation.page
                );
                return None;
            };
            let s = layout.scale;
            let page_rect = Rect::new(
                annotation.x * s,
                annotation.y * s,
                annotation.width * s,
                annotation.height * s,
            );
            Some(PositionedBox {
                index,
                page: layout.page,
                annotation: annotation.clone(),
                rect: page_rect.translate(layout.left, layout.top),
                page_rect,
            })
        })
        .collect()
}

/// Events emitted by the overlay
#[derive(Clone, Debug, PartialEq)]
pub enum OverlayEvent {
    AnnotationClicked(Annotation),
}

/// Positioned annotation boxes for the current layout plus their subscribers
#[derive(Default)]
pub struct AnnotationOverlay {
    boxes: Vec<PositionedBox>,
    outline: f32,
    subscribers: Vec<Sender<OverlayEvent>>,
}

impl AnnotationOverlay {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the boxes with a fresh projection
    pub fn project(&mut self, annotations: &[Annotation], pages: &[PageLayout], outline: f32) {
        self.boxes = project_annotations(annotations, pages);
        self.outline = outline;
        debug!(
            "Projected {} of {} annotations",
            self.boxes.len(),
            annotations.len()
        );
    }

    pub fn clear(&mut self) {
        self.boxes.clear();
    }

    #[must_use]
    pub fn boxes(&self) -> &[PositionedBox] {
        &self.boxes
    }

    #[must_use]
    pub fn outline(&self) -> f32 {
        self.outline
    }

    pub fn boxes_on_page(&self, page: usize) -> impl Iterator<Item = &PositionedBox> {
        self.boxes.iter().filter(move |b| b.page == page)
    }

    /// Box projected for the annotation at `index` in the host list
    #[must_use]
    pub fn box_for(&self, index: usize) -> Option<&PositionedBox> {
        self.boxes.iter().find(|b| b.index == index)
    }

    /// Topmost box under a point in viewer content coordinates. Later boxes
    /// are drawn over earlier ones.
    #[must_use]
    pub fn hit_test(&self, x: f32, y: f32) -> Option<&PositionedBox> {
        self.boxes.iter().rev().find(|b| b.rect.contains(x, y))
    }

    pub fn subscribe(&mut self) -> Receiver<OverlayEvent> {
        let (tx, rx) = flume::unbounded();
        self.subscribers.push(tx);
        rx
    }

    /// Send to every live subscriber, forgetting the ones that hung up
    pub fn emit(&mut self, event: &OverlayEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
