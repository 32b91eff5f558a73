//! Interaction state reported back to the host

use serde::Serialize;

use crate::annotations::Annotation;

/// Snapshot returned to the host
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InteractionResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clicked_annotation: Option<Annotation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visible_pages: Option<Vec<usize>>,
    /// Content offset at the top of the visible band
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scroll_top: Option<f32>,
}

impl InteractionResult {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Tracks interaction state between host queries
#[derive(Debug, Default)]
pub struct ResultReporter {
    clicked: Option<Annotation>,
}

impl ResultReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_click(&mut self, annotation: Annotation) {
        self.clicked = Some(annotation);
    }

    pub fn reset(&mut self) {
        self.clicked = None;
    }

    /// Combine the last click with the current scroll position
    #[must_use]
    pub fn snapshot(
        &self,
        visible_pages: Vec<usize>,
        scroll_top: Option<f32>,
    ) -> InteractionResult {
        InteractionResult {
            clicked_annotation: self.clicked.clone(),
            visible_pages: (!visible_pages.is_empty()).then_some(visible_pages),
            scroll_top,
        }
    }
}
