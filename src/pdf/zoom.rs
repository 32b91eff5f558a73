//! Zoom state for PDF rendering
//!
//! Tracks the active zoom mode and implements the zoom controls: stepping,
//! presets, fit modes and manual entry.

use crate::error::ConfigError;

/// How page scale is derived
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "kebab-case", tag = "mode", content = "factor")]
pub enum ZoomMode {
    /// Explicit factor (1.0 = 100%)
    Factor(f32),
    /// Scale every page so its width matches the resolved viewer width
    FitWidth,
    /// Scale every page so its height matches the configured height
    FitHeight,
}

impl Default for ZoomMode {
    fn default() -> Self {
        Self::FitWidth
    }
}

/// Zoom state for a viewer instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Zoom {
    mode: ZoomMode,
}

impl Default for Zoom {
    fn default() -> Self {
        Self {
            mode: ZoomMode::FitWidth,
        }
    }
}

impl Zoom {
    /// Multiplier per zoom step
    pub const STEP_RATE: f32 = 1.1;
    /// Minimum allowed zoom factor
    pub const MIN_SCALE: f32 = 0.1;
    /// Maximum allowed zoom factor
    pub const MAX_SCALE: f32 = 10.0;
    /// Preset levels offered by the zoom panel
    pub const PRESETS: [f32; 8] = [0.5, 0.75, 1.0, 1.25, 1.5, 2.0, 3.0, 4.0];

    #[must_use]
    pub fn new(mode: ZoomMode) -> Self {
        Self { mode }
    }

    #[must_use]
    pub fn mode(&self) -> ZoomMode {
        self.mode
    }

    /// Zoom in by one step, starting from the scale currently on screen
    pub fn step_in(&mut self, current_scale: f32) {
        self.mode = ZoomMode::Factor(Self::clamp_factor(current_scale * Self::STEP_RATE));
    }

    /// Zoom out by one step, starting from the scale currently on screen
    pub fn step_out(&mut self, current_scale: f32) {
        self.mode = ZoomMode::Factor(Self::clamp_factor(current_scale / Self::STEP_RATE));
    }

    /// Select one of [`Zoom::PRESETS`]
    pub fn preset(&mut self, index: usize) -> bool {
        match Self::PRESETS.get(index) {
            Some(&factor) => {
                self.mode = ZoomMode::Factor(factor);
                true
            }
            None => false,
        }
    }

    pub fn actual_size(&mut self) {
        self.mode = ZoomMode::Factor(1.0);
    }

    pub fn fit_width(&mut self) {
        self.mode = ZoomMode::FitWidth;
    }

    pub fn fit_height(&mut self) {
        self.mode = ZoomMode::FitHeight;
    }

    /// Apply a value typed into the manual zoom input ("150%" or "1.5")
    pub fn set_manual(&mut self, input: &str) -> Result<(), ConfigError> {
        self.mode = ZoomMode::Factor(parse_manual_zoom(input)?);
        Ok(())
    }

    /// Clamp factor to valid range, handling NaN/Inf
    #[must_use]
    pub fn clamp_factor(factor: f32) -> f32 {
        if !factor.is_finite() {
            1.0
        } else {
            factor.clamp(Self::MIN_SCALE, Self::MAX_SCALE)
        }
    }

    #[must_use]
    pub fn in_range(factor: f32) -> bool {
        factor.is_finite() && (Self::MIN_SCALE..=Self::MAX_SCALE).contains(&factor)
    }
}

/// Parse a manual zoom entry. Percentages are divided by 100.
pub fn parse_manual_zoom(input: &str) -> Result<f32, ConfigError> {
    let trimmed = input.trim();
    let factor = match trimmed.strip_suffix('%') {
        Some(pct) => pct.trim().parse::<f32>().map(|p| p / 100.0),
        None => trimmed.parse::<f32>(),
    }
    .map_err(|_| ConfigError::UnknownZoom(input.to_string()))?;

    if Zoom::in_range(factor) {
        Ok(factor)
    } else {
        Err(ConfigError::ZoomOutOfRange(factor))
    }
}
