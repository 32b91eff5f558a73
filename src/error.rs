//! Error types for the viewer engine
//!
//! Configuration errors are returned synchronously before anything is rendered.
//! Load and render errors degrade the viewer instead of aborting it.

use std::fmt;

/// Invalid host configuration
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid width {0:?}: expected pixels or a percentage")]
    InvalidWidth(String),

    #[error("invalid height {0:?}: expected pixels, or \"100%\" with a legacy rendering mode")]
    InvalidHeight(String),

    #[error("zoom level {0} is outside [0.1, 10]")]
    ZoomOutOfRange(f32),

    #[error("unrecognized zoom level {0:?}")]
    UnknownZoom(String),

    #[error("resolution boost {0} is outside [1, 10]")]
    ResolutionBoostOutOfRange(i64),

    #[error("fit-height zoom requires a configured height")]
    FitHeightWithoutHeight,

    #[error("scrollToPage and scrollToAnnotation are mutually exclusive")]
    ConflictingScrollTarget,

    #[error("{field} must be >= 0, got {value}")]
    Negative { field: &'static str, value: i64 },

    #[error("unknown {field} value {value:?}")]
    UnknownVariant { field: &'static str, value: String },

    #[error("page {page} is not in the document ({page_count} pages)")]
    PageOutOfRange { page: usize, page_count: usize },

    #[error("page entries must be positive, got {0}")]
    NonPositivePage(i64),

    #[error("scroll target {target} is out of range (max {max})")]
    ScrollTargetOutOfRange { target: usize, max: usize },

    #[error("scroll target page {0} is not among the pages to render")]
    ScrollTargetNotRendered(usize),

    #[error("malformed configuration: {0}")]
    Malformed(String),

    #[error("no document source was provided")]
    MissingSource,
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Malformed(err.to_string())
    }
}

/// Why a document could not be loaded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadFailure {
    Malformed,
    Unsupported,
}

impl fmt::Display for LoadFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => f.write_str("MALFORMED"),
            Self::Unsupported => f.write_str("UNSUPPORTED"),
        }
    }
}

/// Terminal failure to turn the input into a document
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("document load failed ({reason}): {detail}")]
pub struct DocumentLoadError {
    pub reason: LoadFailure,
    pub detail: String,
}

impl DocumentLoadError {
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self {
            reason: LoadFailure::Malformed,
            detail: detail.into(),
        }
    }

    pub fn unsupported(detail: impl Into<String>) -> Self {
        Self {
            reason: LoadFailure::Unsupported,
            detail: detail.into(),
        }
    }
}

/// Failure to rasterize a single page. Never affects sibling pages.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PageRenderError {
    #[error("page {0} does not exist")]
    NoSuchPage(usize),

    #[error("PDF engine: {0}")]
    Engine(String),

    #[error("{detail}")]
    Generic { detail: String },
}

impl PageRenderError {
    pub fn generic(msg: impl Into<String>) -> Self {
        Self::Generic { detail: msg.into() }
    }
}

#[cfg(feature = "pdf")]
impl From<mupdf::error::Error> for PageRenderError {
    fn from(err: mupdf::error::Error) -> Self {
        Self::Engine(err.to_string())
    }
}

/// Engine settings could not be read
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse settings: {0}")]
    Parse(#[from] serde_yaml::Error),
}

/// Either half of a mount that carries its own document
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ViewerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Load(#[from] DocumentLoadError),
}
