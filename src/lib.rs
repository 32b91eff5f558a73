pub mod annotations;
pub mod config;
pub mod error;
pub mod panic_handler;
pub mod pdf;
pub mod result;
pub mod settings;
pub mod surface;
pub mod viewer;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use annotations::{Annotation, AnnotationOverlay, OverlayEvent, PositionedBox};
pub use config::{HostConfig, ScrollTarget, ViewerConfig};
pub use error::{ConfigError, DocumentLoadError, LoadFailure, PageRenderError, ViewerError};
pub use result::{InteractionResult, ResultReporter};
pub use surface::Surface;
pub use viewer::ViewportController;
