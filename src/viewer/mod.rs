//! Viewport runtime: mounting, resize, scroll, zoom and render polling

mod controller;
mod debounce;

pub use controller::ViewportController;
pub use debounce::Debouncer;
