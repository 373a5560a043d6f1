pub mod complex;
pub mod config;
pub mod error;
pub mod escape;
pub mod viewport;

// Re-export primary types for convenience.
pub use complex::Complex;
pub use config::RenderConfig;
pub use error::CoreError;
pub use escape::{EscapeFunction, EscapeParams, EscapeResult, Mandelbrot};
pub use viewport::Viewport;

/// Convenience result type for the core crate.
pub type Result<T> = std::result::Result<T, CoreError>;
