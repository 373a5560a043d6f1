use thiserror::Error;

/// Errors raised synchronously while configuring the engine or its viewport.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid dimensions: {width}×{height} (both must be > 0)")]
    InvalidDimensions { width: u32, height: u32 },

    #[error("invalid plane height: {0} (must be positive and finite)")]
    InvalidPlaneHeight(f64),

    #[error("invalid tile size: {0} (must be > 0)")]
    InvalidTileSize(u32),

    #[error("invalid max iterations: {0} (must be >= 1)")]
    InvalidMaxIterations(u32),

    #[error("invalid bound: {0} (squared bound must be positive and finite)")]
    InvalidBound(f64),

    #[error("invalid zoom factor: {0} (must be positive and finite)")]
    InvalidZoomFactor(f64),

    #[error("invalid center: {re}, {im} (must be finite)")]
    InvalidCenter { re: f64, im: f64 },

    #[error("malformed render config: {0}")]
    Config(#[from] serde_json::Error),
}
