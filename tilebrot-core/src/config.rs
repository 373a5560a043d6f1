use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::complex::Complex;
use crate::error::CoreError;
use crate::escape::EscapeParams;
use crate::viewport::Viewport;

/// Everything needed to set up a rendering session.
///
/// Every field has a default, so a host can deserialize a partial JSON
/// document and only override what it cares about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Framebuffer width in pixels.
    pub width: u32,
    /// Framebuffer height in pixels.
    pub height: u32,
    /// Side length of the square render tiles.
    pub tile_size: u32,
    pub max_iterations: u32,
    /// Squared escape magnitude.
    pub bound_squared: f64,
    pub center_re: f64,
    pub center_im: f64,
    /// Initial vertical extent of the view in plane units.
    pub plane_height: f64,
    /// Skip interior evaluation of tiles whose boundary is a single color.
    pub accelerate: bool,
    /// Worker threads for the tile pool. `0` lets rayon decide.
    pub threads: usize,
    /// Wheel zoom factor is `1 + zoom_sensitivity * |delta|`.
    pub zoom_sensitivity: f64,
    /// Factor applied by a single zoom step (e.g. a right click).
    pub click_zoom_factor: f64,
}

impl RenderConfig {
    pub const DEFAULT_TILE_SIZE: u32 = 100;
    pub const DEFAULT_ZOOM_SENSITIVITY: f64 = 0.002;
    pub const DEFAULT_CLICK_ZOOM_FACTOR: f64 = 1.5;

    /// Default configuration for a `width × height` surface.
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Parse a JSON document and validate it.
    pub fn from_json_str(json: &str) -> crate::Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        debug!(
            width = config.width,
            height = config.height,
            tile_size = config.tile_size,
            "Loaded render config"
        );
        Ok(config)
    }

    pub fn to_json_string(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every field the engine depends on.
    pub fn validate(&self) -> crate::Result<()> {
        if self.tile_size == 0 {
            return Err(CoreError::InvalidTileSize(self.tile_size));
        }
        self.escape_params()?;
        self.viewport()?;
        if self.zoom_sensitivity < 0.0 || !self.zoom_sensitivity.is_finite() {
            return Err(CoreError::InvalidZoomFactor(self.zoom_sensitivity));
        }
        if self.click_zoom_factor <= 0.0 || !self.click_zoom_factor.is_finite() {
            return Err(CoreError::InvalidZoomFactor(self.click_zoom_factor));
        }
        Ok(())
    }

    pub fn escape_params(&self) -> crate::Result<EscapeParams> {
        EscapeParams::new(self.max_iterations, self.bound_squared)
    }

    /// The initial viewport described by this config.
    pub fn viewport(&self) -> crate::Result<Viewport> {
        Viewport::new(
            Complex::new(self.center_re, self.center_im),
            self.plane_height,
            self.width,
            self.height,
        )
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            tile_size: Self::DEFAULT_TILE_SIZE,
            max_iterations: EscapeParams::DEFAULT_MAX_ITERATIONS,
            bound_squared: EscapeParams::DEFAULT_BOUND_SQUARED,
            center_re: 0.0,
            center_im: 0.0,
            plane_height: Viewport::DEFAULT_PLANE_HEIGHT,
            accelerate: true,
            threads: 0,
            zoom_sensitivity: Self::DEFAULT_ZOOM_SENSITIVITY,
            click_zoom_factor: Self::DEFAULT_CLICK_ZOOM_FACTOR,
        }
    }
}
