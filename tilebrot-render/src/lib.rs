pub mod accelerate;
pub mod color;
pub mod compositor;
pub mod engine;
pub mod error;
pub mod framebuffer;
pub mod generation;
pub mod resample;
pub mod scheduler;
pub mod tile;

pub use color::{ClassicPalette, ColorMapper, PixelColor};
pub use compositor::{
    ApplyOutcome, ChannelListener, Compositor, TileBlit, TileListener, TileUpdate,
};
pub use engine::{wheel_zoom_scale, Engine, Intent};
pub use error::RenderError;
pub use framebuffer::{Framebuffer, SharedFramebuffer};
pub use generation::{Generation, GenerationCounter};
pub use resample::resample_for_zoom;
pub use scheduler::{
    PassHandle, PassSettings, PassState, RenderScheduler, RenderSummary, SummaryListener,
};
pub use tile::{partition, Tile};

/// Convenience result type for the render crate.
pub type Result<T> = std::result::Result<T, RenderError>;
