use std::sync::Arc;

use rayon::ThreadPool;
use tracing::{debug, error, info};

use tilebrot_core::{CoreError, EscapeFunction, RenderConfig, Viewport};

use crate::color::ColorMapper;
use crate::compositor::{Compositor, TileListener};
use crate::framebuffer::{Framebuffer, SharedFramebuffer};
use crate::generation::GenerationCounter;
use crate::resample::resample_for_zoom;
use crate::scheduler::{PassHandle, PassSettings, PassState, RenderScheduler, SummaryListener};

/// A navigation request from the host, already in pixel space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Intent {
    /// Re-centre on the pointer position.
    Click { x: f64, y: f64 },
    /// Scroll-wheel delta; positive zooms in.
    Wheel { delta: f64 },
    /// Zoom in by the configured fixed step.
    ZoomStep,
}

/// Zoom scale for a wheel delta: `1 + k·|delta|`, inverted for negative
/// deltas. Always finite and positive for finite input.
pub fn wheel_zoom_scale(delta: f64, sensitivity: f64) -> f64 {
    let magnitude = 1.0 + sensitivity * delta.abs();
    if delta < 0.0 {
        1.0 / magnitude
    } else {
        magnitude
    }
}

fn build_pool(threads: usize) -> crate::Result<Arc<ThreadPool>> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("tilebrot-tile-{i}"))
        .panic_handler(|payload| {
            let reason = payload
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
                .unwrap_or("non-string panic payload");
            error!(reason, "Panic escaped a tile task");
        })
        .build()?;
    Ok(Arc::new(pool))
}

fn pass_settings(config: &RenderConfig) -> crate::Result<PassSettings> {
    Ok(PassSettings {
        tile_size: config.tile_size,
        escape: config.escape_params()?,
        accelerate: config.accelerate,
    })
}

/// The rendering session: viewport, shared framebuffer, and tile scheduler.
///
/// Navigation methods take `&mut self` and are meant to be called from the
/// host's input thread; the actual work happens on the tile pool.
pub struct Engine<E, C> {
    config: RenderConfig,
    viewport: Viewport,
    framebuffer: SharedFramebuffer,
    compositor: Arc<Compositor>,
    scheduler: RenderScheduler<E, C>,
}

impl<E, C> Engine<E, C>
where
    E: EscapeFunction + 'static,
    C: ColorMapper + 'static,
{
    /// Validate `config` and set up a session with its own tile pool.
    pub fn new(config: RenderConfig, escape: E, colors: C) -> crate::Result<Self> {
        config.validate()?;
        let pool = build_pool(config.threads)?;
        Self::with_thread_pool(config, escape, colors, pool)
    }

    /// Like [`new`](Self::new) but runs tiles on a host-provided pool.
    pub fn with_thread_pool(
        config: RenderConfig,
        escape: E,
        colors: C,
        pool: Arc<ThreadPool>,
    ) -> crate::Result<Self> {
        config.validate()?;
        let viewport = config.viewport()?;
        let settings = pass_settings(&config)?;
        let generations = Arc::new(GenerationCounter::new());
        let framebuffer = SharedFramebuffer::new(viewport.width, viewport.height);
        let compositor = Arc::new(Compositor::new(
            framebuffer.clone(),
            Arc::clone(&generations),
        ));
        let scheduler = RenderScheduler::new(
            Arc::new(escape),
            Arc::new(colors),
            pool,
            generations,
            Arc::clone(&compositor),
            settings,
        );
        info!(
            width = viewport.width,
            height = viewport.height,
            tile_size = config.tile_size,
            max_iterations = config.max_iterations,
            bound_squared = config.bound_squared,
            "Engine configured"
        );
        Ok(Self {
            config,
            viewport,
            framebuffer,
            compositor,
            scheduler,
        })
    }

    /// Replace the configuration. The viewport is rebuilt from the config and
    /// any in-flight pass is superseded; the framebuffer is reallocated only
    /// when the dimensions change. Iteration budget and bound take effect on
    /// the next draw. `threads` only applies at construction.
    ///
    /// Does not draw; call [`draw`](Self::draw) afterwards.
    pub fn configure(&mut self, config: RenderConfig) -> crate::Result<()> {
        config.validate()?;
        let viewport = config.viewport()?;
        let settings = pass_settings(&config)?;
        self.scheduler.supersede();
        self.replace_framebuffer_if_resized(viewport.width, viewport.height);
        self.scheduler.set_settings(settings);
        debug!(
            width = viewport.width,
            height = viewport.height,
            tile_size = config.tile_size,
            bound_squared = config.bound_squared,
            "Engine reconfigured"
        );
        self.viewport = viewport;
        self.config = config;
        Ok(())
    }

    /// Render the current viewport from scratch. Returns immediately.
    pub fn draw(&mut self) -> PassHandle {
        self.scheduler.draw(&self.viewport)
    }

    /// Re-centre on pixel `(px, py)` and redraw. Non-finite coordinates are
    /// rejected without touching the viewport or the running pass.
    pub fn pan(&mut self, px: f64, py: f64) -> crate::Result<PassHandle> {
        self.viewport.pan(px, py)?;
        debug!(center = %self.viewport.center, "Pan");
        Ok(self.draw())
    }

    /// Zoom in by `factor` (> 1 magnifies), with an instant preview.
    pub fn zoom_in(&mut self, factor: f64) -> crate::Result<PassHandle> {
        self.zoom(factor)
    }

    /// Zoom out by `factor` (> 1 shows more of the plane), with an instant preview.
    pub fn zoom_out(&mut self, factor: f64) -> crate::Result<PassHandle> {
        if factor <= 0.0 || !factor.is_finite() {
            return Err(CoreError::InvalidZoomFactor(factor).into());
        }
        self.zoom(1.0 / factor)
    }

    /// Invalidate → preview → recompute, in that order, so no tile of the
    /// previous pass can land on top of the preview.
    fn zoom(&mut self, scale: f64) -> crate::Result<PassHandle> {
        let mut next = self.viewport;
        next.zoom(scale)?;

        let generation = self.scheduler.supersede();
        resample_for_zoom(&mut self.framebuffer.lock(), scale);
        self.viewport = next;
        debug!(scale, plane_height = next.plane_height, "Zoom");
        Ok(self.scheduler.dispatch(generation, &self.viewport))
    }

    /// Translate a host input event into a pan or zoom. A zero wheel delta
    /// is ignored.
    pub fn apply_intent(&mut self, intent: Intent) -> crate::Result<Option<PassHandle>> {
        match intent {
            Intent::Click { x, y } => self.pan(x, y).map(Some),
            Intent::Wheel { delta } if delta == 0.0 => Ok(None),
            Intent::Wheel { delta } => {
                if !delta.is_finite() {
                    return Err(CoreError::InvalidZoomFactor(delta).into());
                }
                let scale = wheel_zoom_scale(delta, self.config.zoom_sensitivity);
                self.zoom(scale).map(Some)
            }
            Intent::ZoomStep => self.zoom_in(self.config.click_zoom_factor).map(Some),
        }
    }

    /// New pixel dimensions: the viewport is replaced wholesale (same centre
    /// and plane height), the framebuffer reallocated, and a draw started.
    pub fn resize(&mut self, width: u32, height: u32) -> crate::Result<PassHandle> {
        let viewport = self.viewport.resized(width, height)?;
        let generation = self.scheduler.supersede();
        self.replace_framebuffer_if_resized(width, height);
        self.viewport = viewport;
        self.config.width = width;
        self.config.height = height;
        Ok(self.scheduler.dispatch(generation, &self.viewport))
    }

    fn replace_framebuffer_if_resized(&mut self, width: u32, height: u32) {
        let mut fb = self.framebuffer.lock();
        if fb.width != width || fb.height != height {
            *fb = Framebuffer::new(width, height);
        }
    }

    pub fn set_tile_listener(&mut self, listener: Option<Arc<dyn TileListener>>) {
        self.compositor.set_listener(listener);
    }

    pub fn set_summary_listener(&mut self, listener: Option<Arc<dyn SummaryListener>>) {
        self.scheduler.set_summary_listener(listener);
    }

    /// Handle to the framebuffer the compositor writes into.
    pub fn framebuffer(&self) -> SharedFramebuffer {
        self.framebuffer.clone()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    pub fn generations(&self) -> &Arc<GenerationCounter> {
        self.scheduler.generations()
    }

    /// State of the most recent pass.
    pub fn state(&self) -> PassState {
        self.scheduler.state()
    }

    /// Tiles written in the current pass as `(done, total)`.
    pub fn progress(&self) -> (usize, usize) {
        self.scheduler.generations().progress()
    }
}
