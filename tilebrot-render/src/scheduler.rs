use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use rayon::ThreadPool;
use tracing::{debug, info, warn};

use tilebrot_core::{EscapeFunction, EscapeParams, Viewport};

use crate::accelerate::{fill_block, scan_edges, EdgeScan};
use crate::color::{ColorMapper, PixelColor};
use crate::compositor::{ApplyOutcome, Compositor};
use crate::generation::{Generation, GenerationCounter};
use crate::tile::{partition, Tile};

// ---------------------------------------------------------------------------
// Pass state & summary
// ---------------------------------------------------------------------------

/// Lifecycle of a render pass: `Idle → Running → {Completed, Superseded}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassState {
    /// Nothing has been drawn yet.
    Idle,
    Running,
    /// Every tile finished while the pass was still current.
    Completed,
    /// A newer draw started before this pass finished.
    Superseded,
}

/// Diagnostics emitted when a pass completes under a still-current generation.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderSummary {
    pub generation: Generation,
    pub elapsed: Duration,
    pub tiles_total: usize,
    /// Tiles filled from a uniform boundary without evaluating the interior.
    pub tiles_accelerated: usize,
    /// Tiles whose task panicked; their regions keep the previous contents.
    pub tiles_faulted: usize,
    pub plane_height: f64,
}

impl RenderSummary {
    /// Share of tiles that took the edge-uniformity shortcut.
    pub fn accelerated_fraction(&self) -> f64 {
        if self.tiles_total == 0 {
            0.0
        } else {
            self.tiles_accelerated as f64 / self.tiles_total as f64
        }
    }
}

/// Host hook for pass summaries. Purely observational.
pub trait SummaryListener: Send + Sync {
    fn pass_completed(&self, summary: &RenderSummary);
}

impl<F> SummaryListener for F
where
    F: Fn(&RenderSummary) + Send + Sync,
{
    fn pass_completed(&self, summary: &RenderSummary) {
        self(summary)
    }
}

/// Settings that apply to every tile of a pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassSettings {
    pub tile_size: u32,
    /// Iteration budget and bound handed to the escape function.
    pub escape: EscapeParams,
    pub accelerate: bool,
}

// ---------------------------------------------------------------------------
// Pass tracking
// ---------------------------------------------------------------------------

type Outcome = Option<(PassState, Option<RenderSummary>)>;

struct PassTracker {
    generation: Generation,
    started: Instant,
    tiles_total: usize,
    plane_height: f64,
    remaining: AtomicUsize,
    accelerated: AtomicUsize,
    faulted: AtomicUsize,
    outcome: Mutex<Outcome>,
    finished: Condvar,
    summary_listener: Option<Arc<dyn SummaryListener>>,
}

impl PassTracker {
    /// Called once per task, after its tile has been applied or abandoned.
    fn task_done(&self, generations: &GenerationCounter) {
        if self.remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.finish(generations);
        }
    }

    fn finish(&self, generations: &GenerationCounter) {
        let (state, summary) = if generations.is_current(self.generation) {
            let summary = RenderSummary {
                generation: self.generation,
                elapsed: self.started.elapsed(),
                tiles_total: self.tiles_total,
                tiles_accelerated: self.accelerated.load(Ordering::Relaxed),
                tiles_faulted: self.faulted.load(Ordering::Relaxed),
                plane_height: self.plane_height,
            };
            info!(
                generation = self.generation.get(),
                elapsed_ms = summary.elapsed.as_millis(),
                plane_height = summary.plane_height,
                tiles_accelerated = summary.tiles_accelerated,
                tiles_total = summary.tiles_total,
                tiles_faulted = summary.tiles_faulted,
                "Render complete"
            );
            if let Some(listener) = &self.summary_listener {
                listener.pass_completed(&summary);
            }
            (PassState::Completed, Some(summary))
        } else {
            let generation = self.generation.get();
            debug!(generation, "Superseded pass drained");
            (PassState::Superseded, None)
        };

        let mut outcome = self.outcome.lock().unwrap_or_else(PoisonError::into_inner);
        *outcome = Some((state, summary));
        drop(outcome);
        self.finished.notify_all();
    }
}

/// Handle to a dispatched pass.
///
/// Dropping the handle does not cancel anything; only a newer draw does.
#[derive(Clone)]
pub struct PassHandle {
    tracker: Arc<PassTracker>,
    generations: Arc<GenerationCounter>,
}

impl PassHandle {
    pub fn generation(&self) -> Generation {
        self.tracker.generation
    }

    pub fn tiles_total(&self) -> usize {
        self.tracker.tiles_total
    }

    /// Current state. A pass reports `Superseded` as soon as a newer draw
    /// starts, even while its tasks are still draining.
    pub fn state(&self) -> PassState {
        if let Some((state, _)) = &*self.lock_outcome() {
            return *state;
        }
        if self.generations.is_stale(self.tracker.generation) {
            PassState::Superseded
        } else {
            PassState::Running
        }
    }

    /// Whether every task of this pass has exited.
    pub fn is_finished(&self) -> bool {
        self.lock_outcome().is_some()
    }

    /// Block until every task of this pass has exited.
    pub fn wait(&self) -> PassState {
        let guard = self.lock_outcome();
        let guard = self
            .tracker
            .finished
            .wait_while(guard, |outcome| outcome.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        match &*guard {
            Some((state, _)) => *state,
            None => PassState::Running,
        }
    }

    /// Like [`wait`](Self::wait) with an upper bound; `None` on timeout.
    pub fn wait_timeout(&self, timeout: Duration) -> Option<PassState> {
        let guard = self.lock_outcome();
        let (guard, _) = self
            .tracker
            .finished
            .wait_timeout_while(guard, timeout, |outcome| outcome.is_none())
            .unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().map(|(state, _)| *state)
    }

    /// Summary of a completed pass, `None` while running or if superseded.
    pub fn summary(&self) -> Option<RenderSummary> {
        self.lock_outcome()
            .as_ref()
            .and_then(|(_, summary)| summary.clone())
    }

    fn lock_outcome(&self) -> MutexGuard<'_, Outcome> {
        self.tracker
            .outcome
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for PassHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PassHandle")
            .field("generation", &self.tracker.generation)
            .field("tiles_total", &self.tracker.tiles_total)
            .field("state", &self.state())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Per-tile rendering
// ---------------------------------------------------------------------------

/// Everything a tile task needs, shared by all tasks of one pass.
struct PassContext<E, C> {
    escape: Arc<E>,
    colors: Arc<C>,
    generations: Arc<GenerationCounter>,
    compositor: Arc<Compositor>,
    tracker: Arc<PassTracker>,
    settings: PassSettings,
    step: f64,
}

/// Pixels of one finished tile.
struct RenderedTile {
    pixels: Vec<u8>,
    accelerated: bool,
}

/// Compute a tile's RGBA block, polling the generation before every pixel.
///
/// Returns `None` as soon as the pass is superseded.
fn render_tile<E: EscapeFunction, C: ColorMapper>(
    ctx: &PassContext<E, C>,
    tile: &Tile,
) -> Option<RenderedTile> {
    let generation = ctx.tracker.generation;
    let params = &ctx.settings.escape;
    let color_at = |dx: u32, dy: u32| -> Option<PixelColor> {
        if ctx.generations.is_stale(generation) {
            return None;
        }
        let c = tile.plane_point(dx, dy, ctx.step);
        Some(ctx.colors.color_of(ctx.escape.evaluate(c, params)))
    };

    if ctx.settings.accelerate {
        match scan_edges(tile, &color_at) {
            EdgeScan::Uniform(color) => {
                return Some(RenderedTile {
                    pixels: fill_block(color, tile.size),
                    accelerated: true,
                });
            }
            EdgeScan::Cancelled => return None,
            EdgeScan::Mixed => {}
        }
    }

    let mut pixels = Vec::with_capacity(tile.pixel_count() * 4);
    for dy in 0..tile.size {
        for dx in 0..tile.size {
            pixels.extend_from_slice(&color_at(dx, dy)?);
        }
    }
    Some(RenderedTile {
        pixels,
        accelerated: false,
    })
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Body of one pool task: render, hand to the compositor, account.
fn run_tile_task<E: EscapeFunction, C: ColorMapper>(ctx: &PassContext<E, C>, tile: Tile) {
    let generation = ctx.tracker.generation;
    if ctx.generations.is_current(generation) {
        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            let rendered = render_tile(ctx, &tile)?;
            let compositor = &ctx.compositor;
            let outcome = compositor.apply_tile(generation, &tile, &rendered.pixels);
            Some((rendered.accelerated, outcome))
        }));

        match result {
            Ok(Some((accelerated, outcome))) => {
                if accelerated {
                    ctx.tracker.accelerated.fetch_add(1, Ordering::Relaxed);
                }
                if outcome == ApplyOutcome::Applied {
                    ctx.generations.inc_progress();
                }
            }
            Ok(None) => {}
            Err(payload) => {
                ctx.tracker.faulted.fetch_add(1, Ordering::Relaxed);
                warn!(
                    generation = generation.get(),
                    x = tile.x,
                    y = tile.y,
                    reason = panic_message(payload.as_ref()),
                    "Tile evaluation fault; tile skipped"
                );
            }
        }
    }
    ctx.tracker.task_done(&ctx.generations);
}

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Dispatches one pool task per tile under a generation token.
///
/// Generic over the escape function and color mapper so the per-pixel loop
/// is statically dispatched.
pub struct RenderScheduler<E, C> {
    escape: Arc<E>,
    colors: Arc<C>,
    pool: Arc<ThreadPool>,
    generations: Arc<GenerationCounter>,
    compositor: Arc<Compositor>,
    settings: PassSettings,
    summary_listener: Option<Arc<dyn SummaryListener>>,
    latest: Option<PassHandle>,
}

impl<E, C> RenderScheduler<E, C>
where
    E: EscapeFunction + 'static,
    C: ColorMapper + 'static,
{
    pub fn new(
        escape: Arc<E>,
        colors: Arc<C>,
        pool: Arc<ThreadPool>,
        generations: Arc<GenerationCounter>,
        compositor: Arc<Compositor>,
        settings: PassSettings,
    ) -> Self {
        Self {
            escape,
            colors,
            pool,
            generations,
            compositor,
            settings,
            summary_listener: None,
            latest: None,
        }
    }

    pub fn settings(&self) -> PassSettings {
        self.settings
    }

    pub fn set_settings(&mut self, settings: PassSettings) {
        debug_assert!(settings.tile_size > 0 && settings.escape.max_iterations > 0);
        self.settings = settings;
    }

    pub fn set_summary_listener(&mut self, listener: Option<Arc<dyn SummaryListener>>) {
        self.summary_listener = listener;
    }

    pub fn generations(&self) -> &Arc<GenerationCounter> {
        &self.generations
    }

    /// Invalidate every in-flight pass and return the new current generation.
    ///
    /// Split from [`dispatch`](Self::dispatch) so callers can touch the
    /// framebuffer (zoom preview) after older tiles stop landing but before
    /// new ones start.
    pub fn supersede(&self) -> Generation {
        self.generations.advance()
    }

    /// Partition `viewport` and submit one task per tile under `generation`.
    pub fn dispatch(&mut self, generation: Generation, viewport: &Viewport) -> PassHandle {
        let tiles = partition(viewport, self.settings.tile_size);
        let tiles_total = tiles.len();
        debug!(
            generation = generation.get(),
            tile_count = tiles_total,
            width = viewport.width,
            height = viewport.height,
            "Dispatching tiled render"
        );

        let tracker = Arc::new(PassTracker {
            generation,
            started: Instant::now(),
            tiles_total,
            plane_height: viewport.plane_height,
            remaining: AtomicUsize::new(tiles_total),
            accelerated: AtomicUsize::new(0),
            faulted: AtomicUsize::new(0),
            outcome: Mutex::new(None),
            finished: Condvar::new(),
            summary_listener: self.summary_listener.clone(),
        });
        let handle = PassHandle {
            tracker: Arc::clone(&tracker),
            generations: Arc::clone(&self.generations),
        };

        if self.generations.is_current(generation) {
            self.generations.reset_progress(tiles_total);
        }

        if tiles_total == 0 {
            tracker.finish(&self.generations);
        } else {
            let ctx = Arc::new(PassContext {
                escape: Arc::clone(&self.escape),
                colors: Arc::clone(&self.colors),
                generations: Arc::clone(&self.generations),
                compositor: Arc::clone(&self.compositor),
                tracker,
                settings: self.settings,
                step: viewport.step(),
            });
            for tile in tiles {
                let ctx = Arc::clone(&ctx);
                self.pool.spawn(move || run_tile_task(&ctx, tile));
            }
        }

        self.latest = Some(handle.clone());
        handle
    }

    /// Supersede the current pass and render `viewport` from scratch.
    pub fn draw(&mut self, viewport: &Viewport) -> PassHandle {
        let generation = self.supersede();
        self.dispatch(generation, viewport)
    }

    /// State of the most recent pass, `Idle` before the first draw.
    pub fn state(&self) -> PassState {
        self.latest
            .as_ref()
            .map_or(PassState::Idle, PassHandle::state)
    }

    pub fn latest(&self) -> Option<&PassHandle> {
        self.latest.as_ref()
    }
}
