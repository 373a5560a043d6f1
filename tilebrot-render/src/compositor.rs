use std::sync::mpsc;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use tracing::{trace, warn};

use crate::framebuffer::{Framebuffer, SharedFramebuffer};
use crate::generation::{Generation, GenerationCounter};
use crate::tile::Tile;

/// A tile that has just been written into the framebuffer.
#[derive(Debug, Clone, Copy)]
pub struct TileBlit<'a> {
    pub generation: Generation,
    /// Pixel x of the top-left corner.
    pub x: u32,
    /// Pixel y of the top-left corner.
    pub y: u32,
    pub size: u32,
    /// `size × size` RGBA pixels, row-major.
    pub pixels: &'a [u8],
}

/// Host hook invoked after every successful tile write.
///
/// Called while the framebuffer lock is held, so calls are serialized and
/// arrive in the same order as the writes. Implementations must not lock the
/// shared framebuffer themselves.
pub trait TileListener: Send + Sync {
    fn tile_applied(&self, blit: &TileBlit<'_>);
}

impl<F> TileListener for F
where
    F: Fn(&TileBlit<'_>) + Send + Sync,
{
    fn tile_applied(&self, blit: &TileBlit<'_>) {
        self(blit)
    }
}

/// Owned copy of a [`TileBlit`], for marshaling onto another thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileUpdate {
    pub generation: Generation,
    pub x: u32,
    pub y: u32,
    pub size: u32,
    pub pixels: Vec<u8>,
}

impl TileUpdate {
    /// Write this update into a host-owned buffer.
    ///
    /// The host should drop updates whose generation is no longer current
    /// before calling this; see [`GenerationCounter::is_current`].
    pub fn apply_to(&self, buffer: &mut Framebuffer) -> bool {
        buffer.write_block(self.x, self.y, self.size, &self.pixels)
    }
}

/// Forwards every applied tile over a channel, for hosts whose presented
/// buffer may only be touched from one thread.
#[derive(Debug)]
pub struct ChannelListener {
    tx: Mutex<mpsc::Sender<TileUpdate>>,
}

impl ChannelListener {
    pub fn new() -> (Self, mpsc::Receiver<TileUpdate>) {
        let (tx, rx) = mpsc::channel();
        (Self { tx: Mutex::new(tx) }, rx)
    }
}

impl TileListener for ChannelListener {
    fn tile_applied(&self, blit: &TileBlit<'_>) {
        let update = TileUpdate {
            generation: blit.generation,
            x: blit.x,
            y: blit.y,
            size: blit.size,
            pixels: blit.pixels.to_vec(),
        };
        let tx = self.tx.lock().unwrap_or_else(PoisonError::into_inner);
        if tx.send(update).is_err() {
            trace!("Tile receiver dropped; update discarded");
        }
    }
}

/// Result of offering a tile to the compositor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    Applied,
    /// The tile's generation was superseded; nothing was written.
    Stale,
    /// The tile does not fit the framebuffer's current dimensions.
    OutOfBounds,
}

/// Serializes tile writes into the shared framebuffer.
///
/// Workers compute in parallel; only the final copy goes through the
/// framebuffer mutex. The generation is checked again once the lock is held,
/// so a superseded tile can never land after a newer pass has written the
/// same region.
pub struct Compositor {
    framebuffer: SharedFramebuffer,
    generations: Arc<GenerationCounter>,
    listener: RwLock<Option<Arc<dyn TileListener>>>,
}

impl Compositor {
    pub fn new(framebuffer: SharedFramebuffer, generations: Arc<GenerationCounter>) -> Self {
        Self {
            framebuffer,
            generations,
            listener: RwLock::new(None),
        }
    }

    pub fn framebuffer(&self) -> &SharedFramebuffer {
        &self.framebuffer
    }

    pub fn set_listener(&self, listener: Option<Arc<dyn TileListener>>) {
        *self
            .listener
            .write()
            .unwrap_or_else(PoisonError::into_inner) = listener;
    }

    /// Write a finished tile if its generation is still current.
    pub fn apply_tile(&self, generation: Generation, tile: &Tile, pixels: &[u8]) -> ApplyOutcome {
        if self.generations.is_stale(generation) {
            trace!(%generation, x = tile.x, y = tile.y, "Discarding stale tile");
            return ApplyOutcome::Stale;
        }

        let mut fb = self.framebuffer.lock();
        if self.generations.is_stale(generation) {
            trace!(%generation, x = tile.x, y = tile.y, "Discarding stale tile");
            return ApplyOutcome::Stale;
        }
        if !fb.write_block(tile.x, tile.y, tile.size, pixels) {
            warn!(
                x = tile.x,
                y = tile.y,
                size = tile.size,
                width = fb.width,
                height = fb.height,
                "Tile does not fit framebuffer; dropped"
            );
            return ApplyOutcome::OutOfBounds;
        }

        let listener = self
            .listener
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(listener) = listener {
            listener.tile_applied(&TileBlit {
                generation,
                x: tile.x,
                y: tile.y,
                size: tile.size,
                pixels,
            });
        }
        drop(fb);
        ApplyOutcome::Applied
    }
}
