use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::color::PixelColor;

/// An RGBA pixel buffer, 4 bytes per pixel, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

impl Framebuffer {
    /// Create a buffer cleared to transparent black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0u8; width as usize * height as usize * 4],
        }
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * 4
    }

    /// Color of the pixel at `(x, y)`, `None` outside the buffer.
    pub fn pixel(&self, x: u32, y: u32) -> Option<PixelColor> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        let mut px = [0u8; 4];
        px.copy_from_slice(&self.pixels[i..i + 4]);
        Some(px)
    }

    pub fn set_pixel(&mut self, x: u32, y: u32, color: PixelColor) {
        debug_assert!(x < self.width && y < self.height);
        let i = self.offset(x, y);
        self.pixels[i..i + 4].copy_from_slice(&color);
    }

    /// Whether a `size × size` block at `(x, y)` lies entirely inside the buffer.
    pub fn fits_block(&self, x: u32, y: u32, size: u32) -> bool {
        let fits = |at: u32, limit: u32| at.checked_add(size).is_some_and(|end| end <= limit);
        fits(x, self.width) && fits(y, self.height)
    }

    /// Copy a square RGBA block into place, row by row.
    ///
    /// Returns `false` without touching the buffer if the block does not fit
    /// entirely (e.g. a tile sized for a larger, previous viewport).
    pub fn write_block(&mut self, x: u32, y: u32, size: u32, block: &[u8]) -> bool {
        debug_assert_eq!(block.len(), size as usize * size as usize * 4);
        if !self.fits_block(x, y, size) || block.len() != size as usize * size as usize * 4 {
            return false;
        }
        let row_bytes = size as usize * 4;
        for (row, src) in block.chunks_exact(row_bytes).enumerate() {
            let dst = self.offset(x, y + row as u32);
            self.pixels[dst..dst + row_bytes].copy_from_slice(src);
        }
        true
    }

    /// Copy out a square block, the inverse of [`write_block`](Self::write_block).
    pub fn read_block(&self, x: u32, y: u32, size: u32) -> Option<Vec<u8>> {
        if !self.fits_block(x, y, size) {
            return None;
        }
        let row_bytes = size as usize * 4;
        let mut out = Vec::with_capacity(row_bytes * size as usize);
        for row in 0..size {
            let start = self.offset(x, y + row);
            out.extend_from_slice(&self.pixels[start..start + row_bytes]);
        }
        Some(out)
    }

    pub fn fill(&mut self, color: PixelColor) {
        for chunk in self.pixels.chunks_exact_mut(4) {
            chunk.copy_from_slice(&color);
        }
    }

    /// Reset every byte to zero (transparent black).
    pub fn clear(&mut self) {
        self.pixels.fill(0);
    }
}

/// A framebuffer shared between the render workers and the host.
///
/// All mutation happens under the mutex, so a reader holding the lock never
/// observes a half-written tile. Cloning yields another handle to the same
/// buffer.
#[derive(Debug, Clone)]
pub struct SharedFramebuffer {
    inner: Arc<Mutex<Framebuffer>>,
}

impl SharedFramebuffer {
    pub fn new(width: u32, height: u32) -> Self {
        Self::from_buffer(Framebuffer::new(width, height))
    }

    pub fn from_buffer(buffer: Framebuffer) -> Self {
        Self {
            inner: Arc::new(Mutex::new(buffer)),
        }
    }

    /// Lock the buffer. A worker that panicked while holding the lock cannot
    /// have left a torn tile (writes are plain slice copies), so poisoning is
    /// ignored.
    pub fn lock(&self) -> MutexGuard<'_, Framebuffer> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Copy of the current contents.
    pub fn snapshot(&self) -> Framebuffer {
        self.lock().clone()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        let fb = self.lock();
        (fb.width, fb.height)
    }
}
