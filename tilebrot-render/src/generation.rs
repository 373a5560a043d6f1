use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Version tag of one render request.
///
/// Generations are handed out in strictly increasing order; only the most
/// recent one is current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Generation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Process-wide render generation plus progress counters for the current pass.
///
/// Created with the engine, advanced exactly once per draw, and polled by
/// every in-flight tile task. Advancing is the only cancellation mechanism:
/// tasks compare their captured generation against [`current`](Self::current)
/// and bail out on mismatch.
#[derive(Debug)]
pub struct GenerationCounter {
    current: AtomicU64,
    progress_done: AtomicUsize,
    progress_total: AtomicUsize,
}

impl GenerationCounter {
    pub fn new() -> Self {
        Self {
            current: AtomicU64::new(0),
            progress_done: AtomicUsize::new(0),
            progress_total: AtomicUsize::new(0),
        }
    }

    /// Start a new generation, implicitly cancelling every older one.
    pub fn advance(&self) -> Generation {
        Generation(self.current.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn current(&self) -> Generation {
        Generation(self.current.load(Ordering::SeqCst))
    }

    #[inline]
    pub fn is_current(&self, generation: Generation) -> bool {
        self.current.load(Ordering::Acquire) == generation.0
    }

    #[inline]
    pub fn is_stale(&self, generation: Generation) -> bool {
        !self.is_current(generation)
    }

    /// Reset progress for a new pass with `total` tiles.
    pub fn reset_progress(&self, total: usize) {
        self.progress_total.store(total, Ordering::Relaxed);
        self.progress_done.store(0, Ordering::Relaxed);
    }

    pub fn inc_progress(&self) {
        self.progress_done.fetch_add(1, Ordering::Relaxed);
    }

    /// Tiles finished in the current pass as `(done, total)`.
    pub fn progress(&self) -> (usize, usize) {
        (
            self.progress_done.load(Ordering::Relaxed),
            self.progress_total.load(Ordering::Relaxed),
        )
    }
}

impl Default for GenerationCounter {
    fn default() -> Self {
        Self::new()
    }
}
