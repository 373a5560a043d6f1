use crate::color::PixelColor;
use crate::tile::Tile;

/// Outcome of sampling a tile's boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeScan {
    /// Every boundary pixel has this color; the interior is assumed to match.
    Uniform(PixelColor),
    /// At least one boundary pixel differs from the top-left one.
    Mixed,
    /// The sampler reported that the pass was superseded.
    Cancelled,
}

/// Sample the four edges of `tile` and report whether they share one color.
///
/// `sample(dx, dy)` returns the color of the pixel at that offset inside the
/// tile, or `None` once the render generation has gone stale. The scan stops
/// at the first mismatch.
///
/// This is a heuristic: a filament that crosses the interior without
/// touching the boundary is painted over. Tiles narrower than three pixels
/// have no interior and are always reported as `Mixed`.
pub fn scan_edges<S>(tile: &Tile, mut sample: S) -> EdgeScan
where
    S: FnMut(u32, u32) -> Option<PixelColor>,
{
    let size = tile.size;
    if size < 3 {
        return EdgeScan::Mixed;
    }

    let Some(first) = sample(0, 0) else {
        return EdgeScan::Cancelled;
    };
    let last = size - 1;

    // Top and bottom rows.
    for dx in 0..size {
        for dy in [0, last] {
            if dx == 0 && dy == 0 {
                continue;
            }
            match sample(dx, dy) {
                None => return EdgeScan::Cancelled,
                Some(c) if c != first => return EdgeScan::Mixed,
                Some(_) => {}
            }
        }
    }

    // Left and right columns (corners already checked above).
    for dy in 1..last {
        for dx in [0, last] {
            match sample(dx, dy) {
                None => return EdgeScan::Cancelled,
                Some(c) if c != first => return EdgeScan::Mixed,
                Some(_) => {}
            }
        }
    }

    EdgeScan::Uniform(first)
}

/// An RGBA block of `size × size` pixels all set to `color`.
pub fn fill_block(color: PixelColor, size: u32) -> Vec<u8> {
    color.repeat(size as usize * size as usize)
}
