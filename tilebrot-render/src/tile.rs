use tilebrot_core::{Complex, Viewport};

/// A square block of the framebuffer, the unit of parallel work.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tile {
    /// Plane coordinate of the tile's top-left pixel.
    pub plane_origin: Complex,
    /// Pixel x of the top-left corner.
    pub x: u32,
    /// Pixel y of the top-left corner.
    pub y: u32,
    /// Side length in pixels.
    pub size: u32,
}

impl Tile {
    /// Number of pixels in this tile.
    pub fn pixel_count(&self) -> usize {
        self.size as usize * self.size as usize
    }

    /// Plane coordinate of the pixel at `(dx, dy)` inside the tile.
    #[inline]
    pub fn plane_point(&self, dx: u32, dy: u32, step: f64) -> Complex {
        self.plane_origin + Complex::new(dx as f64, dy as f64) * step
    }
}

/// Pixel extent `(width, height)` actually covered by whole tiles.
///
/// Dimensions that are not a multiple of `tile_size` leave a strip along the
/// right and bottom edges that no tile covers.
pub fn covered_extent(width: u32, height: u32, tile_size: u32) -> (u32, u32) {
    debug_assert!(tile_size > 0);
    (
        width / tile_size * tile_size,
        height / tile_size * tile_size,
    )
}

/// Slice the viewport into `⌊W/S⌋ × ⌊H/S⌋` tiles in row-major order.
pub fn partition(viewport: &Viewport, tile_size: u32) -> Vec<Tile> {
    debug_assert!(tile_size > 0, "tile size is validated by the config");
    let cols = viewport.width / tile_size;
    let rows = viewport.height / tile_size;
    let origin = viewport.origin();
    let tile_span = tile_size as f64 * viewport.step();

    let mut tiles = Vec::with_capacity(cols as usize * rows as usize);
    for row in 0..rows {
        for col in 0..cols {
            tiles.push(Tile {
                plane_origin: origin + Complex::new(col as f64, row as f64) * tile_span,
                x: col * tile_size,
                y: row * tile_size,
                size: tile_size,
            });
        }
    }
    tiles
}
