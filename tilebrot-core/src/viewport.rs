use crate::complex::Complex;
use crate::error::CoreError;

/// The visible region of the complex plane and the pixel grid laid over it.
///
/// The region is described by its `center` and its vertical extent
/// `plane_height`; the horizontal extent follows from the pixel aspect
/// ratio so that one pixel spans the same plane distance on both axes.
/// Pixel `(0, 0)` maps to [`origin`](Self::origin), the corner with the
/// smallest real and imaginary parts, and both axes grow with the pixel
/// indices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    /// Centre of the viewport in the complex plane.
    pub center: Complex,

    /// Vertical extent of the visible region in plane units.
    pub plane_height: f64,

    /// Viewport width in pixels.
    pub width: u32,

    /// Viewport height in pixels.
    pub height: u32,
}

impl Viewport {
    pub const DEFAULT_PLANE_HEIGHT: f64 = 4.0;

    /// Create a viewport, rejecting empty pixel grids and degenerate extents.
    pub fn new(center: Complex, plane_height: f64, width: u32, height: u32) -> crate::Result<Self> {
        if width == 0 || height == 0 {
            return Err(CoreError::InvalidDimensions { width, height });
        }
        if plane_height <= 0.0 || !plane_height.is_finite() {
            return Err(CoreError::InvalidPlaneHeight(plane_height));
        }
        if !center.is_finite() {
            return Err(CoreError::InvalidCenter {
                re: center.re,
                im: center.im,
            });
        }
        Ok(Self {
            center,
            plane_height,
            width,
            height,
        })
    }

    /// A view centred on the origin showing `[-2, 2]` vertically.
    pub fn centered(width: u32, height: u32) -> crate::Result<Self> {
        Self::new(Complex::ZERO, Self::DEFAULT_PLANE_HEIGHT, width, height)
    }

    /// Horizontal extent in plane units.
    #[inline]
    pub fn plane_width(&self) -> f64 {
        self.plane_height * self.width as f64 / self.height as f64
    }

    /// Plane units per pixel, identical on both axes.
    #[inline]
    pub fn step(&self) -> f64 {
        self.plane_height / self.height as f64
    }

    /// Plane coordinate of pixel `(0, 0)`.
    #[inline]
    pub fn origin(&self) -> Complex {
        self.center - Complex::new(self.plane_width() * 0.5, self.plane_height * 0.5)
    }

    /// Map a pixel coordinate to a point on the complex plane.
    #[inline]
    pub fn to_plane(&self, px: u32, py: u32) -> Complex {
        self.to_plane_f64(px as f64, py as f64)
    }

    /// Like [`to_plane`](Self::to_plane) but for fractional pixel positions.
    #[inline]
    pub fn to_plane_f64(&self, px: f64, py: f64) -> Complex {
        self.origin() + Complex::new(px, py) * self.step()
    }

    /// Re-centre the view on the plane point under pixel `(px, py)`.
    ///
    /// Coordinates outside the pixel grid are allowed; the host may report a
    /// pointer position slightly past the edge. A pan that would leave the
    /// centre non-finite is rejected and the view is left unchanged.
    pub fn pan(&mut self, px: f64, py: f64) -> crate::Result<()> {
        let center = self.to_plane_f64(px, py);
        if !center.is_finite() {
            return Err(CoreError::InvalidCenter {
                re: center.re,
                im: center.im,
            });
        }
        self.center = center;
        Ok(())
    }

    /// Divide the plane extent by `factor`. Values above one zoom in.
    pub fn zoom(&mut self, factor: f64) -> crate::Result<()> {
        if factor <= 0.0 || !factor.is_finite() {
            return Err(CoreError::InvalidZoomFactor(factor));
        }
        let plane_height = self.plane_height / factor;
        if plane_height <= 0.0 || !plane_height.is_finite() {
            return Err(CoreError::InvalidPlaneHeight(plane_height));
        }
        self.plane_height = plane_height;
        Ok(())
    }

    pub fn zoom_in(&mut self, factor: f64) -> crate::Result<()> {
        self.zoom(factor)
    }

    /// Inverse of [`zoom_in`](Self::zoom_in): multiplies the plane extent by `factor`.
    pub fn zoom_out(&mut self, factor: f64) -> crate::Result<()> {
        if factor <= 0.0 || !factor.is_finite() {
            return Err(CoreError::InvalidZoomFactor(factor));
        }
        self.zoom(1.0 / factor)
    }

    /// Same centre and vertical extent over a new pixel grid.
    pub fn resized(&self, width: u32, height: u32) -> crate::Result<Self> {
        Self::new(self.center, self.plane_height, width, height)
    }

    /// The aspect ratio of the pixel grid (width / height).
    pub fn aspect_ratio(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}
