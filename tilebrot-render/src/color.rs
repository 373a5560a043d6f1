use tilebrot_core::EscapeResult;

/// An RGBA color, 8 bits per channel.
pub type PixelColor = [u8; 4];

pub const OPAQUE_BLACK: PixelColor = [0, 0, 0, 255];
pub const TRANSPARENT: PixelColor = [0, 0, 0, 0];

/// Maps an escape result to a displayable color.
///
/// Must be pure and deterministic: the edge accelerator compares colors of
/// boundary pixels and assumes equal inputs always produce equal outputs.
pub trait ColorMapper: Send + Sync {
    fn color_of(&self, result: EscapeResult) -> PixelColor;
}

impl<F> ColorMapper for F
where
    F: Fn(EscapeResult) -> PixelColor + Send + Sync,
{
    #[inline]
    fn color_of(&self, result: EscapeResult) -> PixelColor {
        self(result)
    }
}

/// Red-fixed palette that cycles green and blue every `512 / stride`
/// iterations. Bounded points are opaque black.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassicPalette {
    pub green_stride: u32,
    pub blue_stride: u32,
}

impl ClassicPalette {
    pub const fn new(green_stride: u32, blue_stride: u32) -> Self {
        Self {
            green_stride,
            blue_stride,
        }
    }
}

impl Default for ClassicPalette {
    fn default() -> Self {
        Self::new(32, 8)
    }
}

/// `|255 − (n·stride mod 512)|`, which stays within `0..=256` and hits 256
/// only when `n·stride ≡ 511`; clamp so odd strides cannot overflow a byte.
#[inline]
fn triangle_channel(n: u32, stride: u32) -> u8 {
    // 512 divides 2³², so wrapping keeps the residue exact.
    let phase = (n.wrapping_mul(stride) % 512) as i32;
    (255 - phase).unsigned_abs().min(255) as u8
}

impl ColorMapper for ClassicPalette {
    #[inline]
    fn color_of(&self, result: EscapeResult) -> PixelColor {
        match result {
            EscapeResult::Bounded => OPAQUE_BLACK,
            EscapeResult::Escaped(n) => [
                255,
                triangle_channel(n, self.green_stride),
                triangle_channel(n, self.blue_stride),
                255,
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounded_is_opaque_black() {
        assert_eq!(
            ClassicPalette::default().color_of(EscapeResult::Bounded),
            OPAQUE_BLACK
        );
    }

    #[test]
    fn first_escape_is_white() {
        assert_eq!(
            ClassicPalette::default().color_of(EscapeResult::Escaped(0)),
            [255, 255, 255, 255]
        );
    }

    #[test]
    fn channels_follow_the_triangle_wave() {
        let p = ClassicPalette::default();
        // n = 5: green |255 − 160| = 95, blue |255 − 40| = 215
        assert_eq!(p.color_of(EscapeResult::Escaped(5)), [255, 95, 215, 255]);
        // n = 12: green |255 − 384| = 129, blue |255 − 96| = 159
        assert_eq!(p.color_of(EscapeResult::Escaped(12)), [255, 129, 159, 255]);
        // n = 16 wraps green back to 255.
        assert_eq!(p.color_of(EscapeResult::Escaped(16))[1], 255);
    }

    #[test]
    fn huge_counts_do_not_overflow() {
        let p = ClassicPalette::new(33, 7);
        for n in [u32::MAX, u32::MAX - 1, 1 << 31] {
            let c = p.color_of(EscapeResult::Escaped(n));
            assert_eq!(c[0], 255);
            assert_eq!(c[3], 255);
        }
    }

    #[test]
    fn deterministic() {
        let p = ClassicPalette::default();
        for n in 0..600 {
            assert_eq!(
                p.color_of(EscapeResult::Escaped(n)),
                p.color_of(EscapeResult::Escaped(n))
            );
        }
    }

    #[test]
    fn closures_are_color_mappers() {
        let grey = |r: EscapeResult| match r {
            EscapeResult::Bounded => OPAQUE_BLACK,
            EscapeResult::Escaped(n) => {
                let v = (n % 256) as u8;
                [v, v, v, 255]
            }
        };
        assert_eq!(grey.color_of(EscapeResult::Escaped(7)), [7, 7, 7, 255]);
    }
}
