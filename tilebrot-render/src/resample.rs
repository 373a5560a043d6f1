//! Instant zoom preview.
//!
//! Re-projects whatever is currently in the framebuffer to the new scale so
//! the host has something plausible to show while the real tiles are being
//! computed. The output is never authoritative: every preview is followed by
//! a full draw that overwrites it.

use tracing::debug;

use crate::framebuffer::Framebuffer;

/// Offset that keeps a `dim`-pixel image centred after scaling by `factor`.
///
/// Kept in `f64`: for extreme zoom factors it exceeds every integer type.
#[inline]
fn centering_offset(dim: u32, factor: f64) -> f64 {
    (dim as f64 * (factor - 1.0) * 0.5).round()
}

/// Re-project `buffer` in place for a zoom by `scale`.
///
/// `scale > 1` zooms in: the image is magnified (nearest neighbour) and the
/// centre cropped back to the buffer size. `scale < 1` zooms out: the image
/// is shrunk (box filter), the buffer cleared to transparent and the shrunk
/// image pasted in the middle. `scale == 1` leaves the buffer untouched.
pub fn resample_for_zoom(buffer: &mut Framebuffer, scale: f64) {
    debug_assert!(scale > 0.0 && scale.is_finite(), "zoom scale {scale}");
    if !(scale > 0.0 && scale.is_finite()) || scale == 1.0 {
        return;
    }
    debug!(
        scale,
        width = buffer.width,
        height = buffer.height,
        "Zoom preview"
    );
    if scale > 1.0 {
        magnify_and_crop(buffer, scale);
    } else {
        shrink_and_pad(buffer, scale);
    }
}

fn magnify_and_crop(buffer: &mut Framebuffer, scale: f64) {
    let source = buffer.clone();
    let (w, h) = (buffer.width, buffer.height);
    let off_x = centering_offset(w, scale);
    let off_y = centering_offset(h, scale);

    for y in 0..h {
        let sy = source_index(y as f64 + off_y, scale, h);
        for x in 0..w {
            let sx = source_index(x as f64 + off_x, scale, w);
            if let Some(px) = source.pixel(sx, sy) {
                buffer.set_pixel(x, y, px);
            }
        }
    }
}

/// Nearest source pixel for position `p` in an image magnified by `scale`.
#[inline]
fn source_index(p: f64, scale: f64, dim: u32) -> u32 {
    (p / scale).floor().clamp(0.0, (dim - 1) as f64) as u32
}

fn shrink_and_pad(buffer: &mut Framebuffer, scale: f64) {
    let source = buffer.clone();
    let (w, h) = (buffer.width, buffer.height);
    let shrunk_w = (w as f64 * scale).round() as u32;
    let shrunk_h = (h as f64 * scale).round() as u32;
    // Negative of the zoom-in offset: `dim * (1 - scale) / 2`, at most `dim / 2`.
    let off_x = -centering_offset(w, scale) as i64;
    let off_y = -centering_offset(h, scale) as i64;

    buffer.clear();
    for y in 0..shrunk_h {
        let (y0, y1) = box_span(y, scale, h);
        let dy = off_y + y as i64;
        if dy < 0 || dy >= h as i64 {
            continue;
        }
        for x in 0..shrunk_w {
            let dx = off_x + x as i64;
            if dx < 0 || dx >= w as i64 {
                continue;
            }
            let (x0, x1) = box_span(x, scale, w);
            buffer.set_pixel(dx as u32, dy as u32, box_average(&source, x0..x1, y0..y1));
        }
    }
}

/// Source range covered by shrunk pixel `p`; never empty.
#[inline]
fn box_span(p: u32, scale: f64, dim: u32) -> (u32, u32) {
    let start = ((p as f64 / scale).floor() as u32).min(dim - 1);
    let end = ((p + 1) as f64 / scale).floor() as u32;
    (start, end.clamp(start + 1, dim))
}

fn box_average(
    source: &Framebuffer,
    xs: std::ops::Range<u32>,
    ys: std::ops::Range<u32>,
) -> [u8; 4] {
    let mut sum = [0u64; 4];
    let mut count = 0u64;
    for y in ys {
        for x in xs.clone() {
            if let Some(px) = source.pixel(x, y) {
                for (acc, c) in sum.iter_mut().zip(px) {
                    *acc += c as u64;
                }
                count += 1;
            }
        }
    }
    if count == 0 {
        return [0; 4];
    }
    sum.map(|s| ((s + count / 2) / count) as u8)
}
