//! The raster target: an RGBA pixel [`Surface`] plus the two-surface
//! [`Canvas`] the engine draws on. The *base* surface is the persisted
//! document; the *preview* surface is transient and always cleared between
//! gestures — selection tools float pixels on it while a drag is live and
//! flatten onto the base when the gesture commits.

use image::{Rgba, RgbaImage};
use rayon::prelude::*;

/// Document size used when undo runs out of recorded resize dimensions and
/// no persisted size is available.
pub const DEFAULT_DOC_SIZE: (u32, u32) = (800, 600);

/// A pixel with zero alpha, returned for out-of-bounds reads.
pub const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

// ============================================================================
// SURFACE
// ============================================================================

/// An addressable 2D RGBA surface. Reads outside the surface yield
/// transparent pixels and writes outside it are dropped, so callers can blit
/// partially off-canvas content without pre-clipping.
#[derive(Clone)]
pub struct Surface {
    pixels: RgbaImage,
}

impl Surface {
    pub fn new(width: u32, height: u32) -> Self {
        Self { pixels: RgbaImage::new(width, height) }
    }

    pub fn from_image(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    pub fn get_pixel(&self, x: i32, y: i32) -> Rgba<u8> {
        if x < 0 || y < 0 || x as u32 >= self.width() || y as u32 >= self.height() {
            return TRANSPARENT;
        }
        *self.pixels.get_pixel(x as u32, y as u32)
    }

    pub fn put_pixel(&mut self, x: i32, y: i32, pixel: Rgba<u8>) {
        if x < 0 || y < 0 || x as u32 >= self.width() || y as u32 >= self.height() {
            return;
        }
        self.pixels.put_pixel(x as u32, y as u32, pixel);
    }

    /// Reset every pixel to transparent.
    pub fn clear(&mut self) {
        for p in self.pixels.pixels_mut() {
            *p = TRANSPARENT;
        }
    }

    pub fn fill(&mut self, color: Rgba<u8>) {
        for p in self.pixels.pixels_mut() {
            *p = color;
        }
    }

    /// Clear an inclusive-exclusive pixel region, clamped to the surface.
    pub fn clear_region(&mut self, x: i32, y: i32, w: u32, h: u32) {
        for py in y..y + h as i32 {
            for px in x..x + w as i32 {
                self.put_pixel(px, py, TRANSPARENT);
            }
        }
    }

    /// Copy a `w`×`h` region starting at `(x, y)` into a new buffer.
    /// Off-surface portions come back transparent.
    pub fn extract_region(&self, x: i32, y: i32, w: u32, h: u32) -> RgbaImage {
        let mut out = RgbaImage::new(w, h);
        for dy in 0..h {
            for dx in 0..w {
                out.put_pixel(dx, dy, self.get_pixel(x + dx as i32, y + dy as i32));
            }
        }
        out
    }

    /// Overwrite pixels with `src` at `(dst_x, dst_y)`, no blending.
    pub fn blit_replace(&mut self, dst_x: i32, dst_y: i32, src: &RgbaImage) {
        for (sx, sy, px) in src.enumerate_pixels() {
            self.put_pixel(dst_x + sx as i32, dst_y + sy as i32, *px);
        }
    }

    /// Source-over blend `src` onto this surface at `(dst_x, dst_y)`.
    pub fn blit_blend(&mut self, dst_x: i32, dst_y: i32, src: &RgbaImage) {
        for (sx, sy, px) in src.enumerate_pixels() {
            if px[3] == 0 {
                continue;
            }
            let x = dst_x + sx as i32;
            let y = dst_y + sy as i32;
            let blended = alpha_blend(self.get_pixel(x, y), *px);
            self.put_pixel(x, y, blended);
        }
    }

    /// Source-over blend a raw RGBA buffer (as produced by the rasterizers
    /// in `ops`) at `(dst_x, dst_y)`.
    pub fn blit_blend_buf(&mut self, dst_x: i32, dst_y: i32, buf_w: u32, buf_h: u32, data: &[u8]) {
        if data.len() < buf_w as usize * buf_h as usize * 4 {
            return;
        }
        for sy in 0..buf_h {
            for sx in 0..buf_w {
                let idx = (sy as usize * buf_w as usize + sx as usize) * 4;
                let src = Rgba([data[idx], data[idx + 1], data[idx + 2], data[idx + 3]]);
                if src[3] == 0 {
                    continue;
                }
                let x = dst_x + sx as i32;
                let y = dst_y + sy as i32;
                self.put_pixel(x, y, alpha_blend(self.get_pixel(x, y), src));
            }
        }
    }

    pub fn as_image(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn to_image(&self) -> RgbaImage {
        self.pixels.clone()
    }
}

/// Source-over alpha blending of two straight-alpha pixels.
pub fn alpha_blend(dst: Rgba<u8>, src: Rgba<u8>) -> Rgba<u8> {
    let sa = src[3] as f32 / 255.0;
    if sa >= 1.0 {
        return src;
    }
    if sa <= 0.0 {
        return dst;
    }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    if out_a <= 0.0 {
        return TRANSPARENT;
    }
    let ch = |s: u8, d: u8| -> u8 {
        let v = (s as f32 * sa + d as f32 * da * (1.0 - sa)) / out_a;
        v.round().min(255.0) as u8
    };
    Rgba([
        ch(src[0], dst[0]),
        ch(src[1], dst[1]),
        ch(src[2], dst[2]),
        (out_a * 255.0).round().min(255.0) as u8,
    ])
}

// ============================================================================
// CANVAS — base + preview surface pair
// ============================================================================

/// The document raster: the persisted *base* surface and the transient
/// *preview* surface, always the same size.
pub struct Canvas {
    width: u32,
    height: u32,
    pub base: Surface,
    pub preview: Surface,
}

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            base: Surface::new(width, height),
            preview: Surface::new(width, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Change the document dimensions. Both surfaces come back blank; the
    /// caller (a Resize command replay) re-blits whatever content survives.
    pub fn resize(&mut self, width: u32, height: u32) {
        let width = width.max(1);
        let height = height.max(1);
        self.width = width;
        self.height = height;
        self.base = Surface::new(width, height);
        self.preview = Surface::new(width, height);
    }

    pub fn clear_preview(&mut self) {
        self.preview.clear();
    }

    /// Blend the preview onto the base and clear it — the end of a floating
    /// selection gesture.
    pub fn flatten(&mut self) {
        let preview = self.preview.to_image();
        self.base.blit_blend(0, 0, &preview);
        self.preview.clear();
    }

    /// Flattened copy of base + preview for the view to display.
    pub fn composite(&self) -> RgbaImage {
        let mut out = self.base.to_image();
        let preview = self.preview.as_image();
        let row_bytes = self.width as usize * 4;
        out.par_chunks_mut(row_bytes)
            .enumerate()
            .for_each(|(y, row)| {
                for x in 0..self.width as usize {
                    let src = *preview.get_pixel(x as u32, y as u32);
                    if src[3] == 0 {
                        continue;
                    }
                    let idx = x * 4;
                    let dst = Rgba([row[idx], row[idx + 1], row[idx + 2], row[idx + 3]]);
                    let blended = alpha_blend(dst, src);
                    row[idx..idx + 4].copy_from_slice(&blended.0);
                }
            });
        out
    }
}
