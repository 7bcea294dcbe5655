//! Text rasterization for replayed text commands: glyph layout with kerning,
//! coverage accumulation, faux bold/italic, and a hard clip to the text box
//! the user committed.

use ab_glyph::{point, Font, FontArc, GlyphId, ScaleFont};
use image::Rgba;

use crate::canvas::Surface;
use crate::geometry::BoundingLine;

/// Horizontal placement of each text line inside its box.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextAlignment {
    Left,
    Center,
    Right,
}

impl TextAlignment {
    pub fn label(&self) -> &'static str {
        match self {
            TextAlignment::Left => "Left",
            TextAlignment::Center => "Center",
            TextAlignment::Right => "Right",
        }
    }
}

/// Lay out a single line, left-aligned at x = 0.
/// Returns positioned glyphs `(id, x, baseline_y)` and the line width.
pub fn layout_line(font: &FontArc, text: &str, font_size: f32) -> (Vec<(GlyphId, f32, f32)>, f32) {
    let scaled = font.as_scaled(font_size);
    let ascent = scaled.ascent();

    let mut glyphs = Vec::new();
    let mut cursor_x = 0.0f32;
    let mut last_glyph: Option<GlyphId> = None;

    for ch in text.chars() {
        let glyph_id = font.glyph_id(ch);
        if let Some(prev) = last_glyph {
            cursor_x += scaled.kern(prev, glyph_id);
        }
        glyphs.push((glyph_id, cursor_x, ascent));
        cursor_x += scaled.h_advance(glyph_id);
        last_glyph = Some(glyph_id);
    }

    (glyphs, cursor_x)
}

/// Rasterize multi-line text into `bounds` on the surface.
///
/// The box is authoritative: lines are aligned against its edges and pixels
/// falling outside it are clipped, even if the text is larger than the box.
pub fn draw_text(
    surface: &mut Surface,
    font: &FontArc,
    text: &str,
    font_size: f32,
    alignment: TextAlignment,
    bold: bool,
    italic: bool,
    bounds: &BoundingLine,
    color: Rgba<u8>,
) {
    let b = bounds.fixed();
    let x0 = b.corner0.x.floor().max(0.0) as i32;
    let y0 = b.corner0.y.floor().max(0.0) as i32;
    let x1 = (b.corner1.x.ceil() as i32).min(surface.width() as i32);
    let y1 = (b.corner1.y.ceil() as i32).min(surface.height() as i32);
    let buf_w = (x1 - x0).max(0) as u32;
    let buf_h = (y1 - y0).max(0) as u32;
    if buf_w == 0 || buf_h == 0 {
        return;
    }

    let scaled = font.as_scaled(font_size);
    let line_height = scaled.height();
    let mut coverage = vec![0.0f32; buf_w as usize * buf_h as usize];

    for (line_idx, line) in text.split('\n').enumerate() {
        let (glyphs, line_width) = layout_line(font, line, font_size);
        let align_x = match alignment {
            TextAlignment::Left => b.corner0.x,
            TextAlignment::Center => (b.corner0.x + b.corner1.x - line_width) / 2.0,
            TextAlignment::Right => b.corner1.x - line_width,
        };
        let baseline_offset = b.corner0.y + line_idx as f32 * line_height;

        for (glyph_id, gx, gy) in glyphs {
            let glyph = glyph_id
                .with_scale_and_position(font_size, point(align_x + gx, baseline_offset + gy));
            let baseline_y = baseline_offset + gy;
            if let Some(outlined) = font.outline_glyph(glyph) {
                let px_bounds = outlined.px_bounds();
                outlined.draw(|px, py, cov| {
                    let mut cx = px_bounds.min.x + px as f32;
                    let cy = px_bounds.min.y + py as f32;
                    if italic {
                        cx += (baseline_y - cy) * 0.2;
                    }
                    let ix = cx.round() as i32 - x0;
                    let iy = cy.round() as i32 - y0;
                    if ix >= 0 && iy >= 0 && (ix as u32) < buf_w && (iy as u32) < buf_h {
                        let idx = iy as usize * buf_w as usize + ix as usize;
                        coverage[idx] = coverage[idx].max(cov);
                        // Faux bold: stamp one extra pixel to the right.
                        if bold && (ix as u32) + 1 < buf_w {
                            coverage[idx + 1] = coverage[idx + 1].max(cov);
                        }
                    }
                });
            }
        }
    }

    let mut buf = vec![0u8; buf_w as usize * buf_h as usize * 4];
    for (i, &cov) in coverage.iter().enumerate() {
        if cov > 0.001 {
            let idx = i * 4;
            let a = (color[3] as f32 * cov).round().min(255.0) as u8;
            buf[idx] = color[0];
            buf[idx + 1] = color[1];
            buf[idx + 2] = color[2];
            buf[idx + 3] = a;
        }
    }
    surface.blit_blend_buf(x0, y0, buf_w, buf_h, &buf);
}
