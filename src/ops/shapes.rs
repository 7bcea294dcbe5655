//! Shape and poly-line rasterization onto a [`Surface`].
//!
//! Everything is drawn by evaluating a signed distance per pixel inside a
//! padded bounding box, converting distance to coverage (with a smoothstep
//! anti-aliasing band) and source-over blending the resulting RGBA buffer
//! onto the target surface. Rows are rasterized in parallel.

use egui::Pos2;
use image::Rgba;
use rayon::prelude::*;

use crate::canvas::Surface;
use crate::command::Style;
use crate::geometry::{self, BoundingLine, Segment};

/// Extra pixels around a shape's bounding box so the outline band and the
/// anti-aliasing ramp are never clipped.
const RASTER_PAD: f32 = 2.0;

#[inline]
fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// Distance-to-coverage with a one-pixel anti-aliasing band.
#[inline]
fn coverage(d: f32) -> f32 {
    smoothstep(0.5, -0.5, d)
}

#[inline]
fn sdf_box(px: f32, py: f32, hx: f32, hy: f32) -> f32 {
    let dx = px.abs() - hx;
    let dy = py.abs() - hy;
    let ox = dx.max(0.0);
    let oy = dy.max(0.0);
    (ox * ox + oy * oy).sqrt() + dx.max(dy).min(0.0)
}

#[inline]
fn sdf_ellipse(px: f32, py: f32, rx: f32, ry: f32) -> f32 {
    // Approximate SDF: exact near the axes, good enough for a 1px AA band.
    if rx <= 0.0 || ry <= 0.0 {
        return f32::MAX;
    }
    let k0 = ((px / rx) * (px / rx) + (py / ry) * (py / ry)).sqrt();
    let k1 = ((px / (rx * rx)) * (px / (rx * rx)) + (py / (ry * ry)) * (py / (ry * ry))).sqrt();
    if k1 == 0.0 { -rx.min(ry) } else { k0 * (k0 - 1.0) / k1 }
}

/// Distance from a point to a line segment.
#[inline]
fn sdf_line_segment(px: f32, py: f32, ax: f32, ay: f32, bx: f32, by: f32) -> f32 {
    let dx = bx - ax;
    let dy = by - ay;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return ((px - ax) * (px - ax) + (py - ay) * (py - ay)).sqrt();
    }
    let t = (((px - ax) * dx + (py - ay) * dy) / len_sq).clamp(0.0, 1.0);
    let cx = ax + t * dx;
    let cy = ay + t * dy;
    ((px - cx) * (px - cx) + (py - cy) * (py - cy)).sqrt()
}

/// Rasterize per-pixel coverage over a clamped bounding box and blend the
/// result onto the surface. `sample` maps canvas coordinates to
/// `(color, coverage)`.
fn rasterize_region<F>(surface: &mut Surface, bounds: &BoundingLine, pad: f32, sample: F)
where
    F: Fn(f32, f32) -> (Rgba<u8>, f32) + Sync,
{
    let b = bounds.fixed();
    let x0 = ((b.corner0.x - pad).floor() as i32).max(0);
    let y0 = ((b.corner0.y - pad).floor() as i32).max(0);
    let x1 = ((b.corner1.x + pad).ceil() as i32).min(surface.width() as i32);
    let y1 = ((b.corner1.y + pad).ceil() as i32).min(surface.height() as i32);
    let buf_w = (x1 - x0).max(0) as u32;
    let buf_h = (y1 - y0).max(0) as u32;
    if buf_w == 0 || buf_h == 0 {
        return;
    }

    let row_bytes = buf_w as usize * 4;
    let mut buf = vec![0u8; row_bytes * buf_h as usize];
    buf.par_chunks_mut(row_bytes).enumerate().for_each(|(row, row_buf)| {
        let py = (y0 + row as i32) as f32 + 0.5;
        for col in 0..buf_w as usize {
            let px = (x0 + col as i32) as f32 + 0.5;
            let (color, cov) = sample(px, py);
            if cov > 0.001 {
                let idx = col * 4;
                let a = (color[3] as f32 * cov).round().min(255.0) as u8;
                row_buf[idx] = color[0];
                row_buf[idx + 1] = color[1];
                row_buf[idx + 2] = color[2];
                row_buf[idx + 3] = a;
            }
        }
    });

    surface.blit_blend_buf(x0, y0, buf_w, buf_h, &buf);
}

/// Combine an interior distance with the style's fill/border settings:
/// border band in the primary color on top, interior in the secondary color
/// when the fill flag is set.
fn style_sample(d: f32, style: &Style) -> (Rgba<u8>, f32) {
    let border_half = (style.line_width * 0.5).max(0.5);
    let band = d.abs() - border_half;
    let border_cov = coverage(band);
    if border_cov > 0.001 {
        return (style.primary, border_cov);
    }
    if style.fill && d < 0.0 {
        return (style.secondary, coverage(d + border_half));
    }
    (Rgba([0, 0, 0, 0]), 0.0)
}

/// Draw a poly-line with constant width and color (a replayed stroke).
pub fn draw_polyline(surface: &mut Surface, points: &[Pos2], color: Rgba<u8>, width: f32) {
    if points.is_empty() {
        return;
    }
    if points.len() == 1 {
        // A click without movement still leaves a dot.
        let p = points[0];
        let bounds = BoundingLine::new(p, p);
        let half = (width * 0.5).max(0.5);
        rasterize_region(surface, &bounds, half + RASTER_PAD, move |px, py| {
            let d = ((px - p.x) * (px - p.x) + (py - p.y) * (py - p.y)).sqrt() - half;
            (color, coverage(d))
        });
        return;
    }

    let segments: Vec<[f32; 4]> = points
        .windows(2)
        .map(|w| [w[0].x, w[0].y, w[1].x, w[1].y])
        .collect();
    let bounds = BoundingLine::from_points(points);
    let half = (width * 0.5).max(0.5);
    rasterize_region(surface, &bounds, half + RASTER_PAD, move |px, py| {
        let mut d = f32::MAX;
        for s in &segments {
            d = d.min(sdf_line_segment(px, py, s[0], s[1], s[2], s[3]));
        }
        (color, coverage(d - half))
    });
}

/// Draw an axis-aligned rectangle spanning `bounds`.
pub fn draw_rect(surface: &mut Surface, bounds: &BoundingLine, style: &Style) {
    let b = bounds.fixed();
    let center = b.center();
    let hx = b.width() / 2.0;
    let hy = b.height() / 2.0;
    let style = *style;
    rasterize_region(surface, &b, style.line_width + RASTER_PAD, move |px, py| {
        let d = sdf_box(px - center.x, py - center.y, hx, hy);
        style_sample(d, &style)
    });
}

/// Draw the ellipse inscribed in `bounds`.
pub fn draw_ellipse(surface: &mut Surface, bounds: &BoundingLine, style: &Style) {
    let b = bounds.fixed();
    let center = b.center();
    let rx = b.width() / 2.0;
    let ry = b.height() / 2.0;
    if rx <= 0.0 || ry <= 0.0 {
        return;
    }
    let style = *style;
    rasterize_region(surface, &b, style.line_width + RASTER_PAD, move |px, py| {
        let d = sdf_ellipse(px - center.x, py - center.y, rx, ry);
        style_sample(d, &style)
    });
}

/// Draw a closed polygon: border band from segment distances, interior from
/// the ray-casting parity test.
pub fn draw_polygon(surface: &mut Surface, points: &[Pos2], style: &Style) {
    if points.len() < 3 {
        return;
    }
    let mut segments: Vec<Segment> = points
        .windows(2)
        .map(|w| Segment::new(w[0], w[1]))
        .collect();
    segments.push(Segment::new(points[points.len() - 1], points[0]));

    let bounds = BoundingLine::from_points(points);
    let style = *style;
    rasterize_region(surface, &bounds, style.line_width + RASTER_PAD, move |px, py| {
        let mut edge = f32::MAX;
        for s in &segments {
            edge = edge.min(sdf_line_segment(px, py, s.a.x, s.a.y, s.b.x, s.b.y));
        }
        let inside = geometry::point_in_polygon(Pos2::new(px, py), &segments);
        let d = if inside { -edge } else { edge };
        style_sample(d, &style)
    });
}
