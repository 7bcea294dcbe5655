//! The closed set of selection shapes and their shared behavior contract:
//! hit-testing, foreground extraction, move/resize compositing and
//! mask-respecting deletion. The engine in `selection` holds one of these
//! variants and dispatches through it; adding a shape means adding a variant
//! and satisfying the compiler, not overriding empty base methods.

use egui::Pos2;
use image::{imageops, GrayImage, Luma, RgbaImage};

use crate::canvas::{alpha_blend, Canvas, TRANSPARENT};
use crate::geometry::{self, BoundingLine};

use super::lasso::LassoPath;

/// Selection boundary shape. Rectangle and ellipse derive their pixel mask
/// from the bounding line; a lasso carries its authored polygon.
#[derive(Clone, Debug)]
pub enum SelectionShape {
    Rectangle,
    Ellipse,
    Lasso(LassoPath),
}

impl SelectionShape {
    pub fn is_lasso(&self) -> bool {
        matches!(self, SelectionShape::Lasso(_))
    }

    pub fn lasso(&self) -> Option<&LassoPath> {
        match self {
            SelectionShape::Lasso(path) => Some(path),
            _ => None,
        }
    }

    pub fn lasso_mut(&mut self) -> Option<&mut LassoPath> {
        match self {
            SelectionShape::Lasso(path) => Some(path),
            _ => None,
        }
    }

    /// Is `pos` inside the selection?
    pub fn hit_test(&self, bounds: &BoundingLine, pos: Pos2) -> bool {
        match self {
            SelectionShape::Rectangle => bounds.fixed().contains(pos),
            SelectionShape::Ellipse => geometry::point_in_ellipse(bounds, pos.x, pos.y),
            SelectionShape::Lasso(path) => geometry::point_in_polygon(pos, path.segments()),
        }
    }

    /// Rasterize the shape predicate into a mask covering the bounding box
    /// (255 inside, 0 outside). Zero-area bounds yield an empty mask.
    pub fn build_mask(&self, bounds: &BoundingLine) -> GrayImage {
        let (x0, y0, w, h) = bounds.pixel_rect();
        let mut mask = GrayImage::new(w, h);
        match self {
            SelectionShape::Rectangle => {
                for p in mask.pixels_mut() {
                    *p = Luma([255]);
                }
            }
            _ => {
                for dy in 0..h {
                    for dx in 0..w {
                        let px = x0 as f32 + dx as f32 + 0.5;
                        let py = y0 as f32 + dy as f32 + 0.5;
                        if self.hit_test(bounds, Pos2::new(px, py)) {
                            mask.put_pixel(dx, dy, Luma([255]));
                        }
                    }
                }
            }
        }
        mask
    }

    /// Lift the pixels under the selection off the base raster: returns the
    /// foreground buffer (masked; outside-shape pixels transparent) and its
    /// mask, and clears the shape interior — only the interior, never the
    /// whole bounding box — on the base.
    pub fn extract(&self, canvas: &mut Canvas, bounds: &BoundingLine) -> (RgbaImage, GrayImage) {
        let (x0, y0, w, h) = bounds.pixel_rect();
        let mask = self.build_mask(bounds);
        let mut foreground = RgbaImage::new(w, h);
        for dy in 0..h {
            for dx in 0..w {
                if mask.get_pixel(dx, dy).0[0] > 0 {
                    let x = x0 + dx as i32;
                    let y = y0 + dy as i32;
                    foreground.put_pixel(dx, dy, canvas.base.get_pixel(x, y));
                    canvas.base.put_pixel(x, y, TRANSPARENT);
                }
            }
        }
        (foreground, mask)
    }

    /// Clear the shape interior on the base raster without lifting anything
    /// (the delete operation for a selection that was never moved).
    pub fn clip_delete(&self, canvas: &mut Canvas, bounds: &BoundingLine) {
        let (x0, y0, w, h) = bounds.pixel_rect();
        let mask = self.build_mask(bounds);
        for dy in 0..h {
            for dx in 0..w {
                if mask.get_pixel(dx, dy).0[0] > 0 {
                    canvas.base.put_pixel(x0 + dx as i32, y0 + dy as i32, TRANSPARENT);
                }
            }
        }
    }

    /// Re-composite a moved selection: restore the background snapshot to
    /// the base, then float the masked foreground on the preview at the new
    /// bounds. Pixels of the foreground's bounding box that fall outside the
    /// shape mask are pulled back from the freshly restored base, so a
    /// non-rectangular move never paints its whole bounding box.
    pub fn composite_move(
        &self,
        canvas: &mut Canvas,
        background: &RgbaImage,
        bounds: &BoundingLine,
        foreground: &RgbaImage,
        mask: &GrayImage,
    ) {
        canvas.base.blit_replace(0, 0, background);
        canvas.preview.clear();
        let (x0, y0, w, h) = bounds.pixel_rect();
        if w == 0 || h == 0 {
            return;
        }
        let mut patch = canvas.base.extract_region(x0, y0, w, h);
        fix_image_data(&mut patch, foreground, mask);
        canvas.preview.blit_replace(x0, y0, &patch);
    }

    /// Re-composite a resized selection. The foreground captured when the
    /// resize gesture started is rescaled (and mirrored when the drag
    /// crossed the opposite edge) through a bitmap scale — a lasso's mask
    /// scales the same way, preserved exactly as cut rather than being
    /// re-rasterized from the new bounding box. Returns the scaled
    /// foreground and mask, which become the session's current pair.
    pub fn composite_resize(
        &self,
        canvas: &mut Canvas,
        background: &RgbaImage,
        source_fg: &RgbaImage,
        source_mask: &GrayImage,
        bounds: &BoundingLine,
        flip_x: bool,
        flip_y: bool,
    ) -> (RgbaImage, GrayImage) {
        let (x0, y0, w, h) = bounds.pixel_rect();
        canvas.base.blit_replace(0, 0, background);
        canvas.preview.clear();
        if w == 0 || h == 0 || source_fg.width() == 0 || source_fg.height() == 0 {
            // Zero-area resize: nothing floats, but the session stays alive.
            return (RgbaImage::new(w, h), GrayImage::new(w, h));
        }

        let mut scaled_fg = imageops::resize(source_fg, w, h, imageops::FilterType::Nearest);
        if flip_x {
            scaled_fg = imageops::flip_horizontal(&scaled_fg);
        }
        if flip_y {
            scaled_fg = imageops::flip_vertical(&scaled_fg);
        }

        let scaled_mask = match self {
            SelectionShape::Lasso(_) => {
                let mut m = imageops::resize(source_mask, w, h, imageops::FilterType::Nearest);
                if flip_x {
                    m = imageops::flip_horizontal(&m);
                }
                if flip_y {
                    m = imageops::flip_vertical(&m);
                }
                m
            }
            // Rectangle/ellipse masks are cheap to re-derive from the
            // predicate at the new bounds.
            _ => self.build_mask(bounds),
        };

        let mut patch = canvas.base.extract_region(x0, y0, w, h);
        fix_image_data(&mut patch, &scaled_fg, &scaled_mask);
        canvas.preview.blit_replace(x0, y0, &patch);
        (scaled_fg, scaled_mask)
    }
}

/// Per-pixel mask fix-up: blend the foreground over the patch where the
/// mask says "inside"; everywhere else keep the patch's freshly sampled
/// base pixels so the area outside the shape is never left blank.
pub fn fix_image_data(patch: &mut RgbaImage, foreground: &RgbaImage, mask: &GrayImage) {
    let w = patch.width().min(foreground.width()).min(mask.width());
    let h = patch.height().min(foreground.height()).min(mask.height());
    for y in 0..h {
        for x in 0..w {
            if mask.get_pixel(x, y).0[0] > 0 {
                let base = *patch.get_pixel(x, y);
                let fg = *foreground.get_pixel(x, y);
                patch.put_pixel(x, y, alpha_blend(base, fg));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;
    use image::Rgba;

    #[test]
    fn rectangle_mask_covers_the_whole_box() {
        let bounds = BoundingLine::new(pos2(0.0, 0.0), pos2(4.0, 4.0));
        let mask = SelectionShape::Rectangle.build_mask(&bounds);
        assert_eq!(mask.dimensions(), (4, 4));
        assert!(mask.pixels().all(|p| p.0[0] == 255));
    }

    #[test]
    fn ellipse_mask_excludes_box_corners() {
        let bounds = BoundingLine::new(pos2(0.0, 0.0), pos2(20.0, 10.0));
        let mask = SelectionShape::Ellipse.build_mask(&bounds);
        assert_eq!(mask.get_pixel(0, 0).0[0], 0);
        assert_eq!(mask.get_pixel(10, 5).0[0], 255);
    }

    #[test]
    fn extract_clears_only_the_shape_interior() {
        let mut canvas = Canvas::new(30, 30);
        canvas.base.fill(Rgba([50, 50, 50, 255]));
        let bounds = BoundingLine::new(pos2(0.0, 0.0), pos2(20.0, 10.0));
        let (fg, mask) = SelectionShape::Ellipse.extract(&mut canvas, &bounds);

        assert_eq!(fg.dimensions(), (20, 10));
        // Center was lifted and cleared on the base.
        assert_eq!(*fg.get_pixel(10, 5), Rgba([50, 50, 50, 255]));
        assert_eq!(canvas.base.get_pixel(10, 5), TRANSPARENT);
        // Bounding-box corner is outside the ellipse: untouched on base,
        // transparent in the foreground.
        assert_eq!(canvas.base.get_pixel(0, 0), Rgba([50, 50, 50, 255]));
        assert_eq!(*fg.get_pixel(0, 0), Rgba([0, 0, 0, 0]));
        assert_eq!(mask.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn fix_image_data_keeps_base_pixels_outside_the_mask() {
        let mut patch = RgbaImage::from_pixel(2, 1, Rgba([1, 1, 1, 255]));
        let fg = RgbaImage::from_pixel(2, 1, Rgba([200, 0, 0, 255]));
        let mut mask = GrayImage::new(2, 1);
        mask.put_pixel(0, 0, Luma([255]));

        fix_image_data(&mut patch, &fg, &mask);
        assert_eq!(*patch.get_pixel(0, 0), Rgba([200, 0, 0, 255]));
        assert_eq!(*patch.get_pixel(1, 0), Rgba([1, 1, 1, 255]));
    }
}
