//! Lasso path authoring: the user clicks out a free-form polygon one
//! segment at a time. A segment that would cross the existing path is
//! rejected (the view shows it in an invalid color; the path itself never
//! changes), and a click close enough to the starting point closes the
//! loop.

use egui::{Pos2, Vec2};

use crate::geometry::{self, BoundingLine, Segment};

/// Chebyshev pixel tolerance for auto-closing onto the start point.
pub const LASSO_CLOSE_TOLERANCE: f32 = 8.0;

/// Outcome of feeding one click into the path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum LassoStep {
    /// Point accepted; the path grew (or just started).
    Added,
    /// The candidate segment would cross the path. Path unchanged; the
    /// rejected segment is returned for the invalid-state overlay.
    Rejected(Segment),
    /// The click closed the loop; the path is now a polygon.
    Closed,
}

/// A free-form polygonal boundary. Open while being authored; closed and
/// non-self-intersecting afterwards (enforced per segment, not just at
/// closure).
#[derive(Clone, Debug, Default)]
pub struct LassoPath {
    segments: Vec<Segment>,
    start: Option<Pos2>,
    cursor: Option<Pos2>,
    closed: bool,
}

impl LassoPath {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none()
    }

    /// The last accepted point — where the next candidate segment starts.
    pub fn cursor(&self) -> Option<Pos2> {
        self.cursor
    }

    pub fn start(&self) -> Option<Pos2> {
        self.start
    }

    /// Feed one authoring click into the path.
    pub fn add_point(&mut self, p: Pos2) -> LassoStep {
        if self.closed {
            return LassoStep::Added;
        }
        let (Some(start), Some(cursor)) = (self.start, self.cursor) else {
            self.start = Some(p);
            self.cursor = Some(p);
            return LassoStep::Added;
        };

        // Close the loop when the click lands near the start point and
        // enough of a polygon exists. With fewer than 3 resulting segments
        // the close silently fails and the click is treated normally.
        if geometry::within_pixel_tolerance(p, start, LASSO_CLOSE_TOLERANCE)
            && self.non_degenerate_count() >= 2
        {
            let closing = Segment::new(cursor, start);
            if closing.is_degenerate() {
                self.closed = true;
                return LassoStep::Closed;
            }
            if geometry::segments_intersect(closing, &self.segments) {
                return LassoStep::Rejected(closing);
            }
            self.segments.push(closing);
            self.cursor = Some(start);
            self.closed = true;
            return LassoStep::Closed;
        }

        let candidate = Segment::new(cursor, p);
        if candidate.is_degenerate() {
            // A double-click in place adds nothing but is not an error.
            return LassoStep::Added;
        }
        // Shared endpoints land on intersection parameter 0/1, which the
        // strict test ignores, so the adjacent segment needs no exclusion.
        if geometry::segments_intersect(candidate, &self.segments) {
            return LassoStep::Rejected(candidate);
        }
        self.segments.push(candidate);
        self.cursor = Some(p);
        LassoStep::Added
    }

    pub fn bounds(&self) -> BoundingLine {
        let mut points: Vec<Pos2> = Vec::with_capacity(self.segments.len() + 1);
        for seg in &self.segments {
            points.push(seg.a);
        }
        if let Some(last) = self.segments.last() {
            points.push(last.b);
        } else if let Some(start) = self.start {
            points.push(start);
        }
        BoundingLine::from_points(&points)
    }

    pub fn translate(&mut self, offset: Vec2) {
        for seg in &mut self.segments {
            seg.translate(offset);
        }
        if let Some(s) = &mut self.start {
            *s += offset;
        }
        if let Some(c) = &mut self.cursor {
            *c += offset;
        }
    }

    /// Remap every endpoint from `old` bounds space into `new` bounds space,
    /// optionally mirrored. Used when a closed lasso selection is resized:
    /// the path follows the bounding box for hit-testing while the pixel
    /// mask is scaled as a bitmap.
    pub fn map_bounds(&mut self, old: &BoundingLine, new: &BoundingLine, flip_x: bool, flip_y: bool) {
        let old = old.fixed();
        let new = new.fixed();
        if old.width() <= 0.0 || old.height() <= 0.0 {
            return;
        }
        let sx = new.width() / old.width();
        let sy = new.height() / old.height();
        let map = |p: Pos2| -> Pos2 {
            let rel_x = (p.x - old.corner0.x) * sx;
            let rel_y = (p.y - old.corner0.y) * sy;
            let x = if flip_x { new.corner1.x - rel_x } else { new.corner0.x + rel_x };
            let y = if flip_y { new.corner1.y - rel_y } else { new.corner0.y + rel_y };
            Pos2::new(x, y)
        };
        for seg in &mut self.segments {
            seg.a = map(seg.a);
            seg.b = map(seg.b);
        }
        self.start = self.start.map(map);
        self.cursor = self.cursor.map(map);
    }

    fn non_degenerate_count(&self) -> usize {
        self.segments.iter().filter(|s| !s.is_degenerate()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    #[test]
    fn path_closes_near_its_start_point() {
        let mut path = LassoPath::new();
        assert_eq!(path.add_point(pos2(0.0, 0.0)), LassoStep::Added);
        assert_eq!(path.add_point(pos2(40.0, 0.0)), LassoStep::Added);
        assert_eq!(path.add_point(pos2(40.0, 40.0)), LassoStep::Added);
        assert_eq!(path.add_point(pos2(3.0, 4.0)), LassoStep::Closed);
        assert!(path.is_closed());
        assert_eq!(path.segments().len(), 3);
    }

    #[test]
    fn self_crossing_segment_is_rejected_and_path_unchanged() {
        let mut path = LassoPath::new();
        path.add_point(pos2(0.0, 0.0));
        path.add_point(pos2(40.0, 0.0));
        path.add_point(pos2(40.0, 40.0));
        let before = path.segments().to_vec();

        // Crossing back over the first segment.
        let step = path.add_point(pos2(20.0, -20.0));
        assert!(matches!(step, LassoStep::Rejected(_)));
        assert_eq!(path.segments(), &before[..]);
        assert!(!path.is_closed());

        // The user may continue from the same last point.
        assert_eq!(path.add_point(pos2(0.0, 40.0)), LassoStep::Added);
    }

    #[test]
    fn closing_with_too_few_segments_silently_fails() {
        let mut path = LassoPath::new();
        path.add_point(pos2(0.0, 0.0));
        path.add_point(pos2(40.0, 0.0));
        // Click near the start: only one real segment exists, so the close
        // does not happen and the click becomes an ordinary point.
        let step = path.add_point(pos2(2.0, 2.0));
        assert_eq!(step, LassoStep::Added);
        assert!(!path.is_closed());
    }

    #[test]
    fn map_bounds_scales_and_flips_endpoints() {
        let mut path = LassoPath::new();
        path.add_point(pos2(0.0, 0.0));
        path.add_point(pos2(10.0, 0.0));
        path.add_point(pos2(10.0, 10.0));
        path.add_point(pos2(1.0, 1.0));
        assert!(path.is_closed());

        let old = path.bounds();
        let new = BoundingLine::new(pos2(0.0, 0.0), pos2(20.0, 10.0));
        path.map_bounds(&old, &new, true, false);
        // (10, 0) maps to rel (20, 0), mirrored to x = 0.
        assert_eq!(path.segments()[0].b, pos2(0.0, 0.0));
    }
}
