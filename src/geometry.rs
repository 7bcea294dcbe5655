//! Geometric primitives and hit-testing helpers shared by the selection
//! engine and the shape tools: bounding boxes, anchor handles, point-in-shape
//! predicates, segment intersection and modifier-key snapping.

use egui::{Pos2, Vec2};

/// Parameter-space epsilon for the strict segment-intersection test.
/// Endpoints shared between segments land on parameter 0 or 1; anything
/// inside `(EPS, 1 - EPS)` counts as a genuine crossing.
const INTERSECT_EPS: f32 = 1e-6;

// ============================================================================
// BOUNDING LINE — ordered corner pair describing an axis-aligned box
// ============================================================================

/// A selection's axis-aligned bounding box, stored as the two corners the
/// user actually dragged. `corner0`/`corner1` may be in any order while a
/// drag is live; [`BoundingLine::fix`] normalizes them to min/max.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingLine {
    pub corner0: Pos2,
    pub corner1: Pos2,
}

impl BoundingLine {
    pub fn new(corner0: Pos2, corner1: Pos2) -> Self {
        Self { corner0, corner1 }
    }

    /// Bounding box of a point cloud. Empty input collapses to the origin.
    pub fn from_points(points: &[Pos2]) -> Self {
        let first = points.first().copied().unwrap_or(Pos2::ZERO);
        let mut min = first;
        let mut max = first;
        for p in points {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Self::new(min, max)
    }

    /// Normalize so `corner0.x <= corner1.x` and `corner0.y <= corner1.y`.
    /// Drags can run in any direction, so this must be called whenever a
    /// free-form gesture ends.
    pub fn fix(&mut self) {
        if self.corner0.x > self.corner1.x {
            std::mem::swap(&mut self.corner0.x, &mut self.corner1.x);
        }
        if self.corner0.y > self.corner1.y {
            std::mem::swap(&mut self.corner0.y, &mut self.corner1.y);
        }
    }

    pub fn fixed(mut self) -> Self {
        self.fix();
        self
    }

    pub fn width(&self) -> f32 {
        (self.corner1.x - self.corner0.x).abs()
    }

    pub fn height(&self) -> f32 {
        (self.corner1.y - self.corner0.y).abs()
    }

    pub fn center(&self) -> Pos2 {
        Pos2::new(
            (self.corner0.x + self.corner1.x) / 2.0,
            (self.corner0.y + self.corner1.y) / 2.0,
        )
    }

    /// Axis-aligned containment test (assumes a fixed bounding line).
    pub fn contains(&self, p: Pos2) -> bool {
        p.x >= self.corner0.x && p.x <= self.corner1.x && p.y >= self.corner0.y && p.y <= self.corner1.y
    }

    pub fn translate(&mut self, offset: Vec2) {
        self.corner0 += offset;
        self.corner1 += offset;
    }

    pub fn translated(mut self, offset: Vec2) -> Self {
        self.translate(offset);
        self
    }

    /// Integer pixel region `(x, y, w, h)` covered by this bounding line.
    pub fn pixel_rect(&self) -> (i32, i32, u32, u32) {
        let b = self.fixed();
        let x = b.corner0.x.round() as i32;
        let y = b.corner0.y.round() as i32;
        let w = b.width().round().max(0.0) as u32;
        let h = b.height().round().max(0.0) as u32;
        (x, y, w, h)
    }
}

// ============================================================================
// ANCHORS — the 8 resize handles on a bounding line
// ============================================================================

/// One of the 8 handles on a selection's bounding box, in clockwise order
/// starting at the top-left corner (the index order the view draws them in).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Anchor {
    NorthWest,
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
}

impl Anchor {
    pub const ALL: [Anchor; 8] = [
        Anchor::NorthWest,
        Anchor::North,
        Anchor::NorthEast,
        Anchor::East,
        Anchor::SouthEast,
        Anchor::South,
        Anchor::SouthWest,
        Anchor::West,
    ];

    pub fn index(self) -> usize {
        match self {
            Anchor::NorthWest => 0,
            Anchor::North => 1,
            Anchor::NorthEast => 2,
            Anchor::East => 3,
            Anchor::SouthEast => 4,
            Anchor::South => 5,
            Anchor::SouthWest => 6,
            Anchor::West => 7,
        }
    }

    pub fn is_corner(self) -> bool {
        matches!(
            self,
            Anchor::NorthWest | Anchor::NorthEast | Anchor::SouthEast | Anchor::SouthWest
        )
    }

    /// Outward direction of the handle, as axis signs.
    pub fn outward(self) -> Vec2 {
        match self {
            Anchor::NorthWest => Vec2::new(-1.0, -1.0),
            Anchor::North => Vec2::new(0.0, -1.0),
            Anchor::NorthEast => Vec2::new(1.0, -1.0),
            Anchor::East => Vec2::new(1.0, 0.0),
            Anchor::SouthEast => Vec2::new(1.0, 1.0),
            Anchor::South => Vec2::new(0.0, 1.0),
            Anchor::SouthWest => Vec2::new(-1.0, 1.0),
            Anchor::West => Vec2::new(-1.0, 0.0),
        }
    }
}

/// The 8 anchor positions derived from a bounding line. Never stored across
/// edits — recompute whenever the bounding line changes.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AnchorSet {
    points: [Pos2; 8],
}

impl AnchorSet {
    pub fn from_bounds(bounds: &BoundingLine) -> Self {
        let b = bounds.fixed();
        let (min, max) = (b.corner0, b.corner1);
        let mid_x = (min.x + max.x) / 2.0;
        let mid_y = (min.y + max.y) / 2.0;
        Self {
            points: [
                min,                      // NorthWest
                Pos2::new(mid_x, min.y),  // North
                Pos2::new(max.x, min.y),  // NorthEast
                Pos2::new(max.x, mid_y),  // East
                max,                      // SouthEast
                Pos2::new(mid_x, max.y),  // South
                Pos2::new(min.x, max.y),  // SouthWest
                Pos2::new(min.x, mid_y),  // West
            ],
        }
    }

    pub fn point(&self, anchor: Anchor) -> Pos2 {
        self.points[anchor.index()]
    }

    pub fn points(&self) -> &[Pos2; 8] {
        &self.points
    }

    /// Which handle (if any) is within `grab_radius` of `pos`. Corners are
    /// checked before edge midpoints so a corner wins where they overlap on
    /// tiny selections.
    pub fn hit(&self, pos: Pos2, grab_radius: f32) -> Option<Anchor> {
        let corners = [Anchor::NorthWest, Anchor::NorthEast, Anchor::SouthEast, Anchor::SouthWest];
        for anchor in corners {
            if pos.distance(self.point(anchor)) <= grab_radius {
                return Some(anchor);
            }
        }
        let edges = [Anchor::North, Anchor::East, Anchor::South, Anchor::West];
        for anchor in edges {
            if pos.distance(self.point(anchor)) <= grab_radius {
                return Some(anchor);
            }
        }
        None
    }
}

// ============================================================================
// SEGMENTS
// ============================================================================

/// A directed line segment, the building block of a lasso path.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Segment {
    pub a: Pos2,
    pub b: Pos2,
}

impl Segment {
    pub fn new(a: Pos2, b: Pos2) -> Self {
        Self { a, b }
    }

    pub fn is_degenerate(&self) -> bool {
        self.a == self.b
    }

    pub fn translate(&mut self, offset: Vec2) {
        self.a += offset;
        self.b += offset;
    }
}

// ============================================================================
// PREDICATES
// ============================================================================

/// True iff `(x, y)` lies inside the ellipse inscribed in `bounds`:
/// `(x-h)²/a² + (y-k)²/b² <= 1` with center `(h, k)` and semi-axes `(a, b)`.
/// Degenerate (zero-area) bounds contain nothing.
pub fn point_in_ellipse(bounds: &BoundingLine, x: f32, y: f32) -> bool {
    let b = bounds.fixed();
    let semi_x = b.width() / 2.0;
    let semi_y = b.height() / 2.0;
    if semi_x <= 0.0 || semi_y <= 0.0 {
        return false;
    }
    let center = b.center();
    let dx = (x - center.x) / semi_x;
    let dy = (y - center.y) / semi_y;
    dx * dx + dy * dy <= 1.0
}

/// Ray-casting parity test: true iff `point` is strictly enclosed by the
/// polygon described by `segments`. Degenerate segments are skipped rather
/// than tripping a division by zero.
pub fn point_in_polygon(point: Pos2, segments: &[Segment]) -> bool {
    let mut inside = false;
    for seg in segments {
        if seg.is_degenerate() {
            continue;
        }
        let (p1, p2) = (seg.a, seg.b);
        if (p1.y > point.y) != (p2.y > point.y) {
            let t = (point.y - p1.y) / (p2.y - p1.y);
            let cross_x = p1.x + t * (p2.x - p1.x);
            if point.x < cross_x {
                inside = !inside;
            }
        }
    }
    inside
}

/// True iff `candidate` properly crosses any segment in `existing`.
///
/// Solves the 2×2 system for each pair; a crossing only counts when both
/// intersection parameters are strictly inside `(0, 1)`, so segments that
/// merely touch at an endpoint (a lasso continuing from its last point, or
/// closing onto its start) are not flagged. Parallel pairs are skipped.
pub fn segments_intersect(candidate: Segment, existing: &[Segment]) -> bool {
    existing.iter().any(|seg| segment_pair_intersects(candidate, *seg))
}

fn segment_pair_intersects(s: Segment, t: Segment) -> bool {
    let r = s.b - s.a;
    let d = t.b - t.a;
    let denom = r.x * d.y - r.y * d.x;
    if denom == 0.0 {
        return false;
    }
    let w = t.a - s.a;
    let u = (w.x * d.y - w.y * d.x) / denom;
    let v = (w.x * r.y - w.y * r.x) / denom;
    u > INTERSECT_EPS && u < 1.0 - INTERSECT_EPS && v > INTERSECT_EPS && v < 1.0 - INTERSECT_EPS
}

// ============================================================================
// MODIFIER-KEY SNAPPING
// ============================================================================

/// Snap the `start -> end` vector to the nearest of the 8 compass directions
/// (0°, 45°, 90°, ...), preserving its length. Used when a modifier key
/// constrains a line.
pub fn closest_angled_point(start: Pos2, end: Pos2) -> Pos2 {
    let delta = end - start;
    let len = delta.length();
    if len == 0.0 {
        return end;
    }
    let step = std::f32::consts::FRAC_PI_4; // 45°
    let angle = delta.y.atan2(delta.x);
    let snapped = (angle / step).round() * step;
    Pos2::new(start.x + len * snapped.cos(), start.y + len * snapped.sin())
}

/// Snap `end` so that `start -> end` spans a square (equal axis extents,
/// direction preserved). Used when a modifier key constrains a rectangle or
/// ellipse to a square/circle.
pub fn closest_square(start: Pos2, end: Pos2) -> Pos2 {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let side = dx.abs().max(dy.abs());
    Pos2::new(start.x + side * dx.signum(), start.y + side * dy.signum())
}

/// Chebyshev-style closeness: both axis deltas within `tolerance` pixels.
/// Decides e.g. whether a lasso click is near enough to its starting point
/// to auto-close the loop.
pub fn within_pixel_tolerance(a: Pos2, b: Pos2, tolerance: f32) -> bool {
    (a.x - b.x).abs() <= tolerance && (a.y - b.y).abs() <= tolerance
}
