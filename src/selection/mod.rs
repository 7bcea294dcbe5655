//! The anchor/selection transform engine shared by the rectangle, ellipse
//! and lasso selection tools: one phase machine, one set of 8 resize
//! anchors, one move/resize compositing pipeline, with the shape-specific
//! parts dispatched through [`SelectionShape`].
//!
//! The engine floats lifted pixels on the canvas preview surface while a
//! session is live and commits to the base raster — through a snapshot
//! command pushed onto the [`CommandLog`] — when the session ends.

pub mod lasso;
pub mod shape;

pub use lasso::{LassoPath, LassoStep, LASSO_CLOSE_TOLERANCE};
pub use shape::{fix_image_data, SelectionShape};

use std::time::{Duration, Instant};

use egui::{Key, Modifiers, Pos2, Vec2};
use image::{GrayImage, Luma, RgbaImage};

use crate::canvas::Canvas;
use crate::clipboard::Clipboard;
use crate::command::Command;
use crate::geometry::{closest_square, Anchor, AnchorSet, BoundingLine, Segment};
use crate::history::CommandLog;
use crate::magnetism::Magnetism;
use crate::{log_info, log_warn};

/// Pixel tolerance for grabbing a resize anchor.
pub const ANCHOR_GRAB_RADIUS: f32 = 10.0;
/// Pixels per arrow-key nudge (the grid pitch is used instead when
/// magnetism is enabled).
pub const NUDGE_STEP: f32 = 4.0;
/// Delay before a held arrow key starts repeating.
pub const NUDGE_FIRST_REPEAT: Duration = Duration::from_millis(450);
/// Delay between repeats once repeating.
pub const NUDGE_REPEAT: Duration = Duration::from_millis(60);

/// Drags smaller than this on either axis are accidental clicks and
/// deselect instead of creating a degenerate selection.
const MIN_SELECTION_EDGE: f32 = 2.0;

/// Which boundary shape the tool draws.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionKind {
    Rectangle,
    Ellipse,
    Lasso,
}

/// Lifecycle of a selection session.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SelectionPhase {
    Idle,
    /// The boundary is being defined: a drag for rectangle/ellipse,
    /// click-to-add-segment for lasso.
    Drawing,
    /// Closed and at rest; anchors are live.
    Selecting,
    Moving,
    Resizing(Anchor),
}

/// Debounce gate for arrow-key nudges: the first press registers
/// immediately, repeating starts only after a longer initial delay, then
/// runs fast. Fed timestamps by the caller — the engine owns no timers.
#[derive(Debug, Default)]
pub struct NudgeRepeater {
    next_allowed: Option<Instant>,
}

impl NudgeRepeater {
    pub fn allow(&mut self, now: Instant) -> bool {
        match self.next_allowed {
            None => {
                self.next_allowed = Some(now + NUDGE_FIRST_REPEAT);
                true
            }
            Some(at) if now >= at => {
                self.next_allowed = Some(now + NUDGE_REPEAT);
                true
            }
            Some(_) => false,
        }
    }

    pub fn reset(&mut self) {
        self.next_allowed = None;
    }
}

/// Foreground/mask/bounds captured when a resize drag starts, so every
/// pointer event rescales from the original pixels instead of compounding
/// resampling error.
struct ResizeSource {
    foreground: RgbaImage,
    mask: GrayImage,
}

pub struct SelectionEngine {
    kind: SelectionKind,
    shape: SelectionShape,
    bounds: BoundingLine,
    anchors: AnchorSet,
    phase: SelectionPhase,

    /// Pixels lifted off the base raster (masked to the shape).
    foreground: Option<RgbaImage>,
    mask: Option<GrayImage>,
    /// Full-canvas snapshot taken right after the hole was cleared; restored
    /// to the base on every move/resize event.
    background: Option<RgbaImage>,
    resize_source: Option<ResizeSource>,
    /// Shape/bounds as they were when the current drag started.
    shape_at_gesture: Option<SelectionShape>,
    bounds_at_gesture: BoundingLine,
    /// Pointer position when the current drag started.
    drag_origin: Pos2,

    is_moving_image: bool,
    is_currently_selecting: bool,
    has_been_reset: bool,
    /// The session changed pixels and must push a snapshot on commit.
    dirty: bool,
    focus_held: bool,
    /// Last lasso segment refused for self-intersection, for the view's
    /// invalid-state overlay.
    rejected_segment: Option<Segment>,

    pub magnetism: Magnetism,
    nudge: NudgeRepeater,
}

impl SelectionEngine {
    pub fn new(kind: SelectionKind) -> Self {
        let zero = BoundingLine::new(Pos2::ZERO, Pos2::ZERO);
        Self {
            kind,
            shape: shape_for(kind),
            bounds: zero,
            anchors: AnchorSet::from_bounds(&zero),
            phase: SelectionPhase::Idle,
            foreground: None,
            mask: None,
            background: None,
            resize_source: None,
            shape_at_gesture: None,
            bounds_at_gesture: zero,
            drag_origin: Pos2::ZERO,
            is_moving_image: false,
            is_currently_selecting: false,
            has_been_reset: false,
            dirty: false,
            focus_held: false,
            rejected_segment: None,
            magnetism: Magnetism::default(),
            nudge: NudgeRepeater::default(),
        }
    }

    // ------------------------------------------------------------------
    // Introspection (for the view layer and tests)
    // ------------------------------------------------------------------

    pub fn kind(&self) -> SelectionKind {
        self.kind
    }

    pub fn phase(&self) -> SelectionPhase {
        self.phase
    }

    pub fn bounds(&self) -> BoundingLine {
        self.bounds
    }

    pub fn anchors(&self) -> &AnchorSet {
        &self.anchors
    }

    pub fn lasso_segments(&self) -> &[Segment] {
        self.shape.lasso().map(LassoPath::segments).unwrap_or(&[])
    }

    pub fn rejected_segment(&self) -> Option<Segment> {
        self.rejected_segment
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_moving_image(&self) -> bool {
        self.is_moving_image
    }

    pub fn has_been_reset(&self) -> bool {
        self.has_been_reset
    }

    pub fn foreground(&self) -> Option<&RgbaImage> {
        self.foreground.as_ref()
    }

    // ------------------------------------------------------------------
    // Pointer input
    // ------------------------------------------------------------------

    pub fn pointer_down(
        &mut self,
        pos: Pos2,
        _modifiers: Modifiers,
        canvas: &mut Canvas,
        log: &mut CommandLog,
    ) {
        match self.phase {
            SelectionPhase::Idle => {
                self.has_been_reset = false;
                self.shape = shape_for(self.kind);
                self.drag_origin = pos;
                self.bounds = BoundingLine::new(pos, pos);
                if let Some(path) = self.shape.lasso_mut() {
                    path.add_point(pos);
                }
                self.phase = SelectionPhase::Drawing;
                self.hold_focus(log);
            }

            SelectionPhase::Drawing => {
                // Only the lasso keeps taking clicks while drawing.
                let Some(path) = self.shape.lasso_mut() else {
                    return;
                };
                match path.add_point(pos) {
                    LassoStep::Closed => {
                        self.rejected_segment = None;
                        self.close_lasso(log);
                    }
                    LassoStep::Rejected(seg) => {
                        log_warn!("lasso: rejected self-intersecting segment");
                        self.rejected_segment = Some(seg);
                    }
                    LassoStep::Added => {
                        self.rejected_segment = None;
                    }
                }
            }

            SelectionPhase::Selecting => {
                if let Some(anchor) = self.anchors.hit(pos, ANCHOR_GRAB_RADIUS) {
                    self.begin_resize(anchor, pos, canvas, log);
                } else if self.shape.hit_test(&self.bounds, pos) {
                    self.extract_if_needed(canvas);
                    self.begin_move(pos, log);
                } else {
                    // Click outside: commit the session and go idle.
                    self.commit(canvas, log);
                }
            }

            // Mid-drag; a second button press changes nothing.
            SelectionPhase::Moving | SelectionPhase::Resizing(_) => {}
        }
    }

    pub fn pointer_moved(&mut self, pos: Pos2, modifiers: Modifiers, canvas: &mut Canvas) {
        match self.phase {
            SelectionPhase::Drawing => {
                if self.kind == SelectionKind::Lasso {
                    return;
                }
                let end = if modifiers.shift {
                    closest_square(self.drag_origin, pos)
                } else {
                    pos
                };
                self.bounds = BoundingLine::new(self.drag_origin, end);
            }
            SelectionPhase::Moving => {
                let offset = self.magnetism.dispatch(pos);
                self.apply_move(offset, canvas);
            }
            SelectionPhase::Resizing(anchor) => {
                self.apply_resize(anchor, pos, modifiers, canvas);
            }
            _ => {}
        }
    }

    pub fn pointer_up(
        &mut self,
        _pos: Pos2,
        _modifiers: Modifiers,
        canvas: &mut Canvas,
        log: &mut CommandLog,
    ) {
        match self.phase {
            SelectionPhase::Drawing => {
                if self.kind == SelectionKind::Lasso {
                    return; // the lasso closes by clicks, not by release
                }
                self.bounds.fix();
                self.drop_focus(log);
                if self.bounds.width() < MIN_SELECTION_EDGE
                    || self.bounds.height() < MIN_SELECTION_EDGE
                {
                    self.reset_state(canvas, log);
                    return;
                }
                self.anchors = AnchorSet::from_bounds(&self.bounds);
                self.phase = SelectionPhase::Selecting;
            }
            SelectionPhase::Moving => {
                self.phase = SelectionPhase::Selecting;
                self.magnetism.end_gesture();
                self.shape_at_gesture = None;
                self.drop_focus(log);
            }
            SelectionPhase::Resizing(_) => {
                self.phase = SelectionPhase::Selecting;
                self.resize_source = None;
                self.shape_at_gesture = None;
                self.drop_focus(log);
            }
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Keyboard input
    // ------------------------------------------------------------------

    pub fn key_down(
        &mut self,
        key: Key,
        _modifiers: Modifiers,
        now: Instant,
        canvas: &mut Canvas,
        log: &mut CommandLog,
    ) {
        match key {
            Key::Escape => {
                if self.phase == SelectionPhase::Drawing {
                    // Nothing committed yet: just abandon the boundary.
                    self.reset_state(canvas, log);
                } else if self.phase != SelectionPhase::Idle {
                    self.commit(canvas, log);
                }
            }
            Key::Delete => {
                self.delete_selection(canvas, log);
            }
            Key::ArrowUp | Key::ArrowDown | Key::ArrowLeft | Key::ArrowRight => {
                self.nudge_key(key, now, canvas);
            }
            _ => {}
        }
    }

    pub fn key_released(&mut self, key: Key) {
        if matches!(key, Key::ArrowUp | Key::ArrowDown | Key::ArrowLeft | Key::ArrowRight) {
            self.nudge.reset();
        }
    }

    fn nudge_key(&mut self, key: Key, now: Instant, canvas: &mut Canvas) {
        // Arrow nudge applies to box-derived selections only.
        if self.kind == SelectionKind::Lasso || self.phase != SelectionPhase::Selecting {
            return;
        }
        if !self.nudge.allow(now) {
            return;
        }
        self.extract_if_needed(canvas);
        let step = self.magnetism.nudge_step(NUDGE_STEP);
        let offset = match key {
            Key::ArrowUp => Vec2::new(0.0, -step),
            Key::ArrowDown => Vec2::new(0.0, step),
            Key::ArrowLeft => Vec2::new(-step, 0.0),
            Key::ArrowRight => Vec2::new(step, 0.0),
            _ => return,
        };
        self.bounds_at_gesture = self.bounds;
        self.shape_at_gesture = Some(self.shape.clone());
        self.apply_move(offset, canvas);
        self.shape_at_gesture = None;
    }

    // ------------------------------------------------------------------
    // Clipboard operations
    // ------------------------------------------------------------------

    /// Copy the selected pixels. Non-destructive: samples the base raster
    /// when the selection has not been lifted yet.
    pub fn copy_selection(&self, canvas: &Canvas, clipboard: &mut Clipboard) -> bool {
        if !self.session_active() {
            return false;
        }
        if let Some(fg) = &self.foreground {
            if fg.width() == 0 || fg.height() == 0 {
                return false;
            }
            clipboard.copy(fg.clone());
            return true;
        }

        let (x0, y0, w, h) = self.bounds.pixel_rect();
        if w == 0 || h == 0 {
            return false;
        }
        let mask = self.shape.build_mask(&self.bounds);
        let mut out = RgbaImage::new(w, h);
        for dy in 0..h {
            for dx in 0..w {
                if mask.get_pixel(dx, dy).0[0] > 0 {
                    out.put_pixel(dx, dy, canvas.base.get_pixel(x0 + dx as i32, y0 + dy as i32));
                }
            }
        }
        clipboard.copy(out);
        true
    }

    /// Cut = copy + the selection's own delete.
    pub fn cut_selection(
        &mut self,
        canvas: &mut Canvas,
        clipboard: &mut Clipboard,
        log: &mut CommandLog,
    ) -> bool {
        if !self.copy_selection(canvas, clipboard) {
            return false;
        }
        self.delete_selection(canvas, log)
    }

    /// Install the clipboard buffer as a new top-left-anchored selection in
    /// moving-ready state, re-using the same anchor machinery. Any live
    /// session commits first.
    pub fn paste(
        &mut self,
        canvas: &mut Canvas,
        clipboard: &Clipboard,
        log: &mut CommandLog,
    ) -> bool {
        let Some(buffer) = clipboard.image().cloned() else {
            return false;
        };
        let (w, h) = buffer.dimensions();
        if w == 0 || h == 0 {
            return false;
        }
        if self.phase != SelectionPhase::Idle {
            self.commit(canvas, log);
        }

        log_info!("paste: {}x{} buffer", w, h);
        self.bounds = BoundingLine::new(Pos2::ZERO, Pos2::new(w as f32, h as f32));
        self.anchors = AnchorSet::from_bounds(&self.bounds);
        // Pasted content floats as a rectangular buffer whatever tool shape
        // is active; its own alpha does any further clipping.
        self.shape = SelectionShape::Rectangle;
        self.background = Some(canvas.base.to_image());
        self.mask = Some(GrayImage::from_pixel(w, h, Luma([255])));
        self.foreground = Some(buffer);
        self.is_currently_selecting = true;
        self.is_moving_image = true;
        self.has_been_reset = false;
        self.dirty = true;
        self.phase = SelectionPhase::Selecting;
        self.composite_current(canvas);
        true
    }

    /// Clear the shape region (interior only, never the bounding box) and
    /// commit a snapshot command.
    pub fn delete_selection(&mut self, canvas: &mut Canvas, log: &mut CommandLog) -> bool {
        if !self.session_active() {
            return false;
        }
        if self.is_currently_selecting {
            // The pixels are already lifted; dropping the float leaves the
            // hole behind.
            if let Some(bg) = &self.background {
                canvas.base.blit_replace(0, 0, bg);
            }
            canvas.preview.clear();
        } else {
            self.shape.clip_delete(canvas, &self.bounds);
        }
        self.push_snapshot(canvas, log);
        self.drop_focus(log);
        self.clear_session();
        self.phase = SelectionPhase::Idle;
        self.has_been_reset = true;
        true
    }

    // ------------------------------------------------------------------
    // Session lifecycle
    // ------------------------------------------------------------------

    /// End the session: flatten the floating pixels onto the base, push a
    /// snapshot command if anything changed, and return to idle.
    pub fn commit(&mut self, canvas: &mut Canvas, log: &mut CommandLog) {
        match self.phase {
            SelectionPhase::Idle => return,
            SelectionPhase::Drawing => {
                // No pixels were touched while drawing a boundary.
                self.reset_state(canvas, log);
                return;
            }
            _ => {}
        }
        if self.dirty {
            canvas.flatten();
            self.push_snapshot(canvas, log);
        } else {
            canvas.clear_preview();
        }
        self.drop_focus(log);
        self.clear_session();
        self.phase = SelectionPhase::Idle;
        self.has_been_reset = true;
    }

    /// Discard the session without recording a command. Floating pixels are
    /// flattened in place so no content silently disappears; callers that
    /// want an undoable entry use [`SelectionEngine::commit`]. Required
    /// before switching tools.
    pub fn reset_state(&mut self, canvas: &mut Canvas, log: &mut CommandLog) {
        if self.dirty {
            canvas.flatten();
        } else {
            canvas.clear_preview();
        }
        self.drop_focus(log);
        self.clear_session();
        self.phase = SelectionPhase::Idle;
        self.has_been_reset = true;
    }

    /// Commit the current session and switch the boundary shape for the
    /// next one.
    pub fn set_kind(&mut self, kind: SelectionKind, canvas: &mut Canvas, log: &mut CommandLog) {
        if self.phase != SelectionPhase::Idle {
            self.commit(canvas, log);
        }
        self.kind = kind;
        self.shape = shape_for(kind);
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn session_active(&self) -> bool {
        matches!(
            self.phase,
            SelectionPhase::Selecting | SelectionPhase::Moving | SelectionPhase::Resizing(_)
        )
    }

    fn close_lasso(&mut self, log: &mut CommandLog) {
        if let Some(path) = self.shape.lasso() {
            self.bounds = path.bounds().fixed();
        }
        self.anchors = AnchorSet::from_bounds(&self.bounds);
        self.phase = SelectionPhase::Selecting;
        self.drop_focus(log);
    }

    /// Lift the foreground buffer off the base — first time only, guarded
    /// by `is_currently_selecting` — and snapshot the background.
    fn extract_if_needed(&mut self, canvas: &mut Canvas) {
        if self.is_currently_selecting {
            return;
        }
        let (fg, mask) = self.shape.extract(canvas, &self.bounds);
        self.background = Some(canvas.base.to_image());
        self.foreground = Some(fg);
        self.mask = Some(mask);
        self.is_currently_selecting = true;
        self.is_moving_image = true;
        self.dirty = true;
        self.composite_current(canvas);
    }

    fn begin_move(&mut self, pos: Pos2, log: &mut CommandLog) {
        self.magnetism.begin_gesture(pos);
        self.drag_origin = pos;
        self.bounds_at_gesture = self.bounds;
        self.shape_at_gesture = Some(self.shape.clone());
        self.phase = SelectionPhase::Moving;
        self.hold_focus(log);
    }

    fn begin_resize(&mut self, anchor: Anchor, pos: Pos2, canvas: &mut Canvas, log: &mut CommandLog) {
        self.extract_if_needed(canvas);
        self.drag_origin = pos;
        self.bounds_at_gesture = self.bounds.fixed();
        self.shape_at_gesture = Some(self.shape.clone());
        if let (Some(fg), Some(mask)) = (&self.foreground, &self.mask) {
            self.resize_source = Some(ResizeSource { foreground: fg.clone(), mask: mask.clone() });
        }
        self.phase = SelectionPhase::Resizing(anchor);
        self.hold_focus(log);
    }

    fn apply_move(&mut self, offset: Vec2, canvas: &mut Canvas) {
        self.bounds = self.bounds_at_gesture.translated(offset);
        if let Some(SelectionShape::Lasso(source)) = &self.shape_at_gesture {
            let mut path = source.clone();
            path.translate(offset);
            self.shape = SelectionShape::Lasso(path);
        }
        self.anchors = AnchorSet::from_bounds(&self.bounds);
        self.dirty = true;
        self.composite_current(canvas);
    }

    fn apply_resize(&mut self, anchor: Anchor, pos: Pos2, modifiers: Modifiers, canvas: &mut Canvas) {
        let start = self.bounds_at_gesture;
        let mut b = start;

        if anchor.is_corner() && modifiers.shift {
            // Constrain proportions: one averaged delta applied to both axes
            // of the dragged corner. The sign comes from the pointer's net
            // direction relative to the drag start, so tiny jitters near the
            // corner don't flip the resize direction.
            let d = pos - self.drag_origin;
            let out = anchor.outward();
            let projection = d.x * out.x + d.y * out.y;
            let avg = (d.x.abs() + d.y.abs()) / 2.0;
            let amount = if projection >= 0.0 { avg } else { -avg };
            if out.x < 0.0 {
                b.corner0.x = start.corner0.x + out.x * amount;
            } else {
                b.corner1.x = start.corner1.x + out.x * amount;
            }
            if out.y < 0.0 {
                b.corner0.y = start.corner0.y + out.y * amount;
            } else {
                b.corner1.y = start.corner1.y + out.y * amount;
            }
        } else {
            // Each anchor edits a fixed part of the bounding line: corners
            // move both coordinates of one corner, edge midpoints one axis.
            match anchor {
                Anchor::NorthWest => b.corner0 = pos,
                Anchor::North => b.corner0.y = pos.y,
                Anchor::NorthEast => {
                    b.corner1.x = pos.x;
                    b.corner0.y = pos.y;
                }
                Anchor::East => b.corner1.x = pos.x,
                Anchor::SouthEast => b.corner1 = pos,
                Anchor::South => b.corner1.y = pos.y,
                Anchor::SouthWest => {
                    b.corner0.x = pos.x;
                    b.corner1.y = pos.y;
                }
                Anchor::West => b.corner0.x = pos.x,
            }
        }

        // Crossing the opposite edge mirrors the floating pixels.
        let flip_x = b.corner1.x < b.corner0.x;
        let flip_y = b.corner1.y < b.corner0.y;
        self.bounds = b.fixed();
        self.anchors = AnchorSet::from_bounds(&self.bounds);

        if let Some(SelectionShape::Lasso(source)) = &self.shape_at_gesture {
            let mut path = source.clone();
            path.map_bounds(&start, &self.bounds, flip_x, flip_y);
            self.shape = SelectionShape::Lasso(path);
        }

        self.dirty = true;
        if let (Some(bg), Some(src)) = (&self.background, &self.resize_source) {
            let (fg, mask) = self.shape.composite_resize(
                canvas,
                bg,
                &src.foreground,
                &src.mask,
                &self.bounds,
                flip_x,
                flip_y,
            );
            self.foreground = Some(fg);
            self.mask = Some(mask);
        }
    }

    fn composite_current(&self, canvas: &mut Canvas) {
        if let (Some(bg), Some(fg), Some(mask)) = (&self.background, &self.foreground, &self.mask)
        {
            self.shape.composite_move(canvas, bg, &self.bounds, fg, mask);
        }
    }

    fn push_snapshot(&self, canvas: &Canvas, log: &mut CommandLog) {
        log.commit(Command::Fill { image: canvas.base.to_image() }, canvas);
    }

    fn clear_session(&mut self) {
        self.foreground = None;
        self.mask = None;
        self.background = None;
        self.resize_source = None;
        self.shape_at_gesture = None;
        self.is_moving_image = false;
        self.is_currently_selecting = false;
        self.dirty = false;
        self.rejected_segment = None;
        self.magnetism.end_gesture();
        self.nudge.reset();
        self.shape = shape_for(self.kind);
        log_info!("selection: session cleared");
    }

    fn hold_focus(&mut self, log: &mut CommandLog) {
        if !self.focus_held {
            log.acquire_input_focus();
            self.focus_held = true;
        }
    }

    fn drop_focus(&mut self, log: &mut CommandLog) {
        if self.focus_held {
            log.release_input_focus();
            self.focus_held = false;
        }
    }
}

fn shape_for(kind: SelectionKind) -> SelectionShape {
    match kind {
        SelectionKind::Rectangle => SelectionShape::Rectangle,
        SelectionKind::Ellipse => SelectionShape::Ellipse,
        SelectionKind::Lasso => SelectionShape::Lasso(LassoPath::new()),
    }
}
