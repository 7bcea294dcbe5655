//! End-to-end selection engine scenarios: drawing boundaries, moving and
//! resizing through anchors, cut/copy/paste round trips, and the snapshot
//! commands the sessions leave in the undo log.

use std::time::Instant;

use egui::{pos2, Key, Modifiers};
use image::Rgba;
use rasterboard::canvas::{Canvas, TRANSPARENT};
use rasterboard::clipboard::Clipboard;
use rasterboard::history::CommandLog;
use rasterboard::selection::{SelectionEngine, SelectionKind, SelectionPhase, NUDGE_STEP};

const RED: Rgba<u8> = Rgba([200, 0, 0, 255]);
const BLUE: Rgba<u8> = Rgba([0, 0, 200, 255]);

fn mods() -> Modifiers {
    Modifiers::default()
}

fn paint_region(canvas: &mut Canvas, x0: u32, y0: u32, x1: u32, y1: u32, color: Rgba<u8>) {
    for y in y0..y1 {
        for x in x0..x1 {
            canvas.base.put_pixel(x as i32, y as i32, color);
        }
    }
}

/// Drag out a rectangle/ellipse selection boundary.
fn select_box(
    engine: &mut SelectionEngine,
    canvas: &mut Canvas,
    log: &mut CommandLog,
    from: egui::Pos2,
    to: egui::Pos2,
) {
    engine.pointer_down(from, mods(), canvas, log);
    engine.pointer_moved(to, mods(), canvas);
    engine.pointer_up(to, mods(), canvas, log);
    assert_eq!(engine.phase(), SelectionPhase::Selecting);
}

#[test]
fn cut_then_paste_round_trips_the_pixel_buffer() {
    let mut canvas = Canvas::new(40, 40);
    let mut log = CommandLog::new();
    let mut clipboard = Clipboard::new();
    let mut engine = SelectionEngine::new(SelectionKind::Rectangle);

    paint_region(&mut canvas, 0, 0, 10, 10, RED);
    let original = canvas.base.extract_region(0, 0, 10, 10);

    select_box(&mut engine, &mut canvas, &mut log, pos2(0.0, 0.0), pos2(10.0, 10.0));
    assert!(engine.cut_selection(&mut canvas, &mut clipboard, &mut log));

    // The cut region is background now, and the cut committed a snapshot.
    assert_eq!(canvas.base.get_pixel(5, 5), TRANSPARENT);
    assert_eq!(engine.phase(), SelectionPhase::Idle);
    assert_eq!(log.undo_len(), 1);

    assert!(engine.paste(&mut canvas, &clipboard, &mut log));
    let bounds = engine.bounds();
    assert_eq!(bounds.corner0, pos2(0.0, 0.0));
    assert_eq!(bounds.corner1, pos2(10.0, 10.0));
    assert_eq!(engine.foreground().unwrap(), &original);

    // Committing the paste puts the pixels back on the base raster.
    engine.commit(&mut canvas, &mut log);
    assert_eq!(canvas.base.get_pixel(5, 5), RED);
    assert_eq!(log.undo_len(), 2);
}

#[test]
fn moving_a_rectangle_selection_relocates_pixels_and_leaves_a_hole() {
    let mut canvas = Canvas::new(60, 60);
    let mut log = CommandLog::new();
    let mut engine = SelectionEngine::new(SelectionKind::Rectangle);

    canvas.base.fill(BLUE);
    paint_region(&mut canvas, 5, 5, 35, 35, RED);

    select_box(&mut engine, &mut canvas, &mut log, pos2(5.0, 5.0), pos2(35.0, 35.0));

    // Grab well inside (clear of every anchor), drag 10 px right/down.
    engine.pointer_down(pos2(20.0, 20.0), mods(), &mut canvas, &mut log);
    assert_eq!(engine.phase(), SelectionPhase::Moving);
    assert!(log.input_focus_held(), "mid-gesture undo must be suspended");
    engine.pointer_moved(pos2(30.0, 30.0), mods(), &mut canvas);
    engine.pointer_up(pos2(30.0, 30.0), mods(), &mut canvas, &mut log);
    assert!(!log.input_focus_held());

    engine.commit(&mut canvas, &mut log);
    assert_eq!(canvas.base.get_pixel(30, 30), RED, "content moved");
    assert_eq!(canvas.base.get_pixel(44, 44), RED, "far corner of moved box");
    assert_eq!(canvas.base.get_pixel(6, 6), TRANSPARENT, "hole left behind");
    assert_eq!(canvas.base.get_pixel(2, 2), BLUE, "rest untouched");
    assert_eq!(log.undo_len(), 1);

    // Undoing the committed move restores a blank document (nothing was in
    // the log before the move).
    log.undo(&mut canvas, &(), &mut ());
    assert_eq!(canvas.base.get_pixel(30, 30), TRANSPARENT);
}

#[test]
fn moving_an_ellipse_clears_and_paints_only_the_shape_interior() {
    let mut canvas = Canvas::new(60, 60);
    let mut log = CommandLog::new();
    let mut engine = SelectionEngine::new(SelectionKind::Ellipse);

    canvas.base.fill(BLUE);
    select_box(&mut engine, &mut canvas, &mut log, pos2(0.0, 0.0), pos2(40.0, 24.0));

    engine.pointer_down(pos2(20.0, 12.0), mods(), &mut canvas, &mut log);
    assert_eq!(engine.phase(), SelectionPhase::Moving);
    engine.pointer_moved(pos2(20.0, 42.0), mods(), &mut canvas);
    engine.pointer_up(pos2(20.0, 42.0), mods(), &mut canvas, &mut log);
    engine.commit(&mut canvas, &mut log);

    // Center of the old box is hole; its corners never were inside the
    // ellipse and keep their pixels.
    assert_eq!(canvas.base.get_pixel(20, 12), TRANSPARENT);
    assert_eq!(canvas.base.get_pixel(1, 1), BLUE);
    // Destination center got the floated pixels.
    assert_eq!(canvas.base.get_pixel(20, 42), BLUE);
}

#[test]
fn dragging_the_south_east_anchor_scales_the_selection() {
    let mut canvas = Canvas::new(40, 40);
    let mut log = CommandLog::new();
    let mut engine = SelectionEngine::new(SelectionKind::Rectangle);

    paint_region(&mut canvas, 0, 0, 10, 10, RED);
    select_box(&mut engine, &mut canvas, &mut log, pos2(0.0, 0.0), pos2(10.0, 10.0));

    engine.pointer_down(pos2(10.0, 10.0), mods(), &mut canvas, &mut log);
    assert!(matches!(engine.phase(), SelectionPhase::Resizing(_)));
    engine.pointer_moved(pos2(20.0, 20.0), mods(), &mut canvas);
    engine.pointer_up(pos2(20.0, 20.0), mods(), &mut canvas, &mut log);

    assert_eq!(engine.bounds().corner1, pos2(20.0, 20.0));
    engine.commit(&mut canvas, &mut log);
    assert_eq!(canvas.base.get_pixel(15, 15), RED, "scaled content fills the new box");
    assert_eq!(canvas.base.get_pixel(19, 19), RED);
    assert_eq!(canvas.base.get_pixel(25, 25), TRANSPARENT);
}

#[test]
fn shift_constrains_corner_resize_to_a_square() {
    let mut canvas = Canvas::new(60, 60);
    let mut log = CommandLog::new();
    let mut engine = SelectionEngine::new(SelectionKind::Rectangle);

    paint_region(&mut canvas, 0, 0, 10, 10, RED);
    select_box(&mut engine, &mut canvas, &mut log, pos2(0.0, 0.0), pos2(10.0, 10.0));

    let shift = Modifiers { shift: true, ..Modifiers::default() };
    engine.pointer_down(pos2(10.0, 10.0), shift, &mut canvas, &mut log);
    assert!(matches!(engine.phase(), SelectionPhase::Resizing(_)));

    // Asymmetric drag: the averaged delta (10 + 4) / 2 = 7 goes to both axes.
    engine.pointer_moved(pos2(20.0, 14.0), shift, &mut canvas);
    let bounds = engine.bounds();
    assert_eq!(bounds.corner1, pos2(17.0, 17.0));
    assert_eq!(bounds.width(), bounds.height());

    // Dragging back past the start point shrinks instead of flipping sign
    // per-axis: the pointer's net direction picks the sign.
    engine.pointer_moved(pos2(6.0, 8.0), shift, &mut canvas);
    let bounds = engine.bounds();
    assert_eq!(bounds.corner1, pos2(7.0, 7.0));
}

#[test]
fn arrow_keys_nudge_the_selection_with_a_repeat_gate() {
    let mut canvas = Canvas::new(40, 40);
    let mut log = CommandLog::new();
    let mut engine = SelectionEngine::new(SelectionKind::Rectangle);

    paint_region(&mut canvas, 0, 0, 8, 8, RED);
    select_box(&mut engine, &mut canvas, &mut log, pos2(0.0, 0.0), pos2(8.0, 8.0));

    let now = Instant::now();
    engine.key_down(Key::ArrowRight, mods(), now, &mut canvas, &mut log);
    assert_eq!(engine.bounds().corner0, pos2(NUDGE_STEP, 0.0));

    // Held key within the debounce window does not move again.
    engine.key_down(Key::ArrowRight, mods(), now, &mut canvas, &mut log);
    assert_eq!(engine.bounds().corner0, pos2(NUDGE_STEP, 0.0));

    engine.key_released(Key::ArrowRight);
    engine.key_down(Key::ArrowRight, mods(), now, &mut canvas, &mut log);
    assert_eq!(engine.bounds().corner0, pos2(NUDGE_STEP * 2.0, 0.0));
}

#[test]
fn magnetism_quantizes_move_offsets() {
    let mut canvas = Canvas::new(60, 60);
    let mut log = CommandLog::new();
    let mut engine = SelectionEngine::new(SelectionKind::Rectangle);
    engine.magnetism.enabled = true;
    engine.magnetism.pitch = 10.0;

    paint_region(&mut canvas, 0, 0, 30, 30, RED);
    select_box(&mut engine, &mut canvas, &mut log, pos2(0.0, 0.0), pos2(30.0, 30.0));

    engine.pointer_down(pos2(15.0, 15.0), mods(), &mut canvas, &mut log);
    assert_eq!(engine.phase(), SelectionPhase::Moving);
    engine.pointer_moved(pos2(28.0, 19.0), mods(), &mut canvas);
    // Raw delta (13, 4) snaps to (10, 0).
    assert_eq!(engine.bounds().corner0, pos2(10.0, 0.0));
}

#[test]
fn lasso_authoring_rejects_crossings_then_closes_and_moves() {
    let mut canvas = Canvas::new(60, 40);
    let mut log = CommandLog::new();
    let mut engine = SelectionEngine::new(SelectionKind::Lasso);

    canvas.base.fill(BLUE);

    engine.pointer_down(pos2(0.0, 0.0), mods(), &mut canvas, &mut log);
    engine.pointer_down(pos2(30.0, 0.0), mods(), &mut canvas, &mut log);
    engine.pointer_down(pos2(30.0, 30.0), mods(), &mut canvas, &mut log);

    // A segment crossing the first edge is refused; the path is unchanged
    // and authoring continues from the same point.
    engine.pointer_down(pos2(15.0, -10.0), mods(), &mut canvas, &mut log);
    assert!(engine.rejected_segment().is_some());
    assert_eq!(engine.lasso_segments().len(), 2);
    assert_eq!(engine.phase(), SelectionPhase::Drawing);

    engine.pointer_down(pos2(0.0, 30.0), mods(), &mut canvas, &mut log);
    engine.pointer_down(pos2(1.0, 1.0), mods(), &mut canvas, &mut log); // auto-close
    assert_eq!(engine.phase(), SelectionPhase::Selecting);
    assert!(engine.rejected_segment().is_none());

    // Move the polygon 20 px right and commit via Escape.
    engine.pointer_down(pos2(15.0, 15.0), mods(), &mut canvas, &mut log);
    assert_eq!(engine.phase(), SelectionPhase::Moving);
    engine.pointer_moved(pos2(35.0, 15.0), mods(), &mut canvas);
    engine.pointer_up(pos2(35.0, 15.0), mods(), &mut canvas, &mut log);
    engine.key_down(Key::Escape, mods(), Instant::now(), &mut canvas, &mut log);

    assert_eq!(engine.phase(), SelectionPhase::Idle);
    assert_eq!(canvas.base.get_pixel(5, 5), TRANSPARENT, "hole inside old polygon");
    assert_eq!(canvas.base.get_pixel(45, 15), BLUE, "destination keeps content");
    assert_eq!(log.undo_len(), 1);
}

#[test]
fn tiny_drags_deselect_instead_of_creating_degenerate_sessions() {
    let mut canvas = Canvas::new(40, 40);
    let mut log = CommandLog::new();
    let mut engine = SelectionEngine::new(SelectionKind::Rectangle);

    engine.pointer_down(pos2(5.0, 5.0), mods(), &mut canvas, &mut log);
    engine.pointer_moved(pos2(6.0, 6.0), mods(), &mut canvas);
    engine.pointer_up(pos2(6.0, 6.0), mods(), &mut canvas, &mut log);

    assert_eq!(engine.phase(), SelectionPhase::Idle);
    assert!(engine.has_been_reset());
    assert_eq!(log.undo_len(), 0);
    assert!(!log.input_focus_held());
}

#[test]
fn clicking_outside_commits_the_session_and_returns_to_idle() {
    let mut canvas = Canvas::new(60, 60);
    let mut log = CommandLog::new();
    let mut engine = SelectionEngine::new(SelectionKind::Rectangle);

    canvas.base.fill(BLUE);
    paint_region(&mut canvas, 5, 5, 35, 35, RED);
    select_box(&mut engine, &mut canvas, &mut log, pos2(5.0, 5.0), pos2(35.0, 35.0));

    // Lift and move a little so the session is dirty.
    engine.pointer_down(pos2(20.0, 20.0), mods(), &mut canvas, &mut log);
    engine.pointer_moved(pos2(26.0, 20.0), mods(), &mut canvas);
    engine.pointer_up(pos2(26.0, 20.0), mods(), &mut canvas, &mut log);

    engine.pointer_down(pos2(55.0, 55.0), mods(), &mut canvas, &mut log);
    assert_eq!(engine.phase(), SelectionPhase::Idle);
    assert_eq!(log.undo_len(), 1, "click-outside committed a snapshot");
    assert_eq!(canvas.base.get_pixel(38, 20), RED, "moved pixels flattened");
    assert_eq!(canvas.base.get_pixel(6, 20), TRANSPARENT, "hole where the box moved away");
}

#[test]
fn copy_is_non_destructive_and_paste_reuses_the_anchor_machinery() {
    let mut canvas = Canvas::new(40, 40);
    let mut log = CommandLog::new();
    let mut clipboard = Clipboard::new();
    let mut engine = SelectionEngine::new(SelectionKind::Rectangle);

    paint_region(&mut canvas, 4, 4, 12, 12, RED);
    select_box(&mut engine, &mut canvas, &mut log, pos2(4.0, 4.0), pos2(12.0, 12.0));

    assert!(engine.copy_selection(&canvas, &mut clipboard));
    assert_eq!(canvas.base.get_pixel(8, 8), RED, "copy leaves the raster alone");
    assert!(clipboard.already_copied());

    engine.key_down(Key::Escape, mods(), Instant::now(), &mut canvas, &mut log);
    assert!(engine.paste(&mut canvas, &clipboard, &mut log));
    assert_eq!(engine.phase(), SelectionPhase::Selecting);
    assert_eq!(engine.anchors().points()[4], pos2(8.0, 8.0)); // SE anchor of the 8x8 paste
}

#[test]
fn delete_clears_only_the_ellipse_interior() {
    let mut canvas = Canvas::new(40, 40);
    let mut log = CommandLog::new();
    let mut engine = SelectionEngine::new(SelectionKind::Ellipse);

    canvas.base.fill(BLUE);
    select_box(&mut engine, &mut canvas, &mut log, pos2(0.0, 0.0), pos2(20.0, 10.0));
    assert!(engine.delete_selection(&mut canvas, &mut log));

    assert_eq!(canvas.base.get_pixel(10, 5), TRANSPARENT);
    assert_eq!(canvas.base.get_pixel(1, 1), BLUE, "bounding-box corner survives");
    assert_eq!(engine.phase(), SelectionPhase::Idle);
    assert_eq!(log.undo_len(), 1);
}
