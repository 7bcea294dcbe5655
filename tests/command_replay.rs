//! Undo/redo manager behavior across heterogeneous commands, including the
//! dimension-stack lockstep that document resizes depend on.

use egui::pos2;
use image::{Rgba, RgbaImage};
use rasterboard::canvas::Canvas;
use rasterboard::command::{Command, Style};
use rasterboard::history::{CommandLog, GridOverlay, SnapshotStore};

/// In-memory persistence collaborator standing in for an autosave backend.
#[derive(Default)]
struct TestStore {
    image: Option<RgbaImage>,
    dimensions: Option<(u32, u32)>,
}

impl SnapshotStore for TestStore {
    fn last_image(&self) -> Option<RgbaImage> {
        self.image.clone()
    }
    fn last_dimensions(&self) -> Option<(u32, u32)> {
        self.dimensions
    }
}

/// Counts grid redraw requests issued after resize replays.
#[derive(Default)]
struct TestGrid {
    redraws: usize,
}

impl GridOverlay for TestGrid {
    fn redraw(&mut self) {
        self.redraws += 1;
    }
}

fn stroke_at(y: f32) -> Command {
    Command::Stroke {
        style: Style { line_width: 3.0, ..Style::default() },
        points: vec![pos2(2.0, y), pos2(30.0, y)],
    }
}

/// Commit a document resize the way a canvas-edge drag tool would: snapshot
/// the pre-resize raster, apply the new size, re-blit, then commit.
fn resize_document(canvas: &mut Canvas, log: &mut CommandLog, w: u32, h: u32) {
    let snapshot = canvas.base.to_image();
    canvas.resize(w, h);
    canvas.base.blit_replace(0, 0, &snapshot);
    log.commit(Command::Resize { last_image: snapshot }, canvas);
}

#[test]
fn undo_after_resize_restores_prior_dimensions_and_drops_the_stroke() {
    let mut canvas = Canvas::new(1000, 800);
    let mut log = CommandLog::new();
    let store = TestStore { image: None, dimensions: Some((1000, 800)) };
    let mut grid = TestGrid::default();

    resize_document(&mut canvas, &mut log, 1200, 900);
    assert_eq!(canvas.dimensions(), (1200, 900));

    let stroke = stroke_at(10.0);
    {
        let mut settled = std::collections::VecDeque::new();
        let mut ctx = rasterboard::command::ReplayCtx::new(&[], &mut settled);
        stroke.execute(&mut canvas, &mut ctx);
    }
    log.commit(stroke, &canvas);
    assert!(canvas.base.get_pixel(10, 10)[3] > 0);

    assert!(log.undo(&mut canvas, &store, &mut grid));
    assert_eq!(canvas.dimensions(), (1200, 900));
    assert_eq!(canvas.base.get_pixel(10, 10)[3], 0, "stroke must be gone");

    assert!(log.undo(&mut canvas, &store, &mut grid));
    assert_eq!(canvas.dimensions(), (1000, 800));
    assert_eq!(canvas.base.get_pixel(10, 10)[3], 0);
    assert!(grid.redraws >= 2, "grid must repaint after resize replays");
}

#[test]
fn undoing_the_last_resize_without_a_store_falls_back_to_the_default_size() {
    let mut canvas = Canvas::new(1000, 800);
    let mut log = CommandLog::new();

    resize_document(&mut canvas, &mut log, 1200, 900);
    assert!(log.undo(&mut canvas, &(), &mut ()));
    assert_eq!(canvas.dimensions(), rasterboard::canvas::DEFAULT_DOC_SIZE);
}

#[test]
fn redo_after_resize_undo_reapplies_the_recorded_dimensions() {
    let mut canvas = Canvas::new(1000, 800);
    let mut log = CommandLog::new();
    let store = TestStore { image: None, dimensions: Some((1000, 800)) };

    canvas.base.fill(Rgba([7, 7, 7, 255]));
    resize_document(&mut canvas, &mut log, 1200, 900);

    log.undo(&mut canvas, &store, &mut ());
    assert_eq!(canvas.dimensions(), (1000, 800));

    assert!(log.redo(&mut canvas, &mut ()));
    assert_eq!(canvas.dimensions(), (1200, 900));
    // Pre-resize content was re-blitted by the resize replay.
    assert_eq!(canvas.base.get_pixel(500, 400), Rgba([7, 7, 7, 255]));
    assert_eq!(log.resize_undo_dimensions(), &[(1200, 900)]);
    assert!(log.resize_redo_dimensions().is_empty());
}

#[test]
fn full_replay_restores_the_persisted_snapshot_underneath_the_log() {
    let mut canvas = Canvas::new(50, 50);
    let mut log = CommandLog::new();
    let store = TestStore {
        image: Some(RgbaImage::from_pixel(50, 50, Rgba([1, 2, 3, 255]))),
        dimensions: None,
    };

    log.commit(stroke_at(10.0), &canvas);
    log.commit(stroke_at(20.0), &canvas);
    assert!(log.undo(&mut canvas, &store, &mut ()));

    // The surviving stroke replayed over the autosave image.
    assert!(canvas.base.get_pixel(10, 10)[3] > 0);
    assert_eq!(canvas.base.get_pixel(40, 45), Rgba([1, 2, 3, 255]));
    assert_eq!(canvas.base.get_pixel(10, 20), Rgba([1, 2, 3, 255]), "undone stroke replaced by snapshot");
}

#[test]
fn stack_sizes_account_for_every_commit() {
    let mut canvas = Canvas::new(30, 30);
    let mut log = CommandLog::new();

    for i in 0..5 {
        log.commit(stroke_at(i as f32), &canvas);
    }
    log.undo(&mut canvas, &(), &mut ());
    log.undo(&mut canvas, &(), &mut ());
    assert_eq!(log.undo_len() + log.redo_len(), 5);

    // A fresh commit empties the redo stack.
    log.commit(stroke_at(9.0), &canvas);
    assert_eq!(log.redo_len(), 0);
    assert_eq!(log.undo_len(), 4);
}

#[test]
fn fill_commands_blit_the_stored_raster_wholesale() {
    let mut canvas = Canvas::new(16, 16);
    let mut log = CommandLog::new();

    let painted = RgbaImage::from_pixel(16, 16, Rgba([9, 8, 7, 255]));
    log.commit(Command::Fill { image: painted.clone() }, &canvas);
    log.commit(stroke_at(4.0), &canvas);

    log.undo(&mut canvas, &(), &mut ());
    assert_eq!(canvas.base.to_image(), painted);
}
