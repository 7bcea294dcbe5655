//! Command-log undo/redo manager.
//!
//! Undo is *replay from scratch*: the raster is cleared and every surviving
//! command re-executes in original order. That costs O(history) per undo but
//! no command ever needs an inverse, and heterogeneous commands (strokes,
//! whole-canvas fills, document resizes) all go through the same loop. Redo
//! is strictly additive: the popped command executes directly against the
//! current raster.
//!
//! Resize commands do not carry their target dimensions. Each history stack
//! has a companion dimension stack, kept in lockstep: the n-th resizer from
//! the bottom of a stack pairs with the n-th entry of its companion.

use std::collections::VecDeque;

use image::RgbaImage;

use crate::canvas::{Canvas, DEFAULT_DOC_SIZE};
use crate::command::{Command, ReplayCtx, SettledTask};
use crate::{log_info, log_warn};

// ============================================================================
// COLLABORATOR TRAITS
// ============================================================================

/// Externally-persisted document state (an autosave), consulted during undo
/// so the canvas falls back to the last known raster and size instead of a
/// default-sized blank document.
pub trait SnapshotStore {
    fn last_image(&self) -> Option<RgbaImage>;
    fn last_dimensions(&self) -> Option<(u32, u32)>;
}

/// No persistence: undo replays onto a blank raster.
impl SnapshotStore for () {
    fn last_image(&self) -> Option<RgbaImage> {
        None
    }
    fn last_dimensions(&self) -> Option<(u32, u32)> {
        None
    }
}

/// Overlay that must repaint after the document raster changes size.
pub trait GridOverlay {
    fn redraw(&mut self);
}

/// Headless use: no overlay to repaint.
impl GridOverlay for () {
    fn redraw(&mut self) {}
}

// ============================================================================
// COMMAND LOG
// ============================================================================

pub struct CommandLog {
    undo_stack: Vec<Command>,
    redo_stack: Vec<Command>,
    resize_undo_dims: Vec<(u32, u32)>,
    resize_redo_dims: Vec<(u32, u32)>,
    /// Gestures that must not be interrupted (a live selection drag, text
    /// mid-edit, a canvas-edge drag) hold the input focus; undo/redo are
    /// silent no-ops while any hold is outstanding.
    focus_depth: u32,
    /// Continuations to run once the raster has settled after a mutation.
    settled: VecDeque<SettledTask>,
}

impl Default for CommandLog {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandLog {
    pub fn new() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            resize_undo_dims: Vec::new(),
            resize_redo_dims: Vec::new(),
            focus_depth: 0,
            settled: VecDeque::new(),
        }
    }

    /// Record a completed user action. Any redoable future is discarded —
    /// branching history is not supported.
    pub fn commit(&mut self, command: Command, canvas: &Canvas) {
        log_info!("commit: {}", command.label());
        if command.is_resizer() {
            self.resize_undo_dims.push(canvas.dimensions());
        }
        self.undo_stack.push(command);
        self.redo_stack.clear();
        self.resize_redo_dims.clear();
    }

    /// Undo the most recent command by full replay. A no-op (returning
    /// `false`) when the stack is empty or the input focus is held.
    pub fn undo(
        &mut self,
        canvas: &mut Canvas,
        store: &dyn SnapshotStore,
        grid: &mut dyn GridOverlay,
    ) -> bool {
        if self.focus_depth > 0 || self.undo_stack.is_empty() {
            return false;
        }

        let top_is_resizer = self.undo_stack.last().is_some_and(Command::is_resizer);
        if top_is_resizer && self.resize_undo_dims.len() <= 1 {
            // Undoing the only recorded resize: replay it once more against
            // the last known prior document size (or the default) so the
            // canvas never ends up undefined-sized.
            let dims = [store.last_dimensions().unwrap_or(DEFAULT_DOC_SIZE)];
            if let Some(cmd) = self.undo_stack.last() {
                let mut ctx = ReplayCtx::new(&dims, &mut self.settled);
                cmd.execute(canvas, &mut ctx);
            }
            if let Some(cmd) = self.undo_stack.pop() {
                self.redo_stack.push(cmd);
            }
            if let Some(d) = self.resize_undo_dims.pop() {
                self.resize_redo_dims.push(d);
            }
        } else {
            canvas.base.clear();
            canvas.preview.clear();
            if let Some(cmd) = self.undo_stack.pop() {
                if cmd.is_resizer()
                    && let Some(d) = self.resize_undo_dims.pop()
                {
                    self.resize_redo_dims.push(d);
                }
                self.redo_stack.push(cmd);
            }
        }

        log_info!("undo: replaying {} command(s)", self.undo_stack.len());
        self.replay(canvas, store);
        self.drain_settled(grid);
        true
    }

    /// Redo the most recently undone command, executing it directly against
    /// the current raster. A no-op (returning `false`) when the stack is
    /// empty or the input focus is held.
    pub fn redo(&mut self, canvas: &mut Canvas, grid: &mut dyn GridOverlay) -> bool {
        if self.focus_depth > 0 || self.redo_stack.is_empty() {
            return false;
        }

        let Some(cmd) = self.redo_stack.pop() else {
            return false;
        };
        if cmd.is_resizer() {
            match self.resize_redo_dims.pop() {
                Some(d) => {
                    self.resize_undo_dims.push(d);
                    let dims = [d];
                    let mut ctx = ReplayCtx::new(&dims, &mut self.settled);
                    cmd.execute(canvas, &mut ctx);
                }
                None => {
                    // Lockstep violated upstream; fall back to the default
                    // size rather than leaving the document unsized.
                    log_warn!("redo: resize command without a paired dimension entry");
                    let mut ctx = ReplayCtx::new(&[], &mut self.settled);
                    cmd.execute(canvas, &mut ctx);
                }
            }
        } else {
            let mut ctx = ReplayCtx::new(&[], &mut self.settled);
            cmd.execute(canvas, &mut ctx);
        }
        log_info!("redo: {}", cmd.label());
        self.undo_stack.push(cmd);
        self.drain_settled(grid);
        true
    }

    /// Clear the raster, restore the persisted snapshot if one exists, and
    /// re-execute the surviving log in original order, feeding each resize
    /// its dimension entry in lockstep.
    fn replay(&mut self, canvas: &mut Canvas, store: &dyn SnapshotStore) {
        canvas.base.clear();
        canvas.preview.clear();
        if let Some(img) = store.last_image() {
            canvas.base.blit_replace(0, 0, &img);
        }
        let mut ctx = ReplayCtx::new(&self.resize_undo_dims, &mut self.settled);
        for cmd in &self.undo_stack {
            cmd.execute(canvas, &mut ctx);
        }
    }

    /// Run queued raster-settled continuations. Called only after the raster
    /// mutation that queued them has fully completed, which gives overlays
    /// the ordering guarantee timers used to approximate.
    fn drain_settled(&mut self, grid: &mut dyn GridOverlay) {
        while let Some(task) = self.settled.pop_front() {
            match task {
                SettledTask::RedrawGrid => grid.redraw(),
            }
        }
    }

    // ------------------------------------------------------------------
    // Input focus (shortcut routing ownership)
    // ------------------------------------------------------------------

    /// Take the input focus for an uninterruptible gesture. Nested holds
    /// are counted; undo/redo stay suspended until every hold is released.
    pub fn acquire_input_focus(&mut self) {
        self.focus_depth += 1;
    }

    pub fn release_input_focus(&mut self) {
        self.focus_depth = self.focus_depth.saturating_sub(1);
    }

    pub fn input_focus_held(&self) -> bool {
        self.focus_depth > 0
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn undo_len(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_len(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn resize_undo_dimensions(&self) -> &[(u32, u32)] {
        &self.resize_undo_dims
    }

    pub fn resize_redo_dimensions(&self) -> &[(u32, u32)] {
        &self.resize_redo_dims
    }

    pub fn undo_description(&self) -> Option<&'static str> {
        self.undo_stack.last().map(Command::label)
    }

    pub fn redo_description(&self) -> Option<&'static str> {
        self.redo_stack.last().map(Command::label)
    }

    /// All undoable labels, most recent first.
    pub fn undo_history(&self) -> Vec<&'static str> {
        self.undo_stack.iter().rev().map(Command::label).collect()
    }

    /// Structural clear — drops both stacks and their dimension companions.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.resize_undo_dims.clear();
        self.resize_redo_dims.clear();
    }
}
