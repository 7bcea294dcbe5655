//! The closed set of replayable commands. A tool builds a command as the
//! side effect of a finished user action; from then on the command is owned
//! by whichever history stack holds it and is never mutated. Replaying a
//! command against a clean base raster always reproduces the same pixels —
//! the undo manager (`history`) relies on that to rebuild the document from
//! scratch.

use std::collections::VecDeque;

use ab_glyph::FontArc;
use egui::Pos2;
use image::{Rgba, RgbaImage};

use crate::canvas::{Canvas, DEFAULT_DOC_SIZE};
use crate::geometry::{closest_square, BoundingLine};
use crate::ops::text::TextAlignment;
use crate::ops::{shapes, text};

/// Stroke/shape/text styling captured at command creation time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Style {
    pub primary: Rgba<u8>,
    pub secondary: Rgba<u8>,
    pub line_width: f32,
    pub fill: bool,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            primary: Rgba([0, 0, 0, 255]),
            secondary: Rgba([255, 255, 255, 255]),
            line_width: 1.0,
            fill: false,
        }
    }
}

/// Geometry family of a shape command.
#[derive(Clone, Debug, PartialEq)]
pub enum ShapeKind {
    Rectangle,
    Ellipse,
    Polygon(Vec<Pos2>),
}

/// Work queued for after the raster has settled. Replaces the wall-clock
/// timers the event-driven host would otherwise need to sequence "resize,
/// then redraw overlays": tasks are drained only once the mutation that
/// queued them has fully completed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SettledTask {
    RedrawGrid,
}

/// Per-replay context handed to [`Command::execute`]. Resize commands do not
/// carry their own target dimensions; the undo manager feeds them in here,
/// in lockstep with its dimension stack.
pub struct ReplayCtx<'a> {
    dims: std::slice::Iter<'a, (u32, u32)>,
    settled: &'a mut VecDeque<SettledTask>,
}

impl<'a> ReplayCtx<'a> {
    pub fn new(dims: &'a [(u32, u32)], settled: &'a mut VecDeque<SettledTask>) -> Self {
        Self { dims: dims.iter(), settled }
    }

    fn next_dimensions(&mut self) -> Option<(u32, u32)> {
        self.dims.next().copied()
    }

    fn raster_settled(&mut self, task: SettledTask) {
        self.settled.push_back(task);
    }
}

/// One replayable user action.
#[derive(Clone)]
pub enum Command {
    /// A poly-line with constant width and color.
    Stroke { style: Style, points: Vec<Pos2> },
    /// A rectangle/ellipse/polygon with fill and/or border styling. The
    /// `constrained` flag (square/circle modifier) is captured at creation —
    /// the user may have released the key long before a replay.
    Shape {
        style: Style,
        kind: ShapeKind,
        start: Pos2,
        end: Pos2,
        constrained: bool,
    },
    /// Multi-line text inside the box the editing session ended with.
    Text {
        style: Style,
        font: FontArc,
        text: String,
        size: f32,
        align: TextAlignment,
        bold: bool,
        italic: bool,
        bounds: BoundingLine,
    },
    /// The entire post-fill raster, blitted wholesale. Memory-heavy, but a
    /// flood fill is already O(pixels) — and the same snapshot mechanism
    /// records committed selection edits.
    Fill { image: RgbaImage },
    /// A whole-document resize. Stores the pre-resize raster; the target
    /// dimensions live in the manager's dimension stacks and arrive through
    /// the replay context.
    Resize { last_image: RgbaImage },
}

impl Command {
    /// Resize commands need their paired dimension entry at replay time.
    pub fn is_resizer(&self) -> bool {
        matches!(self, Command::Resize { .. })
    }

    /// Short name for undo-history UI menus.
    pub fn label(&self) -> &'static str {
        match self {
            Command::Stroke { .. } => "Stroke",
            Command::Shape { .. } => "Shape",
            Command::Text { .. } => "Text",
            Command::Fill { .. } => "Fill",
            Command::Resize { .. } => "Resize Canvas",
        }
    }

    /// Redraw this command onto the canvas base raster.
    pub fn execute(&self, canvas: &mut Canvas, ctx: &mut ReplayCtx<'_>) {
        match self {
            Command::Stroke { style, points } => {
                shapes::draw_polyline(&mut canvas.base, points, style.primary, style.line_width);
            }

            Command::Shape { style, kind, start, end, constrained } => {
                let end = if *constrained && !matches!(kind, ShapeKind::Polygon(_)) {
                    closest_square(*start, *end)
                } else {
                    *end
                };
                let bounds = BoundingLine::new(*start, end).fixed();
                match kind {
                    ShapeKind::Rectangle => shapes::draw_rect(&mut canvas.base, &bounds, style),
                    ShapeKind::Ellipse => shapes::draw_ellipse(&mut canvas.base, &bounds, style),
                    ShapeKind::Polygon(points) => {
                        shapes::draw_polygon(&mut canvas.base, points, style)
                    }
                }
            }

            Command::Text { style, font, text, size, align, bold, italic, bounds } => {
                text::draw_text(
                    &mut canvas.base,
                    font,
                    text,
                    *size,
                    *align,
                    *bold,
                    *italic,
                    bounds,
                    style.primary,
                );
            }

            Command::Fill { image } => {
                canvas.base.blit_replace(0, 0, image);
            }

            Command::Resize { last_image } => {
                let (w, h) = ctx.next_dimensions().unwrap_or(DEFAULT_DOC_SIZE);
                canvas.resize(w, h);
                canvas.base.blit_replace(0, 0, last_image);
                ctx.raster_settled(SettledTask::RedrawGrid);
            }
        }
    }
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Command::Stroke { style, points } => f
                .debug_struct("Stroke")
                .field("style", style)
                .field("points", &points.len())
                .finish(),
            Command::Shape { kind, start, end, constrained, .. } => f
                .debug_struct("Shape")
                .field("kind", &kind_name(kind))
                .field("start", start)
                .field("end", end)
                .field("constrained", constrained)
                .finish(),
            Command::Text { text, size, bounds, .. } => f
                .debug_struct("Text")
                .field("text", text)
                .field("size", size)
                .field("bounds", bounds)
                .finish(),
            Command::Fill { image } => f
                .debug_struct("Fill")
                .field("dimensions", &image.dimensions())
                .finish(),
            Command::Resize { last_image } => f
                .debug_struct("Resize")
                .field("last_image", &last_image.dimensions())
                .finish(),
        }
    }
}

fn kind_name(kind: &ShapeKind) -> &'static str {
    match kind {
        ShapeKind::Rectangle => "Rectangle",
        ShapeKind::Ellipse => "Ellipse",
        ShapeKind::Polygon(_) => "Polygon",
    }
}
