//! rasterboard — the engine behind a raster drawing editor.
//!
//! The crate owns the command-log undo/redo machinery and the anchor-based
//! selection transform system shared by the rectangle, ellipse and lasso
//! selection tools. Rendering toolbars, routing OS events and persisting
//! documents are the host application's job; it plugs in through the
//! [`history::SnapshotStore`] and [`history::GridOverlay`] traits and feeds
//! pointer/keyboard events to [`selection::SelectionEngine`].

#![allow(clippy::too_many_arguments)]

pub mod autosave;
pub mod canvas;
pub mod clipboard;
pub mod command;
pub mod geometry;
pub mod history;
pub mod logger;
pub mod magnetism;
pub mod ops;
pub mod selection;

pub use canvas::{Canvas, Surface};
pub use clipboard::Clipboard;
pub use command::{Command, ShapeKind, Style};
pub use geometry::{Anchor, AnchorSet, BoundingLine, Segment};
pub use history::{CommandLog, GridOverlay, SnapshotStore};
pub use magnetism::Magnetism;
pub use selection::{SelectionEngine, SelectionKind, SelectionPhase};
