//! File-backed implementation of the persistence collaborator: the base
//! raster as a PNG plus a small binary record of the document dimensions.
//! The undo manager reads these back so undoing the last canvas resize can
//! fall back to the real prior document instead of a default-sized blank.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::canvas::Canvas;
use crate::history::SnapshotStore;
use crate::log_err;

const IMAGE_FILE: &str = "snapshot.png";
const DIMS_FILE: &str = "snapshot.dims";

/// Error type for autosave file operations.
#[derive(Debug)]
pub enum AutosaveError {
    Io(std::io::Error),
    Image(image::ImageError),
    Serialize(String),
}

impl std::fmt::Display for AutosaveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AutosaveError::Io(e) => write!(f, "I/O error: {}", e),
            AutosaveError::Image(e) => write!(f, "Image error: {}", e),
            AutosaveError::Serialize(e) => write!(f, "Serialization error: {}", e),
        }
    }
}

impl From<std::io::Error> for AutosaveError {
    fn from(e: std::io::Error) -> Self {
        AutosaveError::Io(e)
    }
}

impl From<image::ImageError> for AutosaveError {
    fn from(e: image::ImageError) -> Self {
        AutosaveError::Image(e)
    }
}

impl From<Box<bincode::ErrorKind>> for AutosaveError {
    fn from(e: Box<bincode::ErrorKind>) -> Self {
        AutosaveError::Serialize(e.to_string())
    }
}

/// Persisted document dimensions.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
struct SavedDimensions {
    width: u32,
    height: u32,
}

/// Autosave store rooted at a caller-chosen directory.
pub struct FileSnapshotStore {
    dir: PathBuf,
}

impl FileSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Persist the base raster and the current document dimensions.
    pub fn save(&self, canvas: &Canvas) -> Result<(), AutosaveError> {
        fs::create_dir_all(&self.dir)?;
        canvas.base.as_image().save(self.dir.join(IMAGE_FILE))?;

        let (width, height) = canvas.dimensions();
        let file = File::create(self.dir.join(DIMS_FILE))?;
        let writer = BufWriter::new(file);
        bincode::serialize_into(writer, &SavedDimensions { width, height })?;
        Ok(())
    }
}

impl SnapshotStore for FileSnapshotStore {
    fn last_image(&self) -> Option<RgbaImage> {
        let path = self.dir.join(IMAGE_FILE);
        if !path.exists() {
            return None;
        }
        match image::open(&path) {
            Ok(img) => Some(img.to_rgba8()),
            Err(e) => {
                log_err!("autosave: failed to read {}: {}", path.display(), e);
                None
            }
        }
    }

    fn last_dimensions(&self) -> Option<(u32, u32)> {
        let raw = fs::read(self.dir.join(DIMS_FILE)).ok()?;
        let dims: SavedDimensions = bincode::deserialize(&raw).ok()?;
        Some((dims.width, dims.height))
    }
}
