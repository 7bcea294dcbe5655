//! Single-slot, in-process pixel clipboard shared by every selection tool.
//! The clipboard knows nothing about selection shapes — paste semantics
//! (turning the buffer back into a live selection) belong to the selection
//! engine.

use image::RgbaImage;

#[derive(Default)]
pub struct Clipboard {
    slot: Option<RgbaImage>,
    already_copied: bool,
}

impl Clipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a buffer, replacing whatever was copied before.
    pub fn copy(&mut self, buffer: RgbaImage) {
        self.slot = Some(buffer);
        self.already_copied = true;
    }

    /// Non-destructive read; paste may be invoked any number of times.
    pub fn image(&self) -> Option<&RgbaImage> {
        self.slot.as_ref()
    }

    pub fn has_image(&self) -> bool {
        self.slot.is_some()
    }

    pub fn already_copied(&self) -> bool {
        self.already_copied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_overwrites_and_paste_reads_nondestructively() {
        let mut clip = Clipboard::new();
        assert!(!clip.already_copied());

        clip.copy(RgbaImage::new(2, 2));
        clip.copy(RgbaImage::new(5, 3));
        assert!(clip.already_copied());
        assert_eq!(clip.image().unwrap().dimensions(), (5, 3));
        assert_eq!(clip.image().unwrap().dimensions(), (5, 3));
    }
}
