//! Magnetism — the grid-snap policy applied to selection move offsets.
//! When enabled, a proposed pointer delta is quantized to the nearest
//! multiple of the grid pitch relative to a reference point captured when
//! the gesture started; when disabled the raw delta passes through.

use egui::{Pos2, Vec2};

pub const DEFAULT_GRID_PITCH: f32 = 10.0;

#[derive(Clone, Copy, Debug)]
pub struct Magnetism {
    pub enabled: bool,
    pub pitch: f32,
    reference: Option<Pos2>,
}

impl Default for Magnetism {
    fn default() -> Self {
        Self::new(DEFAULT_GRID_PITCH)
    }
}

impl Magnetism {
    pub fn new(pitch: f32) -> Self {
        Self { enabled: false, pitch: pitch.max(1.0), reference: None }
    }

    /// Capture the gesture's reference point (the pointer position at
    /// drag start).
    pub fn begin_gesture(&mut self, origin: Pos2) {
        self.reference = Some(origin);
    }

    pub fn end_gesture(&mut self) {
        self.reference = None;
    }

    /// Offset to apply for the current pointer position: quantized when
    /// enabled, raw otherwise. Without a captured reference the offset is
    /// zero — there is no gesture to be relative to.
    pub fn dispatch(&self, pointer: Pos2) -> Vec2 {
        let Some(reference) = self.reference else {
            return Vec2::ZERO;
        };
        let raw = pointer - reference;
        if !self.enabled {
            return raw;
        }
        Vec2::new(
            (raw.x / self.pitch).round() * self.pitch,
            (raw.y / self.pitch).round() * self.pitch,
        )
    }

    /// Step to use for a single keyboard nudge: the grid pitch when snapping
    /// is on, otherwise the caller's own step.
    pub fn nudge_step(&self, default_step: f32) -> f32 {
        if self.enabled { self.pitch } else { default_step }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use egui::pos2;

    #[test]
    fn disabled_magnetism_passes_raw_deltas() {
        let mut m = Magnetism::new(10.0);
        m.begin_gesture(pos2(100.0, 100.0));
        assert_eq!(m.dispatch(pos2(103.0, 91.0)), Vec2::new(3.0, -9.0));
    }

    #[test]
    fn enabled_magnetism_quantizes_to_pitch() {
        let mut m = Magnetism::new(10.0);
        m.enabled = true;
        m.begin_gesture(pos2(100.0, 100.0));
        assert_eq!(m.dispatch(pos2(103.0, 91.0)), Vec2::new(0.0, -10.0));
        assert_eq!(m.dispatch(pos2(117.0, 100.0)), Vec2::new(20.0, 0.0));
    }

    #[test]
    fn dispatch_without_gesture_is_zero() {
        let m = Magnetism::new(10.0);
        assert_eq!(m.dispatch(pos2(50.0, 50.0)), Vec2::ZERO);
    }
}
