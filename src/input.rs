//! Per-frame input snapshots with deltas and edge detection.
//!
//! The host feeds raw events through the `pointer_moved` / `button_changed` /
//! `key_changed` / `scrolled` surface at any time; [`InputSampler::update`]
//! runs once per frame and freezes what the rest of the frame sees.

use glam::Vec2;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PointerButton {
    Left,
    Right,
    Middle,
}

impl PointerButton {
    fn slot(self) -> usize {
        match self {
            PointerButton::Left => 0,
            PointerButton::Right => 1,
            PointerButton::Middle => 2,
        }
    }
}

/// Keys the editor reacts to. Anything else is dropped by the binding layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    Escape,
    Delete,
    Insert,
    ArrowLeft,
    ArrowRight,
    ArrowUp,
    ArrowDown,
    Control,
    Shift,
    N,
    O,
    S,
}

#[derive(Debug, Clone, Default, PartialEq)]
struct InputSnapshot {
    pointer: Vec2,
    buttons: [bool; 3],
    keys: HashSet<Key>,
    /// Cumulative wheel value, not a per-frame count.
    scroll: f32,
}

#[derive(Debug, Default)]
pub struct InputSampler {
    live: InputSnapshot,
    current: InputSnapshot,
    previous: InputSnapshot,
    sampled: bool,
}

impl InputSampler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pointer_moved(&mut self, x: f32, y: f32) {
        self.live.pointer = Vec2::new(x, y);
    }

    pub fn button_changed(&mut self, button: PointerButton, down: bool) {
        self.live.buttons[button.slot()] = down;
    }

    pub fn key_changed(&mut self, key: Key, down: bool) {
        if down {
            self.live.keys.insert(key);
        } else {
            self.live.keys.remove(&key);
        }
    }

    /// Adds a wheel movement in wheel units (one notch is 120).
    pub fn scrolled(&mut self, delta: f32) {
        if delta.is_finite() {
            self.live.scroll += delta;
        }
    }

    /// Marks every button and key as up, e.g. when the window loses focus.
    pub fn release_all(&mut self) {
        self.live.buttons = [false; 3];
        self.live.keys.clear();
    }

    /// Takes this frame's snapshot. The first call seeds the previous
    /// snapshot with the current one so the first frame has no deltas.
    pub fn update(&mut self) {
        if self.sampled {
            self.previous = std::mem::replace(&mut self.current, self.live.clone());
        } else {
            self.current = self.live.clone();
            self.previous = self.current.clone();
            self.sampled = true;
        }
    }

    #[allow(dead_code)]
    pub fn pointer_position(&self) -> Vec2 {
        self.current.pointer
    }

    pub fn pointer_delta(&self) -> Vec2 {
        self.current.pointer - self.previous.pointer
    }

    pub fn is_down(&self, button: PointerButton) -> bool {
        self.current.buttons[button.slot()]
    }

    #[allow(dead_code)]
    pub fn pressed_this_frame(&self, button: PointerButton) -> bool {
        self.current.buttons[button.slot()] && !self.previous.buttons[button.slot()]
    }

    #[allow(dead_code)]
    pub fn released_this_frame(&self, button: PointerButton) -> bool {
        !self.current.buttons[button.slot()] && self.previous.buttons[button.slot()]
    }

    pub fn is_key_down(&self, key: Key) -> bool {
        self.current.keys.contains(&key)
    }

    pub fn key_pressed_this_frame(&self, key: Key) -> bool {
        self.current.keys.contains(&key) && !self.previous.keys.contains(&key)
    }

    #[allow(dead_code)]
    pub fn key_released_this_frame(&self, key: Key) -> bool {
        !self.current.keys.contains(&key) && self.previous.keys.contains(&key)
    }

    pub fn scroll_delta(&self) -> f32 {
        self.current.scroll - self.previous.scroll
    }
}

#[cfg(test)]
mod tests {
    use super::{InputSampler, Key, PointerButton};
    use glam::Vec2;

    #[test]
    fn first_frame_delta_is_zero() {
        let mut input = InputSampler::new();
        input.pointer_moved(640.0, 360.0);
        input.scrolled(240.0);
        input.update();
        assert_eq!(input.pointer_position(), Vec2::new(640.0, 360.0));
        assert_eq!(input.pointer_delta(), Vec2::ZERO);
        assert_eq!(input.scroll_delta(), 0.0);
    }

    #[test]
    fn delta_is_current_minus_previous() {
        let mut input = InputSampler::new();
        input.pointer_moved(10.0, 10.0);
        input.update();
        input.pointer_moved(15.0, 4.0);
        input.pointer_moved(20.0, 5.0);
        input.update();
        assert_eq!(input.pointer_delta(), Vec2::new(10.0, -5.0));
        input.update();
        assert_eq!(input.pointer_delta(), Vec2::ZERO);
    }

    #[test]
    fn button_edges_fire_for_one_frame() {
        let mut input = InputSampler::new();
        input.update();

        input.button_changed(PointerButton::Left, true);
        input.update();
        assert!(input.is_down(PointerButton::Left));
        assert!(input.pressed_this_frame(PointerButton::Left));
        assert!(!input.released_this_frame(PointerButton::Left));

        input.update();
        assert!(input.is_down(PointerButton::Left));
        assert!(!input.pressed_this_frame(PointerButton::Left));

        input.button_changed(PointerButton::Left, false);
        input.update();
        assert!(!input.is_down(PointerButton::Left));
        assert!(input.released_this_frame(PointerButton::Left));

        input.update();
        assert!(!input.released_this_frame(PointerButton::Left));
    }

    #[test]
    fn events_between_frames_are_invisible_until_update() {
        let mut input = InputSampler::new();
        input.update();
        input.button_changed(PointerButton::Right, true);
        input.key_changed(Key::ArrowUp, true);
        assert!(!input.is_down(PointerButton::Right));
        assert!(!input.is_key_down(Key::ArrowUp));
        input.update();
        assert!(input.is_down(PointerButton::Right));
        assert!(input.key_pressed_this_frame(Key::ArrowUp));
    }

    #[test]
    fn key_edges_and_release_all() {
        let mut input = InputSampler::new();
        input.key_changed(Key::Delete, true);
        input.update();
        // Held before the first frame: down, but no edge.
        assert!(input.is_key_down(Key::Delete));
        assert!(!input.key_pressed_this_frame(Key::Delete));

        input.release_all();
        input.update();
        assert!(!input.is_key_down(Key::Delete));
        assert!(input.key_released_this_frame(Key::Delete));
    }

    #[test]
    fn scroll_delta_is_difference_of_cumulative_values() {
        let mut input = InputSampler::new();
        input.update();
        input.scrolled(120.0);
        input.scrolled(120.0);
        input.update();
        assert_eq!(input.scroll_delta(), 240.0);
        input.update();
        assert_eq!(input.scroll_delta(), 0.0);
        input.scrolled(-120.0);
        input.update();
        assert_eq!(input.scroll_delta(), -120.0);
    }
}
