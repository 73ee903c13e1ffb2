//! Input state tracking with both edge-triggered and level-triggered queries.
//!
//! - **Level-triggered (held):** `is_held(key)` returns true every frame the key
//!   is physically down. Used for continuous actions like flying the camera.
//!
//! - **Edge-triggered (just_pressed / just_released):** These are true only during
//!   the frame the transition happened and are cleared by `end_frame()`.
//!
//! Raw mouse motion and scroll are accumulated between frames so several device
//! events arriving in one frame add up instead of overwriting each other.

use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    W,
    A,
    S,
    D,
    Q,
    E,
    Space,
    LShift,
    LCtrl,
    Escape,
    F1,
    F3,
    F11,
    R,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MouseBtn {
    Left,
    Right,
    Middle,
}

pub struct InputState {
    held: HashSet<Key>,
    just_pressed: HashSet<Key>,
    just_released: HashSet<Key>,

    mouse_held: HashSet<MouseBtn>,
    mouse_just_pressed: HashSet<MouseBtn>,
    mouse_just_released: HashSet<MouseBtn>,

    mouse_delta: (f64, f64),
    scroll_delta: f32,
}

impl InputState {
    pub fn new() -> Self {
        Self {
            held: HashSet::new(),
            just_pressed: HashSet::new(),
            just_released: HashSet::new(),
            mouse_held: HashSet::new(),
            mouse_just_pressed: HashSet::new(),
            mouse_just_released: HashSet::new(),
            mouse_delta: (0.0, 0.0),
            scroll_delta: 0.0,
        }
    }

    pub fn key_down(&mut self, key: Key) {
        if self.held.insert(key) {
            self.just_pressed.insert(key);
        }
    }

    pub fn key_up(&mut self, key: Key) {
        if self.held.remove(&key) {
            self.just_released.insert(key);
        }
    }

    pub fn mouse_down(&mut self, btn: MouseBtn) {
        if self.mouse_held.insert(btn) {
            self.mouse_just_pressed.insert(btn);
        }
    }

    pub fn mouse_up(&mut self, btn: MouseBtn) {
        if self.mouse_held.remove(&btn) {
            self.mouse_just_released.insert(btn);
        }
    }

    /// Raw relative motion, independent of the cursor position.
    pub fn add_mouse_motion(&mut self, dx: f64, dy: f64) {
        self.mouse_delta.0 += dx;
        self.mouse_delta.1 += dy;
    }

    /// Scroll in lines; pixel deltas are converted by the caller.
    pub fn add_scroll(&mut self, lines: f32) {
        self.scroll_delta += lines;
    }

    pub fn is_held(&self, key: Key) -> bool {
        self.held.contains(&key)
    }

    pub fn is_just_pressed(&self, key: Key) -> bool {
        self.just_pressed.contains(&key)
    }

    pub fn is_just_released(&self, key: Key) -> bool {
        self.just_released.contains(&key)
    }

    pub fn is_mouse_held(&self, btn: MouseBtn) -> bool {
        self.mouse_held.contains(&btn)
    }

    pub fn is_mouse_just_pressed(&self, btn: MouseBtn) -> bool {
        self.mouse_just_pressed.contains(&btn)
    }

    pub fn is_mouse_just_released(&self, btn: MouseBtn) -> bool {
        self.mouse_just_released.contains(&btn)
    }

    pub fn mouse_delta(&self) -> (f64, f64) {
        self.mouse_delta
    }

    pub fn scroll_delta(&self) -> f32 {
        self.scroll_delta
    }

    /// Drop everything held, e.g. when the window loses focus and release
    /// events would never arrive.
    pub fn release_all(&mut self) {
        for key in self.held.drain() {
            self.just_released.insert(key);
        }
        for btn in self.mouse_held.drain() {
            self.mouse_just_released.insert(btn);
        }
    }

    pub fn end_frame(&mut self) {
        self.just_pressed.clear();
        self.just_released.clear();
        self.mouse_just_pressed.clear();
        self.mouse_just_released.clear();
        self.mouse_delta = (0.0, 0.0);
        self.scroll_delta = 0.0;
    }
}

impl Default for InputState {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_down_sets_held_and_just_pressed() {
        let mut input = InputState::new();
        input.key_down(Key::W);
        assert!(input.is_held(Key::W));
        assert!(input.is_just_pressed(Key::W));
    }

    #[test]
    fn test_key_up_clears_held_sets_just_released() {
        let mut input = InputState::new();
        input.key_down(Key::W);
        input.key_up(Key::W);
        assert!(!input.is_held(Key::W));
        assert!(input.is_just_released(Key::W));
    }

    #[test]
    fn test_key_repeat_does_not_retrigger_after_end_frame() {
        let mut input = InputState::new();
        input.key_down(Key::R);
        input.end_frame();
        // OS key repeat delivers another press while still held.
        input.key_down(Key::R);
        assert!(input.is_held(Key::R));
        assert!(!input.is_just_pressed(Key::R));
    }

    #[test]
    fn test_key_up_without_down_is_no_op() {
        let mut input = InputState::new();
        input.key_up(Key::A);
        assert!(!input.is_just_released(Key::A));
        assert!(!input.is_held(Key::A));
    }

    #[test]
    fn test_end_frame_clears_transient_state() {
        let mut input = InputState::new();
        input.key_down(Key::A);
        input.key_down(Key::Space);
        input.add_mouse_motion(3.0, -2.0);
        input.add_scroll(1.0);
        input.end_frame();
        assert!(!input.is_just_pressed(Key::A));
        assert!(!input.is_just_pressed(Key::Space));
        assert!(input.is_held(Key::A));
        assert!(input.is_held(Key::Space));
        assert_eq!(input.mouse_delta(), (0.0, 0.0));
        assert_eq!(input.scroll_delta(), 0.0);
    }

    #[test]
    fn test_mouse_motion_accumulates_within_frame() {
        let mut input = InputState::new();
        input.add_mouse_motion(1.5, 2.0);
        input.add_mouse_motion(0.5, -1.0);
        assert_eq!(input.mouse_delta(), (2.0, 1.0));
    }

    #[test]
    fn test_scroll_accumulates_within_frame() {
        let mut input = InputState::new();
        input.add_scroll(1.0);
        input.add_scroll(2.0);
        assert_eq!(input.scroll_delta(), 3.0);
    }

    #[test]
    fn test_mouse_down_up_transitions() {
        let mut input = InputState::new();
        input.mouse_down(MouseBtn::Right);
        assert!(input.is_mouse_held(MouseBtn::Right));
        assert!(input.is_mouse_just_pressed(MouseBtn::Right));
        input.end_frame();
        input.mouse_up(MouseBtn::Right);
        assert!(!input.is_mouse_held(MouseBtn::Right));
        assert!(input.is_mouse_just_released(MouseBtn::Right));
    }

    #[test]
    fn test_release_all_reports_just_released() {
        let mut input = InputState::new();
        input.key_down(Key::W);
        input.mouse_down(MouseBtn::Left);
        input.release_all();
        assert!(!input.is_held(Key::W));
        assert!(input.is_just_released(Key::W));
        assert!(!input.is_mouse_held(MouseBtn::Left));
        assert!(input.is_mouse_just_released(MouseBtn::Left));
    }
}
