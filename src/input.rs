//! Window input for the flock.
//!
//! Tracks the pointer offset from the window center (the steering input) and
//! the handful of keys that adjust [`FlockParams`] while running:
//!
//! | Key            | Effect                       |
//! |----------------|------------------------------|
//! | `1` / `2` / `3` | raise separation / alignment / cohesion |
//! | `Shift` + same | lower it                     |
//! | `Space`        | pause or resume              |
//!
//! Pointer (or touch) steering only counts on frames where it actually moved;
//! [`Input::begin_frame`] clears it again.

use glam::Vec2;
use std::collections::HashSet;
use winit::event::{ElementState, TouchPhase, WindowEvent};
use winit::keyboard::{KeyCode as WinitKeyCode, PhysicalKey};

use crate::params::FlockParams;

/// How far one key press moves a distance parameter.
pub const PARAM_NUDGE: f32 = 5.0;

/// Keys the simulation reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Key1,
    Key2,
    Key3,
    Space,
    Shift,
    Escape,
    Other(u32),
}

impl From<WinitKeyCode> for KeyCode {
    fn from(key: WinitKeyCode) -> Self {
        match key {
            WinitKeyCode::Digit1 | WinitKeyCode::Numpad1 => KeyCode::Key1,
            WinitKeyCode::Digit2 | WinitKeyCode::Numpad2 => KeyCode::Key2,
            WinitKeyCode::Digit3 | WinitKeyCode::Numpad3 => KeyCode::Key3,
            WinitKeyCode::Space => KeyCode::Space,
            WinitKeyCode::ShiftLeft | WinitKeyCode::ShiftRight => KeyCode::Shift,
            WinitKeyCode::Escape => KeyCode::Escape,
            _ => KeyCode::Other(key as u32),
        }
    }
}

/// Keyboard and pointer state for one window.
#[derive(Debug, Default)]
pub struct Input {
    keys_held: HashSet<KeyCode>,
    keys_pressed: HashSet<KeyCode>,

    /// Offset from the window center, set only on frames with pointer motion.
    pointer_offset: Option<Vec2>,

    window_half: Vec2,
}

impl Input {
    pub fn new() -> Self {
        Self {
            window_half: Vec2::new(400.0, 300.0),
            ..Default::default()
        }
    }

    /// Whether `key` went down this frame.
    pub fn key_pressed(&self, key: KeyCode) -> bool {
        self.keys_pressed.contains(&key)
    }

    pub fn key_held(&self, key: KeyCode) -> bool {
        self.keys_held.contains(&key)
    }

    /// Pointer offset from the window center in pixels, if it moved this frame.
    pub fn pointer_offset(&self) -> Option<Vec2> {
        self.pointer_offset
    }

    /// Half the window size in pixels.
    pub fn window_half(&self) -> Vec2 {
        self.window_half
    }

    pub fn pause_toggled(&self) -> bool {
        self.key_pressed(KeyCode::Space)
    }

    pub fn exit_requested(&self) -> bool {
        self.key_pressed(KeyCode::Escape)
    }

    /// Apply this frame's parameter keys. Returns `true` if anything changed.
    pub fn nudge_params(&self, params: &mut FlockParams) -> bool {
        let sign = if self.key_held(KeyCode::Shift) { -1.0 } else { 1.0 };
        let step = sign * PARAM_NUDGE;
        let mut changed = false;

        let slots = [
            (KeyCode::Key1, &mut params.separation, FlockParams::SEPARATION_RANGE),
            (KeyCode::Key2, &mut params.alignment, FlockParams::ALIGNMENT_RANGE),
            (KeyCode::Key3, &mut params.cohesion, FlockParams::COHESION_RANGE),
        ];
        for (key, value, (min, max)) in slots {
            if self.key_pressed(key) {
                *value = (*value + step).clamp(min, max);
                changed = true;
            }
        }
        changed
    }

    /// Clear per-frame state. Call after the frame has consumed it.
    pub(crate) fn begin_frame(&mut self) {
        self.keys_pressed.clear();
        self.pointer_offset = None;
    }

    pub(crate) fn set_window_size(&mut self, width: u32, height: u32) {
        self.window_half = Vec2::new(width as f32, height as f32) / 2.0;
    }

    fn press(&mut self, key: KeyCode) {
        // Key repeat does not count as a new press.
        if self.keys_held.insert(key) {
            self.keys_pressed.insert(key);
        }
    }

    fn release(&mut self, key: KeyCode) {
        self.keys_held.remove(&key);
    }

    fn move_pointer(&mut self, position: Vec2) {
        self.pointer_offset = Some(position - self.window_half);
    }

    /// Process a winit window event.
    pub(crate) fn handle_event(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::KeyboardInput { event, .. } => {
                if let PhysicalKey::Code(keycode) = event.physical_key {
                    let key = KeyCode::from(keycode);
                    match event.state {
                        ElementState::Pressed => self.press(key),
                        ElementState::Released => self.release(key),
                    }
                }
            }

            WindowEvent::CursorMoved { position, .. } => {
                self.move_pointer(Vec2::new(position.x as f32, position.y as f32));
            }

            WindowEvent::Touch(touch) => {
                if matches!(touch.phase, TouchPhase::Started | TouchPhase::Moved) {
                    self.move_pointer(Vec2::new(touch.location.x as f32, touch.location.y as f32));
                }
            }

            WindowEvent::Resized(size) => {
                self.set_window_size(size.width, size.height);
            }

            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_state() {
        let mut input = Input::new();
        assert!(!input.key_held(KeyCode::Space));

        input.press(KeyCode::Space);
        assert!(input.key_held(KeyCode::Space));
        assert!(input.pause_toggled());

        // held keys survive the frame boundary, presses do not
        input.begin_frame();
        assert!(input.key_held(KeyCode::Space));
        assert!(!input.pause_toggled());

        // repeat while held is not a new press
        input.press(KeyCode::Space);
        assert!(!input.pause_toggled());

        input.release(KeyCode::Space);
        input.press(KeyCode::Space);
        assert!(input.pause_toggled());
    }

    #[test]
    fn test_pointer_offset_from_center() {
        let mut input = Input::new();
        input.set_window_size(800, 600);
        assert_eq!(input.pointer_offset(), None);

        input.move_pointer(Vec2::new(500.0, 100.0));
        assert_eq!(input.pointer_offset(), Some(Vec2::new(100.0, -200.0)));

        input.begin_frame();
        assert_eq!(input.pointer_offset(), None);
    }

    #[test]
    fn test_nudge_params() {
        let mut input = Input::new();
        let mut params = FlockParams::default();

        input.press(KeyCode::Key1);
        assert!(input.nudge_params(&mut params));
        assert_eq!(params.separation, 25.0);
        assert_eq!(params.alignment, 20.0);
        input.begin_frame();
        input.release(KeyCode::Key1);

        input.press(KeyCode::Shift);
        input.press(KeyCode::Key3);
        input.nudge_params(&mut params);
        assert_eq!(params.cohesion, 15.0);
        input.begin_frame();

        assert!(!input.nudge_params(&mut params));
    }

    #[test]
    fn test_nudge_clamps() {
        let mut input = Input::new();
        let mut params = FlockParams::default();
        params.alignment = 98.0;

        input.press(KeyCode::Key2);
        input.nudge_params(&mut params);
        assert_eq!(params.alignment, 100.0);
    }
}
