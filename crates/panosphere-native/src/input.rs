//! Window input shared by both drivers: left-button drags and a few keys.

use winit::event::{ElementState, MouseButton};
use winit::keyboard::KeyCode;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyAction {
    TogglePause,
    ResetView,
    Quit,
}

pub fn key_action(code: KeyCode) -> Option<KeyAction> {
    match code {
        KeyCode::Space => Some(KeyAction::TogglePause),
        KeyCode::KeyR => Some(KeyAction::ResetView),
        KeyCode::Escape => Some(KeyAction::Quit),
        _ => None,
    }
}

/// Turns cursor positions into drag deltas while the left button is held.
#[derive(Debug, Default)]
pub struct DragTracker {
    pressed: bool,
    last: Option<(f64, f64)>,
}

impl DragTracker {
    pub fn button(&mut self, button: MouseButton, state: ElementState) {
        if button == MouseButton::Left {
            self.pressed = state == ElementState::Pressed;
        }
    }

    /// Record a cursor position; returns the delta if it belongs to a drag.
    pub fn moved(&mut self, x: f64, y: f64) -> Option<(f32, f32)> {
        let previous = self.last.replace((x, y));
        if !self.pressed {
            return None;
        }
        previous.map(|(px, py)| ((x - px) as f32, (y - py) as f32))
    }

    /// Cursor left the window; the next move starts a fresh segment.
    pub fn left(&mut self) {
        self.last = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deltas_only_while_left_button_held() {
        let mut t = DragTracker::default();
        assert_eq!(t.moved(10.0, 10.0), None);
        t.button(MouseButton::Left, ElementState::Pressed);
        assert_eq!(t.moved(15.0, 7.0), Some((5.0, -3.0)));
        t.button(MouseButton::Right, ElementState::Released);
        assert_eq!(t.moved(16.0, 7.0), Some((1.0, 0.0)));
        t.button(MouseButton::Left, ElementState::Released);
        assert_eq!(t.moved(30.0, 30.0), None);
    }

    #[test]
    fn leaving_the_window_breaks_the_drag() {
        let mut t = DragTracker::default();
        t.button(MouseButton::Left, ElementState::Pressed);
        t.moved(0.0, 0.0);
        t.left();
        assert_eq!(t.moved(100.0, 100.0), None);
        assert_eq!(t.moved(101.0, 100.0), Some((1.0, 0.0)));
    }

    #[test]
    fn keys() {
        assert_eq!(key_action(KeyCode::Space), Some(KeyAction::TogglePause));
        assert_eq!(key_action(KeyCode::Escape), Some(KeyAction::Quit));
        assert_eq!(key_action(KeyCode::KeyA), None);
    }
}
