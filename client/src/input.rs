//! Keyboard sampling for movement and the connect key

use macroquad::prelude::{is_key_down, KeyCode};
use shared::Vec2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

/// Keyboard state as seen by the movement code: is a direction held this frame
pub trait KeyboardState {
    fn is_down(&self, direction: Direction) -> bool;
}

/// Live keyboard read through macroquad. WASD and the arrow keys both work.
pub struct MacroquadKeyboard;

impl KeyboardState for MacroquadKeyboard {
    fn is_down(&self, direction: Direction) -> bool {
        match direction {
            Direction::Up => is_key_down(KeyCode::W) || is_key_down(KeyCode::Up),
            Direction::Down => is_key_down(KeyCode::S) || is_key_down(KeyCode::Down),
            Direction::Left => is_key_down(KeyCode::A) || is_key_down(KeyCode::Left),
            Direction::Right => is_key_down(KeyCode::D) || is_key_down(KeyCode::Right),
        }
    }
}

/// Turns held keys into a movement intent with components in {-1, 0, 1}.
///
/// Opposing keys are not cancelled out: up is checked before down and left
/// before right, and the first one held wins.
pub fn sample_intent(keys: &impl KeyboardState) -> Vec2 {
    let mut intent = Vec2::ZERO;

    if keys.is_down(Direction::Up) {
        intent.y = -1.0;
    } else if keys.is_down(Direction::Down) {
        intent.y = 1.0;
    }

    if keys.is_down(Direction::Left) {
        intent.x = -1.0;
    } else if keys.is_down(Direction::Right) {
        intent.x = 1.0;
    }

    intent
}

/// Edge detection for the connect key (R or Enter)
pub struct InputManager {
    prev_connect_key: bool,
}

impl InputManager {
    pub fn new() -> Self {
        Self {
            prev_connect_key: false,
        }
    }

    /// True on the frame the connect key goes down
    pub fn poll_connect_request(&mut self) -> bool {
        let down = is_key_down(KeyCode::R) || is_key_down(KeyCode::Enter);
        self.detect_press(down)
    }

    fn detect_press(&mut self, down: bool) -> bool {
        let pressed = down && !self.prev_connect_key;
        self.prev_connect_key = down;
        pressed
    }
}

impl Default for InputManager {
    fn default() -> Self {
        Self::new()
    }
}
