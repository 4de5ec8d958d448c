//! Hexadecimal keypad.

use super::Input;

/// Number of keys on the keypad.
pub const KEY_COUNT: usize = 16;

/// Sixteen keys named `"0"` through `"F"`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Keypad {
    down: [bool; KEY_COUNT],
}

impl Keypad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the state of key `key` (0x0-0xF). Other values are ignored.
    pub fn set(&mut self, key: u8, down: bool) {
        if let Some(slot) = self.down.get_mut(key as usize) {
            *slot = down;
        }
    }

    pub fn press(&mut self, key: u8) {
        self.set(key, true);
    }

    pub fn release(&mut self, key: u8) {
        self.set(key, false);
    }

    pub fn release_all(&mut self) {
        self.down = [false; KEY_COUNT];
    }

    /// Map a typed character to its key (hex digit, either case).
    pub fn key_for_char(c: char) -> Option<u8> {
        c.to_digit(16).map(|d| d as u8)
    }
}

impl Input for Keypad {
    fn is_key_down(&self, key: &str) -> bool {
        u8::from_str_radix(key, 16)
            .ok()
            .and_then(|k| self.down.get(k as usize))
            .copied()
            .unwrap_or(false)
    }
}
