//! Devices the interpreter talks to.
//!
//! The CPU only sees these traits; the orchestrator decides which concrete
//! device sits behind each one. Concrete implementations live alongside:
//! - `FrameBuffer`: 64x32 monochrome display with XOR sprite drawing
//! - `Keypad`: 16-key hexadecimal keypad
//! - `XorShift`: seedable pseudo-random byte source

pub mod display;
pub mod keypad;
pub mod random;

pub use display::FrameBuffer;
pub use keypad::Keypad;
pub use random::XorShift;

use crate::mem::{Bus, MemoryError};

/// Display device receiving clear and draw commands.
pub trait Graphics {
    /// Blank the whole display.
    fn clear(&mut self);

    /// Draw `height` sprite rows read from `bus` starting at `source`,
    /// with the top-left corner at (`x`, `y`).
    ///
    /// Returns whether any lit pixel was switched off.
    fn draw_sprite(
        &mut self,
        bus: &Bus,
        x: u8,
        y: u8,
        height: u8,
        source: u16,
    ) -> Result<bool, MemoryError>;
}

/// Input device answering key-down queries by key name.
pub trait Input {
    /// `key` is an uppercase hexadecimal digit string such as `"A"`.
    fn is_key_down(&self, key: &str) -> bool;
}

/// The owner of the machine, which the CPU asks to stop.
pub trait Supervisor {
    fn stop(&mut self);
}

/// Source of random bytes for the `CXNN` instruction.
pub trait RandomSource {
    fn next_byte(&mut self) -> u8;
}
