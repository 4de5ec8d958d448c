//! Opcode field extraction.
//!
//! Every CHIP-8 instruction is one big-endian 16-bit word. The top nibble
//! selects the instruction class; the remaining fields are read by masking:
//!
//! ```text
//!  15..12  11..8  7..4  3..0
//!  class     X      Y     N
//!                 \-- NN --/
//!          \------ NNN ----/
//! ```

use serde::{Serialize, Deserialize};

/// A raw instruction word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Opcode(pub u16);

impl Opcode {
    /// Primary class: the top nibble.
    #[inline]
    pub fn class(self) -> u8 {
        (self.0 >> 12) as u8
    }

    /// First register index.
    #[inline]
    pub fn x(self) -> usize {
        ((self.0 & 0x0F00) >> 8) as usize
    }

    /// Second register index.
    #[inline]
    pub fn y(self) -> usize {
        ((self.0 & 0x00F0) >> 4) as usize
    }

    /// Low nibble.
    #[inline]
    pub fn n(self) -> u8 {
        (self.0 & 0x000F) as u8
    }

    /// Low byte.
    #[inline]
    pub fn nn(self) -> u8 {
        (self.0 & 0x00FF) as u8
    }

    /// Low 12 bits (an address).
    #[inline]
    pub fn nnn(self) -> u16 {
        self.0 & 0x0FFF
    }
}

impl From<u16> for Opcode {
    fn from(raw: u16) -> Self {
        Opcode(raw)
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}
