//! CHIP-8 register file.
//!
//! - PC: program counter
//! - SP: call-stack index
//! - I: 12-bit index register (always masked on write)
//! - DT/ST: delay and sound countdown timers
//! - V0-VF: general-purpose byte registers; VF doubles as the carry,
//!   borrow and collision flag

use serde::{Serialize, Deserialize};

/// Number of general-purpose registers.
pub const REGISTER_COUNT: usize = 16;

/// Index of the flag register.
pub const FLAG: usize = 0xF;

/// Address programs are loaded at and where execution starts.
pub const PROGRAM_START: u16 = 0x200;

/// Addressable range of the index register.
pub const INDEX_MASK: u16 = 0x0FFF;

/// Width of one instruction in bytes.
pub const INSTRUCTION_WIDTH: u16 = 2;

/// What a register is used for, as far as inspection tooling cares.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RegisterKind {
    ProgramCounter,
    StackPointer,
    Index,
    Timer,
    GeneralPurpose,
}

/// One entry of a register snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterInfo {
    pub name: String,
    pub value: u16,
    /// Display width in bytes.
    pub width: u8,
    pub kind: RegisterKind,
}

/// The CHIP-8 register file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Registers {
    pub pc: u16,
    pub sp: u8,
    i: u16,
    pub delay: u8,
    pub sound: u8,
    pub v: [u8; REGISTER_COUNT],
}

impl Registers {
    /// Create a register file with power-on values.
    pub fn new() -> Self {
        Self {
            pc: PROGRAM_START,
            sp: 0,
            i: 0,
            delay: 0,
            sound: 0,
            v: [0; REGISTER_COUNT],
        }
    }

    /// Restore power-on values.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn index(&self) -> u16 {
        self.i
    }

    /// Set I, masked to the addressable range.
    pub fn set_index(&mut self, value: u16) {
        self.i = value & INDEX_MASK;
    }

    /// Overwrite VF with 1 or 0.
    pub fn set_flag(&mut self, set: bool) {
        self.v[FLAG] = set as u8;
    }

    /// Step past the current instruction.
    pub fn advance(&mut self) {
        self.pc = self.pc.wrapping_add(INSTRUCTION_WIDTH);
    }

    /// Step past the current instruction, and past the next one too
    /// if `condition` holds.
    pub fn skip_if(&mut self, condition: bool) {
        let step = if condition { 2 * INSTRUCTION_WIDTH } else { INSTRUCTION_WIDTH };
        self.pc = self.pc.wrapping_add(step);
    }

    /// Ordered copy of every register for inspection tooling.
    pub fn snapshot(&self) -> Vec<RegisterInfo> {
        let entry = |name: String, value: u16, width: u8, kind: RegisterKind| RegisterInfo {
            name,
            value,
            width,
            kind,
        };

        let mut out = vec![
            entry("PC".into(), self.pc, 2, RegisterKind::ProgramCounter),
            entry("SP".into(), self.sp as u16, 1, RegisterKind::StackPointer),
            entry("I".into(), self.i, 2, RegisterKind::Index),
        ];
        out.extend(self.v.iter().enumerate().map(|(n, value)| {
            entry(format!("V{:X}", n), *value as u16, 1, RegisterKind::GeneralPurpose)
        }));
        out.push(entry("DT".into(), self.delay as u16, 1, RegisterKind::Timer));
        out.push(entry("ST".into(), self.sound as u16, 1, RegisterKind::Timer));
        out
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_on_values() {
        let regs = Registers::new();
        assert_eq!(regs.pc, 0x200);
        assert_eq!(regs.sp, 0);
        assert_eq!(regs.index(), 0);
        assert_eq!(regs.delay, 0);
        assert_eq!(regs.sound, 0);
    }

    #[test]
    fn test_index_is_masked() {
        let mut regs = Registers::new();
        regs.set_index(0x1234);
        assert_eq!(regs.index(), 0x234);
    }

    #[test]
    fn test_skip_if() {
        let mut regs = Registers::new();
        regs.skip_if(false);
        assert_eq!(regs.pc, 0x202);
        regs.skip_if(true);
        assert_eq!(regs.pc, 0x206);
    }

    #[test]
    fn test_snapshot_order() {
        let mut regs = Registers::new();
        regs.v[0xA] = 0x7F;
        regs.set_index(0x2F0);

        let snap = regs.snapshot();
        let names: Vec<_> = snap.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(&names[..4], ["PC", "SP", "I", "V0"]);
        assert_eq!(names[18], "VF");
        assert_eq!(snap.len(), 21);

        assert_eq!(snap[2].value, 0x2F0);
        assert_eq!(snap[3 + 0xA].value, 0x7F);
        assert_eq!(snap[0].kind, RegisterKind::ProgramCounter);
    }

    #[test]
    fn test_snapshot_is_a_copy() {
        let mut regs = Registers::new();
        let snap = regs.snapshot();
        regs.pc = 0x300;
        assert_eq!(snap[0].value, 0x200);
    }
}
