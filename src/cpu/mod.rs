//! CPU emulation for the CHIP-8.
//!
//! This module implements the interpreter core:
//! - 16 byte registers V0-VF, a 12-bit index register and two timers
//! - a 16-entry call stack
//! - 16-bit big-endian opcodes dispatched on their top nibble

pub mod registers;
pub mod decode;
pub mod execute;

pub use registers::{Registers, RegisterInfo, RegisterKind, PROGRAM_START};
pub use decode::Opcode;
pub use execute::{Cpu, CpuError, CpuState, Machine, STACK_DEPTH};
