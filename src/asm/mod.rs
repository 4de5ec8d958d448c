//! Program images and disassembly.
//!
//! This module provides:
//! - ROM image loading (raw bytes → validated `RomImage`)
//! - A disassembler (opcodes → readable text)

pub mod disasm;
pub mod rom;

pub use disasm::{disassemble, disassemble_instruction, disassembly, Disassembly};
pub use rom::{load_rom, RomError, RomImage};
