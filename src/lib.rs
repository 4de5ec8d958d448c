//! # CHIP-8 Emulator
//!
//! An interpreter for the CHIP-8 virtual machine.
//!
//! Programs execute against a virtual CPU and a memory bus made of typed
//! regions (read-only program image, read-write RAM). The display and
//! keypad sit behind small traits so the CPU never depends on a concrete
//! device, and a terminal debugger can inspect the live state.

pub mod mem;
pub mod cpu;
pub mod asm;
pub mod devices;
pub mod config;
pub mod system;

#[cfg(feature = "tui")]
pub mod tui;

// Re-export commonly used types
pub use mem::{Access, Bus, MemoryError, MemoryRegion};
pub use cpu::{Cpu, CpuError, CpuState, Machine, Opcode, Registers};
pub use asm::{disassemble, disassemble_instruction, load_rom, RomError, RomImage};
pub use config::{ConfigError, EmulatorConfig};
pub use system::{Chip8, SystemError};

#[cfg(feature = "tui")]
pub use tui::run_debugger;
