//! TUI debugger for the CHIP-8 emulator.
//!
//! Provides an interactive terminal-based debugger with:
//! - Live display output
//! - Register snapshot and instructions-per-second readout
//! - Disassembly from the current PC and a memory view
//! - Step/run/breakpoint controls and a captured log pane

mod app;
mod ui;

pub use app::{DebuggerApp, LogBuffer, run_debugger};
