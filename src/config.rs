//! Emulator configuration.
//!
//! Settings come from an optional JSON file; every field has a default, so
//! a file only needs the keys it wants to change. Command-line flags are
//! applied on top by the binary.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Tunable emulator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulatorConfig {
    /// Instructions executed per emulated second.
    pub ticks_per_second: u32,
    /// Timer countdown rate.
    pub timer_hz: u32,
    /// How many instructions the debugger disassembles from PC.
    pub disassembly_lines: usize,
    /// Seed for `CXNN`. Seeded from the clock when absent.
    pub rng_seed: Option<u64>,
    /// Map the program image read-write instead of read-only.
    pub writable_program: bool,
    /// Write the draw collision result into VF.
    pub collision_flag: bool,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            ticks_per_second: 500,
            timer_hz: 60,
            disassembly_lines: 16,
            rng_seed: None,
            writable_program: false,
            collision_flag: false,
        }
    }
}

impl EmulatorConfig {
    /// Read a JSON configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let data = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::IoError(e.to_string()))?;
        Self::from_json(&data)
    }

    /// Parse and validate a JSON document.
    pub fn from_json(data: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(data).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ticks_per_second == 0 {
            return Err(ConfigError::Invalid("ticks_per_second must be non-zero".into()));
        }
        if self.timer_hz == 0 || self.timer_hz > self.ticks_per_second {
            return Err(ConfigError::Invalid(
                "timer_hz must be between 1 and ticks_per_second".into(),
            ));
        }
        Ok(())
    }

    /// Instructions executed between two timer decrements.
    pub fn ticks_per_timer(&self) -> u32 {
        (self.ticks_per_second / self.timer_hz.max(1)).max(1)
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("parse error: {0}")]
    ParseError(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
