//! Program images.
//!
//! A ROM image is the raw big-endian instruction stream loaded at 0x200.
//! No header, no checksum: the file length is the program length.

use crate::cpu::PROGRAM_START;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Largest image that fits between the program start and the end of the
/// 4 KiB address space.
pub const MAX_ROM_SIZE: usize = 0x1000 - PROGRAM_START as usize;

/// A validated program image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomImage {
    /// Display name (usually the file name).
    pub name: String,
    bytes: Vec<u8>,
}

impl RomImage {
    /// Wrap raw bytes, rejecting empty or oversized images.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Result<Self, RomError> {
        if bytes.is_empty() {
            return Err(RomError::Empty);
        }
        if bytes.len() > MAX_ROM_SIZE {
            return Err(RomError::TooLarge {
                size: bytes.len(),
                max: MAX_ROM_SIZE,
            });
        }
        Ok(Self {
            name: name.into(),
            bytes,
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// The first `count` instructions of the image, or all of it if shorter.
    pub fn head(&self, count: usize) -> &[u8] {
        let end = count.saturating_mul(2).min(self.bytes.len());
        &self.bytes[..end]
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Load a ROM image from disk.
pub fn load_rom<P: AsRef<Path>>(path: P) -> Result<RomImage, RomError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path).map_err(|e| RomError::IoError(e.to_string()))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    debug!("read {} bytes from {}", bytes.len(), path.display());
    RomImage::new(name, bytes)
}

/// Errors that can occur while loading a ROM image.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RomError {
    #[error("I/O error: {0}")]
    IoError(String),

    #[error("ROM image is empty")]
    Empty,

    #[error("ROM image is {size} bytes, the limit is {max}")]
    TooLarge { size: usize, max: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_limits() {
        assert_eq!(RomImage::new("x", Vec::new()), Err(RomError::Empty));
        assert!(RomImage::new("x", vec![0; MAX_ROM_SIZE]).is_ok());
        assert_eq!(
            RomImage::new("x", vec![0; MAX_ROM_SIZE + 1]),
            Err(RomError::TooLarge { size: 0xE01, max: 0xE00 })
        );
    }

    #[test]
    fn test_head() {
        let rom = RomImage::new("x", vec![0x60, 0x0A, 0x12, 0x00, 0xFF]).unwrap();
        assert_eq!(rom.head(0), &[] as &[u8]);
        assert_eq!(rom.head(1), &[0x60, 0x0A]);
        assert_eq!(rom.head(3), rom.bytes());
        assert_eq!(rom.head(usize::MAX), rom.bytes());
    }

    #[test]
    fn test_load_from_disk() {
        let path = std::env::temp_dir().join(format!("chip8-rom-{}.ch8", std::process::id()));
        std::fs::write(&path, [0x60, 0x0A, 0x12, 0x00]).unwrap();

        let rom = load_rom(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(rom.bytes(), &[0x60, 0x0A, 0x12, 0x00]);
        assert!(rom.name.ends_with(".ch8"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_rom("/definitely/not/here.ch8").unwrap_err();
        assert!(matches!(err, RomError::IoError(_)));
    }
}
