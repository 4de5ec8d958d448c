//! Fixed-capacity memory regions.
//!
//! A region never changes size after creation. Read-only regions are
//! populated once with `load_data` and reject every write entry point
//! with `MemoryError::ReadOnly`, leaving storage untouched.

use super::MemoryError;
use serde::{Serialize, Deserialize};

/// Write capability of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Access {
    /// Reads and writes are allowed.
    ReadWrite,
    /// Only reads (and the initial bulk load) are allowed.
    ReadOnly,
}

/// A contiguous block of bytes with width-typed accessors.
#[derive(Clone)]
pub struct MemoryRegion {
    name: String,
    bytes: Vec<u8>,
    access: Access,
}

impl MemoryRegion {
    /// Create a zero-filled region.
    pub fn new(name: impl Into<String>, capacity: usize, access: Access) -> Self {
        Self {
            name: name.into(),
            bytes: vec![0; capacity],
            access,
        }
    }

    /// Create a zero-filled read-write region.
    pub fn ram(name: impl Into<String>, capacity: usize) -> Self {
        Self::new(name, capacity, Access::ReadWrite)
    }

    /// Create a zero-filled read-only region.
    pub fn rom(name: impl Into<String>, capacity: usize) -> Self {
        Self::new(name, capacity, Access::ReadOnly)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Capacity in bytes.
    pub fn size(&self) -> usize {
        self.bytes.len()
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn is_read_only(&self) -> bool {
        self.access == Access::ReadOnly
    }

    /// Raw view of the region contents (for inspection).
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Bulk-copy `buffer` into the region starting at offset 0.
    ///
    /// The copy is all-or-nothing: an oversized buffer is rejected before
    /// any byte is written. Allowed on read-only regions.
    pub fn load_data(&mut self, buffer: &[u8]) -> Result<(), MemoryError> {
        if buffer.len() > self.bytes.len() {
            return Err(MemoryError::ImageTooLarge {
                region: self.name.clone(),
                size: buffer.len(),
                capacity: self.bytes.len(),
            });
        }
        self.bytes[..buffer.len()].copy_from_slice(buffer);
        Ok(())
    }

    pub fn read_byte(&self, offset: usize) -> Result<u8, MemoryError> {
        self.read_array::<1>(offset).map(u8::from_be_bytes)
    }

    pub fn read_short(&self, offset: usize) -> Result<u16, MemoryError> {
        self.read_array::<2>(offset).map(u16::from_be_bytes)
    }

    pub fn read_word(&self, offset: usize) -> Result<u32, MemoryError> {
        self.read_array::<4>(offset).map(u32::from_be_bytes)
    }

    pub fn read_long(&self, offset: usize) -> Result<u64, MemoryError> {
        self.read_array::<8>(offset).map(u64::from_be_bytes)
    }

    pub fn write_byte(&mut self, offset: usize, value: u8) -> Result<(), MemoryError> {
        self.write_array(offset, value.to_be_bytes())
    }

    pub fn write_short(&mut self, offset: usize, value: u16) -> Result<(), MemoryError> {
        self.write_array(offset, value.to_be_bytes())
    }

    pub fn write_word(&mut self, offset: usize, value: u32) -> Result<(), MemoryError> {
        self.write_array(offset, value.to_be_bytes())
    }

    pub fn write_long(&mut self, offset: usize, value: u64) -> Result<(), MemoryError> {
        self.write_array(offset, value.to_be_bytes())
    }

    fn check_bounds(&self, offset: usize, width: usize) -> Result<(), MemoryError> {
        match offset.checked_add(width) {
            Some(end) if end <= self.bytes.len() => Ok(()),
            _ => Err(MemoryError::OutOfBounds {
                region: self.name.clone(),
                offset,
                width,
                capacity: self.bytes.len(),
            }),
        }
    }

    fn read_array<const N: usize>(&self, offset: usize) -> Result<[u8; N], MemoryError> {
        self.check_bounds(offset, N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(&self.bytes[offset..offset + N]);
        Ok(out)
    }

    fn write_array<const N: usize>(&mut self, offset: usize, data: [u8; N]) -> Result<(), MemoryError> {
        self.check_bounds(offset, N)?;
        if self.is_read_only() {
            return Err(MemoryError::ReadOnly {
                region: self.name.clone(),
                offset,
            });
        }
        self.bytes[offset..offset + N].copy_from_slice(&data);
        Ok(())
    }
}

impl std::fmt::Debug for MemoryRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let non_zero = self.bytes.iter().filter(|b| **b != 0).count();

        f.debug_struct("MemoryRegion")
            .field("name", &self.name)
            .field("access", &self.access)
            .field("size", &self.bytes.len())
            .field("non_zero_bytes", &non_zero)
            .finish()
    }
}
