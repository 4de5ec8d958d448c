//! Memory subsystem.
//!
//! Storage is split in two layers:
//! - `MemoryRegion`: a fixed-capacity byte store with width-typed accessors
//!   and an access capability (read-write or read-only)
//! - `Bus`: maps regions over the flat address space and routes accesses
//!
//! All multi-byte accesses are big-endian.

pub mod region;
pub mod bus;

pub use region::{Access, MemoryRegion};
pub use bus::{Bus, Mapping};

use thiserror::Error;

/// Errors raised by regions and the bus.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MemoryError {
    /// No region is mapped at the address.
    #[error("address 0x{0:04X} is not mapped")]
    Unmapped(u16),

    /// A region-local access ran past the region capacity.
    #[error("{width}-byte access at offset 0x{offset:04X} exceeds region '{region}' ({capacity} bytes)")]
    OutOfBounds {
        region: String,
        offset: usize,
        width: usize,
        capacity: usize,
    },

    /// A multi-byte access started in one region and ended outside it.
    #[error("{width}-byte access at 0x{address:04X} straddles the end of region '{region}'")]
    Straddle {
        region: String,
        address: u16,
        width: usize,
    },

    /// A write was attempted on a read-only region.
    #[error("write to read-only region '{region}' at offset 0x{offset:04X}")]
    ReadOnly { region: String, offset: usize },

    /// A bulk load was larger than the region.
    #[error("image of {size} bytes does not fit region '{region}' ({capacity} bytes)")]
    ImageTooLarge {
        region: String,
        size: usize,
        capacity: usize,
    },

    /// A region was mapped over addresses another region already owns.
    #[error("region '{region}' at 0x{base:04X} overlaps an existing mapping")]
    Overlap { region: String, base: u16 },
}
