//! Address-space router.
//!
//! The bus owns an ordered list of regions mapped at disjoint base
//! addresses. Every access is resolved to exactly one region; an access
//! that would run past the end of its region is a `Straddle` error, never
//! a partial read.

use super::{MemoryError, MemoryRegion};
use tracing::debug;

/// A region placed at a base address.
#[derive(Debug, Clone)]
pub struct Mapping {
    pub base: u16,
    pub region: MemoryRegion,
}

impl Mapping {
    /// One past the last address owned by this mapping.
    pub fn end(&self) -> u32 {
        self.base as u32 + self.region.size() as u32
    }

    pub fn contains(&self, address: u16) -> bool {
        (address as u32) >= self.base as u32 && (address as u32) < self.end()
    }
}

/// The memory bus.
#[derive(Debug, Clone, Default)]
pub struct Bus {
    mappings: Vec<Mapping>,
}

impl Bus {
    /// Create a bus with nothing mapped.
    pub fn new() -> Self {
        Self { mappings: Vec::new() }
    }

    /// Map a region at `base`.
    ///
    /// Fails if the region would overlap an existing mapping or run past
    /// the 16-bit address space.
    pub fn map(&mut self, base: u16, region: MemoryRegion) -> Result<(), MemoryError> {
        let mapping = Mapping { base, region };
        let overlaps = self.mappings.iter().any(|m| {
            (mapping.base as u32) < m.end() && (m.base as u32) < mapping.end()
        });
        if overlaps || mapping.end() > 0x1_0000 {
            return Err(MemoryError::Overlap {
                region: mapping.region.name().to_string(),
                base,
            });
        }

        debug!(
            "mapped region '{}' at 0x{:04X}..0x{:04X} ({:?})",
            mapping.region.name(),
            base,
            mapping.end(),
            mapping.region.access()
        );
        let pos = self.mappings.partition_point(|m| m.base < base);
        self.mappings.insert(pos, mapping);
        Ok(())
    }

    /// Mappings in address order.
    pub fn mappings(&self) -> &[Mapping] {
        &self.mappings
    }

    /// Look up a region by name.
    pub fn region(&self, name: &str) -> Option<&MemoryRegion> {
        self.mappings
            .iter()
            .find(|m| m.region.name() == name)
            .map(|m| &m.region)
    }

    /// Mutable lookup by name, used by the orchestrator to (re)load images.
    pub fn region_mut(&mut self, name: &str) -> Option<&mut MemoryRegion> {
        self.mappings
            .iter_mut()
            .find(|m| m.region.name() == name)
            .map(|m| &mut m.region)
    }

    pub fn is_mapped(&self, address: u16) -> bool {
        self.mappings.iter().any(|m| m.contains(address))
    }

    /// Highest mapped address plus one.
    pub fn size(&self) -> u32 {
        self.mappings.iter().map(Mapping::end).max().unwrap_or(0)
    }

    pub fn read_byte(&self, address: u16) -> Result<u8, MemoryError> {
        let (idx, offset) = self.route(address, 1)?;
        self.mappings[idx].region.read_byte(offset)
    }

    pub fn read_short(&self, address: u16) -> Result<u16, MemoryError> {
        let (idx, offset) = self.route(address, 2)?;
        self.mappings[idx].region.read_short(offset)
    }

    pub fn read_word(&self, address: u16) -> Result<u32, MemoryError> {
        let (idx, offset) = self.route(address, 4)?;
        self.mappings[idx].region.read_word(offset)
    }

    pub fn read_long(&self, address: u16) -> Result<u64, MemoryError> {
        let (idx, offset) = self.route(address, 8)?;
        self.mappings[idx].region.read_long(offset)
    }

    pub fn write_byte(&mut self, address: u16, value: u8) -> Result<(), MemoryError> {
        let (idx, offset) = self.route(address, 1)?;
        self.mappings[idx].region.write_byte(offset, value)
    }

    pub fn write_short(&mut self, address: u16, value: u16) -> Result<(), MemoryError> {
        let (idx, offset) = self.route(address, 2)?;
        self.mappings[idx].region.write_short(offset, value)
    }

    pub fn write_word(&mut self, address: u16, value: u32) -> Result<(), MemoryError> {
        let (idx, offset) = self.route(address, 4)?;
        self.mappings[idx].region.write_word(offset, value)
    }

    pub fn write_long(&mut self, address: u16, value: u64) -> Result<(), MemoryError> {
        let (idx, offset) = self.route(address, 8)?;
        self.mappings[idx].region.write_long(offset, value)
    }

    /// Check that `len` bytes starting at `address` are all mapped and
    /// writable, without writing anything.
    pub fn check_writable(&self, address: u16, len: usize) -> Result<(), MemoryError> {
        for n in 0..len {
            let addr = u16::try_from(address as usize + n)
                .map_err(|_| MemoryError::Unmapped(u16::MAX))?;
            let (idx, offset) = self.route(addr, 1)?;
            let region = &self.mappings[idx].region;
            if region.is_read_only() {
                return Err(MemoryError::ReadOnly {
                    region: region.name().to_string(),
                    offset,
                });
            }
        }
        Ok(())
    }

    /// Resolve an access to (mapping index, region-local offset).
    fn route(&self, address: u16, width: usize) -> Result<(usize, usize), MemoryError> {
        let idx = self
            .mappings
            .iter()
            .position(|m| m.contains(address))
            .ok_or(MemoryError::Unmapped(address))?;

        let mapping = &self.mappings[idx];
        let offset = (address - mapping.base) as usize;
        if offset + width > mapping.region.size() {
            return Err(MemoryError::Straddle {
                region: mapping.region.name().to_string(),
                address,
                width,
            });
        }
        Ok((idx, offset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split_bus() -> Bus {
        let mut bus = Bus::new();
        bus.map(0x000, MemoryRegion::ram("low", 0x10)).unwrap();
        let mut rom = MemoryRegion::rom("rom", 0x10);
        rom.load_data(&[0x60, 0x0A, 0x12, 0x00]).unwrap();
        bus.map(0x010, rom).unwrap();
        bus
    }

    #[test]
    fn test_routes_to_owning_region() {
        let mut bus = split_bus();

        assert_eq!(bus.read_short(0x010).unwrap(), 0x600A);
        assert_eq!(bus.read_word(0x010).unwrap(), 0x600A_1200);

        bus.write_byte(0x00F, 0x42).unwrap();
        assert_eq!(bus.read_byte(0x00F).unwrap(), 0x42);
        assert_eq!(bus.region("low").unwrap().read_byte(0xF).unwrap(), 0x42);
    }

    #[test]
    fn test_unmapped_address() {
        let bus = split_bus();
        assert_eq!(bus.read_byte(0x020), Err(MemoryError::Unmapped(0x020)));
        assert!(!bus.is_mapped(0x020));
        assert_eq!(bus.size(), 0x20);
    }

    #[test]
    fn test_straddling_access_is_an_error() {
        let mut bus = split_bus();

        assert!(matches!(bus.read_short(0x00F), Err(MemoryError::Straddle { .. })));
        assert!(matches!(bus.read_long(0x00C), Err(MemoryError::Straddle { .. })));
        assert!(matches!(bus.write_short(0x00F, 0xFFFF), Err(MemoryError::Straddle { .. })));
        // Nothing leaked into either side.
        assert_eq!(bus.read_byte(0x00F).unwrap(), 0);
        assert_eq!(bus.read_byte(0x010).unwrap(), 0x60);
    }

    #[test]
    fn test_read_only_write_reported() {
        let mut bus = split_bus();

        let err = bus.write_byte(0x011, 0xFF).unwrap_err();
        assert_eq!(err, MemoryError::ReadOnly { region: "rom".into(), offset: 1 });
        assert_eq!(bus.read_byte(0x011).unwrap(), 0x0A);
    }

    #[test]
    fn test_check_writable_spans_regions() {
        let bus = split_bus();

        assert!(bus.check_writable(0x000, 0x10).is_ok());
        assert!(bus.check_writable(0x00E, 0).is_ok());

        let err = bus.check_writable(0x00E, 3).unwrap_err();
        assert_eq!(err, MemoryError::ReadOnly { region: "rom".into(), offset: 0 });
        assert_eq!(bus.check_writable(0x01F, 2), Err(MemoryError::ReadOnly { region: "rom".into(), offset: 0xF }));

        let mut bus = Bus::new();
        bus.map(0x000, MemoryRegion::ram("ram", 0x10)).unwrap();
        assert_eq!(bus.check_writable(0x00E, 3), Err(MemoryError::Unmapped(0x010)));
    }

    #[test]
    fn test_overlapping_map_rejected() {
        let mut bus = split_bus();

        assert!(bus.map(0x018, MemoryRegion::ram("x", 4)).is_err());
        assert!(bus.map(0xFFFE, MemoryRegion::ram("y", 4)).is_err());
        bus.map(0x020, MemoryRegion::ram("high", 0x10)).unwrap();

        let names: Vec<_> = bus.mappings().iter().map(|m| m.region.name()).collect();
        assert_eq!(names, ["low", "rom", "high"]);
    }
}
