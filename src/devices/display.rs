//! Monochrome frame buffer.

use super::Graphics;
use crate::mem::{Bus, MemoryError};

/// Display width in pixels.
pub const WIDTH: usize = 64;
/// Display height in pixels.
pub const HEIGHT: usize = 32;

/// 64x32 one-bit display.
///
/// Sprites are XORed onto the buffer. The starting coordinate wraps around
/// the screen; rows and columns that run off the edge are clipped.
#[derive(Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    pixels: Vec<bool>,
    dirty: bool,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            pixels: vec![false; WIDTH * HEIGHT],
            dirty: true,
        }
    }

    /// Whether the pixel at (x, y) is lit. Out-of-range coordinates are dark.
    pub fn pixel(&self, x: usize, y: usize) -> bool {
        x < WIDTH && y < HEIGHT && self.pixels[y * WIDTH + x]
    }

    /// Number of lit pixels.
    pub fn lit(&self) -> usize {
        self.pixels.iter().filter(|p| **p).count()
    }

    /// Rows of the display, top to bottom.
    pub fn rows(&self) -> impl Iterator<Item = &[bool]> {
        self.pixels.chunks(WIDTH)
    }

    /// Returns true once after every change to the buffer.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl Graphics for FrameBuffer {
    fn clear(&mut self) {
        self.pixels.iter_mut().for_each(|p| *p = false);
        self.dirty = true;
    }

    fn draw_sprite(
        &mut self,
        bus: &Bus,
        x: u8,
        y: u8,
        height: u8,
        source: u16,
    ) -> Result<bool, MemoryError> {
        let x0 = x as usize % WIDTH;
        let y0 = y as usize % HEIGHT;
        let mut collision = false;

        for row in 0..height as u16 {
            let line = bus.read_byte(source.wrapping_add(row))?;
            let py = y0 + row as usize;
            if py >= HEIGHT {
                break;
            }
            for bit in 0..8 {
                let px = x0 + bit;
                if px >= WIDTH {
                    break;
                }
                if line & (0x80 >> bit) != 0 {
                    let cell = &mut self.pixels[py * WIDTH + px];
                    collision |= *cell;
                    *cell = !*cell;
                }
            }
        }

        self.dirty = true;
        Ok(collision)
    }
}

impl std::fmt::Debug for FrameBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameBuffer")
            .field("lit", &self.lit())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mem::MemoryRegion;

    fn sprite_bus(rows: &[u8]) -> Bus {
        let mut bus = Bus::new();
        let mut ram = MemoryRegion::ram("ram", 0x100);
        ram.load_data(rows).unwrap();
        bus.map(0, ram).unwrap();
        bus
    }

    #[test]
    fn test_draw_and_collide() {
        let bus = sprite_bus(&[0b1100_0000, 0b0000_0001]);
        let mut fb = FrameBuffer::new();

        let hit = fb.draw_sprite(&bus, 2, 3, 2, 0).unwrap();
        assert!(!hit);
        assert!(fb.pixel(2, 3));
        assert!(fb.pixel(3, 3));
        assert!(fb.pixel(9, 4));
        assert_eq!(fb.lit(), 3);

        // Drawing the same sprite again erases it and reports the collision.
        let hit = fb.draw_sprite(&bus, 2, 3, 2, 0).unwrap();
        assert!(hit);
        assert_eq!(fb.lit(), 0);
    }

    #[test]
    fn test_start_wraps_and_edges_clip() {
        let bus = sprite_bus(&[0xFF, 0xFF]);
        let mut fb = FrameBuffer::new();

        // x = 64 + 60 wraps to 60; only 4 columns fit.
        fb.draw_sprite(&bus, 124, 31, 2, 0).unwrap();
        assert_eq!(fb.lit(), 4);
        assert!(fb.pixel(63, 31));
        assert!(!fb.pixel(0, 0));
    }

    #[test]
    fn test_clear() {
        let bus = sprite_bus(&[0xFF]);
        let mut fb = FrameBuffer::new();
        fb.draw_sprite(&bus, 0, 0, 1, 0).unwrap();
        fb.take_dirty();

        fb.clear();
        assert_eq!(fb.lit(), 0);
        assert!(fb.take_dirty());
        assert!(!fb.take_dirty());
    }

    #[test]
    fn test_sprite_source_must_be_mapped() {
        let bus = sprite_bus(&[]);
        let mut fb = FrameBuffer::new();
        assert!(fb.draw_sprite(&bus, 0, 0, 1, 0x200).is_err());
    }
}
