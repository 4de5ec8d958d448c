//! The CHIP-8 machine.
//!
//! `Chip8` owns the bus, the devices and the CPU, builds the memory map,
//! paces the timers and answers the CPU's stop requests.
//!
//! Memory map:
//! - `0x000..0x200`: "interpreter" (read-write, holds the font glyphs)
//! - `0x200..0x200+len`: "program" (the ROM image, read-only by default)
//! - `0x200+len..0x1000`: "ram" (read-write, absent if the image fills memory)

use crate::asm::{disassembly, Disassembly, RomImage, RomError};
use crate::config::{ConfigError, EmulatorConfig};
use crate::cpu::execute::{FONT_BASE, GLYPH_HEIGHT};
use crate::cpu::{Cpu, CpuError, CpuState, Machine, RegisterInfo, PROGRAM_START};
use crate::devices::{FrameBuffer, Graphics, Keypad, Supervisor, XorShift};
use crate::mem::{Access, Bus, MemoryError, MemoryRegion};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

/// Size of the address space.
pub const ADDRESS_SPACE: usize = 0x1000;

/// Hexadecimal digit glyphs 0-F, five rows each.
pub const FONT: [u8; 16 * GLYPH_HEIGHT as usize] = [
    0xF0, 0x90, 0x90, 0x90, 0xF0, // 0
    0x20, 0x60, 0x20, 0x20, 0x70, // 1
    0xF0, 0x10, 0xF0, 0x80, 0xF0, // 2
    0xF0, 0x10, 0xF0, 0x10, 0xF0, // 3
    0x90, 0x90, 0xF0, 0x10, 0x10, // 4
    0xF0, 0x80, 0xF0, 0x10, 0xF0, // 5
    0xF0, 0x80, 0xF0, 0x90, 0xF0, // 6
    0xF0, 0x10, 0x20, 0x40, 0x40, // 7
    0xF0, 0x90, 0xF0, 0x90, 0xF0, // 8
    0xF0, 0x90, 0xF0, 0x10, 0xF0, // 9
    0xF0, 0x90, 0xF0, 0x90, 0x90, // A
    0xE0, 0x90, 0xE0, 0x90, 0xE0, // B
    0xF0, 0x80, 0x80, 0x80, 0xF0, // C
    0xE0, 0x90, 0x90, 0x90, 0xE0, // D
    0xF0, 0x80, 0xF0, 0x80, 0xF0, // E
    0xF0, 0x80, 0xF0, 0x80, 0x80, // F
];

/// Records stop requests from the CPU.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    requests: usize,
}

impl StopSignal {
    pub fn is_stopped(&self) -> bool {
        self.requests > 0
    }

    /// How many times a stop has been requested.
    pub fn requests(&self) -> usize {
        self.requests
    }

    fn clear(&mut self) {
        self.requests = 0;
    }
}

impl Supervisor for StopSignal {
    fn stop(&mut self) {
        self.requests += 1;
    }
}

/// Serializable view of the machine for inspection tooling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MachineSnapshot {
    pub rom: String,
    pub state: CpuState,
    pub instructions: u64,
    pub registers: Vec<RegisterInfo>,
    pub stack: Vec<u16>,
    pub disassembly: Vec<(u16, String)>,
}

/// A complete CHIP-8 machine.
pub struct Chip8 {
    pub cpu: Cpu,
    pub bus: Bus,
    pub display: FrameBuffer,
    pub keypad: Keypad,
    signal: StopSignal,
    config: EmulatorConfig,
    rom: RomImage,
    timer_phase: u32,
}

impl Chip8 {
    /// Build a machine with `rom` loaded at the program start.
    pub fn new(rom: RomImage, config: EmulatorConfig) -> Result<Self, SystemError> {
        config.validate()?;
        let bus = build_bus(&rom, &config)?;

        let rng = match config.rng_seed {
            Some(seed) => XorShift::new(seed),
            None => XorShift::from_clock(),
        };
        let mut cpu = Cpu::new(Box::new(rng));
        cpu.collision_flag = config.collision_flag;

        info!("loaded '{}' ({} bytes)", rom.name, rom.len());
        Ok(Self {
            cpu,
            bus,
            display: FrameBuffer::new(),
            keypad: Keypad::new(),
            signal: StopSignal::default(),
            config,
            rom,
            timer_phase: 0,
        })
    }

    /// Execute one instruction and advance the timers.
    ///
    /// Does nothing once stopped.
    pub fn step(&mut self) -> Result<(), SystemError> {
        if self.is_stopped() {
            return Ok(());
        }

        let mut machine = Machine {
            bus: &mut self.bus,
            graphics: &mut self.display,
            input: &self.keypad,
            supervisor: &mut self.signal,
        };
        self.cpu.tick(&mut machine)?;

        if self.cpu.is_running() {
            self.timer_phase += 1;
            if self.timer_phase >= self.config.ticks_per_timer() {
                self.timer_phase = 0;
                self.cpu.tick_timers();
            }
        }
        Ok(())
    }

    /// Step up to `ticks` times, stopping early when the machine stops.
    ///
    /// Returns the number of instructions executed.
    pub fn run_for(&mut self, ticks: u64) -> Result<u64, SystemError> {
        let start = self.cpu.instructions;
        for _ in 0..ticks {
            if self.is_stopped() {
                break;
            }
            self.step()?;
        }
        Ok(self.cpu.instructions - start)
    }

    /// External stop request. The CPU halts and stays halted until `reset`.
    pub fn stop(&mut self) {
        debug!("stop requested by host");
        self.cpu.state = CpuState::Halted;
        self.signal.stop();
    }

    pub fn is_stopped(&self) -> bool {
        self.signal.is_stopped() || self.cpu.is_halted()
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.signal
    }

    /// Rebuild memory from the ROM image and reinitialize the CPU.
    pub fn reset(&mut self) -> Result<(), SystemError> {
        self.bus = build_bus(&self.rom, &self.config)?;
        self.cpu.init();
        self.display.clear();
        self.keypad.release_all();
        self.signal.clear();
        self.timer_phase = 0;
        debug!("machine reset");
        Ok(())
    }

    /// Disassembly from the current PC, bounded by the configured length.
    pub fn disassembly(&self) -> Disassembly<'_> {
        disassembly(&self.bus, self.cpu.regs.pc, self.config.disassembly_lines)
    }

    pub fn registers(&self) -> Vec<RegisterInfo> {
        self.cpu.register_snapshot()
    }

    /// Executed-instruction counter.
    pub fn instructions(&self) -> u64 {
        self.cpu.instructions
    }

    pub fn config(&self) -> &EmulatorConfig {
        &self.config
    }

    pub fn rom(&self) -> &RomImage {
        &self.rom
    }

    pub fn snapshot(&self) -> MachineSnapshot {
        MachineSnapshot {
            rom: self.rom.name.clone(),
            state: self.cpu.state,
            instructions: self.cpu.instructions,
            registers: self.registers(),
            stack: self.cpu.call_stack().to_vec(),
            disassembly: self.disassembly().collect(),
        }
    }
}

impl std::fmt::Debug for Chip8 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Chip8")
            .field("rom", &self.rom.name)
            .field("cpu", &self.cpu)
            .field("stopped", &self.is_stopped())
            .finish()
    }
}

fn build_bus(rom: &RomImage, config: &EmulatorConfig) -> Result<Bus, MemoryError> {
    let mut bus = Bus::new();

    let mut low = MemoryRegion::ram("interpreter", PROGRAM_START as usize);
    let mut font_area = vec![0u8; FONT_BASE as usize];
    font_area.extend_from_slice(&FONT);
    low.load_data(&font_area)?;
    bus.map(0x000, low)?;

    let access = if config.writable_program { Access::ReadWrite } else { Access::ReadOnly };
    let mut program = MemoryRegion::new("program", rom.len(), access);
    program.load_data(rom.bytes())?;
    bus.map(PROGRAM_START, program)?;

    let end = PROGRAM_START as usize + rom.len();
    if end < ADDRESS_SPACE {
        bus.map(end as u16, MemoryRegion::ram("ram", ADDRESS_SPACE - end))?;
    }
    Ok(bus)
}

/// Errors surfaced by the machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SystemError {
    #[error(transparent)]
    Cpu(#[from] CpuError),

    #[error(transparent)]
    Memory(#[from] MemoryError),

    #[error(transparent)]
    Rom(#[from] RomError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn machine(program: &[u16]) -> Chip8 {
        let bytes = program.iter().flat_map(|w| w.to_be_bytes()).collect();
        let rom = RomImage::new("test", bytes).unwrap();
        let config = EmulatorConfig { rng_seed: Some(1), ..EmulatorConfig::default() };
        Chip8::new(rom, config).unwrap()
    }

    #[test]
    fn test_memory_map() {
        let chip = machine(&[0x1200]);
        let names: Vec<_> = chip.bus.mappings().iter().map(|m| (m.base, m.region.name())).collect();

        assert_eq!(names, [(0x000, "interpreter"), (0x200, "program"), (0x202, "ram")]);
        assert_eq!(chip.bus.size(), 0x1000);
        assert!(chip.bus.region("program").unwrap().is_read_only());
        assert_eq!(chip.bus.read_byte(FONT_BASE + 5).unwrap(), 0x20);
    }

    #[test]
    fn test_full_image_leaves_no_ram() {
        let rom = RomImage::new("big", vec![0x12; crate::asm::rom::MAX_ROM_SIZE]).unwrap();
        let chip = Chip8::new(rom, EmulatorConfig::default()).unwrap();
        assert!(chip.bus.region("ram").is_none());
        assert_eq!(chip.bus.size(), 0x1000);
    }

    #[test]
    fn test_font_sprite_draws() {
        // Draw glyph "0" at (0, 0).
        let mut chip = machine(&[0x6000, 0xF029, 0xD005]);
        chip.run_for(3).unwrap();

        assert!(chip.display.pixel(0, 0));
        assert!(chip.display.pixel(3, 0));
        assert!(!chip.display.pixel(1, 1));
        assert_eq!(chip.display.lit(), 14);
    }

    #[test]
    fn test_unknown_opcode_stops_machine() {
        let mut chip = machine(&[0x6001, 0x9000, 0x6002]);

        let executed = chip.run_for(10).unwrap();
        assert_eq!(executed, 1);
        assert!(chip.is_stopped());
        assert_eq!(chip.stop_signal().requests(), 1);
        assert_eq!(chip.cpu.regs.v[0], 1);
    }

    #[test]
    fn test_protected_program_faults_on_write() {
        // BCD of V0 into the program image itself.
        let mut chip = machine(&[0xA200, 0xF033]);
        chip.step().unwrap();

        let err = chip.step().unwrap_err();
        assert!(matches!(err, SystemError::Cpu(CpuError::Memory(MemoryError::ReadOnly { .. }))));
        assert!(chip.is_stopped());
        assert_eq!(chip.bus.read_short(0x200).unwrap(), 0xA200);
    }

    #[test]
    fn test_writable_program_option() {
        let bytes = [0xA2, 0x00, 0xF0, 0x33].to_vec();
        let rom = RomImage::new("w", bytes).unwrap();
        let config = EmulatorConfig { writable_program: true, ..EmulatorConfig::default() };
        let mut chip = Chip8::new(rom, config).unwrap();

        chip.run_for(2).unwrap();
        assert_eq!(chip.bus.read_byte(0x200).unwrap(), 0);
    }

    #[test]
    fn test_timers_follow_instruction_rate() {
        // Set the delay timer to 2, then spin.
        let mut chip = machine(&[0x6002, 0xF015, 0x1204]);
        chip.run_for(2).unwrap();
        assert_eq!(chip.cpu.regs.delay, 2);

        let per_timer = chip.config().ticks_per_timer() as u64;
        chip.run_for(2 * per_timer).unwrap();
        assert_eq!(chip.cpu.regs.delay, 0);
    }

    #[test]
    fn test_stop_and_reset() {
        let mut chip = machine(&[0x7001, 0x1200]);
        chip.run_for(4).unwrap();
        assert_eq!(chip.cpu.regs.v[0], 2);

        chip.stop();
        assert_eq!(chip.run_for(4).unwrap(), 0);

        chip.reset().unwrap();
        assert!(!chip.is_stopped());
        assert_eq!(chip.cpu.regs.v[0], 0);
        assert_eq!(chip.run_for(2).unwrap(), 2);
    }

    #[test]
    fn test_disassembly_leaves_state_alone() {
        let mut chip = machine(&[0x600A, 0xA300, 0x2208, 0x0000, 0x7101, 0x00EE]);
        chip.run_for(4).unwrap();

        let contents = |chip: &Chip8| -> Vec<Vec<u8>> {
            chip.bus.mappings().iter().map(|m| m.region.as_bytes().to_vec()).collect()
        };
        let before = chip.snapshot();
        let memory = contents(&chip);

        for _ in 0..3 {
            assert_eq!(chip.disassembly().count(), chip.config().disassembly_lines);
        }
        let _ = crate::asm::disassembly(&chip.bus, 0x000, 0x800).count();

        assert_eq!(chip.snapshot(), before);
        assert_eq!(contents(&chip), memory);
        assert_eq!(chip.instructions(), 4);
    }

    #[test]
    fn test_faulted_bcd_is_atomic() {
        // V0 = 234, I = 0x1FE: the third digit would land in the program.
        let mut chip = machine(&[0x60EA, 0xA1FE, 0xF033]);
        chip.run_for(2).unwrap();

        let err = chip.step().unwrap_err();
        assert!(matches!(err, SystemError::Cpu(CpuError::Memory(MemoryError::ReadOnly { .. }))));
        assert_eq!(chip.bus.read_byte(0x1FE).unwrap(), 0);
        assert_eq!(chip.bus.read_byte(0x1FF).unwrap(), 0);
    }

    #[test]
    fn test_snapshot() {
        let mut chip = machine(&[0x2204, 0x0000, 0x600A, 0x00EE]);
        chip.run_for(2).unwrap();

        let snap = chip.snapshot();
        assert_eq!(snap.state, CpuState::Running);
        assert_eq!(snap.instructions, 2);
        assert_eq!(snap.stack, vec![0x200]);
        assert_eq!(snap.disassembly[0], (0x206, "ret".to_string()));
        assert!(snap.disassembly.len() <= chip.config().disassembly_lines);
    }
}
