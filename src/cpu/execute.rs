//! CPU execution engine.
//!
//! Implements the fetch-decode-execute cycle. Each tick fetches one opcode
//! from the bus, looks its class up in a 16-entry dispatch table, and runs
//! the handler. Handlers own all program-counter movement.

use crate::cpu::decode::Opcode;
use crate::cpu::registers::{Registers, RegisterInfo};
use crate::devices::{Graphics, Input, RandomSource, Supervisor};
use crate::mem::{Bus, MemoryError};
use serde::{Serialize, Deserialize};
use thiserror::Error;
use tracing::{error, trace, warn};

/// Depth of the call stack.
pub const STACK_DEPTH: usize = 16;

/// Address of the first font glyph.
pub const FONT_BASE: u16 = 0x000;

/// Bytes per font glyph.
pub const GLYPH_HEIGHT: u16 = 5;

/// CPU execution state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CpuState {
    /// CPU is executing instructions.
    Running,
    /// CPU has stopped; `tick` does nothing until `init`.
    Halted,
}

/// Everything the CPU touches that it does not own, borrowed for one tick.
pub struct Machine<'a> {
    pub bus: &'a mut Bus,
    pub graphics: &'a mut dyn Graphics,
    pub input: &'a dyn Input,
    pub supervisor: &'a mut dyn Supervisor,
}

type Handler = fn(&mut Cpu, &mut Machine<'_>, Opcode) -> Result<(), CpuError>;

/// Handlers indexed by opcode class. Class 0x9 has none.
const DISPATCH: [Option<Handler>; 16] = [
    Some(Cpu::op_system as Handler),
    Some(Cpu::op_jump as Handler),
    Some(Cpu::op_call as Handler),
    Some(Cpu::op_skip_eq_imm as Handler),
    Some(Cpu::op_skip_ne_imm as Handler),
    Some(Cpu::op_skip_eq_reg as Handler),
    Some(Cpu::op_load_imm as Handler),
    Some(Cpu::op_add_imm as Handler),
    Some(Cpu::op_alu as Handler),
    None,
    Some(Cpu::op_load_index as Handler),
    Some(Cpu::op_jump_offset as Handler),
    Some(Cpu::op_random as Handler),
    Some(Cpu::op_draw as Handler),
    Some(Cpu::op_key as Handler),
    Some(Cpu::op_misc as Handler),
];

/// The CHIP-8 CPU.
pub struct Cpu {
    /// CPU registers.
    pub regs: Registers,
    /// Return addresses, indexed by `regs.sp`. At most `STACK_DEPTH - 1`
    /// are live at once.
    pub stack: [u16; STACK_DEPTH],
    /// Current execution state.
    pub state: CpuState,
    /// Instructions executed since construction. Never reset.
    pub instructions: u64,
    /// Write the draw collision result into VF.
    pub collision_flag: bool,
    rng: Box<dyn RandomSource>,
}

impl Cpu {
    /// Create a CPU in the `Running` state with power-on registers.
    pub fn new(rng: Box<dyn RandomSource>) -> Self {
        let mut cpu = Self {
            regs: Registers::new(),
            stack: [0; STACK_DEPTH],
            state: CpuState::Running,
            instructions: 0,
            collision_flag: false,
            rng,
        };
        cpu.init();
        cpu
    }

    /// Reset registers and stack and resume `Running`.
    pub fn init(&mut self) {
        self.regs.reset();
        self.stack = [0; STACK_DEPTH];
        self.state = CpuState::Running;
    }

    /// Execute a single instruction.
    ///
    /// An unknown opcode halts the CPU, asks the supervisor to stop and
    /// returns `Ok`. A bus or stack fault does the same but is returned as
    /// an error. Does nothing once halted.
    pub fn tick(&mut self, machine: &mut Machine<'_>) -> Result<(), CpuError> {
        if self.state == CpuState::Halted {
            return Ok(());
        }

        let pc = self.regs.pc;
        match self.execute(machine, pc) {
            Ok(()) => {
                self.instructions += 1;
                Ok(())
            }
            Err(CpuError::UnknownOpcode { opcode, pc }) => {
                error!("unimplemented opcode {} at pc 0x{:04X}", opcode, pc);
                self.halt(machine);
                Ok(())
            }
            Err(e) => {
                error!("fault at pc 0x{:04X}: {}", pc, e);
                self.halt(machine);
                Err(e)
            }
        }
    }

    fn execute(&mut self, machine: &mut Machine<'_>, pc: u16) -> Result<(), CpuError> {
        let opcode = Opcode(machine.bus.read_short(pc)?);
        trace!("0x{:04X}: {}", pc, opcode);

        match DISPATCH[opcode.class() as usize] {
            Some(handler) => handler(self, machine, opcode),
            None => Err(self.unknown(opcode)),
        }
    }

    fn halt(&mut self, machine: &mut Machine<'_>) {
        self.state = CpuState::Halted;
        warn!("CPU halted after {} instructions, requesting stop", self.instructions);
        machine.supervisor.stop();
    }

    fn unknown(&self, opcode: Opcode) -> CpuError {
        CpuError::UnknownOpcode { opcode, pc: self.regs.pc }
    }

    /// Count both timers down by one, stopping at zero.
    pub fn tick_timers(&mut self) {
        self.regs.delay = self.regs.delay.saturating_sub(1);
        self.regs.sound = self.regs.sound.saturating_sub(1);
    }

    /// Ordered copy of the register file.
    pub fn register_snapshot(&self) -> Vec<RegisterInfo> {
        self.regs.snapshot()
    }

    /// Return addresses currently on the stack, oldest first.
    pub fn call_stack(&self) -> &[u16] {
        &self.stack[..self.regs.sp as usize]
    }

    pub fn is_halted(&self) -> bool {
        self.state == CpuState::Halted
    }

    pub fn is_running(&self) -> bool {
        self.state == CpuState::Running
    }

    fn push(&mut self, address: u16) -> Result<(), CpuError> {
        let sp = self.regs.sp as usize;
        // SP stays below the depth, so the last slot is never filled.
        if sp + 1 >= STACK_DEPTH {
            return Err(CpuError::StackOverflow { pc: self.regs.pc });
        }
        self.stack[sp] = address;
        self.regs.sp += 1;
        Ok(())
    }

    fn pop(&mut self) -> Result<u16, CpuError> {
        if self.regs.sp == 0 {
            return Err(CpuError::StackUnderflow { pc: self.regs.pc });
        }
        self.regs.sp -= 1;
        Ok(self.stack[self.regs.sp as usize])
    }

    // ==================== Handlers ====================

    /// 00E0 clear display, 00EE return.
    fn op_system(&mut self, m: &mut Machine<'_>, op: Opcode) -> Result<(), CpuError> {
        match op.nn() {
            0xE0 => {
                m.graphics.clear();
                self.regs.advance();
            }
            0xEE => {
                // The stack holds the address of the call itself.
                self.regs.pc = self.pop()?;
                self.regs.advance();
            }
            _ => return Err(self.unknown(op)),
        }
        Ok(())
    }

    /// 1NNN
    fn op_jump(&mut self, _m: &mut Machine<'_>, op: Opcode) -> Result<(), CpuError> {
        self.regs.pc = op.nnn();
        Ok(())
    }

    /// 2NNN
    fn op_call(&mut self, _m: &mut Machine<'_>, op: Opcode) -> Result<(), CpuError> {
        self.push(self.regs.pc)?;
        self.regs.pc = op.nnn();
        Ok(())
    }

    /// 3XNN
    fn op_skip_eq_imm(&mut self, _m: &mut Machine<'_>, op: Opcode) -> Result<(), CpuError> {
        self.regs.skip_if(self.regs.v[op.x()] == op.nn());
        Ok(())
    }

    /// 4XNN
    fn op_skip_ne_imm(&mut self, _m: &mut Machine<'_>, op: Opcode) -> Result<(), CpuError> {
        self.regs.skip_if(self.regs.v[op.x()] != op.nn());
        Ok(())
    }

    /// 5XY_
    fn op_skip_eq_reg(&mut self, _m: &mut Machine<'_>, op: Opcode) -> Result<(), CpuError> {
        self.regs.skip_if(self.regs.v[op.x()] == self.regs.v[op.y()]);
        Ok(())
    }

    /// 6XNN
    fn op_load_imm(&mut self, _m: &mut Machine<'_>, op: Opcode) -> Result<(), CpuError> {
        self.regs.v[op.x()] = op.nn();
        self.regs.advance();
        Ok(())
    }

    /// 7XNN, no flag.
    fn op_add_imm(&mut self, _m: &mut Machine<'_>, op: Opcode) -> Result<(), CpuError> {
        let x = op.x();
        self.regs.v[x] = self.regs.v[x].wrapping_add(op.nn());
        self.regs.advance();
        Ok(())
    }

    /// 8XY0-8XY5. Results come from the operands as read before the
    /// instruction; VF is written last so the flag wins when X is F.
    fn op_alu(&mut self, _m: &mut Machine<'_>, op: Opcode) -> Result<(), CpuError> {
        let (x, a, b) = (op.x(), self.regs.v[op.x()], self.regs.v[op.y()]);
        match op.n() {
            0x0 => self.regs.v[x] = b,
            0x1 => self.regs.v[x] = a | b,
            0x2 => self.regs.v[x] = a & b,
            0x3 => self.regs.v[x] = a ^ b,
            0x4 => {
                let (sum, carry) = a.overflowing_add(b);
                self.regs.v[x] = sum;
                self.regs.set_flag(carry);
            }
            0x5 => {
                // VF = 1 means no borrow.
                self.regs.v[x] = a.wrapping_sub(b);
                self.regs.set_flag(a >= b);
            }
            _ => return Err(self.unknown(op)),
        }
        self.regs.advance();
        Ok(())
    }

    /// ANNN
    fn op_load_index(&mut self, _m: &mut Machine<'_>, op: Opcode) -> Result<(), CpuError> {
        self.regs.set_index(op.nnn());
        self.regs.advance();
        Ok(())
    }

    /// BNNN
    fn op_jump_offset(&mut self, _m: &mut Machine<'_>, op: Opcode) -> Result<(), CpuError> {
        self.regs.pc = op.nnn() + self.regs.v[0] as u16;
        Ok(())
    }

    /// CXNN
    fn op_random(&mut self, _m: &mut Machine<'_>, op: Opcode) -> Result<(), CpuError> {
        self.regs.v[op.x()] = self.rng.next_byte() & op.nn();
        self.regs.advance();
        Ok(())
    }

    /// DXYN
    fn op_draw(&mut self, m: &mut Machine<'_>, op: Opcode) -> Result<(), CpuError> {
        let x = self.regs.v[op.x()];
        let y = self.regs.v[op.y()];
        let collision = m.graphics.draw_sprite(m.bus, x, y, op.n(), self.regs.index())?;
        if self.collision_flag {
            self.regs.set_flag(collision);
        }
        self.regs.advance();
        Ok(())
    }

    /// EX9E skip if pressed, EXA1 skip if not pressed (selected by low nibble).
    fn op_key(&mut self, m: &mut Machine<'_>, op: Opcode) -> Result<(), CpuError> {
        let want_down = match op.n() {
            0xE => true,
            0x1 => false,
            _ => return Err(self.unknown(op)),
        };
        let key = format!("{:X}", self.regs.v[op.x()]);
        let down = m.input.is_key_down(&key);
        self.regs.skip_if(down == want_down);
        Ok(())
    }

    /// FX07, FX15, FX18, FX1E, FX29, FX33, FX55, FX65.
    fn op_misc(&mut self, m: &mut Machine<'_>, op: Opcode) -> Result<(), CpuError> {
        let x = op.x();
        let i = self.regs.index();
        match op.nn() {
            0x07 => self.regs.v[x] = self.regs.delay,
            0x15 => self.regs.delay = self.regs.v[x],
            0x18 => self.regs.sound = self.regs.v[x],
            0x1E => self.regs.set_index(i + self.regs.v[x] as u16),
            0x29 => self.regs.set_index(FONT_BASE + self.regs.v[x] as u16 * GLYPH_HEIGHT),
            0x33 => {
                // Multi-byte stores either land whole or not at all.
                m.bus.check_writable(i, 3)?;
                let value = self.regs.v[x];
                m.bus.write_byte(i, value / 100)?;
                m.bus.write_byte(i + 1, (value / 10) % 10)?;
                m.bus.write_byte(i + 2, value % 10)?;
            }
            0x55 => {
                m.bus.check_writable(i, x + 1)?;
                for n in 0..=x {
                    m.bus.write_byte(i + n as u16, self.regs.v[n])?;
                }
            }
            0x65 => {
                let mut loaded = [0u8; 16];
                for n in 0..=x {
                    loaded[n] = m.bus.read_byte(i + n as u16)?;
                }
                self.regs.v[..=x].copy_from_slice(&loaded[..=x]);
            }
            _ => return Err(self.unknown(op)),
        }
        self.regs.advance();
        Ok(())
    }
}

impl std::fmt::Debug for Cpu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cpu")
            .field("state", &self.state)
            .field("instructions", &self.instructions)
            .field("regs", &self.regs)
            .field("stack", &self.call_stack())
            .finish()
    }
}

/// Errors that can occur during CPU execution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CpuError {
    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),

    #[error("call stack overflow at pc 0x{pc:04X}")]
    StackOverflow { pc: u16 },

    #[error("return with empty call stack at pc 0x{pc:04X}")]
    StackUnderflow { pc: u16 },

    #[error("unimplemented opcode {opcode} at pc 0x{pc:04X}")]
    UnknownOpcode { opcode: Opcode, pc: u16 },
}
