//! Disassembler for CHIP-8 programs.
//!
//! Recognizes exactly the opcodes the interpreter executes. Anything else is
//! rendered as a four-digit hexadecimal literal. Disassembly never touches
//! CPU or bus state.

use crate::cpu::Opcode;
use crate::cpu::registers::INSTRUCTION_WIDTH;
use crate::mem::Bus;

/// Disassemble a single opcode to text.
pub fn disassemble_instruction(opcode: Opcode) -> String {
    mnemonic(opcode).unwrap_or_else(|| format!("0x{:04X}", opcode.0))
}

fn mnemonic(op: Opcode) -> Option<String> {
    let (x, y) = (op.x(), op.y());
    let text = match op.class() {
        0x0 => match op.nn() {
            0xE0 => "cls".to_string(),
            0xEE => "ret".to_string(),
            _ => return None,
        },
        0x1 => format!("jp 0x{:03x}", op.nnn()),
        0x2 => format!("call 0x{:03x}", op.nnn()),
        0x3 => format!("se v{:x}, 0x{:02x}", x, op.nn()),
        0x4 => format!("sne v{:x}, 0x{:02x}", x, op.nn()),
        0x5 => format!("se v{:x}, v{:x}", x, y),
        0x6 => format!("ld v{:x}, 0x{:02x}", x, op.nn()),
        0x7 => format!("add v{:x}, 0x{:02x}", x, op.nn()),
        0x8 => {
            let name = match op.n() {
                0x0 => "ld",
                0x1 => "or",
                0x2 => "and",
                0x3 => "xor",
                0x4 => "add",
                0x5 => "sub",
                _ => return None,
            };
            format!("{} v{:x}, v{:x}", name, x, y)
        }
        0xA => format!("ld I, 0x{:03x}", op.nnn()),
        0xB => format!("jp v0, 0x{:03x}", op.nnn()),
        0xC => format!("rand v{:x}, 0x{:02x}", x, op.nn()),
        0xD => format!("drw v{:x}, v{:x}, 0x{:02x}", x, y, op.n()),
        0xE => match op.n() {
            0xE => format!("skp v{:x}", x),
            0x1 => format!("sknp v{:x}", x),
            _ => return None,
        },
        0xF => match op.nn() {
            0x07 => format!("ld v{:x}, t", x),
            0x15 => format!("ld t, v{:x}", x),
            0x18 => format!("ld s, v{:x}", x),
            0x1E => format!("add I, v{:x}", x),
            0x29 => format!("ld I, fnt (v{:x})", x),
            0x33 => format!("bcd v{:x}", x),
            0x55 => format!("str v0 -> v{:x}", x),
            0x65 => format!("ldr v0 -> v{:x}", x),
            _ => return None,
        },
        _ => return None,
    };
    Some(text)
}

/// Lazy (address, mnemonic) sequence read from the bus.
///
/// Yields at most `count` entries, stepping one instruction at a time, and
/// ends early at the first address that cannot be fetched.
pub struct Disassembly<'a> {
    bus: &'a Bus,
    address: u32,
    remaining: usize,
}

/// Disassemble `count` instructions starting at `start`.
pub fn disassembly(bus: &Bus, start: u16, count: usize) -> Disassembly<'_> {
    Disassembly {
        bus,
        address: start as u32,
        remaining: count,
    }
}

impl Iterator for Disassembly<'_> {
    type Item = (u16, String);

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let address = u16::try_from(self.address).ok()?;
        match self.bus.read_short(address) {
            Ok(raw) => {
                self.remaining -= 1;
                self.address += INSTRUCTION_WIDTH as u32;
                Some((address, disassemble_instruction(Opcode(raw))))
            }
            Err(_) => {
                self.remaining = 0;
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining))
    }
}

/// Disassemble a raw program image loaded at `base` into a listing.
pub fn disassemble(image: &[u8], base: u16) -> String {
    let mut output = String::new();
    output.push_str("; CHIP-8 Disassembly\n");
    output.push_str("; ------------------\n\n");

    for (n, pair) in image.chunks(2).enumerate() {
        let address = base as usize + n * 2;
        match pair {
            [hi, lo] => {
                let raw = u16::from_be_bytes([*hi, *lo]);
                let line = disassemble_instruction(Opcode(raw));
                output.push_str(&format!("{:03X}: {:04X}  {}\n", address, raw, line));
            }
            [odd] => output.push_str(&format!("{:03X}: {:02X}    ; trailing byte\n", address, odd)),
            _ => {}
        }
    }

    output
}
