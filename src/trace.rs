//! nestest-style instruction trace.
//!
//! ```text
//! C000  4C F5 C5  JMP $C5F5                       A:00 X:00 Y:00 P:24 SP:FD CYC:7
//! ```
//!
//! Everything is read with [`Bus::peek`], so tracing never disturbs the machine.

use ansi_term::Colour::{Cyan, Green, Red};

use crate::{
    bus::Bus,
    cpu::{AddressingMode, Registers, opcodes},
};

/// The instruction at `regs.pc` followed by the register file.
pub fn trace_line<B: Bus>(bus: &B, regs: &Registers, cycles: usize, color: bool) -> String {
    let pc = regs.pc;
    let len = opcodes::lookup(bus.peek(pc)).map_or(1, |ins| ins.len);

    let bytes = (0..len as u16)
        .map(|i| format!("{:02X}", bus.peek(pc.wrapping_add(i))))
        .collect::<Vec<_>>()
        .join(" ");
    let bytes = format!("{bytes:<8}");
    let asm = format!("{:<32}", disassemble(bus, pc));
    let addr = format!("{pc:04X}");

    let (addr, asm) = if color {
        let asm = if asm.starts_with("???") {
            Red.bold().paint(asm).to_string()
        } else {
            Cyan.paint(asm).to_string()
        };
        (Green.bold().paint(addr).to_string(), asm)
    } else {
        (addr, asm)
    };

    format!(
        "{}  {}  {}A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X} CYC:{}",
        addr, bytes, asm, regs.a, regs.x, regs.y, regs.status, regs.sp, cycles
    )
}

/// Assembler syntax for the instruction at `pc`. Unofficial opcodes come out as `???`.
pub fn disassemble<B: Bus>(bus: &B, pc: u16) -> String {
    let Some(ins) = opcodes::lookup(bus.peek(pc)) else {
        return "???".to_string();
    };

    let b1 = bus.peek(pc.wrapping_add(1));
    let word = u16::from_le_bytes([b1, bus.peek(pc.wrapping_add(2))]);

    let operand = match ins.mode {
        AddressingMode::Implied => String::new(),
        AddressingMode::Accumulator => "A".to_string(),
        AddressingMode::Immediate => format!("#${b1:02X}"),
        AddressingMode::ZeroPage => format!("${b1:02X}"),
        AddressingMode::ZeroPageX => format!("${b1:02X},X"),
        AddressingMode::ZeroPageY => format!("${b1:02X},Y"),
        AddressingMode::Absolute => format!("${word:04X}"),
        AddressingMode::AbsoluteX => format!("${word:04X},X"),
        AddressingMode::AbsoluteY => format!("${word:04X},Y"),
        AddressingMode::Indirect => format!("(${word:04X})"),
        AddressingMode::IndirectX => format!("(${b1:02X},X)"),
        AddressingMode::IndirectY => format!("(${b1:02X}),Y"),
        AddressingMode::Relative => {
            let target = pc.wrapping_add(2).wrapping_add(b1 as i8 as u16);
            format!("${target:04X}")
        }
    };

    if operand.is_empty() {
        ins.mnemonic.to_string()
    } else {
        format!("{} {}", ins.mnemonic, operand)
    }
}
