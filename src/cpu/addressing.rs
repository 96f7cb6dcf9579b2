//! Operand resolution.
//!
//! Resolution happens with PC on the first operand byte (the opcode is already fetched).
//! It yields the effective address; the operand value is only read when an instruction
//! asks for it, so stores and read-modify-write instructions never do a spurious read.
//!
//! Three wraps stay inside page zero: `zp,X`, `zp,Y`, and the pointer fetch of `(zp,X)` and
//! `(zp),Y`. `JMP ($xxFF)` takes its high byte from `$xx00`, as the NMOS part does.

use crate::{
    bus::Bus,
    cpu::{CPU, CpuError, opcodes::AddressingMode},
};

/// A resolved operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Operand {
    pub mode: AddressingMode,
    /// Effective address. Immediate: the operand byte itself. Relative: the branch target.
    /// `None` for implied and accumulator modes.
    pub addr: Option<u16>,
    /// Indexing (or a taken branch) landed on a different page than the base.
    pub page_crossed: bool,
}

fn crosses_page(base: u16, addr: u16) -> bool {
    (base & 0xFF00) != (addr & 0xFF00)
}

impl<B: Bus> CPU<B> {
    pub(crate) fn resolve(&mut self, mode: AddressingMode) -> Result<Operand, CpuError> {
        use AddressingMode::*;

        let pc = self.pc;
        let (addr, page_crossed) = match mode {
            Implied | Accumulator => (None, false),

            Immediate => (Some(pc), false),

            ZeroPage => (Some(self.read(pc)? as u16), false),

            ZeroPageX => {
                let base = self.read(pc)?;
                (Some(base.wrapping_add(self.x) as u16), false)
            }

            ZeroPageY => {
                let base = self.read(pc)?;
                (Some(base.wrapping_add(self.y) as u16), false)
            }

            Absolute => (Some(self.read_u16(pc)?), false),

            AbsoluteX => {
                let base = self.read_u16(pc)?;
                let addr = base.wrapping_add(self.x as u16);
                (Some(addr), crosses_page(base, addr))
            }

            AbsoluteY => {
                let base = self.read_u16(pc)?;
                let addr = base.wrapping_add(self.y as u16);
                (Some(addr), crosses_page(base, addr))
            }

            Indirect => {
                let ptr = self.read_u16(pc)?;
                let lo = self.read(ptr)? as u16;
                // page-boundary bug: the carry out of the low byte is lost
                let hi_addr = (ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF);
                let hi = self.read(hi_addr)? as u16;
                (Some((hi << 8) | lo), false)
            }

            IndirectX => {
                let ptr = self.read(pc)?.wrapping_add(self.x);
                (Some(self.read_zero_page_u16(ptr)?), false)
            }

            IndirectY => {
                let ptr = self.read(pc)?;
                let base = self.read_zero_page_u16(ptr)?;
                let addr = base.wrapping_add(self.y as u16);
                (Some(addr), crosses_page(base, addr))
            }

            Relative => {
                let offset = self.read(pc)? as i8;
                let next = pc.wrapping_add(1);
                let target = next.wrapping_add(offset as u16);
                (Some(target), crosses_page(next, target))
            }
        };

        Ok(Operand {
            mode,
            addr,
            page_crossed,
        })
    }

    fn read_zero_page_u16(&mut self, ptr: u8) -> Result<u16, CpuError> {
        let lo = self.read(ptr as u16)? as u16;
        let hi = self.read(ptr.wrapping_add(1) as u16)? as u16;
        Ok((hi << 8) | lo)
    }

    pub(crate) fn read_operand(&mut self, operand: &Operand) -> Result<u8, CpuError> {
        match (operand.mode, operand.addr) {
            (AddressingMode::Accumulator, _) => Ok(self.a),
            (_, Some(addr)) => self.read(addr),
            (mode, None) => Err(CpuError::InvalidAddressingMode {
                mode,
                pc: self.instr_pc(),
            }),
        }
    }

    pub(crate) fn write_operand(&mut self, operand: &Operand, value: u8) -> Result<(), CpuError> {
        match (operand.mode, operand.addr) {
            (AddressingMode::Accumulator, _) => {
                self.a = value;
                Ok(())
            }
            (AddressingMode::Immediate, _) | (_, None) => Err(CpuError::InvalidAddressingMode {
                mode: operand.mode,
                pc: self.instr_pc(),
            }),
            (_, Some(addr)) => self.write(addr, value),
        }
    }

    /// Effective address for instructions that need one (jumps, branches).
    pub(crate) fn operand_addr(&self, operand: &Operand) -> Result<u16, CpuError> {
        operand.addr.ok_or(CpuError::InvalidAddressingMode {
            mode: operand.mode,
            pc: self.instr_pc(),
        })
    }
}
