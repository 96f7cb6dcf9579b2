//! Opcode table: the 151 documented 6502 opcodes indexed by opcode byte.
//!
//! Each entry is a mnemonic crossed with an addressing mode. The table is built at
//! compile time; unofficial opcodes have no entry and decode as illegal.

use std::fmt;

/// The 56 documented mnemonics.
#[rustfmt::skip]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Mnemonic {
    Adc, And, Asl, Bcc, Bcs, Beq, Bit, Bmi, Bne, Bpl, Brk, Bvc, Bvs, Clc,
    Cld, Cli, Clv, Cmp, Cpx, Cpy, Dec, Dex, Dey, Eor, Inc, Inx, Iny, Jmp,
    Jsr, Lda, Ldx, Ldy, Lsr, Nop, Ora, Pha, Php, Pla, Plp, Rol, Ror, Rti,
    Rts, Sbc, Sec, Sed, Sei, Sta, Stx, Sty, Tax, Tay, Tsx, Txa, Txs, Tya,
}

impl Mnemonic {
    #[rustfmt::skip]
    pub fn name(self) -> &'static str {
        use Mnemonic::*;
        match self {
            Adc => "ADC", And => "AND", Asl => "ASL", Bcc => "BCC", Bcs => "BCS",
            Beq => "BEQ", Bit => "BIT", Bmi => "BMI", Bne => "BNE", Bpl => "BPL",
            Brk => "BRK", Bvc => "BVC", Bvs => "BVS", Clc => "CLC", Cld => "CLD",
            Cli => "CLI", Clv => "CLV", Cmp => "CMP", Cpx => "CPX", Cpy => "CPY",
            Dec => "DEC", Dex => "DEX", Dey => "DEY", Eor => "EOR", Inc => "INC",
            Inx => "INX", Iny => "INY", Jmp => "JMP", Jsr => "JSR", Lda => "LDA",
            Ldx => "LDX", Ldy => "LDY", Lsr => "LSR", Nop => "NOP", Ora => "ORA",
            Pha => "PHA", Php => "PHP", Pla => "PLA", Plp => "PLP", Rol => "ROL",
            Ror => "ROR", Rti => "RTI", Rts => "RTS", Sbc => "SBC", Sec => "SEC",
            Sed => "SED", Sei => "SEI", Sta => "STA", Stx => "STX", Sty => "STY",
            Tax => "TAX", Tay => "TAY", Tsx => "TSX", Txa => "TXA", Txs => "TXS",
            Tya => "TYA",
        }
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How an instruction finds its operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AddressingMode {
    Implied,
    Accumulator,
    Immediate,
    ZeroPage,
    ZeroPageX,
    ZeroPageY,
    Absolute,
    AbsoluteX,
    AbsoluteY,
    /// `JMP ($xxxx)` only.
    Indirect,
    /// `($zz,X)`
    IndirectX,
    /// `($zz),Y`
    IndirectY,
    Relative,
}

impl AddressingMode {
    /// Bytes following the opcode.
    pub const fn operand_len(self) -> u8 {
        use AddressingMode::*;
        match self {
            Implied | Accumulator => 0,
            Immediate | ZeroPage | ZeroPageX | ZeroPageY | IndirectX | IndirectY | Relative => 1,
            Absolute | AbsoluteX | AbsoluteY | Indirect => 2,
        }
    }
}

/// One row of the opcode table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Instruction {
    pub opcode: u8,
    pub mnemonic: Mnemonic,
    pub mode: AddressingMode,
    /// Total length including the opcode byte.
    pub len: u8,
    pub cycles: u8,
    /// Read instructions take one more cycle when indexing crosses a page.
    pub page_penalty: bool,
}

const fn op(opcode: u8, mnemonic: Mnemonic, mode: AddressingMode, cycles: u8) -> Instruction {
    Instruction {
        opcode,
        mnemonic,
        mode,
        len: 1 + mode.operand_len(),
        cycles,
        page_penalty: false,
    }
}

const fn op_p(opcode: u8, mnemonic: Mnemonic, mode: AddressingMode, cycles: u8) -> Instruction {
    let mut ins = op(opcode, mnemonic, mode, cycles);
    ins.page_penalty = true;
    ins
}

use AddressingMode::{
    Absolute as Abs, AbsoluteX as AbsX, AbsoluteY as AbsY, Accumulator as Acc, Immediate as Imm,
    Implied as Imp, Indirect as Ind, IndirectX as IndX, IndirectY as IndY, Relative as Rel,
    ZeroPage as Zp, ZeroPageX as ZpX, ZeroPageY as ZpY,
};
use Mnemonic::*;

#[rustfmt::skip]
const LEGAL: [Instruction; 151] = [
    op(0x69, Adc, Imm, 2), op(0x65, Adc, Zp, 3), op(0x75, Adc, ZpX, 4), op(0x6D, Adc, Abs, 4),
    op_p(0x7D, Adc, AbsX, 4), op_p(0x79, Adc, AbsY, 4), op(0x61, Adc, IndX, 6), op_p(0x71, Adc, IndY, 5),

    op(0x29, And, Imm, 2), op(0x25, And, Zp, 3), op(0x35, And, ZpX, 4), op(0x2D, And, Abs, 4),
    op_p(0x3D, And, AbsX, 4), op_p(0x39, And, AbsY, 4), op(0x21, And, IndX, 6), op_p(0x31, And, IndY, 5),

    op(0x0A, Asl, Acc, 2), op(0x06, Asl, Zp, 5), op(0x16, Asl, ZpX, 6), op(0x0E, Asl, Abs, 6),
    op(0x1E, Asl, AbsX, 7),

    op(0x90, Bcc, Rel, 2), op(0xB0, Bcs, Rel, 2), op(0xF0, Beq, Rel, 2), op(0x30, Bmi, Rel, 2),
    op(0xD0, Bne, Rel, 2), op(0x10, Bpl, Rel, 2), op(0x50, Bvc, Rel, 2), op(0x70, Bvs, Rel, 2),

    op(0x24, Bit, Zp, 3), op(0x2C, Bit, Abs, 4),

    op(0x00, Brk, Imp, 7),

    op(0x18, Clc, Imp, 2), op(0xD8, Cld, Imp, 2), op(0x58, Cli, Imp, 2), op(0xB8, Clv, Imp, 2),

    op(0xC9, Cmp, Imm, 2), op(0xC5, Cmp, Zp, 3), op(0xD5, Cmp, ZpX, 4), op(0xCD, Cmp, Abs, 4),
    op_p(0xDD, Cmp, AbsX, 4), op_p(0xD9, Cmp, AbsY, 4), op(0xC1, Cmp, IndX, 6), op_p(0xD1, Cmp, IndY, 5),

    op(0xE0, Cpx, Imm, 2), op(0xE4, Cpx, Zp, 3), op(0xEC, Cpx, Abs, 4),
    op(0xC0, Cpy, Imm, 2), op(0xC4, Cpy, Zp, 3), op(0xCC, Cpy, Abs, 4),

    op(0xC6, Dec, Zp, 5), op(0xD6, Dec, ZpX, 6), op(0xCE, Dec, Abs, 6), op(0xDE, Dec, AbsX, 7),
    op(0xCA, Dex, Imp, 2), op(0x88, Dey, Imp, 2),

    op(0x49, Eor, Imm, 2), op(0x45, Eor, Zp, 3), op(0x55, Eor, ZpX, 4), op(0x4D, Eor, Abs, 4),
    op_p(0x5D, Eor, AbsX, 4), op_p(0x59, Eor, AbsY, 4), op(0x41, Eor, IndX, 6), op_p(0x51, Eor, IndY, 5),

    op(0xE6, Inc, Zp, 5), op(0xF6, Inc, ZpX, 6), op(0xEE, Inc, Abs, 6), op(0xFE, Inc, AbsX, 7),
    op(0xE8, Inx, Imp, 2), op(0xC8, Iny, Imp, 2),

    op(0x4C, Jmp, Abs, 3), op(0x6C, Jmp, Ind, 5),
    op(0x20, Jsr, Abs, 6),

    op(0xA9, Lda, Imm, 2), op(0xA5, Lda, Zp, 3), op(0xB5, Lda, ZpX, 4), op(0xAD, Lda, Abs, 4),
    op_p(0xBD, Lda, AbsX, 4), op_p(0xB9, Lda, AbsY, 4), op(0xA1, Lda, IndX, 6), op_p(0xB1, Lda, IndY, 5),

    op(0xA2, Ldx, Imm, 2), op(0xA6, Ldx, Zp, 3), op(0xB6, Ldx, ZpY, 4), op(0xAE, Ldx, Abs, 4),
    op_p(0xBE, Ldx, AbsY, 4),

    op(0xA0, Ldy, Imm, 2), op(0xA4, Ldy, Zp, 3), op(0xB4, Ldy, ZpX, 4), op(0xAC, Ldy, Abs, 4),
    op_p(0xBC, Ldy, AbsX, 4),

    op(0x4A, Lsr, Acc, 2), op(0x46, Lsr, Zp, 5), op(0x56, Lsr, ZpX, 6), op(0x4E, Lsr, Abs, 6),
    op(0x5E, Lsr, AbsX, 7),

    op(0xEA, Nop, Imp, 2),

    op(0x09, Ora, Imm, 2), op(0x05, Ora, Zp, 3), op(0x15, Ora, ZpX, 4), op(0x0D, Ora, Abs, 4),
    op_p(0x1D, Ora, AbsX, 4), op_p(0x19, Ora, AbsY, 4), op(0x01, Ora, IndX, 6), op_p(0x11, Ora, IndY, 5),

    op(0x48, Pha, Imp, 3), op(0x08, Php, Imp, 3), op(0x68, Pla, Imp, 4), op(0x28, Plp, Imp, 4),

    op(0x2A, Rol, Acc, 2), op(0x26, Rol, Zp, 5), op(0x36, Rol, ZpX, 6), op(0x2E, Rol, Abs, 6),
    op(0x3E, Rol, AbsX, 7),

    op(0x6A, Ror, Acc, 2), op(0x66, Ror, Zp, 5), op(0x76, Ror, ZpX, 6), op(0x6E, Ror, Abs, 6),
    op(0x7E, Ror, AbsX, 7),

    op(0x40, Rti, Imp, 6), op(0x60, Rts, Imp, 6),

    op(0xE9, Sbc, Imm, 2), op(0xE5, Sbc, Zp, 3), op(0xF5, Sbc, ZpX, 4), op(0xED, Sbc, Abs, 4),
    op_p(0xFD, Sbc, AbsX, 4), op_p(0xF9, Sbc, AbsY, 4), op(0xE1, Sbc, IndX, 6), op_p(0xF1, Sbc, IndY, 5),

    op(0x38, Sec, Imp, 2), op(0xF8, Sed, Imp, 2), op(0x78, Sei, Imp, 2),

    op(0x85, Sta, Zp, 3), op(0x95, Sta, ZpX, 4), op(0x8D, Sta, Abs, 4), op(0x9D, Sta, AbsX, 5),
    op(0x99, Sta, AbsY, 5), op(0x81, Sta, IndX, 6), op(0x91, Sta, IndY, 6),

    op(0x86, Stx, Zp, 3), op(0x96, Stx, ZpY, 4), op(0x8E, Stx, Abs, 4),
    op(0x84, Sty, Zp, 3), op(0x94, Sty, ZpX, 4), op(0x8C, Sty, Abs, 4),

    op(0xAA, Tax, Imp, 2), op(0xA8, Tay, Imp, 2), op(0xBA, Tsx, Imp, 2), op(0x8A, Txa, Imp, 2),
    op(0x9A, Txs, Imp, 2), op(0x98, Tya, Imp, 2),
];

const fn build_table() -> [Option<Instruction>; 256] {
    let mut table = [None; 256];
    let mut i = 0;
    while i < LEGAL.len() {
        let ins = LEGAL[i];
        table[ins.opcode as usize] = Some(ins);
        i += 1;
    }
    table
}

/// Dense dispatch table indexed by opcode byte.
pub static OPCODES: [Option<Instruction>; 256] = build_table();

/// Descriptor for `opcode`, or `None` for unofficial/illegal bytes.
pub fn lookup(opcode: u8) -> Option<&'static Instruction> {
    OPCODES[opcode as usize].as_ref()
}
