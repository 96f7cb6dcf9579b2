//! Instruction semantics, one method per mnemonic family.

use crate::{
    bus::Bus,
    cpu::{
        BrkMode, CPU, CpuError,
        addressing::Operand,
        cpu::Flow,
        flags::{
            FLAG_BREAK, FLAG_CARRY, FLAG_DECIMAL, FLAG_INTERRUPT_DISABLE, FLAG_NEGATIVE,
            FLAG_OVERFLOW, FLAG_UNUSED, FLAG_ZERO,
        },
        opcodes::{Instruction, Mnemonic},
    },
    memory::IRQ_VECTOR,
};

impl<B: Bus> CPU<B> {
    pub(crate) fn execute(
        &mut self,
        instruction: &Instruction,
        op: &Operand,
    ) -> Result<Flow, CpuError> {
        use Mnemonic::*;

        match instruction.mnemonic {
            Lda => {
                self.a = self.read_operand(op)?;
                self.update_zero_and_negative_flags(self.a);
            }
            Ldx => {
                self.x = self.read_operand(op)?;
                self.update_zero_and_negative_flags(self.x);
            }
            Ldy => {
                self.y = self.read_operand(op)?;
                self.update_zero_and_negative_flags(self.y);
            }
            Sta => self.write_operand(op, self.a)?,
            Stx => self.write_operand(op, self.x)?,
            Sty => self.write_operand(op, self.y)?,

            Tax => {
                self.x = self.a;
                self.update_zero_and_negative_flags(self.x);
            }
            Tay => {
                self.y = self.a;
                self.update_zero_and_negative_flags(self.y);
            }
            Txa => {
                self.a = self.x;
                self.update_zero_and_negative_flags(self.a);
            }
            Tya => {
                self.a = self.y;
                self.update_zero_and_negative_flags(self.a);
            }
            Tsx => {
                self.x = self.sp;
                self.update_zero_and_negative_flags(self.x);
            }
            Txs => self.sp = self.x,

            Pha => self.push(self.a)?,
            Php => self.push(self.status | FLAG_BREAK | FLAG_UNUSED)?,
            Pla => {
                self.a = self.pop()?;
                self.update_zero_and_negative_flags(self.a);
            }
            Plp => {
                let value = self.pop()?;
                self.status = (value & !FLAG_BREAK) | FLAG_UNUSED;
            }

            Adc => {
                let value = self.read_operand(op)?;
                self.add_with_carry(value);
            }
            Sbc => {
                let value = self.read_operand(op)?;
                self.add_with_carry(!value);
            }

            Cmp => self.compare(self.a, op)?,
            Cpx => self.compare(self.x, op)?,
            Cpy => self.compare(self.y, op)?,

            And => {
                self.a &= self.read_operand(op)?;
                self.update_zero_and_negative_flags(self.a);
            }
            Ora => {
                self.a |= self.read_operand(op)?;
                self.update_zero_and_negative_flags(self.a);
            }
            Eor => {
                self.a ^= self.read_operand(op)?;
                self.update_zero_and_negative_flags(self.a);
            }
            Bit => {
                let value = self.read_operand(op)?;
                self.set_flag(FLAG_ZERO, self.a & value == 0);
                self.set_flag(FLAG_NEGATIVE, value & 0x80 != 0);
                self.set_flag(FLAG_OVERFLOW, value & 0x40 != 0);
            }

            Asl => self.modify(op, |value, _| (value << 1, value & 0x80 != 0))?,
            Lsr => self.modify(op, |value, _| (value >> 1, value & 0x01 != 0))?,
            Rol => self.modify(op, |value, carry| {
                ((value << 1) | carry as u8, value & 0x80 != 0)
            })?,
            Ror => self.modify(op, |value, carry| {
                ((value >> 1) | ((carry as u8) << 7), value & 0x01 != 0)
            })?,

            Inc => {
                let result = self.read_operand(op)?.wrapping_add(1);
                self.write_operand(op, result)?;
                self.update_zero_and_negative_flags(result);
            }
            Dec => {
                let result = self.read_operand(op)?.wrapping_sub(1);
                self.write_operand(op, result)?;
                self.update_zero_and_negative_flags(result);
            }
            Inx => {
                self.x = self.x.wrapping_add(1);
                self.update_zero_and_negative_flags(self.x);
            }
            Iny => {
                self.y = self.y.wrapping_add(1);
                self.update_zero_and_negative_flags(self.y);
            }
            Dex => {
                self.x = self.x.wrapping_sub(1);
                self.update_zero_and_negative_flags(self.x);
            }
            Dey => {
                self.y = self.y.wrapping_sub(1);
                self.update_zero_and_negative_flags(self.y);
            }

            Bcc => return self.branch(self.status & FLAG_CARRY == 0, op),
            Bcs => return self.branch(self.status & FLAG_CARRY != 0, op),
            Bne => return self.branch(self.status & FLAG_ZERO == 0, op),
            Beq => return self.branch(self.status & FLAG_ZERO != 0, op),
            Bpl => return self.branch(self.status & FLAG_NEGATIVE == 0, op),
            Bmi => return self.branch(self.status & FLAG_NEGATIVE != 0, op),
            Bvc => return self.branch(self.status & FLAG_OVERFLOW == 0, op),
            Bvs => return self.branch(self.status & FLAG_OVERFLOW != 0, op),

            Jmp => {
                self.pc = self.operand_addr(op)?;
                return Ok(Flow::Jump);
            }
            Jsr => {
                let target = self.operand_addr(op)?;
                // address of the JSR's last byte
                let return_addr = self.pc.wrapping_add(1);
                self.push_u16(return_addr)?;
                self.pc = target;
                return Ok(Flow::Jump);
            }
            Rts => {
                self.pc = self.pop_u16()?.wrapping_add(1);
                return Ok(Flow::Jump);
            }
            Rti => {
                let status = self.pop()?;
                self.status = (status & !FLAG_BREAK) | FLAG_UNUSED;
                self.pc = self.pop_u16()?;
                return Ok(Flow::Jump);
            }
            Brk => return self.brk(),

            Clc => self.status &= !FLAG_CARRY,
            Sec => self.status |= FLAG_CARRY,
            Cli => self.status &= !FLAG_INTERRUPT_DISABLE,
            Sei => self.status |= FLAG_INTERRUPT_DISABLE,
            Cld => self.status &= !FLAG_DECIMAL,
            Sed => self.status |= FLAG_DECIMAL,
            Clv => self.status &= !FLAG_OVERFLOW,

            Nop => {}
        }

        Ok(Flow::Next)
    }

    /// Binary add; the 2A03 ignores D. SBC feeds the inverted operand through here.
    fn add_with_carry(&mut self, value: u8) {
        let carry_in = (self.status & FLAG_CARRY) as u16;
        let sum = self.a as u16 + value as u16 + carry_in;
        let result = sum as u8;

        self.set_flag(FLAG_CARRY, sum > 0xFF);
        self.set_flag(
            FLAG_OVERFLOW,
            (self.a ^ result) & (value ^ result) & 0x80 != 0,
        );

        self.a = result;
        self.update_zero_and_negative_flags(self.a);
    }

    fn compare(&mut self, register: u8, op: &Operand) -> Result<(), CpuError> {
        let value = self.read_operand(op)?;
        let result = register.wrapping_sub(value);

        self.set_flag(FLAG_CARRY, register >= value);
        self.set_flag(FLAG_ZERO, register == value);
        self.set_flag(FLAG_NEGATIVE, result & 0x80 != 0);
        Ok(())
    }

    /// Shift/rotate on A or memory. `shift` gets the value and the carry in, and
    /// returns the result and the carry out.
    fn modify<F>(&mut self, op: &Operand, shift: F) -> Result<(), CpuError>
    where
        F: FnOnce(u8, bool) -> (u8, bool),
    {
        let value = self.read_operand(op)?;
        let (result, carry) = shift(value, self.status & FLAG_CARRY != 0);

        self.write_operand(op, result)?;
        self.set_flag(FLAG_CARRY, carry);
        self.update_zero_and_negative_flags(result);
        Ok(())
    }

    fn branch(&mut self, condition: bool, op: &Operand) -> Result<Flow, CpuError> {
        if !condition {
            return Ok(Flow::Next);
        }

        self.pc = self.operand_addr(op)?;
        self.cycles += 1;
        if op.page_crossed {
            self.cycles += 1;
        }
        Ok(Flow::Jump)
    }

    fn brk(&mut self) -> Result<Flow, CpuError> {
        if self.config.brk == BrkMode::Halt {
            return Ok(Flow::Halt);
        }

        // the byte after BRK is padding
        let return_addr = self.instr_pc().wrapping_add(2);
        self.push_u16(return_addr)?;
        self.push(self.status | FLAG_BREAK | FLAG_UNUSED)?;
        self.status |= FLAG_INTERRUPT_DISABLE;
        self.pc = self.read_u16(IRQ_VECTOR)?;
        Ok(Flow::Jump)
    }

    fn set_flag(&mut self, flag: u8, on: bool) {
        if on {
            self.status |= flag;
        } else {
            self.status &= !flag;
        }
    }

    fn update_zero_and_negative_flags(&mut self, value: u8) {
        self.set_flag(FLAG_ZERO, value == 0);
        self.set_flag(FLAG_NEGATIVE, value & 0x80 != 0);
    }
}
