use log::{debug, trace, warn};

use crate::{
    bus::Bus,
    cpu::{
        CpuConfig, CpuError, StackCheck, StackFault,
        flags::{FLAG_BREAK, FLAG_INTERRUPT_DISABLE, FLAG_UNUSED, RESET_STATUS},
        opcodes,
    },
    memory::{IRQ_VECTOR, NMI_VECTOR, RESET_VECTOR},
    trace,
};

pub const STACK_BASE: u16 = 0x0100;

/// Cycles spent entering NMI or IRQ.
const INTERRUPT_CYCLES: usize = 7;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    /// Built but not reset yet.
    ResetPending,
    Running,
    /// Stopped on `BRK` in [`BrkMode::Halt`](crate::cpu::BrkMode::Halt).
    Halted,
    /// A fatal error happened; only `reset` recovers.
    Faulted,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interrupt {
    Nmi,
    Irq,
}

/// Copy of the programmer-visible registers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Registers {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub status: u8,
}

/// What one call to [`CPU::step`] did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StepOutcome {
    /// Address of the executed instruction.
    pub pc: u16,
    pub opcode: u8,
    /// Cycles consumed, including any interrupt entry.
    pub cycles: usize,
    pub halted: bool,
    /// Interrupt entered before the instruction, if any.
    pub interrupt: Option<Interrupt>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    Halted,
    /// The tick callback returned `false`.
    Cancelled,
}

/// Handed to the run-loop callback after every instruction.
///
/// Only the bus is mutable, so a host can feed memory-mapped inputs but cannot
/// re-enter `step` or `reset`.
pub struct Tick<'a, B> {
    pub outcome: StepOutcome,
    pub registers: Registers,
    pub cycles: usize,
    pub bus: &'a mut B,
}

/// Where the interpreter goes after an instruction.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Flow {
    /// Fall through to the next instruction.
    Next,
    /// The instruction set PC itself.
    Jump,
    Halt,
}

pub struct CPU<B: Bus> {
    pub a: u8,
    pub x: u8,
    pub y: u8,
    pub sp: u8,
    pub pc: u16,
    pub status: u8,
    pub cycles: usize,
    pub bus: B,
    pub config: CpuConfig,
    state: RunState,
    nmi_pending: bool,
    irq_pending: bool,
    /// Address of the instruction being executed, for diagnostics.
    instr_pc: u16,
}

impl<B: Bus> CPU<B> {
    pub fn new(bus: B) -> Self {
        Self::with_config(bus, CpuConfig::default())
    }

    pub fn with_config(bus: B, config: CpuConfig) -> Self {
        Self {
            a: 0,
            x: 0,
            y: 0,
            sp: config.reset_sp,
            pc: 0,
            status: RESET_STATUS,
            cycles: 0,
            bus,
            config,
            state: RunState::ResetPending,
            nmi_pending: false,
            irq_pending: false,
            instr_pc: 0,
        }
    }

    pub fn reset(&mut self) -> Result<(), CpuError> {
        self.a = 0;
        self.x = 0;
        self.y = 0;
        self.sp = self.config.reset_sp;
        self.status = RESET_STATUS;
        self.nmi_pending = false;
        self.irq_pending = false;
        self.instr_pc = RESET_VECTOR;

        self.pc = self.read_u16(RESET_VECTOR)?;
        self.cycles = 7;
        self.state = RunState::Running;

        debug!("reset: PC=${:04X} SP=${:02X}", self.pc, self.sp);
        Ok(())
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    pub fn is_halted(&self) -> bool {
        self.state == RunState::Halted
    }

    pub fn registers(&self) -> Registers {
        Registers {
            a: self.a,
            x: self.x,
            y: self.y,
            sp: self.sp,
            pc: self.pc,
            status: self.status,
        }
    }

    pub fn set_registers(&mut self, registers: Registers) {
        self.a = registers.a;
        self.x = registers.x;
        self.y = registers.y;
        self.sp = registers.sp;
        self.pc = registers.pc;
        self.status = registers.status;
    }

    /// Latches an NMI; it is taken before the next instruction.
    pub fn trigger_nmi(&mut self) {
        self.nmi_pending = true;
    }

    /// Latches an IRQ; it is dropped if I is set when the next instruction starts.
    pub fn trigger_irq(&mut self) {
        self.irq_pending = true;
    }

    /// The instruction at PC formatted as a trace line.
    pub fn trace(&self) -> String {
        trace::trace_line(&self.bus, &self.registers(), self.cycles, false)
    }

    /// Executes one instruction, entering a pending interrupt first.
    pub fn step(&mut self) -> Result<StepOutcome, CpuError> {
        match self.state {
            RunState::Running => {}
            RunState::Halted => {
                return Ok(StepOutcome {
                    pc: self.pc,
                    opcode: self.bus.peek(self.pc),
                    cycles: 0,
                    halted: true,
                    interrupt: None,
                });
            }
            RunState::ResetPending | RunState::Faulted => {
                return Err(CpuError::NotRunning { pc: self.pc });
            }
        }

        let outcome = self.execute_next();
        if outcome.is_err() {
            self.state = RunState::Faulted;
        }
        outcome
    }

    /// Steps until `BRK` halts the CPU or an error occurs.
    pub fn run(&mut self) -> Result<StopReason, CpuError> {
        self.run_with_callback(|_| true)
    }

    /// Steps until halted, calling `callback` after every instruction.
    /// Returning `false` from the callback stops the loop.
    pub fn run_with_callback<F>(&mut self, mut callback: F) -> Result<StopReason, CpuError>
    where
        F: FnMut(&mut Tick<'_, B>) -> bool,
    {
        loop {
            let outcome = self.step()?;

            let mut tick = Tick {
                outcome,
                registers: self.registers(),
                cycles: self.cycles,
                bus: &mut self.bus,
            };
            let keep_going = callback(&mut tick);

            if outcome.halted {
                return Ok(StopReason::Halted);
            }
            if !keep_going {
                return Ok(StopReason::Cancelled);
            }
        }
    }

    fn execute_next(&mut self) -> Result<StepOutcome, CpuError> {
        let start_cycles = self.cycles;
        let interrupt = self.service_interrupts()?;

        let pc = self.pc;
        self.instr_pc = pc;

        let opcode = self.fetch_byte()?;
        let instruction =
            opcodes::lookup(opcode).ok_or(CpuError::IllegalOpcode { opcode, pc })?;

        let operand = self.resolve(instruction.mode)?;
        let flow = self.execute(instruction, &operand)?;

        match flow {
            Flow::Next => {
                self.pc = self.pc.wrapping_add(instruction.len as u16 - 1);
            }
            Flow::Jump => {}
            Flow::Halt => {
                self.pc = pc;
                self.state = RunState::Halted;
                debug!("halted on BRK at ${pc:04X}");
            }
        }

        self.cycles += instruction.cycles as usize;
        if instruction.page_penalty && operand.page_crossed {
            self.cycles += 1;
        }

        Ok(StepOutcome {
            pc,
            opcode,
            cycles: self.cycles - start_cycles,
            halted: flow == Flow::Halt,
            interrupt,
        })
    }

    fn service_interrupts(&mut self) -> Result<Option<Interrupt>, CpuError> {
        self.instr_pc = self.pc;

        if self.nmi_pending {
            self.nmi_pending = false;
            self.interrupt(NMI_VECTOR)?;
            trace!("NMI taken, PC=${:04X}", self.pc);
            return Ok(Some(Interrupt::Nmi));
        }

        if self.irq_pending {
            self.irq_pending = false;
            if self.status & FLAG_INTERRUPT_DISABLE != 0 {
                trace!("IRQ ignored, I flag set");
                return Ok(None);
            }
            self.interrupt(IRQ_VECTOR)?;
            trace!("IRQ taken, PC=${:04X}", self.pc);
            return Ok(Some(Interrupt::Irq));
        }

        Ok(None)
    }

    /// Hardware interrupt entry: push PC and P (B clear), set I, load the vector.
    fn interrupt(&mut self, vector: u16) -> Result<(), CpuError> {
        self.push_u16(self.pc)?;
        self.push((self.status & !FLAG_BREAK) | FLAG_UNUSED)?;
        self.status |= FLAG_INTERRUPT_DISABLE;
        self.pc = self.read_u16(vector)?;
        self.cycles += INTERRUPT_CYCLES;
        Ok(())
    }

    fn fetch_byte(&mut self) -> Result<u8, CpuError> {
        let byte = self.read(self.pc)?;
        self.pc = self.pc.wrapping_add(1);
        Ok(byte)
    }

    pub(crate) fn read(&mut self, addr: u16) -> Result<u8, CpuError> {
        let pc = self.instr_pc;
        self.bus
            .read(addr)
            .map_err(|source| CpuError::Bus { pc, source })
    }

    pub(crate) fn read_u16(&mut self, addr: u16) -> Result<u16, CpuError> {
        let pc = self.instr_pc;
        self.bus
            .read_u16(addr)
            .map_err(|source| CpuError::Bus { pc, source })
    }

    pub(crate) fn write(&mut self, addr: u16, data: u8) -> Result<(), CpuError> {
        let pc = self.instr_pc;
        self.bus
            .write(addr, data)
            .map_err(|source| CpuError::Bus { pc, source })
    }

    pub(crate) fn push(&mut self, value: u8) -> Result<(), CpuError> {
        if self.sp == 0x00 {
            self.stack_imbalance(StackFault::Overflow)?;
        }
        self.write(STACK_BASE | self.sp as u16, value)?;
        self.sp = self.sp.wrapping_sub(1);
        Ok(())
    }

    pub(crate) fn pop(&mut self) -> Result<u8, CpuError> {
        if self.sp == 0xFF {
            self.stack_imbalance(StackFault::Underflow)?;
        }
        self.sp = self.sp.wrapping_add(1);
        self.read(STACK_BASE | self.sp as u16)
    }

    /// High byte first, so the low byte ends up at the lower address.
    pub(crate) fn push_u16(&mut self, value: u16) -> Result<(), CpuError> {
        self.push((value >> 8) as u8)?;
        self.push(value as u8)
    }

    pub(crate) fn pop_u16(&mut self) -> Result<u16, CpuError> {
        let lo = self.pop()? as u16;
        let hi = self.pop()? as u16;
        Ok((hi << 8) | lo)
    }

    fn stack_imbalance(&self, kind: StackFault) -> Result<(), CpuError> {
        match self.config.stack_check {
            StackCheck::Off => Ok(()),
            StackCheck::Warn => {
                warn!(
                    "stack {kind} at ${:04X} (SP=${:02X})",
                    self.instr_pc, self.sp
                );
                Ok(())
            }
            StackCheck::Fatal => Err(CpuError::StackImbalance {
                pc: self.instr_pc,
                sp: self.sp,
                kind,
            }),
        }
    }

    pub(crate) fn instr_pc(&self) -> u16 {
        self.instr_pc
    }
}
