//! 6502 CPU emulation for the NES (2A03 core, no decimal mode).
//!
//! Documented instruction set only; unofficial opcodes decode as [`CpuError::IllegalOpcode`].
//! The CPU owns a [`Bus`](crate::bus::Bus) and talks to memory only through it.
//!
//! - **opcodes**: the 256-entry opcode table.
//! - **addressing**: operand resolution for the 13 addressing modes.
//! - **cpu**: registers, stack, interrupts and the step/run loop.
//! - **instructions**: what each mnemonic does.
//! - **flags**: status register bit masks.

use thiserror::Error;

use crate::memory::MemoryError;

pub mod addressing;
pub mod cpu;
pub mod flags;
pub mod instructions;
pub mod opcodes;

#[cfg(test)]
mod tests;

pub use addressing::Operand;
pub use cpu::{CPU, Interrupt, Registers, RunState, StepOutcome, StopReason, Tick};
pub use opcodes::{AddressingMode, Instruction, Mnemonic};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CpuError {
    #[error("illegal opcode ${opcode:02X} at ${pc:04X}")]
    IllegalOpcode { opcode: u8, pc: u16 },

    #[error("bus fault at PC ${pc:04X}: {source}")]
    Bus {
        pc: u16,
        #[source]
        source: MemoryError,
    },

    #[error("stack {kind} at ${pc:04X} (SP=${sp:02X})")]
    StackImbalance { pc: u16, sp: u8, kind: StackFault },

    #[error("{mode:?} operand has no storage (PC ${pc:04X})")]
    InvalidAddressingMode { mode: AddressingMode, pc: u16 },

    #[error("CPU not running at ${pc:04X}; reset required")]
    NotRunning { pc: u16 },
}

impl CpuError {
    /// Address of the instruction that failed.
    pub fn pc(&self) -> u16 {
        match *self {
            CpuError::IllegalOpcode { pc, .. }
            | CpuError::Bus { pc, .. }
            | CpuError::StackImbalance { pc, .. }
            | CpuError::InvalidAddressingMode { pc, .. }
            | CpuError::NotRunning { pc } => pc,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StackFault {
    /// Pull with SP at `$FF`.
    Underflow,
    /// Push with SP at `$00`.
    Overflow,
}

impl std::fmt::Display for StackFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            StackFault::Underflow => "underflow",
            StackFault::Overflow => "overflow",
        })
    }
}

/// What `BRK` does.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BrkMode {
    /// Stop the run loop with PC left on the `BRK`. Test programs end this way.
    #[default]
    Halt,
    /// The real software interrupt through `$FFFE`.
    Interrupt,
}

/// Response to SP wrapping on a push or pull.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StackCheck {
    Off,
    #[default]
    Warn,
    Fatal,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CpuConfig {
    /// SP after reset. Hardware leaves `$FD` after the reset sequence's three phantom pushes.
    pub reset_sp: u8,
    pub brk: BrkMode,
    pub stack_check: StackCheck,
}

impl Default for CpuConfig {
    fn default() -> Self {
        Self {
            reset_sp: 0xFD,
            brk: BrkMode::default(),
            stack_check: StackCheck::default(),
        }
    }
}
