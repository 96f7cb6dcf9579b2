//! A cartridge plugged into a CPU and its memory map.

use std::path::Path;

use log::{info, warn};
use thiserror::Error;

use crate::{
    cartridge::{Cartridge, CartridgeError},
    cpu::{CPU, CpuConfig, CpuError, StepOutcome, StopReason, Tick},
    memory::{IoPolicy, Memory, PRG_ROM_START},
};

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error(transparent)]
    Cartridge(#[from] CartridgeError),

    #[error(transparent)]
    Cpu(#[from] CpuError),
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConsoleConfig {
    pub cpu: CpuConfig,
    pub io: IoPolicy,
}

pub struct Console {
    cpu: CPU<Memory>,
    cartridge: Cartridge,
}

impl Console {
    /// Maps `cartridge` and resets the CPU. Only NROM boards are accepted.
    pub fn new(cartridge: Cartridge, config: ConsoleConfig) -> Result<Self, ConsoleError> {
        cartridge.ensure_nrom()?;

        let mut memory = Memory::with_policy(config.io);
        memory.load_cartridge(&cartridge);

        let mut console = Self {
            cpu: CPU::with_config(memory, config.cpu),
            cartridge,
        };
        console.reset()?;

        let cart = &console.cartridge;
        info!(
            "loaded {:?} ROM: mapper {}, {} KiB PRG, {}, {:?} mirroring{}",
            cart.format(),
            cart.mapper(),
            cart.prg_rom().len() / 1024,
            if cart.uses_chr_ram() {
                "CHR RAM".to_string()
            } else {
                format!("{} KiB CHR", cart.chr_rom().len() / 1024)
            },
            cart.mirroring(),
            if cart.has_battery() { ", battery" } else { "" }
        );
        Ok(console)
    }

    pub fn from_path<P: AsRef<Path>>(path: P, config: ConsoleConfig) -> Result<Self, ConsoleError> {
        let cartridge = Cartridge::load(path)?;
        Self::new(cartridge, config)
    }

    /// Resets the CPU. A zero reset vector (blank ROM tail) starts execution at `$8000`.
    pub fn reset(&mut self) -> Result<(), ConsoleError> {
        self.cpu.reset()?;
        if self.cpu.pc == 0x0000 {
            warn!("reset vector is $0000, starting at ${PRG_ROM_START:04X}");
            self.cpu.pc = PRG_ROM_START;
        }
        Ok(())
    }

    pub fn cpu(&self) -> &CPU<Memory> {
        &self.cpu
    }

    pub fn cpu_mut(&mut self) -> &mut CPU<Memory> {
        &mut self.cpu
    }

    pub fn cartridge(&self) -> &Cartridge {
        &self.cartridge
    }

    /// Unplugs the cartridge, keeping the CPU and its mapped memory.
    pub fn into_cpu(self) -> CPU<Memory> {
        self.cpu
    }

    pub fn step(&mut self) -> Result<StepOutcome, CpuError> {
        self.cpu.step()
    }

    pub fn run(&mut self) -> Result<StopReason, CpuError> {
        self.cpu.run()
    }

    pub fn run_with_callback<F>(&mut self, callback: F) -> Result<StopReason, CpuError>
    where
        F: FnMut(&mut Tick<'_, Memory>) -> bool,
    {
        self.cpu.run_with_callback(callback)
    }
}
