//! NES CPU memory map over a flat 64 KiB array.
//!
//! | Range           | Contents                                                       |
//! |-----------------|----------------------------------------------------------------|
//! | `$0000-$07FF`   | 2 KiB internal RAM, mirrored every 2 KiB up to `$1FFF`         |
//! | `$2000-$3FFF`   | PPU registers, 8 bytes mirrored (see [`IoPolicy`])             |
//! | `$4000-$401F`   | APU and I/O registers (see [`IoPolicy`])                       |
//! | `$4020-$7FFF`   | Cartridge space, including battery SRAM at `$6000-$7FFF`       |
//! | `$8000-$FFFF`   | PRG ROM; read-only once a cartridge is mapped                  |
//!
//! Interrupt vectors live at the top of PRG: NMI `$FFFA`, reset `$FFFC`, IRQ/BRK `$FFFE`.

use log::debug;
use thiserror::Error;

use crate::bus::Bus;
use crate::cartridge::Cartridge;

pub const MEMORY_SIZE: usize = 0x1_0000;
pub const RAM_MIRROR_MASK: u16 = 0x07FF;
pub const PPU_MIRROR_MASK: u16 = 0x2007;

pub const PRG_ROM_START: u16 = 0x8000;
pub const NMI_VECTOR: u16 = 0xFFFA;
pub const RESET_VECTOR: u16 = 0xFFFC;
pub const IRQ_VECTOR: u16 = 0xFFFE;

const PRG_BANK_SIZE: usize = 16 * 1024;
/// iNES trainers land in battery SRAM.
const TRAINER_START: u16 = 0x7000;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryError {
    #[error("access to unmapped region at ${addr:04X}")]
    UnmappedRegion { addr: u16 },
}

/// What `$2000-$401F` does when no PPU or APU is attached.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IoPolicy {
    /// Plain storage, no mirroring. Test programs may use these addresses as RAM.
    #[default]
    Flat,
    /// PPU registers folded with `addr & $2007`; APU range is plain storage.
    Mirrored,
    /// Reads return 0 and writes are dropped.
    Silent,
    /// Any access fails with [`MemoryError::UnmappedRegion`].
    Fault,
}

pub struct Memory {
    data: Box<[u8; MEMORY_SIZE]>,
    io: IoPolicy,
    rom_mapped: bool,
}

impl Default for Memory {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory {
    pub fn new() -> Self {
        Self::with_policy(IoPolicy::default())
    }

    pub fn with_policy(io: IoPolicy) -> Self {
        Self {
            data: Box::new([0; MEMORY_SIZE]),
            io,
            rom_mapped: false,
        }
    }

    pub fn policy(&self) -> IoPolicy {
        self.io
    }

    /// True once [`Memory::load_cartridge`] has made `$8000-$FFFF` read-only.
    pub fn rom_mapped(&self) -> bool {
        self.rom_mapped
    }

    /// Resolves mirrors. `None` means the access is swallowed (silent I/O).
    fn decode(&self, addr: u16) -> Result<Option<u16>, MemoryError> {
        match addr {
            0x0000..=0x1FFF => Ok(Some(addr & RAM_MIRROR_MASK)),
            0x2000..=0x401F => match self.io {
                IoPolicy::Flat => Ok(Some(addr)),
                IoPolicy::Mirrored if addr <= 0x3FFF => Ok(Some(addr & PPU_MIRROR_MASK)),
                IoPolicy::Mirrored => Ok(Some(addr)),
                IoPolicy::Silent => Ok(None),
                IoPolicy::Fault => Err(MemoryError::UnmappedRegion { addr }),
            },
            0x4020..=0xFFFF => Ok(Some(addr)),
        }
    }

    pub fn read(&self, addr: u16) -> Result<u8, MemoryError> {
        Ok(match self.decode(addr)? {
            Some(addr) => self.data[addr as usize],
            None => 0,
        })
    }

    pub fn write(&mut self, addr: u16, value: u8) -> Result<(), MemoryError> {
        if self.rom_mapped && addr >= PRG_ROM_START {
            debug!("ignored write of ${value:02X} to PRG ROM at ${addr:04X}");
            return Ok(());
        }

        if let Some(addr) = self.decode(addr)? {
            self.data[addr as usize] = value;
        }
        Ok(())
    }

    pub fn read_u16(&self, addr: u16) -> Result<u16, MemoryError> {
        let lo = self.read(addr)? as u16;
        let hi = self.read(addr.wrapping_add(1))? as u16;
        Ok((hi << 8) | lo)
    }

    pub fn write_u16(&mut self, addr: u16, value: u16) -> Result<(), MemoryError> {
        self.write(addr, value as u8)?;
        self.write(addr.wrapping_add(1), (value >> 8) as u8)
    }

    /// Copies `bytes` to `offset` verbatim, bypassing ROM protection and the I/O policy.
    /// Bytes past `$FFFF` are dropped.
    pub fn load(&mut self, offset: u16, bytes: &[u8]) {
        let start = offset as usize;
        let len = bytes.len().min(MEMORY_SIZE - start);
        self.data[start..start + len].copy_from_slice(&bytes[..len]);
    }

    /// Loads a program and points the reset vector at it.
    pub fn load_prg(&mut self, offset: u16, bytes: &[u8]) {
        self.load(offset, bytes);
        self.load(RESET_VECTOR, &offset.to_le_bytes());
    }

    /// NROM mapping: PRG at `$8000`, a single 16 KiB bank repeated at `$C000`.
    /// `$8000-$FFFF` becomes read-only afterwards.
    pub fn load_cartridge(&mut self, cartridge: &Cartridge) {
        let prg = cartridge.prg_rom();
        let window = MEMORY_SIZE - PRG_ROM_START as usize;

        if prg.len() == PRG_BANK_SIZE {
            self.load(PRG_ROM_START, prg);
            self.load(PRG_ROM_START + PRG_BANK_SIZE as u16, prg);
        } else {
            self.load(PRG_ROM_START, &prg[..prg.len().min(window)]);
        }
        if let Some(trainer) = cartridge.trainer() {
            self.load(TRAINER_START, trainer);
        }

        self.rom_mapped = true;
        debug!(
            "mapped {} KiB PRG ROM at ${PRG_ROM_START:04X}, reset vector ${:04X}",
            prg.len() / 1024,
            u16::from_le_bytes([self.data[RESET_VECTOR as usize], self.data[RESET_VECTOR as usize + 1]])
        );
    }

    /// Same byte [`Memory::read`] returns, for traces and frontends. Faulting
    /// addresses read as 0.
    pub fn peek(&self, addr: u16) -> u8 {
        match self.decode(addr) {
            Ok(Some(addr)) => self.data[addr as usize],
            Ok(None) | Err(_) => 0,
        }
    }

    /// Raw view of `len` bytes from `start`, e.g. a memory-mapped screen.
    pub fn slice(&self, start: u16, len: usize) -> &[u8] {
        let start = start as usize;
        &self.data[start..(start + len).min(MEMORY_SIZE)]
    }
}

impl Bus for Memory {
    fn read(&mut self, addr: u16) -> Result<u8, MemoryError> {
        Memory::read(self, addr)
    }

    fn write(&mut self, addr: u16, data: u8) -> Result<(), MemoryError> {
        Memory::write(self, addr, data)
    }

    fn peek(&self, addr: u16) -> u8 {
        Memory::peek(self, addr)
    }
}
