//! NES cartridge loading from iNES / NES 2.0 dumps (.nes files).
//!
//! Layout after the 16-byte header: an optional 512-byte trainer (flags 6 bit 2), PRG ROM,
//! then CHR ROM. PRG is what the CPU sees at `$8000-$FFFF`; CHR belongs to the PPU and is
//! only carried along here.

use std::fs;
use std::path::Path;

use log::{debug, warn};

use crate::cartridge::CartridgeError;
use crate::cartridge::header::{HEADER_SIZE, Header, Mirroring, RomFormat, TRAINER_SIZE};

/// A parsed dump. Owns its ROM images; the memory map copies PRG out of it.
#[derive(Clone, Debug)]
pub struct Cartridge {
    header: Header,
    trainer: Option<Vec<u8>>,
    prg_rom: Vec<u8>,
    chr_rom: Vec<u8>,
}

impl Cartridge {
    /// Read and parse a ROM file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CartridgeError> {
        let path = path.as_ref();
        let data = fs::read(path)?;
        debug!("read {} bytes from {}", data.len(), path.display());
        Self::from_bytes(&data)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, CartridgeError> {
        let header = Header::parse(data)?;

        let expected = header.expected_len();
        if data.len() < expected {
            return Err(CartridgeError::TruncatedRom {
                expected,
                actual: data.len(),
            });
        }

        if !header.format.is_standard() {
            warn!(
                "{:?} header: bytes 8-15 ignored, mapper {} may be wrong",
                header.format, header.mapper
            );
        }

        let mut offset = HEADER_SIZE;
        let trainer = if header.trainer {
            let trainer = data[offset..offset + TRAINER_SIZE].to_vec();
            offset += TRAINER_SIZE;
            Some(trainer)
        } else {
            None
        };

        let prg_rom = data[offset..offset + header.prg_rom_size].to_vec();
        offset += header.prg_rom_size;

        let chr_rom = data[offset..offset + header.chr_rom_size].to_vec();
        offset += header.chr_rom_size;

        if offset < data.len() {
            debug!("{} trailing bytes after CHR ROM ignored", data.len() - offset);
        }

        debug!(
            "{:?} cartridge: mapper {}, {} KiB PRG, {} KiB CHR, {:?} mirroring",
            header.format,
            header.mapper,
            prg_rom.len() / 1024,
            chr_rom.len() / 1024,
            header.mirroring
        );

        Ok(Self {
            header,
            trainer,
            prg_rom,
            chr_rom,
        })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn prg_rom(&self) -> &[u8] {
        &self.prg_rom
    }

    pub fn chr_rom(&self) -> &[u8] {
        &self.chr_rom
    }

    /// The 512-byte trainer, normally destined for `$7000-$71FF`.
    pub fn trainer(&self) -> Option<&[u8]> {
        self.trainer.as_deref()
    }

    pub fn mapper(&self) -> u16 {
        self.header.mapper
    }

    pub fn mirroring(&self) -> Mirroring {
        self.header.mirroring
    }

    pub fn format(&self) -> RomFormat {
        self.header.format
    }

    pub fn has_battery(&self) -> bool {
        self.header.battery
    }

    /// No CHR ROM: the board provides 8 KiB of CHR RAM.
    pub fn uses_chr_ram(&self) -> bool {
        self.chr_rom.is_empty()
    }

    /// Fails unless the board is NROM (mapper 0), the only one this core maps.
    pub fn ensure_nrom(&self) -> Result<(), CartridgeError> {
        match self.header.mapper {
            0 => Ok(()),
            other => Err(CartridgeError::UnsupportedMapper(other)),
        }
    }
}
