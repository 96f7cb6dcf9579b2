//! The 16-byte iNES / NES 2.0 header.
//!
//! ```text
//! 0-3   "NES" $1A
//! 4     PRG ROM size, 16 KiB units (NES 2.0: MSB nibble in byte 9)
//! 5     CHR ROM size, 8 KiB units (NES 2.0: MSB nibble in byte 9)
//! 6     flags: mirroring, battery, trainer, four-screen, mapper D0-D3
//! 7     flags: console type, format identifier (bits 2-3), mapper D4-D7
//! 8     NES 2.0: mapper D8-D11, submapper
//! 12-15 zero in a clean iNES header
//! ```

use crate::cartridge::CartridgeError;

pub const HEADER_SIZE: usize = 16;
pub const TRAINER_SIZE: usize = 512;
pub const PRG_UNIT: usize = 16 * 1024;
pub const CHR_UNIT: usize = 8 * 1024;

const MAGIC: [u8; 4] = *b"NES\x1A";

const FLAG6_VERTICAL: u8 = 1 << 0;
const FLAG6_BATTERY: u8 = 1 << 1;
const FLAG6_TRAINER: u8 = 1 << 2;
const FLAG6_FOUR_SCREEN: u8 = 1 << 3;

/// Nametable arrangement wired on the board.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    FourScreen,
}

/// Dump format, from bits 2-3 of byte 7.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RomFormat {
    Ines,
    Nes2,
    /// Identifier bits `01`: only bytes 0-7 can be trusted.
    ArchaicInes,
    /// Identifier bits `00` with junk in bytes 12-15, or `11`.
    Ines07,
}

impl RomFormat {
    fn detect(header: &[u8; HEADER_SIZE]) -> Self {
        match header[7] & 0x0C {
            0x08 => RomFormat::Nes2,
            0x04 => RomFormat::ArchaicInes,
            0x00 if header[12..16].iter().all(|&b| b == 0) => RomFormat::Ines,
            _ => RomFormat::Ines07,
        }
    }

    /// Whether bytes 8-15 follow a published layout.
    pub fn is_standard(self) -> bool {
        matches!(self, RomFormat::Ines | RomFormat::Nes2)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Header {
    pub format: RomFormat,
    /// PRG ROM size in bytes.
    pub prg_rom_size: usize,
    /// CHR ROM size in bytes; 0 means the board carries CHR RAM instead.
    pub chr_rom_size: usize,
    pub mapper: u16,
    pub submapper: u8,
    pub mirroring: Mirroring,
    pub battery: bool,
    pub trainer: bool,
}

impl Header {
    pub fn parse(data: &[u8]) -> Result<Self, CartridgeError> {
        let header: [u8; HEADER_SIZE] = data
            .get(..HEADER_SIZE)
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or(CartridgeError::TruncatedRom {
                expected: HEADER_SIZE,
                actual: data.len(),
            })?;

        let magic = [header[0], header[1], header[2], header[3]];
        if magic != MAGIC {
            return Err(CartridgeError::InvalidMagic(magic));
        }

        let format = RomFormat::detect(&header);
        let flags6 = header[6];
        let flags7 = header[7];

        let mut mapper = ((flags7 & 0xF0) | (flags6 >> 4)) as u16;
        let mut submapper = 0;

        let (prg_rom_size, chr_rom_size) = if format == RomFormat::Nes2 {
            mapper |= ((header[8] & 0x0F) as u16) << 8;
            submapper = header[8] >> 4;
            (
                nes2_rom_size(header[4], header[9] & 0x0F, PRG_UNIT),
                nes2_rom_size(header[5], header[9] >> 4, CHR_UNIT),
            )
        } else {
            (header[4] as usize * PRG_UNIT, header[5] as usize * CHR_UNIT)
        };

        let mirroring = if flags6 & FLAG6_FOUR_SCREEN != 0 {
            Mirroring::FourScreen
        } else if flags6 & FLAG6_VERTICAL != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        };

        Ok(Self {
            format,
            prg_rom_size,
            chr_rom_size,
            mapper,
            submapper,
            mirroring,
            battery: flags6 & FLAG6_BATTERY != 0,
            trainer: flags6 & FLAG6_TRAINER != 0,
        })
    }

    /// Total file size the header promises.
    pub fn expected_len(&self) -> usize {
        let trainer = if self.trainer { TRAINER_SIZE } else { 0 };
        HEADER_SIZE
            .saturating_add(trainer)
            .saturating_add(self.prg_rom_size)
            .saturating_add(self.chr_rom_size)
    }
}

/// NES 2.0 size field. An MSB nibble of `$F` switches the LSB byte to
/// exponent-multiplier notation: `2^E * (MM * 2 + 1)` bytes.
fn nes2_rom_size(lsb: u8, msb: u8, unit: usize) -> usize {
    if msb == 0x0F {
        let exponent = (lsb >> 2) as u32;
        let multiplier = (lsb & 0x03) as usize * 2 + 1;
        1usize
            .checked_shl(exponent)
            .unwrap_or(usize::MAX)
            .saturating_mul(multiplier)
    } else {
        (((msb as usize) << 8) | lsb as usize) * unit
    }
}
