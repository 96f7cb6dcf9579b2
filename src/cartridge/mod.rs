//! NES cartridge loading.
//!
//! - **header**: [iNES](https://www.nesdev.org/wiki/INES) and [NES 2.0](https://www.nesdev.org/wiki/NES_2.0)
//!   header decoding: sizes, format detection, mirroring, mapper number.
//! - **cartridge**: slices trainer, PRG ROM and CHR ROM out of a dump and owns them.
//!
//! Only NROM (mapper 0) boards can be run; other mappers are rejected when a console is built.

use thiserror::Error;

pub mod cartridge;
pub mod header;

pub use cartridge::Cartridge;
pub use header::{Header, Mirroring, RomFormat};

#[derive(Error, Debug)]
pub enum CartridgeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid iNES magic {0:02X?}, expected \"NES\\x1A\"")]
    InvalidMagic([u8; 4]),

    #[error("unsupported mapper {0}, only NROM (mapper 0) is supported")]
    UnsupportedMapper(u16),

    #[error("truncated ROM: header declares {expected} bytes but only {actual} are present")]
    TruncatedRom { expected: usize, actual: usize },
}
