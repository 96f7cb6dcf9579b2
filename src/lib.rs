//! Elaris core: the CPU side of an NES (Nintendo Entertainment System) emulator.
//!
//! Follows the [NESdev Wiki](https://www.nesdev.org/wiki/NES_reference_guide): the Ricoh 2A03's
//! 6502 core, the CPU memory map, and iNES / NES 2.0 cartridge loading.
//!
//! ## Modules (NESdev references)
//!
//! - **bus** – the [`Bus`](bus::Bus) trait the CPU reads and writes through
//! - **cartridge** – [iNES](https://www.nesdev.org/wiki/INES) / [NES 2.0](https://www.nesdev.org/wiki/NES_2.0)
//!   parsing; [NROM](https://www.nesdev.org/wiki/NROM) is the only board that runs
//! - **console** – a cartridge mapped into memory and driven by the CPU
//! - **cpu** – [6502](https://www.nesdev.org/wiki/CPU) / 2A03: documented opcodes, [NMI](https://www.nesdev.org/wiki/NMI) and IRQ
//! - **memory** – [CPU memory map](https://www.nesdev.org/wiki/CPU_memory_map): RAM mirrors, I/O policy, PRG ROM
//! - **trace** – nestest-style per-instruction trace lines

pub mod bus;
pub mod cartridge;
pub mod console;
pub mod cpu;
pub mod memory;
pub mod trace;
