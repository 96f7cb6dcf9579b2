//! The CPU's view of the address space.
//!
//! The CPU is generic over [`Bus`] so tests and hosts can substitute their own memory map;
//! [`crate::memory::Memory`] is the NES implementation.

use crate::memory::MemoryError;

/// Byte-addressed, little-endian 16-bit bus.
pub trait Bus {
    fn read(&mut self, addr: u16) -> Result<u8, MemoryError>;
    fn write(&mut self, addr: u16, data: u8) -> Result<(), MemoryError>;

    /// Side-effect-free read for traces and debuggers. Never faults.
    fn peek(&self, addr: u16) -> u8;

    /// Little-endian word at `addr`, `addr + 1`. The second address wraps at `$FFFF`.
    fn read_u16(&mut self, addr: u16) -> Result<u16, MemoryError> {
        let lo = self.read(addr)? as u16;
        let hi = self.read(addr.wrapping_add(1))? as u16;
        Ok((hi << 8) | lo)
    }

    fn write_u16(&mut self, addr: u16, data: u16) -> Result<(), MemoryError> {
        self.write(addr, data as u8)?;
        self.write(addr.wrapping_add(1), (data >> 8) as u8)
    }
}
