//! Processor status register (P) bit masks: `N V _ B D I Z C`, bit 7 to bit 0.

pub const FLAG_CARRY: u8 = 1 << 0;
pub const FLAG_ZERO: u8 = 1 << 1;
pub const FLAG_INTERRUPT_DISABLE: u8 = 1 << 2;
pub const FLAG_DECIMAL: u8 = 1 << 3; // tracked, but the 2A03 has no BCD unit
pub const FLAG_BREAK: u8 = 1 << 4; // only exists in the pushed copy of P
pub const FLAG_UNUSED: u8 = 1 << 5; // always 1 when pushed
pub const FLAG_OVERFLOW: u8 = 1 << 6;
pub const FLAG_NEGATIVE: u8 = 1 << 7;

/// Status after reset: interrupts disabled, unused bit set.
pub const RESET_STATUS: u8 = FLAG_INTERRUPT_DISABLE | FLAG_UNUSED;

/// Renders P as `NV-BDIZC`, upper case for set bits and lower case for clear ones.
pub fn describe(status: u8) -> String {
    const NAMES: [(u8, char); 8] = [
        (FLAG_NEGATIVE, 'N'),
        (FLAG_OVERFLOW, 'V'),
        (FLAG_UNUSED, '-'),
        (FLAG_BREAK, 'B'),
        (FLAG_DECIMAL, 'D'),
        (FLAG_INTERRUPT_DISABLE, 'I'),
        (FLAG_ZERO, 'Z'),
        (FLAG_CARRY, 'C'),
    ];

    NAMES
        .iter()
        .map(|&(mask, name)| {
            if status & mask != 0 {
                name
            } else {
                name.to_ascii_lowercase()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reset_status_is_0x24() {
        assert_eq!(RESET_STATUS, 0x24);
    }

    #[test]
    fn describe_marks_set_bits() {
        assert_eq!(describe(0x24), "nv-bdIzc");
        assert_eq!(describe(0xC3), "NV-bdiZC");
    }
}
