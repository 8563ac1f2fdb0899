//! 24-bit address encoding

/// Number of address bytes transmitted after the opcode
pub const ADDRESS_BYTES: usize = 3;

/// Largest address representable in the 24-bit address phase
pub const MAX_WIRE_ADDRESS: u32 = 0x00FF_FFFF;

/// Encode an address as three big-endian bytes (bits 23..0)
///
/// Bits above 23 are dropped. Range checking against the chip capacity
/// happens in the protocol layer before a frame is ever built.
pub const fn encode_address(address: u32) -> [u8; ADDRESS_BYTES] {
    [(address >> 16) as u8, (address >> 8) as u8, address as u8]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_address() {
        assert_eq!(encode_address(0x000100), [0x00, 0x01, 0x00]);
        assert_eq!(encode_address(0x01FFFF), [0x01, 0xFF, 0xFF]);
        assert_eq!(encode_address(MAX_WIRE_ADDRESS), [0xFF, 0xFF, 0xFF]);
    }
}
