//! Status register decoding

use crate::spi::opcodes;
use bitflags::bitflags;

bitflags! {
    /// MRAM status register
    ///
    /// Only [`WEL`](Self::WEL) is consulted by the protocol; the block
    /// protection bits are decoded for display.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusRegister: u8 {
        /// Write Enable Latch
        const WEL  = opcodes::SR_WEL;
        /// Block Protect 0
        const BP0  = opcodes::SR_BP0;
        /// Block Protect 1
        const BP1  = opcodes::SR_BP1;
        /// Status Register Write Disable
        const SRWD = opcodes::SR_SRWD;

        // Keep undefined bits so the raw value survives a round trip
        const _ = !0;
    }
}

impl StatusRegister {
    /// Returns true if the write-enable latch is set
    pub fn write_enabled(&self) -> bool {
        self.contains(Self::WEL)
    }

    /// Block protection level (0-3) from BP1:BP0
    pub fn block_protection(&self) -> u8 {
        (self.bits() >> 2) & 0x03
    }
}
