//! Serial MRAM opcodes
//!
//! Byte-mode subset of the command set shared by MR10Q010-class MRAM and
//! the 23x1024 serial SRAM family. Page/sequential burst commands and the
//! status register write are deliberately absent.

// ============================================================================
// Write control
// ============================================================================

/// Write Enable - required before every write
pub const WREN: u8 = 0x06;

// ============================================================================
// Status register
// ============================================================================

/// Read Status Register
pub const RDSR: u8 = 0x05;

// ============================================================================
// Data access
// ============================================================================

/// Read Data Bytes
pub const READ: u8 = 0x03;
/// Write Data Bytes
pub const WRITE: u8 = 0x02;

// ============================================================================
// Status register bits
// ============================================================================

/// Status register: Write Enable Latch
pub const SR_WEL: u8 = 1 << 1;
/// Status register: Block Protect 0
pub const SR_BP0: u8 = 1 << 2;
/// Status register: Block Protect 1
pub const SR_BP1: u8 = 1 << 3;
/// Status register: Status Register Write Disable
pub const SR_SRWD: u8 = 1 << 7;

/// Placeholder data byte returned alongside a failed read
///
/// A genuine stored 0xFF looks identical; only the accompanying error tells
/// the two apart.
pub const READ_SENTINEL: u8 = 0xFF;
