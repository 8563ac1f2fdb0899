//! Error types for mramctl-core
//!
//! This module provides a no_std compatible error type that can be used
//! throughout the crate.

use core::fmt;

/// The protocol step during which a transaction failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Write Enable (WREN) frame
    WriteEnable,
    /// Read Status Register (RDSR) frame
    StatusRead,
    /// Data read (READ) frame
    Read,
    /// Data write (WRITE) frame
    Write,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::WriteEnable => "write-enable",
            Self::StatusRead => "status-read",
            Self::Read => "read",
            Self::Write => "write",
        };
        f.write_str(name)
    }
}

/// Core error type - no_std compatible, Copy for efficiency
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    // Transport setup errors
    /// The SPI device could not be opened
    DeviceUnavailable,
    /// Mode, clock speed or word size could not be applied
    ConfigurationRejected,
    /// A session is already open on this chip-select line
    SessionBusy,

    // Addressing errors
    /// Address is beyond the chip capacity
    AddressOutOfRange {
        /// The rejected address
        address: u32,
        /// Chip capacity in bytes
        capacity: u32,
    },

    // Transaction errors
    /// The transport reported a failed exchange (no protocol context yet)
    SpiTransferFailed,
    /// One SPI exchange of the memory protocol failed
    TransactionFailed {
        /// Opcode of the failed frame
        opcode: u8,
        /// Address carried by the frame, if any
        address: Option<u32>,
        /// Protocol step that failed
        phase: Phase,
    },

    // Interchange errors
    /// An interchange line did not parse into an address/data pair
    MalformedRecord {
        /// 1-based line number in the source
        line: usize,
    },

    // I/O errors
    /// Reading the interchange source or writing the sink failed
    Io,
}

impl Error {
    /// Returns true if the error aborts the whole operation
    ///
    /// Fatal errors are the ones that prevent any further transaction from
    /// being issued: the transport cannot be opened or configured, or the
    /// text sink/source is gone. Everything else is local to one address or
    /// one record.
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::DeviceUnavailable | Self::ConfigurationRejected | Self::SessionBusy | Self::Io
        )
    }

    /// Attach protocol context to a raw transport failure
    pub(crate) fn in_phase(self, opcode: u8, address: Option<u32>, phase: Phase) -> Self {
        match self {
            Self::SpiTransferFailed => Self::TransactionFailed {
                opcode,
                address,
                phase,
            },
            other => other,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceUnavailable => write!(f, "SPI device unavailable"),
            Self::ConfigurationRejected => write!(f, "SPI configuration rejected"),
            Self::SessionBusy => write!(f, "a session is already open on this chip select"),
            Self::AddressOutOfRange { address, capacity } => write!(
                f,
                "address 0x{:06X} out of range (capacity {} bytes)",
                address, capacity
            ),
            Self::SpiTransferFailed => write!(f, "SPI transfer failed"),
            Self::TransactionFailed {
                opcode,
                address: Some(address),
                phase,
            } => write!(
                f,
                "{} transaction (opcode 0x{:02X}) failed at address 0x{:06X}",
                phase, opcode, address
            ),
            Self::TransactionFailed {
                opcode,
                address: None,
                phase,
            } => write!(f, "{} transaction (opcode 0x{:02X}) failed", phase, opcode),
            Self::MalformedRecord { line } => write!(f, "malformed record on line {}", line),
            Self::Io => write!(f, "I/O error"),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

/// Result type alias using the core Error type
pub type Result<T> = core::result::Result<T, Error>;
