//! Chip variants
//!
//! Every supported part speaks the same byte-mode protocol. What differs
//! between boards is configuration: capacity, how the read response is
//! framed, the transport word size, the rated clock and whether the
//! write-enable latch is checked. [`ChipConfig`] carries those values and
//! [`ChipVariant`] names the known combinations.

use core::fmt;
use core::str::FromStr;

/// Byte capacity of the MR10Q010 / 23x1024 parts (17-bit decode range)
pub const MR10Q010_CAPACITY: u32 = 128 * 1024;

/// Rated maximum SPI clock of the MR10Q010 in Hz
pub const MR10Q010_MAX_SPEED_HZ: u32 = 40_000_000;

/// How a READ frame captures its data byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "std", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "std", serde(rename_all = "lowercase"))]
pub enum ReadFrame {
    /// 4-byte address phase, then a chained 1-byte receive phase
    #[default]
    Split,
    /// 5-byte full-duplex frame with a trailing filler byte
    Duplex,
}

/// Static description of one memory chip
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipConfig {
    /// Capacity in bytes; valid addresses are `0..capacity`
    pub capacity: u32,
    /// Read response framing
    pub read_frame: ReadFrame,
    /// Transport word size in bits
    pub bits_per_word: u8,
    /// Rated maximum clock in Hz
    pub max_speed_hz: u32,
    /// Read the status register after WREN and warn if WEL is not set
    pub check_write_enable: bool,
}

impl ChipConfig {
    /// Check if an address is valid for this chip
    pub const fn is_valid_address(&self, address: u32) -> bool {
        address < self.capacity
    }

    /// Highest valid address
    pub const fn max_address(&self) -> u32 {
        self.capacity.saturating_sub(1)
    }
}

impl Default for ChipConfig {
    fn default() -> Self {
        ChipVariant::default().config()
    }
}

/// Known chip/board combinations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChipVariant {
    /// MR10Q010 with split read framing and WEL verification
    #[default]
    Mr10q010,
    /// MR10Q010 read with a 5-byte full-duplex frame
    Mr10q010Duplex,
    /// Duplex framing with a 24-bit transport word
    ///
    /// Framing is still five literal bytes. Needs validation on real
    /// hardware before it is trusted.
    Mr10q010Wide,
}

impl ChipVariant {
    /// All known variants
    pub const ALL: [ChipVariant; 3] = [
        ChipVariant::Mr10q010,
        ChipVariant::Mr10q010Duplex,
        ChipVariant::Mr10q010Wide,
    ];

    /// Canonical name used on the command line and in config files
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Mr10q010 => "mr10q010",
            Self::Mr10q010Duplex => "mr10q010-duplex",
            Self::Mr10q010Wide => "mr10q010-wide",
        }
    }

    /// One-line description
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Mr10q010 => "MR10Q010 128 KiB, split read, WEL check",
            Self::Mr10q010Duplex => "MR10Q010 128 KiB, 5-byte full-duplex read",
            Self::Mr10q010Wide => "MR10Q010 128 KiB, full-duplex read, 24-bit words (unvalidated)",
        }
    }

    /// Configuration for this variant
    pub const fn config(&self) -> ChipConfig {
        match self {
            Self::Mr10q010 => ChipConfig {
                capacity: MR10Q010_CAPACITY,
                read_frame: ReadFrame::Split,
                bits_per_word: 8,
                max_speed_hz: MR10Q010_MAX_SPEED_HZ,
                check_write_enable: true,
            },
            Self::Mr10q010Duplex => ChipConfig {
                capacity: MR10Q010_CAPACITY,
                read_frame: ReadFrame::Duplex,
                bits_per_word: 8,
                max_speed_hz: MR10Q010_MAX_SPEED_HZ,
                check_write_enable: false,
            },
            Self::Mr10q010Wide => ChipConfig {
                capacity: MR10Q010_CAPACITY,
                read_frame: ReadFrame::Duplex,
                bits_per_word: 24,
                max_speed_hz: MR10Q010_MAX_SPEED_HZ,
                check_write_enable: false,
            },
        }
    }
}

impl fmt::Display for ChipVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returned when a variant name is not recognized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnknownVariant;

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("unknown chip variant")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for UnknownVariant {}

impl FromStr for ChipVariant {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|v| v.name().eq_ignore_ascii_case(s))
            .ok_or(UnknownVariant)
    }
}
