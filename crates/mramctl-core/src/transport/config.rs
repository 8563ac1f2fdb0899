//! Transport configuration

use crate::chip::ChipConfig;
use crate::error::{Error, Result};

/// Default SPI clock speed in Hz (10 MHz)
pub const DEFAULT_SPEED_HZ: u32 = 10_000_000;

/// SPI mode constants
pub mod mode {
    /// SPI mode 0: CPOL=0, CPHA=0
    pub const MODE_0: u8 = 0;
    /// SPI mode 1: CPOL=0, CPHA=1
    pub const MODE_1: u8 = 1;
    /// SPI mode 2: CPOL=1, CPHA=0
    pub const MODE_2: u8 = 2;
    /// SPI mode 3: CPOL=1, CPHA=1
    pub const MODE_3: u8 = 3;
}

/// Fixed configuration applied when a transport is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransportConfig {
    /// SPI clock speed in Hz
    pub speed_hz: u32,
    /// SPI mode (0-3)
    pub mode: u8,
    /// Bits per word
    pub bits_per_word: u8,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            speed_hz: DEFAULT_SPEED_HZ,
            mode: mode::MODE_0,
            bits_per_word: 8,
        }
    }
}

impl TransportConfig {
    /// Build a mode 0 configuration for `chip` at the requested clock speed
    ///
    /// The speed must be non-zero and no faster than the chip is rated for.
    pub fn for_chip(chip: &ChipConfig, speed_hz: u32) -> Result<Self> {
        if speed_hz == 0 || speed_hz > chip.max_speed_hz {
            log::error!(
                "SPI speed {} Hz outside the chip's range (1..={} Hz)",
                speed_hz,
                chip.max_speed_hz
            );
            return Err(Error::ConfigurationRejected);
        }
        if chip.bits_per_word != 8 {
            log::warn!(
                "Using {} bits per word with byte-framed commands; validate against hardware",
                chip.bits_per_word
            );
        }
        Ok(Self {
            speed_hz,
            mode: mode::MODE_0,
            bits_per_word: chip.bits_per_word,
        })
    }

    /// Override the SPI mode (0-3)
    pub fn with_mode(mut self, mode: u8) -> Result<Self> {
        if mode > mode::MODE_3 {
            log::error!("Invalid SPI mode: {} (must be 0-3)", mode);
            return Err(Error::ConfigurationRejected);
        }
        self.mode = mode;
        Ok(self)
    }
}
