//! mramctl-linux-spi - Linux spidev transport
//!
//! This crate drives serial MRAM chips through the Linux spidev
//! `/dev/spidevX.Y` device interface.
//!
//! # Overview
//!
//! The Linux SPI driver exposes SPI controllers through character devices
//! at `/dev/spidevX.Y` where X is the bus number and Y is the chip select.
//! Each command frame is issued as a single `SPI_IOC_MESSAGE` so chip
//! select stays asserted for the whole frame, including the chained
//! receive phase of a split read.
//!
//! # Example
//!
//! ```no_run
//! use mramctl_core::chip::ChipVariant;
//! use mramctl_core::device::MemoryDevice;
//! use mramctl_core::transport::TransportConfig;
//! use mramctl_linux_spi::{LinuxSpi, LinuxSpiConfig};
//!
//! let chip = ChipVariant::Mr10q010.config();
//! let transport = TransportConfig::for_chip(&chip, 10_000_000)?;
//! let spi = LinuxSpi::open(&LinuxSpiConfig::from_transport("/dev/spidev0.0", &transport))?;
//!
//! let mut mram = MemoryDevice::new(spi, chip);
//! mram.write_byte(0x100, 0xAB)?;
//! println!("0x100: 0x{:02X}", mram.read_byte(0x100)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # System Requirements
//!
//! - Linux kernel with spidev support enabled (`CONFIG_SPI_SPIDEV`)
//! - Read/write access to `/dev/spidevX.Y` device
//! - May require adding user to `spi` group or using udev rules

pub mod device;
pub mod error;

// Re-exports
pub use device::{LinuxSpi, LinuxSpiConfig, LinuxSpiOpener};
pub use error::{LinuxSpiError, Result};
