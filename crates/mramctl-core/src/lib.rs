//! mramctl-core - Core library for serial MRAM access
//!
//! This crate provides the SPI command framing, the byte-level memory
//! protocol and the bulk import/export logic for byte-addressable serial
//! MRAM chips such as the MR10Q010 ("23x1024"-style, 24-bit addressed).
//! It is `no_std` compatible; the parts that need I/O or heap-owned device
//! names are behind the `std` feature.
//!
//! # Features
//!
//! - `std` - Enable standard library support (includes `alloc`), the
//!   dual-chip router, the interchange codec and the bulk orchestrator
//! - `alloc` - Enable heap allocation
//!
//! # Example
//!
//! ```ignore
//! use mramctl_core::{chip::ChipVariant, device::MemoryDevice, transport::Transport};
//!
//! fn peek<T: Transport>(transport: T) {
//!     let mut mram = MemoryDevice::new(transport, ChipVariant::Mr10q010.config());
//!     match mram.read_byte(0x100) {
//!         Ok(value) => println!("0x000100: 0x{:02X}", value),
//!         Err(e) => println!("Read failed: {}", e),
//!     }
//! }
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

#[cfg(feature = "alloc")]
extern crate alloc;

#[cfg(feature = "std")]
pub mod bulk;
pub mod chip;
pub mod device;
pub mod error;
#[cfg(feature = "std")]
pub mod interchange;
pub mod protocol;
#[cfg(feature = "std")]
pub mod router;
pub mod spi;
pub mod transport;

pub use error::{Error, Phase, Result};
