//! Transport abstraction
//!
//! This module defines the seam between the memory protocol and whatever
//! performs the SPI exchanges (Linux spidev, the in-memory emulator, ...).

mod config;
mod traits;

pub use config::{mode, TransportConfig, DEFAULT_SPEED_HZ};
pub use traits::*;
