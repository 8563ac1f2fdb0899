//! Memory device session
//!
//! [`MemoryDevice`] pairs one open transport with the configuration of the
//! chip behind it. It owns the transport for the lifetime of the session;
//! dropping the device (or calling [`MemoryDevice::close`]) releases it.

use crate::chip::ChipConfig;
use crate::error::{Error, Result};
use crate::protocol::{self, StatusRegister};
use crate::transport::Transport;

/// A session with one memory chip
#[derive(Debug)]
pub struct MemoryDevice<T> {
    transport: T,
    chip: ChipConfig,
}

impl<T: Transport> MemoryDevice<T> {
    /// Create a session over an already opened transport
    pub fn new(transport: T, chip: ChipConfig) -> Self {
        Self { transport, chip }
    }

    /// Chip configuration
    pub fn chip(&self) -> &ChipConfig {
        &self.chip
    }

    /// Chip capacity in bytes
    pub fn capacity(&self) -> u32 {
        self.chip.capacity
    }

    /// Mutable access to the underlying transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Read one byte
    pub fn read_byte(&mut self, address: u32) -> Result<u8> {
        protocol::read_byte(&mut self.transport, &self.chip, address)
    }

    /// Read one byte, returning the sentinel value alongside any error
    pub fn read_byte_or_sentinel(&mut self, address: u32) -> (u8, Option<Error>) {
        protocol::read_byte_or_sentinel(&mut self.transport, &self.chip, address)
    }

    /// Write one byte (WREN + WRITE)
    pub fn write_byte(&mut self, address: u32, data: u8) -> Result<()> {
        protocol::write_byte(&mut self.transport, &self.chip, address, data)
    }

    /// Read the status register
    pub fn read_status_register(&mut self) -> Result<StatusRegister> {
        protocol::read_status_register(&mut self.transport)
    }

    /// End the session and hand the transport back
    pub fn close(self) -> T {
        self.transport
    }
}
