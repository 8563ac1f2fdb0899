//! Transport trait definitions

use crate::error::Result;
use crate::spi::CommandFrame;

use super::TransportConfig;

/// A single open SPI channel bound to one chip-select line
///
/// Implementations perform exactly one synchronous, blocking exchange per
/// call, asserting chip select for the whole call:
///
/// - [`Exchange::WriteOnly`](crate::spi::Exchange::WriteOnly): the frame is
///   clocked out, nothing is captured and `rx` is empty
/// - [`Exchange::FullDuplex`](crate::spi::Exchange::FullDuplex): `rx` has the
///   frame's length and is filled while the frame is clocked out
/// - [`Exchange::WriteThenRead`](crate::spi::Exchange::WriteThenRead): the
///   frame is clocked out, then `rx.len()` bytes are clocked in as a chained
///   transfer without releasing chip select
///
/// A failed exchange is reported as
/// [`Error::SpiTransferFailed`](crate::Error::SpiTransferFailed); the
/// protocol layer attaches opcode, address and phase. Transactions are
/// never retried here.
pub trait Transport {
    /// Execute one framed transaction
    fn transact(&mut self, frame: &CommandFrame, rx: &mut [u8]) -> Result<()>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn transact(&mut self, frame: &CommandFrame, rx: &mut [u8]) -> Result<()> {
        (**self).transact(frame, rx)
    }
}

#[cfg(feature = "alloc")]
impl<T: Transport + ?Sized> Transport for alloc::boxed::Box<T> {
    fn transact(&mut self, frame: &CommandFrame, rx: &mut [u8]) -> Result<()> {
        (**self).transact(frame, rx)
    }
}

/// Opens transports for opaque device identities
///
/// The device string is whatever the platform uses to name a chip-select
/// line (for spidev, `/dev/spidevB.C`). Dropping the returned transport
/// closes it.
pub trait TransportOpener {
    /// The transport type produced by this opener
    type Transport: Transport;

    /// Open and configure the device
    ///
    /// Fails with `DeviceUnavailable` if the device cannot be opened and
    /// `ConfigurationRejected` if mode, speed or word size cannot be applied.
    fn open(&mut self, device: &str, config: &TransportConfig) -> Result<Self::Transport>;
}

impl<O: TransportOpener + ?Sized> TransportOpener for &mut O {
    type Transport = O::Transport;

    fn open(&mut self, device: &str, config: &TransportConfig) -> Result<Self::Transport> {
        (**self).open(device, config)
    }
}
