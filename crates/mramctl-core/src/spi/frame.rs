//! Command frame codec
//!
//! Pure, stateless builders for every frame the memory protocol sends.
//! A frame is `[opcode, addr_hi, addr_mid, addr_lo, (data)]` together with
//! a description of how the response is captured. Nothing here validates
//! addresses; that is the protocol layer's job.

use super::address::{encode_address, ADDRESS_BYTES};
use super::opcodes;
use crate::chip::ReadFrame;

/// Longest frame the protocol ever builds
pub const MAX_FRAME_LEN: usize = 1 + ADDRESS_BYTES + 1;

/// Filler byte shifted out while a full-duplex response is clocked in
const FILLER: u8 = 0x00;

/// How the response of a frame is captured
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Exchange {
    /// Transmit only, nothing is captured
    WriteOnly,
    /// One byte is captured for every byte transmitted
    FullDuplex,
    /// The frame is transmitted, then this many bytes are clocked in as a
    /// chained transfer with chip select still asserted
    WriteThenRead(u8),
}

/// A single framed SPI transaction
///
/// Built immediately before the transaction and discarded afterwards.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandFrame {
    bytes: [u8; MAX_FRAME_LEN],
    len: u8,
    address: Option<u32>,
    exchange: Exchange,
}

impl CommandFrame {
    fn new(header: &[u8], address: Option<u32>, exchange: Exchange) -> Self {
        let mut bytes = [0u8; MAX_FRAME_LEN];
        bytes[..header.len()].copy_from_slice(header);
        Self {
            bytes,
            len: header.len() as u8,
            address,
            exchange,
        }
    }

    /// The opcode byte
    pub fn opcode(&self) -> u8 {
        self.bytes[0]
    }

    /// The address carried by this frame, if any
    pub fn address(&self) -> Option<u32> {
        self.address
    }

    /// Bytes to transmit
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    /// Number of bytes to transmit
    pub fn tx_len(&self) -> usize {
        self.len as usize
    }

    /// How the response is captured
    pub fn exchange(&self) -> Exchange {
        self.exchange
    }

    /// Number of response bytes the transport must capture
    pub fn rx_len(&self) -> usize {
        match self.exchange {
            Exchange::WriteOnly => 0,
            Exchange::FullDuplex => self.len as usize,
            Exchange::WriteThenRead(n) => n as usize,
        }
    }
}

/// Build a READ frame (opcode 0x03 + 24-bit address)
///
/// With [`ReadFrame::Duplex`] a trailing filler byte is appended so the
/// data byte is shifted in during the fifth byte of a full-duplex exchange.
/// With [`ReadFrame::Split`] the data byte is clocked in by a chained
/// one-byte receive phase.
pub fn build_read_frame(address: u32, read_frame: ReadFrame) -> CommandFrame {
    let [hi, mid, lo] = encode_address(address);
    match read_frame {
        ReadFrame::Split => CommandFrame::new(
            &[opcodes::READ, hi, mid, lo],
            Some(address),
            Exchange::WriteThenRead(1),
        ),
        ReadFrame::Duplex => CommandFrame::new(
            &[opcodes::READ, hi, mid, lo, FILLER],
            Some(address),
            Exchange::FullDuplex,
        ),
    }
}

/// Build a WRITE frame (opcode 0x02 + 24-bit address + data byte)
pub fn build_write_frame(address: u32, data: u8) -> CommandFrame {
    let [hi, mid, lo] = encode_address(address);
    CommandFrame::new(
        &[opcodes::WRITE, hi, mid, lo, data],
        Some(address),
        Exchange::WriteOnly,
    )
}

/// Build the Write Enable frame `[0x06]`
pub fn build_write_enable_frame() -> CommandFrame {
    CommandFrame::new(&[opcodes::WREN], None, Exchange::WriteOnly)
}

/// Build the Read Status Register frame `[0x05, 0x00]`
pub fn build_read_status_frame() -> CommandFrame {
    CommandFrame::new(&[opcodes::RDSR, FILLER], None, Exchange::FullDuplex)
}

/// Extract the data byte from a response frame
///
/// The data always sits in the last captured byte, aligned with the
/// dummy/data phase of the frame.
pub fn extract_data_byte(rx: &[u8]) -> u8 {
    rx.last().copied().unwrap_or(opcodes::READ_SENTINEL)
}
