//! SPI types and command framing
//!
//! This module provides the opcodes understood by serial MRAM parts, the
//! 24-bit address encoding and the command frame codec.

mod address;
mod frame;
pub mod opcodes;

pub use address::{encode_address, ADDRESS_BYTES, MAX_WIRE_ADDRESS};
pub use frame::{
    build_read_frame, build_read_status_frame, build_write_enable_frame, build_write_frame,
    extract_data_byte, CommandFrame, Exchange, MAX_FRAME_LEN,
};
pub use opcodes::*;
