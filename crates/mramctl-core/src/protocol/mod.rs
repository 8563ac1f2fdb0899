//! Memory protocol implementations
//!
//! Byte-mode command sequences for serial MRAM.

pub mod mram;
mod status;

pub use mram::*;
pub use status::StatusRegister;
