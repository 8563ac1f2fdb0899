//! Byte-level MRAM protocol
//!
//! Read, write and status commands for one chip reached through one
//! [`Transport`]. Every address is checked against the chip capacity before
//! a frame is built, so an out-of-range request never reaches the bus.
//!
//! A write is two transactions issued back to back on the same transport:
//!
//! ```text
//! Idle -> WREN sent -> WRITE issued -> Idle
//! ```
//!
//! A read is a single transaction. There is no busy flag to poll and no
//! read-back verification.

use crate::chip::ChipConfig;
use crate::error::{Error, Phase, Result};
use crate::spi::{self, opcodes, CommandFrame, MAX_FRAME_LEN};
use crate::transport::Transport;

use super::StatusRegister;

/// Reject addresses outside `0..chip.capacity`
pub fn check_address(chip: &ChipConfig, address: u32) -> Result<()> {
    if chip.is_valid_address(address) {
        Ok(())
    } else {
        log::debug!(
            "Address 0x{:06X} out of range (max 0x{:06X})",
            address,
            chip.max_address()
        );
        Err(Error::AddressOutOfRange {
            address,
            capacity: chip.capacity,
        })
    }
}

/// Run one frame and return the captured bytes
fn exchange<T: Transport + ?Sized>(
    transport: &mut T,
    frame: &CommandFrame,
    phase: Phase,
) -> Result<([u8; MAX_FRAME_LEN], usize)> {
    let mut rx = [0u8; MAX_FRAME_LEN];
    let rx_len = frame.rx_len();
    transport
        .transact(frame, &mut rx[..rx_len])
        .map_err(|e| {
            let e = e.in_phase(frame.opcode(), frame.address(), phase);
            log::debug!("{}", e);
            e
        })?;
    Ok((rx, rx_len))
}

/// Send the Write Enable command
pub fn write_enable<T: Transport + ?Sized>(transport: &mut T) -> Result<()> {
    let frame = spi::build_write_enable_frame();
    exchange(transport, &frame, Phase::WriteEnable).map(|_| ())
}

/// Read the status register
pub fn read_status_register<T: Transport + ?Sized>(transport: &mut T) -> Result<StatusRegister> {
    let frame = spi::build_read_status_frame();
    let (rx, len) = exchange(transport, &frame, Phase::StatusRead)?;
    Ok(StatusRegister::from_bits_retain(spi::extract_data_byte(
        &rx[..len],
    )))
}

/// Read one byte
///
/// On a transport failure the error is returned and the caller should use
/// [`opcodes::READ_SENTINEL`] as a non-authoritative placeholder if it
/// needs a value at all.
pub fn read_byte<T: Transport + ?Sized>(
    transport: &mut T,
    chip: &ChipConfig,
    address: u32,
) -> Result<u8> {
    check_address(chip, address)?;

    let frame = spi::build_read_frame(address, chip.read_frame);
    let (rx, len) = exchange(transport, &frame, Phase::Read)?;
    let value = spi::extract_data_byte(&rx[..len]);
    log::trace!("READ 0x{:06X} -> 0x{:02X}", address, value);
    Ok(value)
}

/// Read one byte, substituting the sentinel on failure
///
/// Returns the value together with the error, if any. The value is only
/// meaningful when the error is `None`.
pub fn read_byte_or_sentinel<T: Transport + ?Sized>(
    transport: &mut T,
    chip: &ChipConfig,
    address: u32,
) -> (u8, Option<Error>) {
    match read_byte(transport, chip, address) {
        Ok(value) => (value, None),
        Err(e) => (opcodes::READ_SENTINEL, Some(e)),
    }
}

/// Write one byte
///
/// Sends WREN, optionally checks the write-enable latch, then sends the
/// WRITE frame. A latch that reads back clear is only a warning; the write
/// is still issued.
pub fn write_byte<T: Transport + ?Sized>(
    transport: &mut T,
    chip: &ChipConfig,
    address: u32,
    data: u8,
) -> Result<()> {
    check_address(chip, address)?;

    write_enable(transport)?;

    if chip.check_write_enable {
        match read_status_register(transport) {
            Ok(status) if !status.write_enabled() => {
                log::warn!(
                    "Write Enable Latch not set before write to 0x{:06X} (SR=0x{:02X})",
                    address,
                    status.bits()
                );
            }
            Ok(_) => {}
            Err(e) => log::warn!("Could not verify Write Enable Latch: {}", e),
        }
    }

    let frame = spi::build_write_frame(address, data);
    exchange(transport, &frame, Phase::Write)?;
    log::trace!("WRITE 0x{:06X} <- 0x{:02X}", address, data);
    Ok(())
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::chip::{ChipVariant, ReadFrame};
    use crate::spi::Exchange;

    /// Minimal chip model that journals every frame it sees
    struct Recorder {
        memory: Vec<u8>,
        wel: bool,
        frames: Vec<Vec<u8>>,
        fail_opcode: Option<u8>,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                memory: vec![0u8; 131072],
                wel: false,
                frames: Vec::new(),
                fail_opcode: None,
            }
        }

        fn opcodes(&self) -> Vec<u8> {
            self.frames.iter().map(|f| f[0]).collect()
        }
    }

    impl Transport for Recorder {
        fn transact(&mut self, frame: &CommandFrame, rx: &mut [u8]) -> Result<()> {
            let tx = frame.as_bytes();
            self.frames.push(tx.to_vec());
            if self.fail_opcode == Some(frame.opcode()) {
                return Err(Error::SpiTransferFailed);
            }
            let addr = || ((tx[1] as usize) << 16) | ((tx[2] as usize) << 8) | tx[3] as usize;
            match frame.opcode() {
                opcodes::WREN => self.wel = true,
                opcodes::RDSR => rx[1] = if self.wel { opcodes::SR_WEL } else { 0 },
                opcodes::WRITE => {
                    if self.wel {
                        self.memory[addr()] = tx[4];
                    }
                    self.wel = false;
                }
                opcodes::READ => {
                    let value = self.memory[addr()];
                    match frame.exchange() {
                        Exchange::FullDuplex => rx[4] = value,
                        _ => rx[0] = value,
                    }
                }
                _ => {}
            }
            Ok(())
        }
    }

    #[test]
    fn test_write_then_read() {
        let chip = ChipVariant::Mr10q010.config();
        let mut t = Recorder::new();
        write_byte(&mut t, &chip, 0x100, 0xAB).unwrap();
        assert_eq!(read_byte(&mut t, &chip, 0x100).unwrap(), 0xAB);
        assert_eq!(
            t.opcodes(),
            vec![opcodes::WREN, opcodes::RDSR, opcodes::WRITE, opcodes::READ]
        );
    }

    #[test]
    fn test_duplex_read() {
        let chip = ChipVariant::Mr10q010Duplex.config();
        assert_eq!(chip.read_frame, ReadFrame::Duplex);
        let mut t = Recorder::new();
        t.memory[0x1FFFF] = 0x5A;
        assert_eq!(read_byte(&mut t, &chip, 0x1FFFF).unwrap(), 0x5A);
        assert_eq!(t.frames[0], vec![0x03, 0x01, 0xFF, 0xFF, 0x00]);
    }

    #[test]
    fn test_write_without_wel_check() {
        let chip = ChipVariant::Mr10q010Duplex.config();
        let mut t = Recorder::new();
        write_byte(&mut t, &chip, 0x42, 0x24).unwrap();
        assert_eq!(t.opcodes(), vec![opcodes::WREN, opcodes::WRITE]);
        assert_eq!(t.memory[0x42], 0x24);
    }

    #[test]
    fn test_out_of_range_issues_nothing() {
        let chip = ChipVariant::Mr10q010.config();
        let mut t = Recorder::new();
        let expected = Error::AddressOutOfRange {
            address: 0x20000,
            capacity: 0x20000,
        };
        assert_eq!(read_byte(&mut t, &chip, 0x20000), Err(expected));
        assert_eq!(write_byte(&mut t, &chip, 0x20000, 0x00), Err(expected));
        assert_eq!(
            read_byte(&mut t, &chip, u32::MAX),
            Err(Error::AddressOutOfRange {
                address: u32::MAX,
                capacity: 0x20000
            })
        );
        assert!(t.frames.is_empty());
    }

    #[test]
    fn test_read_failure_reports_context() {
        let chip = ChipVariant::Mr10q010.config();
        let mut t = Recorder::new();
        t.fail_opcode = Some(opcodes::READ);
        assert_eq!(
            read_byte(&mut t, &chip, 0x10),
            Err(Error::TransactionFailed {
                opcode: opcodes::READ,
                address: Some(0x10),
                phase: Phase::Read
            })
        );

        let (value, err) = read_byte_or_sentinel(&mut t, &chip, 0x10);
        assert_eq!(value, opcodes::READ_SENTINEL);
        assert!(err.is_some());
    }

    #[test]
    fn test_genuine_ff_is_not_an_error() {
        let chip = ChipVariant::Mr10q010.config();
        let mut t = Recorder::new();
        t.memory[0x20] = 0xFF;
        assert_eq!(read_byte_or_sentinel(&mut t, &chip, 0x20), (0xFF, None));
    }

    #[test]
    fn test_failed_wren_aborts_write() {
        let chip = ChipVariant::Mr10q010.config();
        let mut t = Recorder::new();
        t.fail_opcode = Some(opcodes::WREN);
        assert_eq!(
            write_byte(&mut t, &chip, 0x10, 0x01),
            Err(Error::TransactionFailed {
                opcode: opcodes::WREN,
                address: None,
                phase: Phase::WriteEnable
            })
        );
        assert_eq!(t.opcodes(), vec![opcodes::WREN]);
    }

    #[test]
    fn test_status_failure_does_not_abort_write() {
        let chip = ChipVariant::Mr10q010.config();
        let mut t = Recorder::new();
        t.fail_opcode = Some(opcodes::RDSR);
        write_byte(&mut t, &chip, 0x10, 0x77).unwrap();
        assert_eq!(t.memory[0x10], 0x77);
    }
}
