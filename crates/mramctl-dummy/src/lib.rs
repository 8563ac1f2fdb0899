//! mramctl-dummy - In-memory MRAM emulator for testing
//!
//! This crate provides a dummy transport that emulates a byte-mode serial
//! MRAM chip in memory. It's useful for testing and development without
//! real hardware.
//!
//! - [`DummyChip`] is the chip itself: memory, status register, a journal
//!   of every transaction and optional fault injection. It is a cheap,
//!   cloneable handle so tests can inspect a chip while a session is open.
//! - [`DummyMram`] is an open session on a chip and implements
//!   [`Transport`]. Only one session per chip may exist at a time.
//! - [`DummyBoard`] maps device paths to chips and implements
//!   [`TransportOpener`], standing in for a board with several chip selects.

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use mramctl_core::error::{Error, Result};
use mramctl_core::spi::{opcodes, CommandFrame, Exchange};
use mramctl_core::transport::{mode, Transport, TransportConfig, TransportOpener};

/// Fill value of a fresh chip
pub const DEFAULT_FILL: u8 = 0x00;

/// One transaction as seen on the bus
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transaction {
    /// Transmitted bytes
    pub tx: Vec<u8>,
    /// How the response was captured
    pub exchange: Exchange,
    /// Whether the transaction succeeded
    pub ok: bool,
}

impl Transaction {
    /// Opcode byte
    pub fn opcode(&self) -> u8 {
        self.tx[0]
    }
}

#[derive(Debug, Default)]
struct Faults {
    all: bool,
    opcodes: BTreeSet<u8>,
    addresses: BTreeSet<u32>,
}

#[derive(Debug)]
struct ChipState {
    memory: Vec<u8>,
    status: u8,
    journal: Vec<Transaction>,
    faults: Faults,
    session_open: bool,
}

/// An emulated MRAM chip
#[derive(Debug, Clone)]
pub struct DummyChip {
    state: Arc<Mutex<ChipState>>,
}

impl DummyChip {
    /// Create a chip of `capacity` bytes filled with [`DEFAULT_FILL`]
    pub fn new(capacity: u32) -> Self {
        Self::with_data(capacity, &[])
    }

    /// Create a chip with pre-filled data
    pub fn with_data(capacity: u32, initial_data: &[u8]) -> Self {
        let mut memory = vec![DEFAULT_FILL; capacity as usize];
        let len = initial_data.len().min(memory.len());
        memory[..len].copy_from_slice(&initial_data[..len]);
        Self {
            state: Arc::new(Mutex::new(ChipState {
                memory,
                status: 0,
                journal: Vec::new(),
                faults: Faults::default(),
                session_open: false,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ChipState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Open a session on this chip
    ///
    /// Fails with [`Error::SessionBusy`] while another session is open.
    pub fn connect(&self) -> Result<DummyMram> {
        let mut state = self.lock();
        if state.session_open {
            return Err(Error::SessionBusy);
        }
        state.session_open = true;
        Ok(DummyMram { chip: self.clone() })
    }

    /// Returns true while a session is open
    pub fn is_connected(&self) -> bool {
        self.lock().session_open
    }

    /// Snapshot of the memory contents
    pub fn memory(&self) -> Vec<u8> {
        self.lock().memory.clone()
    }

    /// Byte at `address`, or [`DEFAULT_FILL`] on a zero-capacity chip
    pub fn peek(&self, address: u32) -> u8 {
        let state = self.lock();
        state
            .decode(address)
            .map_or(DEFAULT_FILL, |index| state.memory[index])
    }

    /// Set the byte at `address` without a transaction
    pub fn poke(&self, address: u32, value: u8) {
        let mut state = self.lock();
        if let Some(index) = state.decode(address) {
            state.memory[index] = value;
        }
    }

    /// Raw status register value
    pub fn status(&self) -> u8 {
        self.lock().status
    }

    /// Set the status register without a transaction
    pub fn set_status(&self, value: u8) {
        self.lock().status = value;
    }

    /// All transactions since creation or the last [`clear_journal`](Self::clear_journal)
    pub fn journal(&self) -> Vec<Transaction> {
        self.lock().journal.clone()
    }

    /// Forget recorded transactions
    pub fn clear_journal(&self) {
        self.lock().journal.clear();
    }

    /// Fail every transaction
    pub fn fail_all(&self, fail: bool) {
        self.lock().faults.all = fail;
    }

    /// Fail every transaction with this opcode
    pub fn fail_opcode(&self, opcode: u8) {
        self.lock().faults.opcodes.insert(opcode);
    }

    /// Fail every transaction addressed to `address`
    pub fn fail_address(&self, address: u32) {
        self.lock().faults.addresses.insert(address);
    }

    /// Remove all injected faults
    pub fn clear_faults(&self) {
        self.lock().faults = Faults::default();
    }
}

/// An open session on a [`DummyChip`]
#[derive(Debug)]
pub struct DummyMram {
    chip: DummyChip,
}

impl DummyMram {
    /// The chip behind this session
    pub fn chip(&self) -> &DummyChip {
        &self.chip
    }
}

impl Drop for DummyMram {
    fn drop(&mut self) {
        self.chip.lock().session_open = false;
    }
}

fn frame_address(tx: &[u8]) -> Option<u32> {
    if tx.len() < 4 {
        return None;
    }
    Some(((tx[1] as u32) << 16) | ((tx[2] as u32) << 8) | tx[3] as u32)
}

impl ChipState {
    /// Decode an address the way the chip does: high bits are ignored
    ///
    /// Returns `None` for a zero-capacity chip.
    fn decode(&self, address: u32) -> Option<usize> {
        (address as usize).checked_rem(self.memory.len())
    }

    /// Like [`decode`](Self::decode), failing the transaction on a
    /// zero-capacity chip
    fn index(&self, address: u32) -> Result<usize> {
        self.decode(address).ok_or_else(|| {
            log::warn!("dummy: access to 0x{:06X} on a zero-capacity chip", address);
            Error::SpiTransferFailed
        })
    }

    fn faulted(&self, frame: &CommandFrame) -> bool {
        self.faults.all
            || self.faults.opcodes.contains(&frame.opcode())
            || frame
                .address()
                .map(|a| self.faults.addresses.contains(&a))
                .unwrap_or(false)
    }

    fn execute(&mut self, frame: &CommandFrame, rx: &mut [u8]) -> Result<()> {
        let tx = frame.as_bytes();
        match frame.opcode() {
            opcodes::WREN => {
                self.status |= opcodes::SR_WEL;
                Ok(())
            }
            opcodes::RDSR => {
                for byte in rx.iter_mut() {
                    *byte = 0;
                }
                if let Some(last) = rx.last_mut() {
                    *last = self.status;
                }
                Ok(())
            }
            opcodes::WRITE => {
                let (Some(address), Some(&data)) = (frame_address(tx), tx.get(4)) else {
                    log::warn!("dummy: short WRITE frame {:02X?}", tx);
                    return Err(Error::SpiTransferFailed);
                };
                if self.status & opcodes::SR_WEL == 0 {
                    log::warn!("dummy: WRITE to 0x{:06X} ignored, WEL not set", address);
                } else {
                    let index = self.index(address)?;
                    self.memory[index] = data;
                }
                self.status &= !opcodes::SR_WEL;
                Ok(())
            }
            opcodes::READ => {
                let Some(address) = frame_address(tx) else {
                    log::warn!("dummy: short READ frame {:02X?}", tx);
                    return Err(Error::SpiTransferFailed);
                };
                match frame.exchange() {
                    Exchange::FullDuplex => {
                        // Data arrives during the byte after the address
                        for (i, byte) in rx.iter_mut().enumerate() {
                            *byte = if i >= 4 {
                                self.memory[self.index(address + (i as u32 - 4))?]
                            } else {
                                0
                            };
                        }
                    }
                    Exchange::WriteThenRead(_) => {
                        for (i, byte) in rx.iter_mut().enumerate() {
                            *byte = self.memory[self.index(address + i as u32)?];
                        }
                    }
                    Exchange::WriteOnly => {}
                }
                Ok(())
            }
            other => {
                log::warn!("dummy: unsupported opcode 0x{:02X}", other);
                Err(Error::SpiTransferFailed)
            }
        }
    }
}

impl Transport for DummyMram {
    fn transact(&mut self, frame: &CommandFrame, rx: &mut [u8]) -> Result<()> {
        let mut state = self.chip.lock();

        let result = if rx.len() != frame.rx_len() {
            log::warn!(
                "dummy: rx buffer of {} bytes for a frame expecting {}",
                rx.len(),
                frame.rx_len()
            );
            Err(Error::SpiTransferFailed)
        } else if state.faulted(frame) {
            Err(Error::SpiTransferFailed)
        } else {
            state.execute(frame, rx)
        };

        state.journal.push(Transaction {
            tx: frame.as_bytes().to_vec(),
            exchange: frame.exchange(),
            ok: result.is_ok(),
        });
        result
    }
}

/// A set of emulated chips addressed by device path
#[derive(Debug, Default)]
pub struct DummyBoard {
    chips: HashMap<String, DummyChip>,
}

impl DummyBoard {
    /// Create an empty board
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a board with one fresh chip of `capacity` bytes per device
    pub fn with_devices<I, S>(devices: I, capacity: u32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut board = Self::new();
        for device in devices {
            board.add_chip(device, DummyChip::new(capacity));
        }
        board
    }

    /// Attach a chip under a device path
    pub fn add_chip(&mut self, device: impl Into<String>, chip: DummyChip) {
        self.chips.insert(device.into(), chip);
    }

    /// Chip attached under a device path
    pub fn chip(&self, device: &str) -> Option<&DummyChip> {
        self.chips.get(device)
    }
}

impl TransportOpener for DummyBoard {
    type Transport = DummyMram;

    fn open(&mut self, device: &str, config: &TransportConfig) -> Result<DummyMram> {
        let Some(chip) = self.chips.get(device) else {
            log::warn!("dummy: no chip at {}", device);
            return Err(Error::DeviceUnavailable);
        };
        // MRAM supports modes 0 and 3 only
        if config.mode != mode::MODE_0 && config.mode != mode::MODE_3 {
            return Err(Error::ConfigurationRejected);
        }
        log::debug!(
            "dummy: opened {} (mode={}, speed={} kHz, bits={})",
            device,
            config.mode,
            config.speed_hz / 1000,
            config.bits_per_word
        );
        chip.connect()
    }
}
