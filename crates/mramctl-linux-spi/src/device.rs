//! Linux SPI device implementation
//!
//! This module provides the `LinuxSpi` struct that implements the `Transport`
//! trait using Linux's spidev interface, and `LinuxSpiOpener` which opens one
//! per chip select line.

use crate::error::{LinuxSpiError, Result};

use mramctl_core::error::Result as CoreResult;
use mramctl_core::spi::{CommandFrame, Exchange};
use mramctl_core::transport::{mode, Transport, TransportConfig, TransportOpener, DEFAULT_SPEED_HZ};

use std::fs::{File, OpenOptions};
use std::os::unix::io::AsRawFd;

/// Linux spidev ioctl constants
mod ioctl {
    use nix::ioctl_write_ptr;

    // SPI ioctl magic number
    const SPI_IOC_MAGIC: u8 = b'k';

    const SPI_IOC_TYPE_MODE: u8 = 1;
    const SPI_IOC_TYPE_BITS_PER_WORD: u8 = 3;
    const SPI_IOC_TYPE_MAX_SPEED_HZ: u8 = 4;

    ioctl_write_ptr!(spi_ioc_wr_mode, SPI_IOC_MAGIC, SPI_IOC_TYPE_MODE, u8);
    ioctl_write_ptr!(
        spi_ioc_wr_bits_per_word,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_BITS_PER_WORD,
        u8
    );
    ioctl_write_ptr!(
        spi_ioc_wr_max_speed_hz,
        SPI_IOC_MAGIC,
        SPI_IOC_TYPE_MAX_SPEED_HZ,
        u32
    );

    /// Size of struct spi_ioc_transfer
    pub const SPI_IOC_TRANSFER_SIZE: usize = 32;

    /// SPI_IOC_MESSAGE(n) = _IOW(SPI_IOC_MAGIC, 0, char[n * sizeof(spi_ioc_transfer)])
    pub fn spi_ioc_message(n: u8) -> libc::c_ulong {
        let size = (n as usize) * SPI_IOC_TRANSFER_SIZE;
        ((1u32 << 30) | ((size as u32) << 16) | ((SPI_IOC_MAGIC as u32) << 8)) as libc::c_ulong
    }
}

/// SPI transfer structure for ioctl
/// This must match the kernel's struct spi_ioc_transfer layout
#[repr(C)]
#[derive(Debug, Default, Clone)]
struct SpiIocTransfer {
    tx_buf: u64,          // __u64 tx_buf
    rx_buf: u64,          // __u64 rx_buf
    len: u32,             // __u32 len
    speed_hz: u32,        // __u32 speed_hz
    delay_usecs: u16,     // __u16 delay_usecs
    bits_per_word: u8,    // __u8 bits_per_word
    cs_change: u8,        // __u8 cs_change
    tx_nbits: u8,         // __u8 tx_nbits
    rx_nbits: u8,         // __u8 rx_nbits
    word_delay_usecs: u8, // __u8 word_delay_usecs
    _pad: u8,             // padding
}

const _: () = assert!(std::mem::size_of::<SpiIocTransfer>() == ioctl::SPI_IOC_TRANSFER_SIZE);

/// Configuration for opening a Linux SPI device
#[derive(Debug, Clone)]
pub struct LinuxSpiConfig {
    /// Device path (e.g., "/dev/spidev0.0")
    pub device: String,
    /// SPI clock speed in Hz (default: 10 MHz)
    pub speed_hz: u32,
    /// SPI mode (0-3, default: 0)
    pub mode: u8,
    /// Word size in bits (default: 8)
    pub bits_per_word: u8,
}

impl Default for LinuxSpiConfig {
    fn default() -> Self {
        Self {
            device: String::new(),
            speed_hz: DEFAULT_SPEED_HZ,
            mode: mode::MODE_0,
            bits_per_word: 8,
        }
    }
}

impl LinuxSpiConfig {
    /// Create a new configuration with the given device path
    pub fn new(device: impl Into<String>) -> Self {
        Self {
            device: device.into(),
            ..Default::default()
        }
    }

    /// Configuration for `device` with the bus settings of `config`
    pub fn from_transport(device: impl Into<String>, config: &TransportConfig) -> Self {
        Self {
            device: device.into(),
            speed_hz: config.speed_hz,
            mode: config.mode,
            bits_per_word: config.bits_per_word,
        }
    }
}

/// One open spidev chip select line
pub struct LinuxSpi {
    /// File handle for spidev device
    file: File,
    device: String,
    speed_hz: u32,
    bits_per_word: u8,
}

impl LinuxSpi {
    /// Open a Linux SPI device with the given configuration
    pub fn open(config: &LinuxSpiConfig) -> Result<Self> {
        if config.device.is_empty() {
            return Err(LinuxSpiError::NoDevice);
        }

        log::debug!("linux_spi: Opening device {}", config.device);

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&config.device)
            .map_err(|e| LinuxSpiError::OpenFailed {
                path: config.device.clone(),
                source: e,
            })?;

        let fd = file.as_raw_fd();

        let mode = config.mode;
        unsafe {
            ioctl::spi_ioc_wr_mode(fd, &mode).map_err(|e| LinuxSpiError::SetModeFailed {
                mode,
                source: std::io::Error::from_raw_os_error(e as i32),
            })?;
        }

        let bits = config.bits_per_word;
        unsafe {
            ioctl::spi_ioc_wr_bits_per_word(fd, &bits).map_err(|e| {
                LinuxSpiError::SetBitsPerWordFailed {
                    bits,
                    source: std::io::Error::from_raw_os_error(e as i32),
                }
            })?;
        }

        let speed = config.speed_hz;
        unsafe {
            ioctl::spi_ioc_wr_max_speed_hz(fd, &speed).map_err(|e| {
                LinuxSpiError::SetSpeedFailed {
                    speed,
                    source: std::io::Error::from_raw_os_error(e as i32),
                }
            })?;
        }

        log::info!(
            "linux_spi: Opened {} (mode={}, speed={} kHz, bits={})",
            config.device,
            mode,
            speed / 1000,
            bits
        );

        Ok(Self {
            file,
            device: config.device.clone(),
            speed_hz: speed,
            bits_per_word: bits,
        })
    }

    /// Device path of this line
    pub fn device(&self) -> &str {
        &self.device
    }

    /// Get current speed setting
    pub fn speed_hz(&self) -> u32 {
        self.speed_hz
    }

    /// Release the line
    pub fn close(self) {
        log::debug!("linux_spi: Closing {}", self.device);
    }

    fn transfer(&self, tx: u64, rx: u64, len: usize) -> SpiIocTransfer {
        SpiIocTransfer {
            tx_buf: tx,
            rx_buf: rx,
            len: len as u32,
            speed_hz: self.speed_hz,
            bits_per_word: self.bits_per_word,
            // Keep CS asserted between chained transfers
            cs_change: 0,
            ..Default::default()
        }
    }

    /// Issue one SPI_IOC_MESSAGE with chip select held for the whole frame
    fn spi_transfer(&mut self, frame: &CommandFrame, rx: &mut [u8]) -> Result<()> {
        let tx = frame.as_bytes();
        if rx.len() != frame.rx_len() {
            return Err(LinuxSpiError::BufferMismatch {
                expected: frame.rx_len(),
                actual: rx.len(),
            });
        }

        let tx_ptr = tx.as_ptr() as u64;
        let rx_ptr = rx.as_mut_ptr() as u64;
        let transfers: [SpiIocTransfer; 2];
        let count: u8 = match frame.exchange() {
            Exchange::WriteOnly => {
                transfers = [self.transfer(tx_ptr, 0, tx.len()), SpiIocTransfer::default()];
                1
            }
            Exchange::FullDuplex => {
                transfers = [
                    self.transfer(tx_ptr, rx_ptr, tx.len()),
                    SpiIocTransfer::default(),
                ];
                1
            }
            Exchange::WriteThenRead(_) => {
                transfers = [
                    self.transfer(tx_ptr, 0, tx.len()),
                    self.transfer(0, rx_ptr, rx.len()),
                ];
                2
            }
        };

        let fd = self.file.as_raw_fd();
        let ret = unsafe { libc::ioctl(fd, ioctl::spi_ioc_message(count), transfers.as_ptr()) };

        if ret < 0 {
            return Err(LinuxSpiError::TransferFailed(
                std::io::Error::last_os_error(),
            ));
        }

        Ok(())
    }
}

impl Transport for LinuxSpi {
    fn transact(&mut self, frame: &CommandFrame, rx: &mut [u8]) -> CoreResult<()> {
        log::trace!(
            "linux_spi: {} tx={:02X?} {:?}",
            self.device,
            frame.as_bytes(),
            frame.exchange()
        );
        self.spi_transfer(frame, rx).map_err(|e| {
            log::debug!("linux_spi: {}: {}", self.device, e);
            e.into()
        })
    }
}

/// Opens spidev lines on demand
#[derive(Debug, Default, Clone, Copy)]
pub struct LinuxSpiOpener;

impl LinuxSpiOpener {
    /// Create an opener
    pub fn new() -> Self {
        Self
    }
}

impl TransportOpener for LinuxSpiOpener {
    type Transport = LinuxSpi;

    fn open(&mut self, device: &str, config: &TransportConfig) -> CoreResult<LinuxSpi> {
        LinuxSpi::open(&LinuxSpiConfig::from_transport(device, config)).map_err(|e| {
            log::error!("linux_spi: {}", e);
            e.into()
        })
    }
}
