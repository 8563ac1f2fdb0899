//! Error types for Linux SPI operations

use mramctl_core::Error as CoreError;
use thiserror::Error;

/// Linux SPI specific errors
#[derive(Debug, Error)]
pub enum LinuxSpiError {
    /// Failed to open device
    #[error("Failed to open {path}: {source}")]
    OpenFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to set SPI mode
    #[error("Failed to set SPI mode to {mode}: {source}")]
    SetModeFailed {
        mode: u8,
        #[source]
        source: std::io::Error,
    },

    /// Failed to set bits per word
    #[error("Failed to set bits per word to {bits}: {source}")]
    SetBitsPerWordFailed {
        bits: u8,
        #[source]
        source: std::io::Error,
    },

    /// Failed to set clock speed
    #[error("Failed to set clock speed to {speed} Hz: {source}")]
    SetSpeedFailed {
        speed: u32,
        #[source]
        source: std::io::Error,
    },

    /// SPI transfer failed
    #[error("SPI transfer failed: {0}")]
    TransferFailed(#[source] std::io::Error),

    /// Receive buffer does not match the frame
    #[error("Receive buffer of {actual} bytes, frame expects {expected}")]
    BufferMismatch { expected: usize, actual: usize },

    /// Device not specified
    #[error("No device specified")]
    NoDevice,
}

impl From<LinuxSpiError> for CoreError {
    fn from(e: LinuxSpiError) -> Self {
        match e {
            LinuxSpiError::OpenFailed { .. } | LinuxSpiError::NoDevice => {
                CoreError::DeviceUnavailable
            }
            LinuxSpiError::SetModeFailed { .. }
            | LinuxSpiError::SetBitsPerWordFailed { .. }
            | LinuxSpiError::SetSpeedFailed { .. } => CoreError::ConfigurationRejected,
            LinuxSpiError::TransferFailed(_) | LinuxSpiError::BufferMismatch { .. } => {
                CoreError::SpiTransferFailed
            }
        }
    }
}

/// Result type for Linux SPI operations
pub type Result<T> = std::result::Result<T, LinuxSpiError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn os_error() -> std::io::Error {
        std::io::Error::from_raw_os_error(libc::ENODEV)
    }

    #[test]
    fn test_core_mapping() {
        let open = LinuxSpiError::OpenFailed {
            path: "/dev/spidev0.0".into(),
            source: os_error(),
        };
        assert_eq!(CoreError::from(open), CoreError::DeviceUnavailable);

        let speed = LinuxSpiError::SetSpeedFailed {
            speed: 1,
            source: os_error(),
        };
        assert_eq!(CoreError::from(speed), CoreError::ConfigurationRejected);

        let xfer = LinuxSpiError::TransferFailed(os_error());
        assert_eq!(CoreError::from(xfer), CoreError::SpiTransferFailed);
    }

    #[test]
    fn test_message_names_path() {
        let open = LinuxSpiError::OpenFailed {
            path: "/dev/spidev1.1".into(),
            source: os_error(),
        };
        assert!(open.to_string().contains("/dev/spidev1.1"));
    }
}
