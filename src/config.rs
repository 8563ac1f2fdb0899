//! Configuration file loading and merging with command-line overrides
//!
//! Configuration is read from a TOML file:
//!
//! ```toml
//! programmer = "linux_spi"
//! variant = "mr10q010"
//! speed_hz = "10 MHz"
//! mode = 0
//!
//! [devices]
//! chip1 = "/dev/spidev0.0"
//! chip2 = "/dev/spidev0.1"
//!
//! [bulk]
//! on_error = "threshold"
//! max_consecutive_failures = 16
//! strategy = "streamed"
//! address_digits = 5
//! radix = "auto"
//! ```
//!
//! Every field is optional. Command-line flags win over the file, the file
//! wins over built-in defaults.

use std::fs;
use std::path::{Path, PathBuf};

use mramctl_core::bulk::{
    BulkOptions, FailurePolicy, LoadStrategy, DEFAULT_MAX_CONSECUTIVE_FAILURES,
};
use mramctl_core::chip::ChipVariant;
use mramctl_core::interchange::{AddressRadix, DEFAULT_ADDRESS_DIGITS};
use mramctl_core::transport::{mode, DEFAULT_SPEED_HZ};
use thiserror::Error;

use crate::cli::{self, Cli, FailureArgs, OnError, RadixArg, StrategyArg};

/// Configuration file looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "mramctl.toml";

/// Default programmer
pub const DEFAULT_PROGRAMMER: &str = "linux_spi";

/// Default device behind each chip select
pub const DEFAULT_DEVICES: [&str; 2] = ["/dev/spidev0.0", "/dev/spidev0.1"];

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read the file
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to parse the file
    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// Unknown chip variant
    #[error("Unknown chip variant: {0} (see list-variants)")]
    UnknownVariant(String),
}

/// Configuration file contents
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub programmer: Option<String>,
    pub variant: Option<String>,
    #[serde(deserialize_with = "deserialize_speed")]
    pub speed_hz: Option<u32>,
    pub mode: Option<u8>,
    pub devices: DevicesConfig,
    pub bulk: BulkConfig,
}

/// `[devices]` table
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DevicesConfig {
    pub chip1: Option<String>,
    pub chip2: Option<String>,
}

/// `[bulk]` table
#[derive(Debug, Default, Clone, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BulkConfig {
    pub on_error: Option<OnError>,
    pub max_consecutive_failures: Option<u32>,
    pub strategy: Option<LoadStrategy>,
    pub address_digits: Option<usize>,
    pub radix: Option<AddressRadix>,
}

/// Deserialize a speed that can be an integer in Hz or a string like "10 MHz"
fn deserialize_speed<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::Deserialize;

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum SpeedOrStr {
        Int(u32),
        Str(String),
    }

    match Option::<SpeedOrStr>::deserialize(deserializer)? {
        None => Ok(None),
        Some(SpeedOrStr::Int(n)) => Ok(Some(n)),
        Some(SpeedOrStr::Str(s)) => cli::parse_speed(&s)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

impl FileConfig {
    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content, path)
    }
}

/// Load the configuration file
///
/// An explicit path must exist. Without one, [`DEFAULT_CONFIG_FILE`] is
/// used if present and built-in defaults otherwise.
pub fn load(path: Option<&Path>) -> Result<FileConfig, ConfigError> {
    match path {
        Some(path) => {
            let config = FileConfig::from_file(path)?;
            log::info!("Loaded configuration from {}", path.display());
            Ok(config)
        }
        None => {
            let default = Path::new(DEFAULT_CONFIG_FILE);
            if default.is_file() {
                let config = FileConfig::from_file(default)?;
                log::info!("Loaded configuration from {}", default.display());
                Ok(config)
            } else {
                log::debug!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                Ok(FileConfig::default())
            }
        }
    }
}

/// Effective settings after merging file and command line
#[derive(Debug, Clone)]
pub struct Settings {
    pub programmer: String,
    pub variant: ChipVariant,
    pub speed_hz: u32,
    pub mode: u8,
    pub devices: [String; 2],
    bulk: BulkConfig,
}

impl Settings {
    /// Merge the file configuration with command-line overrides
    pub fn resolve(file: FileConfig, cli: &Cli) -> Result<Self, ConfigError> {
        let variant_name = cli.variant.clone().or(file.variant);
        let variant = match variant_name {
            Some(name) => name
                .parse()
                .map_err(|_| ConfigError::UnknownVariant(name.clone()))?,
            None => ChipVariant::default(),
        };

        let device = |flag: &Option<String>, file: Option<String>, index: usize| {
            flag.clone()
                .or(file)
                .unwrap_or_else(|| DEFAULT_DEVICES[index].to_string())
        };

        Ok(Self {
            programmer: cli
                .programmer
                .clone()
                .or(file.programmer)
                .unwrap_or_else(|| DEFAULT_PROGRAMMER.to_string()),
            variant,
            speed_hz: cli.speed.or(file.speed_hz).unwrap_or(DEFAULT_SPEED_HZ),
            mode: cli.mode.or(file.mode).unwrap_or(mode::MODE_0),
            devices: [
                device(&cli.dev1, file.devices.chip1, 0),
                device(&cli.dev2, file.devices.chip2, 1),
            ],
            bulk: file.bulk,
        })
    }

    /// Bulk options for a run, with command-line overrides applied
    pub fn bulk_options(
        &self,
        failure: &FailureArgs,
        strategy: Option<StrategyArg>,
        radix: Option<RadixArg>,
        address_digits: Option<usize>,
    ) -> BulkOptions {
        let max = failure
            .max_failures
            .or(self.bulk.max_consecutive_failures)
            .unwrap_or(DEFAULT_MAX_CONSECUTIVE_FAILURES);

        // A bare --max-failures implies the threshold policy
        let on_error = failure
            .on_error
            .or(failure.max_failures.map(|_| OnError::Threshold))
            .or(self.bulk.on_error)
            .unwrap_or(OnError::Threshold);

        BulkOptions {
            policy: match on_error {
                OnError::Continue => FailurePolicy::Continue,
                OnError::Abort => FailurePolicy::AbortOnFirst,
                OnError::Threshold => FailurePolicy::AbortAfter(max),
            },
            strategy: strategy
                .map(LoadStrategy::from)
                .or(self.bulk.strategy)
                .unwrap_or_default(),
            radix: radix
                .map(AddressRadix::from)
                .or(self.bulk.radix)
                .unwrap_or_default(),
            address_digits: address_digits
                .or(self.bulk.address_digits)
                .unwrap_or(DEFAULT_ADDRESS_DIGITS),
        }
    }
}

impl From<StrategyArg> for LoadStrategy {
    fn from(arg: StrategyArg) -> Self {
        match arg {
            StrategyArg::Streamed => LoadStrategy::Streamed,
            StrategyArg::Buffered => LoadStrategy::Buffered,
        }
    }
}

impl From<RadixArg> for AddressRadix {
    fn from(arg: RadixArg) -> Self {
        match arg {
            RadixArg::Auto => AddressRadix::Auto,
            RadixArg::Hex => AddressRadix::Hex,
            RadixArg::Decimal => AddressRadix::Decimal,
        }
    }
}
