//! CLI argument parsing

use clap::{Parser, Subcommand, ValueEnum};
use mramctl_core::router::ChipSelector;
use std::path::PathBuf;

/// Parse a string as a hex or decimal u32
pub fn parse_hex_u32(s: &str) -> Result<u32, String> {
    if let Some(hex) = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        u32::from_str_radix(hex, 16).map_err(|e| format!("Invalid hex value: {}", e))
    } else {
        s.parse::<u32>().map_err(|e| format!("Invalid number: {}", e))
    }
}

/// Parse a string as a hex or decimal byte
fn parse_hex_u8(s: &str) -> Result<u8, String> {
    let value = parse_hex_u32(s)?;
    u8::try_from(value).map_err(|_| format!("Value {} does not fit in a byte", s))
}

/// Parse a clock speed like "10000000", "10 MHz" or "400kHz" into Hz
pub fn parse_speed(s: &str) -> Result<u32, String> {
    let s = s.trim();

    if let Ok(n) = s.parse::<u32>() {
        return Ok(n);
    }

    let s_lower = s.to_lowercase();
    let (num_str, multiplier) = if let Some(n) = s_lower.strip_suffix("mhz") {
        (n.trim(), 1_000_000)
    } else if let Some(n) = s_lower.strip_suffix("khz") {
        (n.trim(), 1_000)
    } else if let Some(n) = s_lower.strip_suffix("hz") {
        (n.trim(), 1)
    } else {
        return Err(format!("invalid speed: {}", s));
    };

    let num: u32 = num_str
        .parse()
        .map_err(|_| format!("invalid speed: {}", s))?;
    num.checked_mul(multiplier)
        .ok_or_else(|| format!("speed out of range: {}", s))
}

fn parse_chip(s: &str) -> Result<ChipSelector, String> {
    s.parse()
}

fn parse_chip_arg(s: &str) -> Result<ChipArg, String> {
    if s.trim().eq_ignore_ascii_case("all") {
        Ok(ChipArg::All)
    } else {
        s.parse().map(ChipArg::One)
    }
}

/// Chip selection for bulk commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChipArg {
    /// A single chip
    One(ChipSelector),
    /// Both chips in turn
    All,
}

impl ChipArg {
    /// Selected chips in processing order
    pub fn selectors(&self) -> Vec<ChipSelector> {
        match self {
            ChipArg::One(selector) => vec![*selector],
            ChipArg::All => ChipSelector::ALL.to_vec(),
        }
    }
}

/// What to do when a transaction fails during dump or load
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnError {
    /// Skip the address and keep going
    Continue,
    /// Stop at the first failure
    Abort,
    /// Stop after too many consecutive failures
    Threshold,
}

/// Order in which loaded records are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    /// Write in file order while reading
    Streamed,
    /// Read everything first, then write in address order
    Buffered,
}

/// How load interprets bare addresses
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RadixArg {
    /// Decide per line
    Auto,
    /// Always hexadecimal
    Hex,
    /// Always decimal unless 0x-prefixed
    Decimal,
}

#[derive(Parser)]
#[command(name = "mramctl")]
#[command(author, version, about = "Serial MRAM access tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (TOML). Defaults to ./mramctl.toml if present
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Programmer to use (linux_spi, dummy[:fill=<hex>])
    #[arg(short, long, global = true)]
    pub programmer: Option<String>,

    /// Chip variant (see list-variants)
    #[arg(long, global = true)]
    pub variant: Option<String>,

    /// SPI clock speed (e.g. 10000000, "10 MHz", 400kHz)
    #[arg(long, global = true, value_parser = parse_speed)]
    pub speed: Option<u32>,

    /// SPI mode (0-3)
    #[arg(long, global = true)]
    pub mode: Option<u8>,

    /// Device behind chip select 1
    #[arg(long, global = true)]
    pub dev1: Option<String>,

    /// Device behind chip select 2
    #[arg(long, global = true)]
    pub dev2: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Failure handling options shared by dump and load
#[derive(clap::Args, Debug, Clone, Default)]
pub struct FailureArgs {
    /// What to do when a transaction fails
    #[arg(long, value_enum)]
    pub on_error: Option<OnError>,

    /// Consecutive failures tolerated with --on-error threshold
    #[arg(long)]
    pub max_failures: Option<u32>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read one byte
    Read {
        /// Chip to read (1 or 2)
        #[arg(short, long, default_value = "1", value_parser = parse_chip)]
        chip: ChipSelector,

        /// Address (hex with 0x prefix, or decimal)
        #[arg(short, long, value_parser = parse_hex_u32)]
        address: u32,
    },

    /// Write one byte
    Write {
        /// Chip to write (1 or 2)
        #[arg(short, long, default_value = "1", value_parser = parse_chip)]
        chip: ChipSelector,

        /// Address (hex with 0x prefix, or decimal)
        #[arg(short, long, value_parser = parse_hex_u32)]
        address: u32,

        /// Byte value (hex with 0x prefix, or decimal)
        #[arg(long, value_parser = parse_hex_u8)]
        value: u8,
    },

    /// Show the status register
    Status {
        /// Chip to query (1 or 2)
        #[arg(short, long, default_value = "1", value_parser = parse_chip)]
        chip: ChipSelector,
    },

    /// Dump chip contents to text files
    Dump {
        /// Chip to dump (1, 2 or all)
        #[arg(short, long, default_value = "all", value_parser = parse_chip_arg)]
        chip: ChipArg,

        /// Output path; {chip} is replaced by the chip number
        #[arg(short, long, default_value = "chip{chip}.csv")]
        output: String,

        /// Hex digits per address
        #[arg(long)]
        address_digits: Option<usize>,

        #[command(flatten)]
        failure: FailureArgs,
    },

    /// Load chip contents from a text file
    Load {
        /// Chip to load (1, 2 or all)
        #[arg(short, long, default_value = "all", value_parser = parse_chip_arg)]
        chip: ChipArg,

        /// Input file
        #[arg(short, long)]
        input: PathBuf,

        /// Write order
        #[arg(long, value_enum)]
        strategy: Option<StrategyArg>,

        /// Address radix
        #[arg(long, value_enum)]
        radix: Option<RadixArg>,

        #[command(flatten)]
        failure: FailureArgs,
    },

    /// List supported chip variants
    ListVariants,

    /// List supported programmers
    ListProgrammers,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_hex() {
        assert_eq!(parse_hex_u32("0x100"), Ok(0x100));
        assert_eq!(parse_hex_u32("256"), Ok(256));
        assert!(parse_hex_u32("0xZZ").is_err());
        assert_eq!(parse_hex_u8("0xAB"), Ok(0xAB));
        assert!(parse_hex_u8("0x100").is_err());
    }

    #[test]
    fn test_parse_speed() {
        assert_eq!(parse_speed("10000000"), Ok(10_000_000));
        assert_eq!(parse_speed("10 MHz"), Ok(10_000_000));
        assert_eq!(parse_speed("400kHz"), Ok(400_000));
        assert_eq!(parse_speed("100 hz"), Ok(100));
        assert!(parse_speed("fast").is_err());
        assert!(parse_speed("5000 MHz").is_err());
    }

    #[test]
    fn test_chip_arg() {
        assert_eq!(parse_chip_arg("all"), Ok(ChipArg::All));
        assert_eq!(parse_chip_arg("2"), Ok(ChipArg::One(ChipSelector::Chip2)));
        assert!(parse_chip_arg("3").is_err());
        assert_eq!(ChipArg::All.selectors(), ChipSelector::ALL.to_vec());
    }

    #[test]
    fn test_cli_parses() {
        let cli = Cli::try_parse_from([
            "mramctl",
            "--speed",
            "1 MHz",
            "dump",
            "--chip",
            "2",
            "-o",
            "out.csv",
            "--on-error",
            "continue",
        ])
        .unwrap();
        assert_eq!(cli.speed, Some(1_000_000));
        match cli.command {
            Commands::Dump {
                chip,
                output,
                failure,
                ..
            } => {
                assert_eq!(chip, ChipArg::One(ChipSelector::Chip2));
                assert_eq!(output, "out.csv");
                assert_eq!(failure.on_error, Some(OnError::Continue));
            }
            _ => panic!("expected dump"),
        }
    }

    #[test]
    fn test_cli_verify() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
