//! Programmer registration and dispatch
//!
//! This module provides a centralized registry for all programmers, with support
//! for feature-gated inclusion and dynamic help text generation.

use mramctl_core::chip::ChipConfig;
use mramctl_core::error::Result as CoreResult;
use mramctl_core::transport::{Transport, TransportConfig, TransportOpener};

/// Information about a programmer
pub struct ProgrammerInfo {
    /// Primary name (used for matching)
    pub name: &'static str,
    /// Alternative names/aliases
    pub aliases: &'static [&'static str],
    /// Short description
    pub description: &'static str,
}

/// Get information about all available programmers (enabled at compile time)
#[allow(unused_mut, clippy::vec_init_then_push)]
pub fn available_programmers() -> Vec<ProgrammerInfo> {
    let mut programmers = Vec::new();

    #[cfg(feature = "linux-spi")]
    programmers.push(ProgrammerInfo {
        name: "linux_spi",
        aliases: &["linux-spi", "spidev"],
        description: "Linux spidev interface, one /dev/spidevX.Y per chip select",
    });

    #[cfg(feature = "dummy")]
    programmers.push(ProgrammerInfo {
        name: "dummy",
        aliases: &[],
        description: "In-memory MRAM emulator, contents discarded on exit (fill=<hex>)",
    });

    programmers
}

/// Generate help text listing all available programmers
pub fn programmer_help() -> String {
    let programmers = available_programmers();

    if programmers.is_empty() {
        return "No programmers available (recompile with programmer features enabled)".to_string();
    }

    let mut help = String::from("Available programmers:\n");
    for p in &programmers {
        help.push_str(&format!("  {:12} - {}\n", p.name, p.description));
    }
    help
}

/// Find the canonical name of a programmer by name or alias
pub fn find_programmer(name: &str) -> Option<&'static str> {
    available_programmers()
        .into_iter()
        .find(|p| p.name == name || p.aliases.contains(&name))
        .map(|p| p.name)
}

/// Parse a programmer string into name and options
///
/// Format: "name" or "name:option1=value1,option2=value2"
pub fn parse_programmer_string(s: &str) -> (&str, Vec<(&str, &str)>) {
    if let Some((name, opts)) = s.split_once(':') {
        let options: Vec<_> = opts
            .split(',')
            .filter_map(|opt| opt.split_once('='))
            .collect();
        (name, options)
    } else {
        (s, Vec::new())
    }
}

/// An opener for whichever programmer was selected
pub enum AnyOpener {
    #[cfg(feature = "linux-spi")]
    LinuxSpi(mramctl_linux_spi::LinuxSpiOpener),
    #[cfg(feature = "dummy")]
    Dummy(mramctl_dummy::DummyBoard),
}

impl TransportOpener for AnyOpener {
    type Transport = Box<dyn Transport>;

    fn open(&mut self, device: &str, config: &TransportConfig) -> CoreResult<Self::Transport> {
        match *self {
            #[cfg(feature = "linux-spi")]
            AnyOpener::LinuxSpi(ref mut opener) => Ok(Box::new(opener.open(device, config)?)),
            #[cfg(feature = "dummy")]
            AnyOpener::Dummy(ref mut board) => Ok(Box::new(board.open(device, config)?)),
        }
    }
}

/// Create the opener for a programmer string
///
/// `devices` and `chip` describe the board; the dummy programmer uses them
/// to attach one emulated chip per chip select.
#[allow(unused_variables)]
pub fn open_programmer(
    programmer: &str,
    devices: &[String; 2],
    chip: &ChipConfig,
) -> Result<AnyOpener, Box<dyn std::error::Error>> {
    let (name, options) = parse_programmer_string(programmer);

    let canonical_name = match find_programmer(name) {
        Some(n) => n,
        None => return Err(unknown_programmer_error(name)),
    };

    match canonical_name {
        #[cfg(feature = "linux-spi")]
        "linux_spi" => {
            for (key, value) in &options {
                log::warn!("linux_spi: Unknown option: {}={}", key, value);
            }
            log::debug!("Using Linux spidev programmer");
            Ok(AnyOpener::LinuxSpi(mramctl_linux_spi::LinuxSpiOpener::new()))
        }

        #[cfg(feature = "dummy")]
        "dummy" => {
            use mramctl_dummy::{DummyBoard, DummyChip, DEFAULT_FILL};

            let mut fill = DEFAULT_FILL;
            for (key, value) in &options {
                match *key {
                    "fill" => {
                        let hex = value.trim_start_matches("0x").trim_start_matches("0X");
                        fill = u8::from_str_radix(hex, 16)
                            .map_err(|_| format!("Invalid fill value: {}", value))?;
                    }
                    _ => log::warn!("dummy: Unknown option: {}={}", key, value),
                }
            }

            let image = vec![fill; chip.capacity as usize];
            let mut board = DummyBoard::new();
            for device in devices {
                board.add_chip(device.as_str(), DummyChip::with_data(chip.capacity, &image));
            }
            log::info!(
                "Using dummy programmer ({} bytes per chip, fill 0x{:02X})",
                chip.capacity,
                fill
            );
            Ok(AnyOpener::Dummy(board))
        }

        _ => Err(unknown_programmer_error(name)),
    }
}

fn unknown_programmer_error(name: &str) -> Box<dyn std::error::Error> {
    let mut msg = format!("Unknown programmer: {}\n\n", name);
    msg.push_str(&programmer_help());
    msg.push_str("\nUse 'mramctl list-programmers' for more details");
    msg.into()
}
