//! mramctl - Serial MRAM access tool
//!
//! Reads, writes, dumps and loads byte-addressable SPI MRAM chips on boards
//! with two chip selects.
//!
//! # Architecture
//!
//! - `mramctl-core` frames the MRAM command set and runs the per-byte
//!   protocol, the interchange text format and bulk dump/load
//! - a programmer provides a `TransportOpener` that turns a device path
//!   into an open SPI channel (`linux_spi` for spidev, `dummy` for an
//!   in-memory emulator)
//! - a `ChipRouter` maps chip 1 and chip 2 onto their device paths and
//!   makes sure only one chip is open at a time

mod cli;
mod commands;
mod config;
mod programmers;

use clap::Parser;
use cli::{Cli, Commands};
use config::Settings;
use mramctl_core::router::ChipRouter;
use mramctl_core::transport::TransportConfig;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    match cli.command {
        Commands::ListVariants => {
            commands::list_variants();
            return Ok(());
        }
        Commands::ListProgrammers => {
            commands::list_programmers();
            return Ok(());
        }
        _ => {}
    }

    let file = config::load(cli.config.as_deref())?;
    let settings = Settings::resolve(file, &cli)?;
    log::debug!("Settings: {:?}", settings);

    let chip = settings.variant.config();
    let transport = TransportConfig::for_chip(&chip, settings.speed_hz)?.with_mode(settings.mode)?;
    let opener = programmers::open_programmer(&settings.programmer, &settings.devices, &chip)?;

    log::info!(
        "{} via {} (chip 1: {}, chip 2: {}, {} kHz, mode {})",
        settings.variant,
        settings.programmer,
        settings.devices[0],
        settings.devices[1],
        transport.speed_hz / 1000,
        transport.mode
    );

    let mut router = ChipRouter::new(opener, settings.devices.clone(), chip, transport);

    match cli.command {
        Commands::Read { chip, address } => commands::run_read(&mut router, chip, address),
        Commands::Write {
            chip,
            address,
            value,
        } => commands::run_write(&mut router, chip, address, value),
        Commands::Status { chip } => commands::run_status(&mut router, chip),
        Commands::Dump {
            chip,
            output,
            address_digits,
            failure,
        } => {
            let options = settings.bulk_options(&failure, None, None, address_digits);
            commands::run_dump(&mut router, &chip.selectors(), &output, &options)
        }
        Commands::Load {
            chip,
            input,
            strategy,
            radix,
            failure,
        } => {
            let options = settings.bulk_options(&failure, strategy, radix, None);
            commands::run_load(&mut router, &chip.selectors(), &input, &options)
        }
        Commands::ListVariants | Commands::ListProgrammers => Ok(()),
    }
}
