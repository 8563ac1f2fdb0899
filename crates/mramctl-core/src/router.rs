//! Dual-chip routing
//!
//! A board carries two memory chips on independent chip-select lines.
//! [`ChipRouter`] maps a [`ChipSelector`] to the device identity of its
//! line and opens sessions on demand with a shared configuration, so the
//! same protocol and bulk code serve either chip. Chips are visited one at
//! a time: a session is closed before the next one is opened.

use core::fmt;
use core::str::FromStr;
use std::io::{BufRead, Write};

use crate::bulk::{self, BulkOptions, BulkProgress, BulkReport};
use crate::chip::ChipConfig;
use crate::device::MemoryDevice;
use crate::error::Result;
use crate::transport::{TransportConfig, TransportOpener};

/// Logical chip identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChipSelector {
    /// First chip
    Chip1,
    /// Second chip
    Chip2,
}

impl ChipSelector {
    /// Both chips, in visiting order
    pub const ALL: [ChipSelector; 2] = [ChipSelector::Chip1, ChipSelector::Chip2];

    /// 1-based chip number
    pub const fn number(&self) -> u8 {
        match self {
            Self::Chip1 => 1,
            Self::Chip2 => 2,
        }
    }

    const fn index(&self) -> usize {
        self.number() as usize - 1
    }
}

impl fmt::Display for ChipSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "chip {}", self.number())
    }
}

impl FromStr for ChipSelector {
    type Err = String;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        match s.strip_prefix("chip").unwrap_or(&s).trim() {
            "1" => Ok(Self::Chip1),
            "2" => Ok(Self::Chip2),
            _ => Err(format!("invalid chip selector: {} (expected 1 or 2)", s)),
        }
    }
}

/// Routes chip selectors to transports
pub struct ChipRouter<O> {
    opener: O,
    devices: [String; 2],
    chip: ChipConfig,
    transport: TransportConfig,
}

impl<O: TransportOpener> ChipRouter<O> {
    /// Create a router
    ///
    /// `devices[0]` backs [`ChipSelector::Chip1`], `devices[1]` backs
    /// [`ChipSelector::Chip2`]. Both chips share `chip` and `transport`.
    pub fn new(
        opener: O,
        devices: [String; 2],
        chip: ChipConfig,
        transport: TransportConfig,
    ) -> Self {
        Self {
            opener,
            devices,
            chip,
            transport,
        }
    }

    /// Device identity bound to a selector
    pub fn device(&self, selector: ChipSelector) -> &str {
        &self.devices[selector.index()]
    }

    /// Shared chip configuration
    pub fn chip(&self) -> &ChipConfig {
        &self.chip
    }

    /// Shared transport configuration
    pub fn transport_config(&self) -> &TransportConfig {
        &self.transport
    }

    /// Mutable access to the opener
    pub fn opener_mut(&mut self) -> &mut O {
        &mut self.opener
    }

    /// Open a session on the selected chip
    pub fn open(&mut self, selector: ChipSelector) -> Result<MemoryDevice<O::Transport>> {
        let device = &self.devices[selector.index()];
        log::debug!("Opening {} on {}", selector, device);
        match self.opener.open(device, &self.transport) {
            Ok(transport) => Ok(MemoryDevice::new(transport, self.chip)),
            Err(e) => {
                log::error!("Cannot open {} ({}): {}", selector, device, e);
                Err(e)
            }
        }
    }

    /// Run `f` on a fresh session for `selector`, closing it afterwards
    pub fn with_chip<R, F>(&mut self, selector: ChipSelector, f: F) -> Result<R>
    where
        F: FnOnce(&mut MemoryDevice<O::Transport>) -> R,
    {
        let mut device = self.open(selector)?;
        let result = f(&mut device);
        drop(device.close());
        log::debug!("Closed {}", selector);
        Ok(result)
    }

    /// Apply `f` to each selected chip in turn
    ///
    /// Each session is closed before the next one is opened. Iteration
    /// stops at the first chip that cannot be opened; its error is the last
    /// entry of the returned list.
    pub fn for_each_chip<R, F>(
        &mut self,
        selectors: &[ChipSelector],
        mut f: F,
    ) -> Vec<(ChipSelector, Result<R>)>
    where
        F: FnMut(ChipSelector, &mut MemoryDevice<O::Transport>) -> R,
    {
        let mut results = Vec::with_capacity(selectors.len());
        for &selector in selectors {
            let result = self.with_chip(selector, |device| f(selector, device));
            let failed = result.is_err();
            results.push((selector, result));
            if failed {
                break;
            }
        }
        results
    }

    /// Dump the selected chip to `sink`
    ///
    /// Only a failure to open the session is returned as an error; anything
    /// after that is reported in the [`BulkReport`].
    pub fn dump_to_text<W, P>(
        &mut self,
        selector: ChipSelector,
        sink: W,
        options: &BulkOptions,
        progress: &mut P,
    ) -> Result<BulkReport>
    where
        W: Write,
        P: BulkProgress + ?Sized,
    {
        log::info!("Dumping {} ({})", selector, self.device(selector));
        self.with_chip(selector, |device| {
            bulk::dump_to_text(device, sink, options, progress)
        })
    }

    /// Load `source` into the selected chip
    pub fn load_from_text<R, P>(
        &mut self,
        selector: ChipSelector,
        source: R,
        options: &BulkOptions,
        progress: &mut P,
    ) -> Result<BulkReport>
    where
        R: BufRead,
        P: BulkProgress + ?Sized,
    {
        log::info!("Loading {} ({})", selector, self.device(selector));
        self.with_chip(selector, |device| {
            bulk::load_from_text(device, source, options, progress)
        })
    }
}
