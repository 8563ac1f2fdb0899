//! Bulk transfer between a chip and the text interchange format
//!
//! [`dump_to_text`] walks the whole address space in ascending order and
//! emits one record per address. [`load_from_text`] applies the records of a
//! text source to the chip, either streamed in file order or buffered into
//! a full image and replayed in ascending address order.
//!
//! Neither function returns an error: per-address and per-record failures
//! are logged and counted, and anything that stops the run early is
//! reported in [`BulkReport::outcome`]. Opening the session is the caller's
//! business (see [`crate::router`]).

use core::fmt;
use std::io::{BufRead, Write};

use crate::device::MemoryDevice;
use crate::error::Error;
use crate::interchange::{
    AddressRadix, Record, RecordReader, RecordWriter, DEFAULT_ADDRESS_DIGITS,
};
use crate::transport::Transport;

/// Default consecutive transport failures tolerated before a run aborts
pub const DEFAULT_MAX_CONSECUTIVE_FAILURES: u32 = 16;

/// What to do when a transaction fails during a bulk run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Log, skip the address and keep going
    Continue,
    /// Abort the run on the first failed transaction
    AbortOnFirst,
    /// Abort once this many transactions in a row have failed
    AbortAfter(u32),
}

impl Default for FailurePolicy {
    fn default() -> Self {
        Self::AbortAfter(DEFAULT_MAX_CONSECUTIVE_FAILURES)
    }
}

/// Order in which loaded records are written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoadStrategy {
    /// Write each record as soon as it is parsed, in file order
    #[default]
    Streamed,
    /// Parse everything into a full-capacity image first, then write it in
    /// ascending address order. The last record for an address wins.
    Buffered,
}

/// Options shared by dump and load
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkOptions {
    /// Failure handling
    pub policy: FailurePolicy,
    /// Load ordering
    pub strategy: LoadStrategy,
    /// Address radix for loading
    pub radix: AddressRadix,
    /// Address width in hex digits for dumping
    pub address_digits: usize,
}

impl Default for BulkOptions {
    fn default() -> Self {
        Self {
            policy: FailurePolicy::default(),
            strategy: LoadStrategy::default(),
            radix: AddressRadix::default(),
            address_digits: DEFAULT_ADDRESS_DIGITS,
        }
    }
}

/// How a bulk run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Every address/record was processed
    Completed,
    /// The progress reporter asked to stop between two addresses
    Stopped,
    /// The run gave up early
    Aborted(Error),
}

/// Summary of one bulk run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkReport {
    /// Bytes successfully read or written
    pub transferred: usize,
    /// Addresses or records skipped or rejected
    pub skipped: usize,
    /// How the run ended
    pub outcome: Outcome,
}

impl BulkReport {
    fn new() -> Self {
        Self {
            transferred: 0,
            skipped: 0,
            outcome: Outcome::Completed,
        }
    }

    /// Returns true if the run processed everything
    pub fn is_complete(&self) -> bool {
        self.outcome == Outcome::Completed
    }
}

impl fmt::Display for BulkReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} bytes transferred, {} skipped, ",
            self.transferred, self.skipped
        )?;
        match self.outcome {
            Outcome::Completed => write!(f, "completed"),
            Outcome::Stopped => write!(f, "stopped early"),
            Outcome::Aborted(e) => write!(f, "aborted: {}", e),
        }
    }
}

/// Progress callbacks for bulk runs
pub trait BulkProgress {
    /// Called once before the first transaction; `None` if the total is
    /// not known up front (streamed load)
    fn started(&mut self, total: Option<usize>);

    /// Called after each address or record with the number processed so far
    fn advanced(&mut self, processed: usize);

    /// Polled before each transaction; returning true ends the run
    fn should_stop(&mut self) -> bool {
        false
    }

    /// Called once with the final report
    fn finished(&mut self, report: &BulkReport);
}

/// A no-op progress reporter
pub struct NoProgress;

impl BulkProgress for NoProgress {
    fn started(&mut self, _total: Option<usize>) {}
    fn advanced(&mut self, _processed: usize) {}
    fn finished(&mut self, _report: &BulkReport) {}
}

/// Applies a [`FailurePolicy`] to a stream of successes and failures
struct FailureTracker {
    policy: FailurePolicy,
    consecutive: u32,
}

impl FailureTracker {
    fn new(policy: FailurePolicy) -> Self {
        Self {
            policy,
            consecutive: 0,
        }
    }

    fn success(&mut self) {
        self.consecutive = 0;
    }

    /// Record a failure; returns true if the run must abort
    fn failure(&mut self) -> bool {
        self.consecutive = self.consecutive.saturating_add(1);
        match self.policy {
            FailurePolicy::Continue => false,
            FailurePolicy::AbortOnFirst => true,
            FailurePolicy::AbortAfter(limit) => self.consecutive >= limit.max(1),
        }
    }
}

fn finish<P: BulkProgress + ?Sized>(progress: &mut P, report: BulkReport) -> BulkReport {
    match report.outcome {
        Outcome::Aborted(e) => log::error!("Run aborted: {}", e),
        Outcome::Stopped => log::warn!("Run stopped on request"),
        Outcome::Completed => {}
    }
    log::info!("{}", report);
    progress.finished(&report);
    report
}

/// Dump the whole chip to `sink`
///
/// Emits the header and one record per address, ascending. A failed read
/// is logged and still emitted with the sentinel byte `FF` so the output
/// keeps one line per address; it counts as skipped. The run aborts when
/// the failure policy says so or when the sink fails.
pub fn dump_to_text<T, W, P>(
    device: &mut MemoryDevice<T>,
    sink: W,
    options: &BulkOptions,
    progress: &mut P,
) -> BulkReport
where
    T: Transport,
    W: Write,
    P: BulkProgress + ?Sized,
{
    let capacity = device.capacity();
    let mut report = BulkReport::new();
    let mut tracker = FailureTracker::new(options.policy);

    progress.started(Some(capacity as usize));

    let mut writer = match RecordWriter::new(sink, options.address_digits) {
        Ok(writer) => writer,
        Err(e) => {
            log::error!("Failed to write dump header: {}", e);
            report.outcome = Outcome::Aborted(Error::Io);
            return finish(progress, report);
        }
    };

    for address in 0..capacity {
        if progress.should_stop() {
            report.outcome = Outcome::Stopped;
            break;
        }

        let (value, error) = device.read_byte_or_sentinel(address);
        match error {
            None => {
                tracker.success();
                report.transferred += 1;
            }
            Some(e) => {
                log::warn!("Read failed at 0x{:06X}: {}", address, e);
                report.skipped += 1;
                if tracker.failure() {
                    report.outcome = Outcome::Aborted(e);
                    break;
                }
            }
        }

        if let Err(e) = writer.write_record(address, value) {
            log::error!("Failed to write record for 0x{:06X}: {}", address, e);
            report.outcome = Outcome::Aborted(Error::Io);
            return finish(progress, report);
        }
        progress.advanced(address as usize + 1);
    }

    if let Err(e) = writer.finish() {
        log::error!("Failed to flush dump: {}", e);
        if report.outcome == Outcome::Completed {
            report.outcome = Outcome::Aborted(Error::Io);
        }
    }

    finish(progress, report)
}

/// Write one record, updating the report; returns false if the run must abort
fn apply_record<T: Transport>(
    device: &mut MemoryDevice<T>,
    line: Option<usize>,
    record: Record,
    tracker: &mut FailureTracker,
    report: &mut BulkReport,
) -> bool {
    match device.write_byte(record.address, record.data) {
        Ok(()) => {
            tracker.success();
            report.transferred += 1;
            true
        }
        Err(e @ Error::AddressOutOfRange { .. }) => {
            match line {
                Some(line) => log::warn!("Skipping line {}: {}", line, e),
                None => log::warn!("Skipping record: {}", e),
            }
            report.skipped += 1;
            true
        }
        Err(e) => {
            log::warn!("Write failed at 0x{:06X}: {}", record.address, e);
            report.skipped += 1;
            if tracker.failure() {
                report.outcome = Outcome::Aborted(e);
                false
            } else {
                true
            }
        }
    }
}

/// Load records from `source` into the chip
///
/// Malformed and out-of-range records are skipped with a warning. Transport
/// failures follow the failure policy. See [`LoadStrategy`] for ordering.
pub fn load_from_text<T, R, P>(
    device: &mut MemoryDevice<T>,
    source: R,
    options: &BulkOptions,
    progress: &mut P,
) -> BulkReport
where
    T: Transport,
    R: BufRead,
    P: BulkProgress + ?Sized,
{
    let report = match options.strategy {
        LoadStrategy::Streamed => load_streamed(device, source, options, progress),
        LoadStrategy::Buffered => load_buffered(device, source, options, progress),
    };
    finish(progress, report)
}

fn load_streamed<T, R, P>(
    device: &mut MemoryDevice<T>,
    source: R,
    options: &BulkOptions,
    progress: &mut P,
) -> BulkReport
where
    T: Transport,
    R: BufRead,
    P: BulkProgress + ?Sized,
{
    let mut report = BulkReport::new();
    let mut tracker = FailureTracker::new(options.policy);

    progress.started(None);

    for item in RecordReader::new(source, options.radix) {
        if progress.should_stop() {
            report.outcome = Outcome::Stopped;
            break;
        }

        match item {
            Ok((line, record)) => {
                if !apply_record(device, Some(line), record, &mut tracker, &mut report) {
                    break;
                }
            }
            Err(Error::Io) => {
                report.outcome = Outcome::Aborted(Error::Io);
                break;
            }
            Err(e) => {
                log::warn!("Skipping {}", e);
                report.skipped += 1;
            }
        }
        progress.advanced(report.transferred + report.skipped);
    }

    report
}

fn load_buffered<T, R, P>(
    device: &mut MemoryDevice<T>,
    source: R,
    options: &BulkOptions,
    progress: &mut P,
) -> BulkReport
where
    T: Transport,
    R: BufRead,
    P: BulkProgress + ?Sized,
{
    let mut report = BulkReport::new();
    let mut tracker = FailureTracker::new(options.policy);
    let chip = *device.chip();
    let mut image: Vec<Option<u8>> = vec![None; chip.capacity as usize];

    for item in RecordReader::new(source, options.radix) {
        match item {
            Ok((line, record)) if !chip.is_valid_address(record.address) => {
                log::warn!(
                    "Skipping line {}: address 0x{:06X} out of range",
                    line,
                    record.address
                );
                report.skipped += 1;
            }
            Ok((line, record)) => {
                let slot = &mut image[record.address as usize];
                if slot.is_some() {
                    log::debug!(
                        "Line {} overrides earlier record for 0x{:06X}",
                        line,
                        record.address
                    );
                    report.skipped += 1;
                }
                *slot = Some(record.data);
            }
            Err(Error::Io) => {
                report.outcome = Outcome::Aborted(Error::Io);
                return report;
            }
            Err(e) => {
                log::warn!("Skipping {}", e);
                report.skipped += 1;
            }
        }
    }

    let pending = image.iter().filter(|slot| slot.is_some()).count();
    log::debug!("Buffered {} records, replaying in address order", pending);
    progress.started(Some(pending));

    let mut processed = 0usize;
    for (address, data) in image
        .iter()
        .enumerate()
        .filter_map(|(address, slot)| slot.map(|data| (address as u32, data)))
    {
        if progress.should_stop() {
            report.outcome = Outcome::Stopped;
            break;
        }
        let record = Record { address, data };
        if !apply_record(device, None, record, &mut tracker, &mut report) {
            break;
        }
        processed += 1;
        progress.advanced(processed);
    }

    report
}
