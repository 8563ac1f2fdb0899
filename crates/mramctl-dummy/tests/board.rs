//! End-to-end behaviour of the router, protocol and bulk layers against
//! emulated chips

use std::io::{self, BufReader, Read, Write};

use mramctl_core::bulk::{
    self, BulkOptions, BulkProgress, BulkReport, FailurePolicy, LoadStrategy, NoProgress,
    Outcome,
};
use mramctl_core::chip::{ChipConfig, ChipVariant, MR10Q010_CAPACITY};
use mramctl_core::router::{ChipRouter, ChipSelector};
use mramctl_core::spi::{opcodes, Exchange};
use mramctl_core::transport::TransportConfig;
use mramctl_core::{Error, Phase};
use mramctl_dummy::{DummyBoard, DummyChip};

const CHIP1: &str = "/dev/spidev0.0";
const CHIP2: &str = "/dev/spidev0.1";

struct Rig {
    router: ChipRouter<DummyBoard>,
    chip1: DummyChip,
    chip2: DummyChip,
}

fn rig(chip: ChipConfig) -> Rig {
    let chip1 = DummyChip::new(chip.capacity);
    let chip2 = DummyChip::new(chip.capacity);
    let mut board = DummyBoard::new();
    board.add_chip(CHIP1, chip1.clone());
    board.add_chip(CHIP2, chip2.clone());
    let transport = TransportConfig::for_chip(&chip, 10_000_000).unwrap();
    Rig {
        router: ChipRouter::new(board, [CHIP1.into(), CHIP2.into()], chip, transport),
        chip1,
        chip2,
    }
}

fn small(capacity: u32) -> ChipConfig {
    ChipConfig {
        capacity,
        ..ChipVariant::Mr10q010.config()
    }
}

fn dump(rig: &mut Rig, selector: ChipSelector, options: &BulkOptions) -> (String, BulkReport) {
    let mut out = Vec::new();
    let report = rig
        .router
        .dump_to_text(selector, &mut out, options, &mut NoProgress)
        .unwrap();
    (String::from_utf8(out).unwrap(), report)
}

fn load(rig: &mut Rig, selector: ChipSelector, text: &str, options: &BulkOptions) -> BulkReport {
    rig.router
        .load_from_text(selector, text.as_bytes(), options, &mut NoProgress)
        .unwrap()
}

struct StopAfter {
    limit: usize,
    processed: usize,
    finished: Option<BulkReport>,
}

impl BulkProgress for StopAfter {
    fn started(&mut self, _total: Option<usize>) {}

    fn advanced(&mut self, processed: usize) {
        self.processed = processed;
    }

    fn should_stop(&mut self) -> bool {
        self.processed >= self.limit
    }

    fn finished(&mut self, report: &BulkReport) {
        self.finished = Some(*report);
    }
}

/// Counts `finished` calls and keeps the last report
#[derive(Default)]
struct Tally {
    finished: usize,
    report: Option<BulkReport>,
}

impl BulkProgress for Tally {
    fn started(&mut self, _total: Option<usize>) {}
    fn advanced(&mut self, _processed: usize) {}

    fn finished(&mut self, report: &BulkReport) {
        self.finished += 1;
        self.report = Some(*report);
    }
}

/// Sink that accepts `remaining` bytes, then fails
struct FailingSink {
    remaining: usize,
    fail_flush: bool,
}

impl Write for FailingSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.remaining == 0 {
            return Err(io::Error::other("sink full"));
        }
        let n = buf.len().min(self.remaining);
        self.remaining -= n;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        if self.fail_flush {
            Err(io::Error::other("flush failed"))
        } else {
            Ok(())
        }
    }
}

/// Source whose reads fail once the preceding text is exhausted
struct BrokenTail;

impl Read for BrokenTail {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::other("read failed"))
    }
}

fn broken_source(text: &'static str) -> impl io::BufRead {
    BufReader::new(text.as_bytes().chain(BrokenTail))
}

#[test]
fn write_then_read_returns_value() {
    let mut rig = rig(ChipVariant::Mr10q010.config());
    let value = rig
        .router
        .with_chip(ChipSelector::Chip1, |mram| {
            mram.write_byte(0x1FFFF, 0x5A)?;
            mram.read_byte(0x1FFFF)
        })
        .unwrap()
        .unwrap();
    assert_eq!(value, 0x5A);
    assert_eq!(rig.chip1.peek(0x1FFFF), 0x5A);
    assert_eq!(rig.chip2.peek(0x1FFFF), 0x00);
}

#[test]
fn out_of_range_issues_no_transactions() {
    let mut rig = rig(ChipVariant::Mr10q010.config());
    let (write, read) = rig
        .router
        .with_chip(ChipSelector::Chip2, |mram| {
            (
                mram.write_byte(MR10Q010_CAPACITY, 0x01),
                mram.read_byte(0xFFFFFF),
            )
        })
        .unwrap();
    assert_eq!(
        write,
        Err(Error::AddressOutOfRange {
            address: MR10Q010_CAPACITY,
            capacity: MR10Q010_CAPACITY
        })
    );
    assert!(matches!(read, Err(Error::AddressOutOfRange { .. })));
    assert!(rig.chip2.journal().is_empty());
}

#[test]
fn write_enable_precedes_every_write() {
    let mut rig = rig(small(64));
    let report = load(
        &mut rig,
        ChipSelector::Chip1,
        "Address,Word\n00000,11\n00001,22\n0003F,33\n",
        &BulkOptions::default(),
    );
    assert_eq!(report.transferred, 3);

    let journal = rig.chip1.journal();
    let writes: Vec<usize> = journal
        .iter()
        .enumerate()
        .filter(|(_, t)| t.opcode() == opcodes::WRITE)
        .map(|(i, _)| i)
        .collect();
    assert_eq!(writes.len(), 3);
    for i in writes {
        // WREN, then the WEL check, then the write itself
        assert_eq!(journal[i - 2].opcode(), opcodes::WREN);
        assert_eq!(journal[i - 1].opcode(), opcodes::RDSR);
        assert!(journal[i - 2].ok);
    }
    assert_eq!(rig.chip1.status() & opcodes::SR_WEL, 0);
}

#[test]
fn failed_write_enable_aborts_that_write() {
    let mut rig = rig(small(16));
    rig.chip1.fail_opcode(opcodes::WREN);
    let err = rig
        .router
        .with_chip(ChipSelector::Chip1, |mram| mram.write_byte(3, 0x99))
        .unwrap()
        .unwrap_err();
    assert_eq!(
        err,
        Error::TransactionFailed {
            opcode: opcodes::WREN,
            address: None,
            phase: Phase::WriteEnable
        }
    );
    assert!(rig
        .chip1
        .journal()
        .iter()
        .all(|t| t.opcode() != opcodes::WRITE));
    assert_eq!(rig.chip1.peek(3), 0x00);
}

#[test]
fn failed_status_check_does_not_block_write() {
    let mut rig = rig(small(16));
    rig.chip1.fail_opcode(opcodes::RDSR);
    rig.router
        .with_chip(ChipSelector::Chip1, |mram| mram.write_byte(3, 0x99))
        .unwrap()
        .unwrap();
    assert_eq!(rig.chip1.peek(3), 0x99);
}

#[test]
fn status_register_reflects_write_enable_latch() {
    let mut rig = rig(small(16));
    rig.chip1.set_status(opcodes::SR_BP0 | opcodes::SR_SRWD);
    let status = rig
        .router
        .with_chip(ChipSelector::Chip1, |mram| mram.read_status_register())
        .unwrap()
        .unwrap();
    assert!(!status.write_enabled());
    assert_eq!(status.block_protection(), 1);
    assert_eq!(status.bits(), 0x84);
}

#[test]
fn duplex_variant_round_trip() {
    let mut rig = rig(ChipVariant::Mr10q010Duplex.config());
    let value = rig
        .router
        .with_chip(ChipSelector::Chip2, |mram| {
            mram.write_byte(0x00ABC, 0xC3)?;
            mram.read_byte(0x00ABC)
        })
        .unwrap()
        .unwrap();
    assert_eq!(value, 0xC3);

    let journal = rig.chip2.journal();
    let opcodes_seen: Vec<u8> = journal.iter().map(|t| t.opcode()).collect();
    assert_eq!(opcodes_seen, [opcodes::WREN, opcodes::WRITE, opcodes::READ]);
    assert_eq!(journal[2].tx, [opcodes::READ, 0x00, 0x0A, 0xBC, 0x00]);
    assert_eq!(journal[2].exchange, Exchange::FullDuplex);
}

#[test]
fn dump_of_single_written_byte() {
    let mut rig = rig(ChipVariant::Mr10q010.config());
    rig.router
        .with_chip(ChipSelector::Chip1, |mram| mram.write_byte(0x100, 0xAB))
        .unwrap()
        .unwrap();

    let (text, report) = dump(&mut rig, ChipSelector::Chip1, &BulkOptions::default());
    assert!(report.is_complete());
    assert_eq!(report.transferred, MR10Q010_CAPACITY as usize);
    assert_eq!(report.skipped, 0);

    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("Address,Word"));
    let records: Vec<&str> = lines.collect();
    assert_eq!(records.len(), MR10Q010_CAPACITY as usize);
    assert_eq!(records[0], "00000,00");
    assert_eq!(records[0x100], "00100,AB");
    assert_eq!(records[0x1FFFF], "1FFFF,00");
    assert_eq!(
        records.iter().filter(|l| l.ends_with(",00")).count(),
        MR10Q010_CAPACITY as usize - 1
    );
}

#[test]
fn dump_then_load_reproduces_chip() {
    let mut rig = rig(small(512));
    for address in 0..512u32 {
        rig.chip1.poke(address, (address.wrapping_mul(37) ^ 0x5A) as u8);
    }
    let options = BulkOptions::default();
    let (text, _) = dump(&mut rig, ChipSelector::Chip1, &options);

    let report = load(&mut rig, ChipSelector::Chip2, &text, &options);
    assert!(report.is_complete());
    assert_eq!(report.transferred, 512);
    assert_eq!(rig.chip1.memory(), rig.chip2.memory());
}

#[test]
fn decimal_address_with_prefixed_data() {
    let mut rig = rig(ChipVariant::Mr10q010.config());
    let report = load(
        &mut rig,
        ChipSelector::Chip1,
        "256,0xAB\n",
        &BulkOptions::default(),
    );
    assert_eq!(report.transferred, 1);
    assert_eq!(rig.chip1.peek(0x100), 0xAB);
    assert_eq!(rig.chip1.peek(0x256), 0x00);
}

#[test]
fn malformed_lines_are_skipped() {
    let mut rig = rig(small(64));
    let text = "Address,Word\n\
                00001,AA\n\
                garbage\n\
                00002,1FF\n\
                00003\n\
                00004,BB,CC\n\
                \n\
                00005,CC\n\
                00040,DD\n";
    let report = load(&mut rig, ChipSelector::Chip1, text, &BulkOptions::default());
    assert!(report.is_complete());
    assert_eq!(report.transferred, 2);
    // four malformed lines and one address past the end
    assert_eq!(report.skipped, 5);
    assert_eq!(rig.chip1.peek(1), 0xAA);
    assert_eq!(rig.chip1.peek(5), 0xCC);
    let writes = rig
        .chip1
        .journal()
        .iter()
        .filter(|t| t.opcode() == opcodes::WRITE)
        .count();
    assert_eq!(writes, 2);
}

#[test]
fn both_chips_loaded_from_one_source_dump_identically() {
    let mut rig = rig(small(128));
    let text = "Address,Word\n00000,01\n00010,FE\n0007F,7F\n";
    let options = BulkOptions::default();

    let results = rig
        .router
        .for_each_chip(&ChipSelector::ALL, |_, mram| {
            bulk::load_from_text(mram, text.as_bytes(), &options, &mut NoProgress)
        });
    assert_eq!(results.len(), 2);
    for (_, result) in &results {
        assert_eq!(result.as_ref().unwrap().transferred, 3);
    }

    let (dump1, _) = dump(&mut rig, ChipSelector::Chip1, &options);
    let (dump2, _) = dump(&mut rig, ChipSelector::Chip2, &options);
    assert_eq!(dump1, dump2);
    assert!(dump1.contains("\n00010,FE\n"));
}

#[test]
fn buffered_load_writes_in_address_order() {
    let mut rig = rig(small(16));
    let options = BulkOptions {
        strategy: LoadStrategy::Buffered,
        ..BulkOptions::default()
    };
    let report = load(
        &mut rig,
        ChipSelector::Chip1,
        "00003,33\n00001,11\n00002,22\n00001,44\n",
        &options,
    );
    assert!(report.is_complete());
    assert_eq!(report.transferred, 3);
    assert_eq!(report.skipped, 1);

    let written: Vec<(u8, u8)> = rig
        .chip1
        .journal()
        .iter()
        .filter(|t| t.opcode() == opcodes::WRITE)
        .map(|t| (t.tx[3], t.tx[4]))
        .collect();
    assert_eq!(written, [(1, 0x44), (2, 0x22), (3, 0x33)]);
}

#[test]
fn streamed_load_keeps_file_order() {
    let mut rig = rig(small(16));
    load(
        &mut rig,
        ChipSelector::Chip1,
        "00003,33\n00001,11\n00001,44\n",
        &BulkOptions::default(),
    );
    let written: Vec<u8> = rig
        .chip1
        .journal()
        .iter()
        .filter(|t| t.opcode() == opcodes::WRITE)
        .map(|t| t.tx[3])
        .collect();
    assert_eq!(written, [3, 1, 1]);
    assert_eq!(rig.chip1.peek(1), 0x44);
}

#[test]
fn failed_read_emits_sentinel_and_continues() {
    let mut rig = rig(small(16));
    rig.chip1.poke(5, 0x12);
    rig.chip1.fail_address(5);
    let options = BulkOptions {
        policy: FailurePolicy::Continue,
        ..BulkOptions::default()
    };
    let (text, report) = dump(&mut rig, ChipSelector::Chip1, &options);
    assert!(report.is_complete());
    assert_eq!(report.transferred, 15);
    assert_eq!(report.skipped, 1);
    assert_eq!(text.lines().count(), 17);
    assert!(text.contains("\n00005,FF\n"));
}

#[test]
fn consecutive_failures_abort_dump() {
    let mut rig = rig(small(64));
    rig.chip1.fail_opcode(opcodes::READ);
    let options = BulkOptions {
        policy: FailurePolicy::AbortAfter(4),
        ..BulkOptions::default()
    };
    let (text, report) = dump(&mut rig, ChipSelector::Chip1, &options);
    assert_eq!(
        report.outcome,
        Outcome::Aborted(Error::TransactionFailed {
            opcode: opcodes::READ,
            address: Some(3),
            phase: Phase::Read
        })
    );
    assert_eq!(report.transferred, 0);
    assert_eq!(report.skipped, 4);
    // header plus the three sentinel records before the abort
    assert_eq!(text.lines().count(), 4);
    assert!(!rig.chip1.is_connected());
}

#[test]
fn abort_on_first_failed_write() {
    let mut rig = rig(small(16));
    rig.chip1.fail_address(2);
    let options = BulkOptions {
        policy: FailurePolicy::AbortOnFirst,
        ..BulkOptions::default()
    };
    let report = load(
        &mut rig,
        ChipSelector::Chip1,
        "00001,11\n00002,22\n00003,33\n",
        &options,
    );
    assert!(matches!(
        report.outcome,
        Outcome::Aborted(Error::TransactionFailed {
            address: Some(2),
            phase: Phase::Write,
            ..
        })
    ));
    assert_eq!(report.transferred, 1);
    assert_eq!(rig.chip1.peek(3), 0x00);
}

#[test]
fn stop_request_ends_run_between_addresses() {
    let mut rig = rig(small(64));
    let mut progress = StopAfter {
        limit: 10,
        processed: 0,
        finished: None,
    };
    let mut out = Vec::new();
    let report = rig
        .router
        .dump_to_text(
            ChipSelector::Chip2,
            &mut out,
            &BulkOptions::default(),
            &mut progress,
        )
        .unwrap();
    assert_eq!(report.outcome, Outcome::Stopped);
    assert_eq!(report.transferred, 10);
    assert_eq!(progress.finished, Some(report));
    let reads = rig
        .chip2
        .journal()
        .iter()
        .filter(|t| t.opcode() == opcodes::READ)
        .count();
    assert_eq!(reads, 10);
}

#[test]
fn one_session_per_line() {
    let mut rig = rig(small(16));
    let first = rig.router.open(ChipSelector::Chip1).unwrap();
    assert_eq!(
        rig.router.open(ChipSelector::Chip1).err(),
        Some(Error::SessionBusy)
    );
    // the other line is independent
    assert!(rig.router.open(ChipSelector::Chip2).is_ok());
    drop(first.close());
    assert!(rig.router.open(ChipSelector::Chip1).is_ok());
}

#[test]
fn missing_chip_stops_iteration() {
    let chip = small(16);
    let mut board = DummyBoard::new();
    board.add_chip(CHIP1, DummyChip::new(16));
    let transport = TransportConfig::for_chip(&chip, 1_000_000).unwrap();
    let mut router = ChipRouter::new(
        board,
        [CHIP1.into(), "/dev/spidev9.9".into()],
        chip,
        transport,
    );

    let results = router.for_each_chip(&ChipSelector::ALL, |_, mram| mram.read_byte(0));
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].1, Ok(Ok(0x00)));
    assert_eq!(results[1].1, Err(Error::DeviceUnavailable));
}

#[test]
fn failed_header_write_aborts_dump() {
    let mut rig = rig(small(8));
    let sink = FailingSink {
        remaining: 0,
        fail_flush: false,
    };
    let mut tally = Tally::default();
    let report = rig
        .router
        .dump_to_text(
            ChipSelector::Chip1,
            sink,
            &BulkOptions::default(),
            &mut tally,
        )
        .unwrap();
    assert_eq!(report.outcome, Outcome::Aborted(Error::Io));
    assert_eq!(report.transferred, 0);
    assert_eq!(tally.finished, 1);
    assert_eq!(tally.report, Some(report));
    assert!(rig.chip1.journal().is_empty());
}

#[test]
fn failed_record_write_aborts_dump() {
    let mut rig = rig(small(8));
    // Header plus two `00000,00` records
    let sink = FailingSink {
        remaining: "Address,Word\n".len() + 2 * "00000,00\n".len(),
        fail_flush: false,
    };
    let mut tally = Tally::default();
    let report = rig
        .router
        .dump_to_text(
            ChipSelector::Chip1,
            sink,
            &BulkOptions::default(),
            &mut tally,
        )
        .unwrap();
    assert_eq!(report.outcome, Outcome::Aborted(Error::Io));
    assert_eq!(report.transferred, 3);
    assert_eq!(tally.finished, 1);
}

#[test]
fn failed_flush_aborts_dump() {
    let mut rig = rig(small(8));
    let sink = FailingSink {
        remaining: usize::MAX,
        fail_flush: true,
    };
    let mut tally = Tally::default();
    let report = rig
        .router
        .dump_to_text(
            ChipSelector::Chip1,
            sink,
            &BulkOptions::default(),
            &mut tally,
        )
        .unwrap();
    assert_eq!(report.outcome, Outcome::Aborted(Error::Io));
    assert_eq!(report.transferred, 8);
    assert_eq!(tally.finished, 1);
}

#[test]
fn failed_source_aborts_streamed_load() {
    let mut rig = rig(small(16));
    let mut tally = Tally::default();
    let report = rig
        .router
        .load_from_text(
            ChipSelector::Chip1,
            broken_source("00001,11\n00002,22\n"),
            &BulkOptions::default(),
            &mut tally,
        )
        .unwrap();
    assert_eq!(report.outcome, Outcome::Aborted(Error::Io));
    assert_eq!(report.transferred, 2);
    assert_eq!(tally.finished, 1);
    assert_eq!(rig.chip1.peek(1), 0x11);
    assert_eq!(rig.chip1.peek(2), 0x22);
}

#[test]
fn failed_source_aborts_buffered_load_before_writing() {
    let mut rig = rig(small(16));
    let options = BulkOptions {
        strategy: LoadStrategy::Buffered,
        ..BulkOptions::default()
    };
    let mut tally = Tally::default();
    let report = rig
        .router
        .load_from_text(
            ChipSelector::Chip1,
            broken_source("00001,11\n00002,22\n"),
            &options,
            &mut tally,
        )
        .unwrap();
    assert_eq!(report.outcome, Outcome::Aborted(Error::Io));
    assert_eq!(report.transferred, 0);
    assert_eq!(tally.finished, 1);
    assert!(rig.chip1.journal().is_empty());
}

#[test]
fn invalid_utf8_line_is_skipped_on_load() {
    let mut rig = rig(small(16));
    let source: &[u8] = b"00001,11\n\xff\xfe,22\n00002,33\n";
    let report = rig
        .router
        .load_from_text(
            ChipSelector::Chip1,
            source,
            &BulkOptions::default(),
            &mut NoProgress,
        )
        .unwrap();
    assert_eq!(report.outcome, Outcome::Completed);
    assert_eq!(report.transferred, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(rig.chip1.peek(1), 0x11);
    assert_eq!(rig.chip1.peek(2), 0x33);
}
