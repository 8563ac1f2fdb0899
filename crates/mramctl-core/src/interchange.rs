//! Address/data text interchange format
//!
//! ```text
//! Address,Word
//! 00000,00
//! 00100,AB
//! ```
//!
//! Dumps are written with a fixed-width uppercase hexadecimal address and a
//! two-digit uppercase hexadecimal data byte. On load the header is
//! optional and two address grammars are accepted:
//!
//! - `<hex>,<hh>` as produced by dumps (`00100,AB`)
//! - `<decimal>,0x<hh>` (`256,0xAB`)
//!
//! An explicit `0x` on the address always means hexadecimal. See
//! [`AddressRadix`] for how a bare address is interpreted.

use std::io::{self, BufRead, Write};

use crate::error::{Error, Result};

/// Header line written at the top of every dump
pub const HEADER: &str = "Address,Word";

/// Default number of hex digits for dumped addresses (covers 17 bits)
pub const DEFAULT_ADDRESS_DIGITS: usize = 5;

/// How a bare (unprefixed) address field is interpreted on load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressRadix {
    /// Decimal if the data field carries a `0x` prefix and the address has
    /// only decimal digits, hexadecimal otherwise
    #[default]
    Auto,
    /// Always hexadecimal
    Hex,
    /// Always decimal
    Decimal,
}

/// One parsed `(address, byte)` pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Record {
    /// Target address (not yet checked against a chip capacity)
    pub address: u32,
    /// Data byte
    pub data: u8,
}

fn strip_hex_prefix(s: &str) -> Option<&str> {
    s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
}

fn parse_hex_u32(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(s, 16).ok()
}

fn parse_dec_u32(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_data(s: &str) -> Option<u8> {
    let digits = strip_hex_prefix(s).unwrap_or(s);
    if digits.is_empty() || digits.len() > 2 {
        return None;
    }
    parse_hex_u32(digits).map(|v| v as u8)
}

/// Parse one `address,data` line
///
/// Returns `None` if the line is not a well-formed record. The header and
/// blank lines are not records either; [`RecordReader`] filters those
/// before calling this.
pub fn parse_record(line: &str, radix: AddressRadix) -> Option<Record> {
    let mut fields = line.trim().split(',');
    let address = fields.next()?.trim();
    let data = fields.next()?.trim();
    if fields.next().is_some() {
        return None;
    }

    let data_prefixed = strip_hex_prefix(data).is_some();
    let data = parse_data(data)?;

    let address = match strip_hex_prefix(address) {
        Some(hex) => parse_hex_u32(hex)?,
        None => match radix {
            AddressRadix::Hex => parse_hex_u32(address)?,
            AddressRadix::Decimal => parse_dec_u32(address)?,
            AddressRadix::Auto if data_prefixed => {
                parse_dec_u32(address).or_else(|| parse_hex_u32(address))?
            }
            AddressRadix::Auto => parse_hex_u32(address)?,
        },
    };

    Some(Record { address, data })
}

fn is_header(line: &str) -> bool {
    line.split(',')
        .next()
        .map(|f| f.trim().eq_ignore_ascii_case("address"))
        .unwrap_or(false)
}

/// Format one record as a dump line (without line terminator)
pub fn format_record(address: u32, data: u8, address_digits: usize) -> String {
    format!("{:0width$X},{:02X}", address, data, width = address_digits)
}

/// Streaming reader over an interchange source
///
/// Yields `(line_number, record)` for every well-formed record in file
/// order. Malformed lines yield [`Error::MalformedRecord`]; a failing
/// source yields [`Error::Io`] and ends the iteration.
pub struct RecordReader<R> {
    source: R,
    radix: AddressRadix,
    line_no: usize,
    seen_content: bool,
    done: bool,
    buf: Vec<u8>,
}

impl<R: BufRead> RecordReader<R> {
    /// Create a reader with the given address radix
    pub fn new(source: R, radix: AddressRadix) -> Self {
        Self {
            source,
            radix,
            line_no: 0,
            seen_content: false,
            done: false,
            buf: Vec::new(),
        }
    }
}

impl<R: BufRead> Iterator for RecordReader<R> {
    type Item = Result<(usize, Record)>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            self.buf.clear();
            match self.source.read_until(b'\n', &mut self.buf) {
                Ok(0) => self.done = true,
                Ok(_) => {
                    self.line_no += 1;
                    let Ok(text) = core::str::from_utf8(&self.buf) else {
                        self.seen_content = true;
                        return Some(Err(Error::MalformedRecord { line: self.line_no }));
                    };
                    let line = text.trim();
                    if line.is_empty() {
                        continue;
                    }
                    let first = !self.seen_content;
                    self.seen_content = true;
                    if first && is_header(line) {
                        log::debug!("Skipping header on line {}", self.line_no);
                        continue;
                    }
                    return Some(
                        parse_record(line, self.radix)
                            .map(|record| (self.line_no, record))
                            .ok_or(Error::MalformedRecord { line: self.line_no }),
                    );
                }
                Err(e) => {
                    log::error!("Failed to read line {}: {}", self.line_no + 1, e);
                    self.done = true;
                    return Some(Err(Error::Io));
                }
            }
        }
        None
    }
}

/// Streaming writer for dump files
pub struct RecordWriter<W: Write> {
    sink: W,
    address_digits: usize,
}

impl<W: Write> RecordWriter<W> {
    /// Create a writer and emit the header line
    pub fn new(mut sink: W, address_digits: usize) -> io::Result<Self> {
        writeln!(sink, "{}", HEADER)?;
        Ok(Self {
            sink,
            address_digits,
        })
    }

    /// Append one record
    pub fn write_record(&mut self, address: u32, data: u8) -> io::Result<()> {
        writeln!(
            self.sink,
            "{}",
            format_record(address, data, self.address_digits)
        )
    }

    /// Flush and return the sink
    pub fn finish(mut self) -> io::Result<W> {
        self.sink.flush()?;
        Ok(self.sink)
    }
}
