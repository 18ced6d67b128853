//! Diagnostic request trace.
//!
//! The controller can log every handled request as one text line
//! `cycle, line_address_hex, type` where `type` is `1` for a dirty write-back and
//! `0` otherwise. Records are buffered and appended to the file in batches. Trace
//! output is best effort: an I/O failure is logged and disables the recorder.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::common::constants::{TRACE_FILE_SUFFIX, TRACE_HEADER};
use crate::config::GeneralConfig;

/// One traced request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TraceRecord {
    /// Request cycle.
    pub cycle: u64,
    /// Line address as received.
    pub line: u64,
    /// `true` for a dirty write-back.
    pub write: bool,
}

impl TraceRecord {
    /// Parses one trace line; returns `None` for the header, blank lines and malformed input.
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut fields = line.split(',').map(str::trim);
        let cycle = fields.next()?.parse().ok()?;
        let addr = fields.next()?;
        let addr = addr.strip_prefix("0x").unwrap_or(addr);
        let line_addr = u64::from_str_radix(addr, 16).ok()?;
        let write = match fields.next()? {
            "0" => false,
            "1" => true,
            _ => return None,
        };
        if fields.next().is_some() {
            return None;
        }
        Some(Self {
            cycle,
            line: line_addr,
            write,
        })
    }
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, {:x}, {}", self.cycle, self.line, u8::from(self.write))
    }
}

/// Buffered append-only trace writer.
#[derive(Debug)]
pub struct TraceRecorder {
    path: PathBuf,
    buffer: Vec<TraceRecord>,
    flush_every: usize,
    enabled: bool,
}

impl TraceRecorder {
    /// Creates the trace file (truncating it) and writes the header.
    ///
    /// # Arguments
    ///
    /// * `general` - Trace directory, controller name and flush interval.
    ///
    /// # Returns
    ///
    /// A recorder; disabled if the file cannot be created.
    pub fn create(general: &GeneralConfig) -> Self {
        let file_name = format!("{}{}", general.name, TRACE_FILE_SUFFIX);
        let path = Path::new(&general.trace_dir).join(file_name);
        let enabled = match File::create(&path).and_then(|mut f| writeln!(f, "{TRACE_HEADER}")) {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "trace: cannot create file, tracing disabled"
                );
                false
            }
        };
        Self {
            path,
            buffer: Vec::with_capacity(general.trace_flush_every.min(1 << 16)),
            flush_every: general.trace_flush_every.max(1),
            enabled,
        }
    }

    /// Returns the trace file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `false` once an I/O error has disabled the recorder.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Returns the number of buffered, unwritten records.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Buffers a record, flushing when the batch is full.
    pub fn record(&mut self, record: TraceRecord) {
        if !self.enabled {
            return;
        }
        self.buffer.push(record);
        if self.buffer.len() >= self.flush_every {
            self.flush();
        }
    }

    /// Appends every buffered record to the file.
    pub fn flush(&mut self) {
        if !self.enabled || self.buffer.is_empty() {
            return;
        }
        let result = OpenOptions::new()
            .append(true)
            .open(&self.path)
            .and_then(|file| {
                let mut out = BufWriter::new(file);
                for record in &self.buffer {
                    writeln!(out, "{record}")?;
                }
                out.flush()
            });
        self.buffer.clear();
        if let Err(e) = result {
            warn!(path = %self.path.display(), error = %e, "trace: write failed, tracing disabled");
            self.enabled = false;
        }
    }
}

impl Drop for TraceRecorder {
    fn drop(&mut self) {
        self.flush();
    }
}
