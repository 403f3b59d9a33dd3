//! Streaming ingestion of the source catalog: a single top-level JSON array
//! of flat records, read in bounded chunks.
//!
//! `JsonArrayStream` is a byte-level scanner that emits the text of each
//! complete top-level object as it becomes available. Memory use is bounded
//! by the chunk size plus the largest in-flight object, independent of the
//! catalog size. Structural bytes (`{`, `}`, `"`, `\`) are ASCII, so scanning
//! bytes is UTF-8 safe.

use crate::{RawFundRecord, SchemeCode};
use anyhow::{bail, Context, Result};
use std::io::{ErrorKind, Read, Seek, SeekFrom};

const DEFAULT_CHUNK_SIZE: usize = 32 * 1024;

/// Incremental scanner over a top-level JSON array.
///
/// Yields each complete top-level object verbatim; the caller parses it in
/// isolation. `offset()` reports the absolute byte position just past the
/// last emitted object, which serves as the resumable cursor.
pub struct JsonArrayStream<R: Read> {
    reader: R,
    chunk_size: usize,
    buf: Vec<u8>,
    /// Absolute stream offset of `buf[0]`.
    base_offset: u64,
    scan_pos: usize,
    obj_start: Option<usize>,
    depth: u32,
    in_string: bool,
    escaped: bool,
    started: bool,
    finished: bool,
    eof: bool,
    last_offset: u64,
}

impl<R: Read> JsonArrayStream<R> {
    pub fn new(reader: R) -> Self {
        Self::with_chunk_size(reader, DEFAULT_CHUNK_SIZE)
    }

    pub fn with_chunk_size(reader: R, chunk_size: usize) -> Self {
        Self {
            reader,
            chunk_size: chunk_size.max(1),
            buf: Vec::new(),
            base_offset: 0,
            scan_pos: 0,
            obj_start: None,
            depth: 0,
            in_string: false,
            escaped: false,
            started: false,
            finished: false,
            eof: false,
            last_offset: 0,
        }
    }

    /// Absolute byte offset just past the last emitted object (or past the
    /// closing `]` once the array has been fully consumed).
    pub fn offset(&self) -> u64 {
        self.last_offset
    }

    /// Whether the closing `]` (or a clean end-of-stream) has been reached.
    pub fn finished(&self) -> bool {
        self.finished
    }

    /// Next complete top-level object, or `None` at end of the array.
    ///
    /// I/O failures and truncation mid-object are fatal; syntactic validity
    /// of the emitted text is the caller's concern.
    pub fn next_raw(&mut self) -> Result<Option<Vec<u8>>> {
        if self.finished {
            return Ok(None);
        }
        loop {
            while self.scan_pos < self.buf.len() {
                let i = self.scan_pos;
                let b = self.buf[i];
                self.scan_pos += 1;

                if self.in_string {
                    if self.escaped {
                        self.escaped = false;
                    } else if b == b'\\' {
                        self.escaped = true;
                    } else if b == b'"' {
                        self.in_string = false;
                    }
                    continue;
                }
                match b {
                    b'"' => self.in_string = true,
                    b'{' => {
                        if self.depth == 0 {
                            self.obj_start = Some(i);
                            self.started = true;
                        }
                        self.depth += 1;
                    }
                    b'}' => {
                        if self.depth > 0 {
                            self.depth -= 1;
                            if self.depth == 0 {
                                let start = self.obj_start.take().unwrap_or(i);
                                let text = self.buf[start..=i].to_vec();
                                self.last_offset = self.base_offset + i as u64 + 1;
                                self.buf.drain(..=i);
                                self.base_offset = self.last_offset;
                                self.scan_pos = 0;
                                return Ok(Some(text));
                            }
                        }
                    }
                    b'[' => {
                        if self.depth == 0 {
                            self.started = true;
                        }
                    }
                    b']' => {
                        if self.depth == 0 {
                            self.last_offset = self.base_offset + i as u64 + 1;
                            self.finished = true;
                            self.buf.clear();
                            return Ok(None);
                        }
                    }
                    b',' => {}
                    _ => {
                        if self.depth == 0 && !self.started && !b.is_ascii_whitespace() {
                            bail!("expected a top-level JSON array, found {:?}", b as char);
                        }
                    }
                }
            }

            if self.eof {
                if self.depth > 0 || self.in_string {
                    bail!("unexpected end of stream inside a catalog record");
                }
                // Lenient: a stream that ends at depth 0 without `]` is
                // treated as a clean end of the array.
                self.finished = true;
                return Ok(None);
            }
            self.fill()?;
        }
    }

    fn fill(&mut self) -> Result<()> {
        let mut chunk = vec![0u8; self.chunk_size];
        loop {
            match self.reader.read(&mut chunk) {
                Ok(0) => {
                    self.eof = true;
                    return Ok(());
                }
                Ok(n) => {
                    self.buf.extend_from_slice(&chunk[..n]);
                    return Ok(());
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).context("reading catalog stream"),
            }
        }
    }
}

impl<R: Read + Seek> JsonArrayStream<R> {
    /// Restart scanning mid-array at a previously reported `offset()`.
    pub fn resume(mut reader: R, offset: u64) -> Result<Self> {
        reader
            .seek(SeekFrom::Start(offset))
            .context("seeking to checkpoint cursor")?;
        let mut stream = Self::new(reader);
        stream.started = true;
        stream.base_offset = offset;
        stream.last_offset = offset;
        Ok(stream)
    }
}

/// Why an individual object could not be turned into a usable record.
#[derive(Debug)]
pub struct RecordParseError {
    /// Scheme code recovered from the raw object, when possible.
    pub scheme_code: Option<SchemeCode>,
    pub reason: String,
}

/// Parse one raw object in isolation and validate the minimal contract:
/// positive scheme code, non-blank scheme name.
pub fn parse_record(raw: &[u8]) -> std::result::Result<RawFundRecord, RecordParseError> {
    match serde_json::from_slice::<RawFundRecord>(raw) {
        Ok(rec) => {
            if rec.scheme_code == 0 {
                return Err(RecordParseError {
                    scheme_code: None,
                    reason: "scheme code must be positive".into(),
                });
            }
            if rec.scheme_name.trim().is_empty() {
                return Err(RecordParseError {
                    scheme_code: Some(rec.scheme_code),
                    reason: "scheme name is empty".into(),
                });
            }
            Ok(rec)
        }
        Err(e) => {
            // Best effort: pull the scheme code out of the raw value so the
            // failure can be keyed in an error log.
            let scheme_code = serde_json::from_slice::<serde_json::Value>(raw)
                .ok()
                .and_then(|v| v.get("schemeCode").and_then(|c| c.as_u64()))
                .and_then(|c| SchemeCode::try_from(c).ok())
                .filter(|&c| c != 0);
            Err(RecordParseError {
                scheme_code,
                reason: e.to_string(),
            })
        }
    }
}

/// Skip-and-log wrapper used by the live (non-checkpointed) ingestion path:
/// malformed objects are logged and dropped, the stream continues.
pub struct RecordStream<R: Read> {
    inner: JsonArrayStream<R>,
    skipped: u64,
}

impl<R: Read> RecordStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            inner: JsonArrayStream::new(reader),
            skipped: 0,
        }
    }

    /// Records dropped so far because they failed to parse or validate.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    pub fn next_record(&mut self) -> Result<Option<RawFundRecord>> {
        loop {
            match self.inner.next_raw()? {
                None => return Ok(None),
                Some(raw) => match parse_record(&raw) {
                    Ok(rec) => return Ok(Some(rec)),
                    Err(e) => {
                        self.skipped += 1;
                        tracing::warn!(
                            scheme_code = ?e.scheme_code,
                            reason = %e.reason,
                            "skipping malformed catalog record"
                        );
                    }
                },
            }
        }
    }
}
