//! Line-oriented decoder for category logs.

use crate::error::{ReplayError, Result};
use crate::types::{Category, Record, Slot};
use serde::de::IgnoredAny;
use serde::Deserialize;
use serde_json::value::RawValue;
use std::io::BufRead;

/// Fields the engine reads from a line; everything else stays opaque.
#[derive(Deserialize)]
struct LineHeader {
    slot: u64,
    #[serde(default)]
    pair: Option<IgnoredAny>,
    #[serde(default)]
    swap: Option<IgnoredAny>,
}

impl LineHeader {
    fn category(&self) -> std::result::Result<Category, &'static str> {
        match (self.pair.is_some(), self.swap.is_some()) {
            (true, false) => Ok(Category::NewPair),
            (false, true) => Ok(Category::Swap),
            (false, false) => Err("no category discriminator present"),
            (true, true) => Err("more than one category discriminator present"),
        }
    }
}

/// Decode a single log line.
///
/// `stream` and `line` only label the error; the record's category comes
/// from the line itself.
pub fn decode_line(stream: Category, line: usize, text: &str) -> Result<Record> {
    let malformed = |reason: String| ReplayError::Decode {
        category: stream,
        line,
        reason,
    };

    let payload: Box<RawValue> =
        serde_json::from_str(text).map_err(|e| malformed(e.to_string()))?;
    let header: LineHeader =
        serde_json::from_str(payload.get()).map_err(|e| malformed(e.to_string()))?;
    let category = header.category().map_err(|reason| malformed(reason.to_string()))?;

    Ok(Record {
        slot: Slot(header.slot),
        category,
        payload,
    })
}

/// Lazily decodes a category log into records.
///
/// Yields `None` once the source is exhausted, which callers turn into the
/// end-of-stream marker. After the first error the decoder is fused.
pub struct RecordDecoder<R> {
    reader: R,
    category: Category,
    line: usize,
    buf: Vec<u8>,
    failed: bool,
}

impl<R: BufRead> RecordDecoder<R> {
    pub fn new(reader: R, category: Category) -> Self {
        Self {
            reader,
            category,
            line: 0,
            buf: Vec::new(),
            failed: false,
        }
    }

    /// Number of lines read so far.
    pub fn lines_read(&self) -> usize {
        self.line
    }
}

impl<R: BufRead> Iterator for RecordDecoder<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        self.buf.clear();
        let read = match self.reader.read_until(b'\n', &mut self.buf) {
            Ok(n) => n,
            Err(e) => {
                self.failed = true;
                return Some(Err(ReplayError::SourceUnavailable(format!(
                    "{} log, after line {}: {}",
                    self.category, self.line, e
                ))));
            }
        };
        if read == 0 {
            return None;
        }
        self.line += 1;

        let text = match std::str::from_utf8(&self.buf) {
            Ok(text) => text.trim_end_matches(['\n', '\r']),
            Err(e) => {
                self.failed = true;
                return Some(Err(ReplayError::Decode {
                    category: self.category,
                    line: self.line,
                    reason: e.to_string(),
                }));
            }
        };
        let result = decode_line(self.category, self.line, text);
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}
