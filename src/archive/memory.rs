//! In-memory archive, mostly for tests and benchmarks.

use crate::error::{ReplayError, Result};
use crate::types::Category;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::io::Cursor;
use std::sync::Arc;

use super::{ArchiveSource, SegmentId, StreamReader};

enum MemoryLog {
    /// Can be opened any number of times.
    Bytes(Arc<[u8]>),
    /// Handed out once.
    Reader(Mutex<Option<StreamReader>>),
}

struct MemorySegment {
    id: SegmentId,
    logs: BTreeMap<Category, MemoryLog>,
}

/// Archive held entirely in memory.
///
/// Every release is recorded so callers can check that streams were cleaned
/// up.
#[derive(Default)]
pub struct MemoryArchive {
    segments: Vec<MemorySegment>,
    released: Mutex<Vec<(String, Category)>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a segment whose logs are given as lists of lines.
    pub fn with_segment<I, L>(mut self, name: &str, logs: I) -> Self
    where
        I: IntoIterator<Item = (Category, L)>,
        L: IntoIterator,
        L::Item: AsRef<str>,
    {
        let segment = self.segment_mut(name);
        for (category, lines) in logs {
            let mut body = String::new();
            for line in lines {
                body.push_str(line.as_ref());
                body.push('\n');
            }
            segment
                .logs
                .insert(category, MemoryLog::Bytes(Arc::from(body.into_bytes())));
        }
        self
    }

    /// Attach a one-shot reader as the `category` log of segment `name`.
    pub fn with_reader(mut self, name: &str, category: Category, reader: StreamReader) -> Self {
        self.segment_mut(name)
            .logs
            .insert(category, MemoryLog::Reader(Mutex::new(Some(reader))));
        self
    }

    /// Streams released so far, in release order.
    pub fn released(&self) -> Vec<(String, Category)> {
        self.released.lock().clone()
    }

    fn segment_mut(&mut self, name: &str) -> &mut MemorySegment {
        let index = match self.segments.iter().position(|s| s.id.name == name) {
            Some(index) => index,
            None => {
                self.segments.push(MemorySegment {
                    id: SegmentId::new(name),
                    logs: BTreeMap::new(),
                });
                self.segments.len() - 1
            }
        };
        &mut self.segments[index]
    }
}

impl ArchiveSource for MemoryArchive {
    fn segments(&self) -> Result<Vec<SegmentId>> {
        Ok(self.segments.iter().map(|s| s.id.clone()).collect())
    }

    fn open_stream(&self, segment: &SegmentId, category: Category) -> Result<Option<StreamReader>> {
        let Some(found) = self.segments.iter().find(|s| s.id == *segment) else {
            return Err(ReplayError::SourceUnavailable(format!(
                "unknown segment {}",
                segment
            )));
        };

        match found.logs.get(&category) {
            None => Ok(None),
            Some(MemoryLog::Bytes(bytes)) => Ok(Some(Box::new(Cursor::new(Arc::clone(bytes))))),
            Some(MemoryLog::Reader(slot)) => match slot.lock().take() {
                Some(reader) => Ok(Some(reader)),
                None => Err(ReplayError::SourceUnavailable(format!(
                    "{} log of {} was already consumed",
                    category, segment
                ))),
            },
        }
    }

    fn release_stream(&self, segment: &SegmentId, category: Category) {
        self.released.lock().push((segment.name.clone(), category));
    }
}
