//! Archive sources.
//!
//! An archive is an ordered list of segments (one per time bucket), each
//! holding at most one log per category. Fetching and unpacking archive
//! containers happens upstream; a source only hands out readable streams
//! and is told when a stream has been fully consumed.

mod dir;
mod memory;

pub use dir::DirArchive;
pub use memory::MemoryArchive;

use crate::error::Result;
use crate::types::Category;
use chrono::NaiveDateTime;
use std::fmt;
use std::io::Read;

/// Naming convention for time-bucketed segments, e.g. `20240501-130000`.
pub const SEGMENT_TIME_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Identifier of one archive segment.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SegmentId {
    pub name: String,
    /// Start of the bucket, when the name follows [`SEGMENT_TIME_FORMAT`].
    pub starts_at: Option<NaiveDateTime>,
}

impl SegmentId {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let stem = name.split('.').next().unwrap_or(&name);
        let starts_at = NaiveDateTime::parse_from_str(stem, SEGMENT_TIME_FORMAT).ok();
        Self { name, starts_at }
    }
}

impl fmt::Display for SegmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Readable byte stream for one category log.
pub type StreamReader = Box<dyn Read + Send>;

/// Where replayed data comes from.
pub trait ArchiveSource: Send + Sync {
    /// All segments, oldest first.
    fn segments(&self) -> Result<Vec<SegmentId>>;

    /// Open the log of `category` in `segment`.
    ///
    /// `Ok(None)` means the segment has no log for that category.
    fn open_stream(&self, segment: &SegmentId, category: Category) -> Result<Option<StreamReader>>;

    /// Called exactly once for every stream returned by `open_stream`,
    /// after the stream was drained, failed, or was cancelled.
    fn release_stream(&self, segment: &SegmentId, category: Category);
}
