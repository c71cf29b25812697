//! Filesystem archive: one subdirectory per segment.

use crate::error::{ReplayError, Result};
use crate::types::Category;
use std::fs::{self, File};
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::{ArchiveSource, SegmentId, StreamReader};

/// Archive laid out as `<data_dir>/<segment>/<category file>`.
///
/// Segments are the subdirectories of the data dir, ordered by name. Plain
/// files in the data dir are ignored.
#[derive(Clone, Debug)]
pub struct DirArchive {
    root: PathBuf,
    /// Delete each stream's file once it has been released.
    remove_consumed: bool,
}

impl DirArchive {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            remove_consumed: false,
        }
    }

    /// Treat the segment files as scratch copies and delete them after use.
    pub fn with_remove_consumed(mut self, remove: bool) -> Self {
        self.remove_consumed = remove;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn stream_path(&self, segment: &SegmentId, category: Category) -> PathBuf {
        self.root.join(&segment.name).join(category.file_name())
    }
}

impl ArchiveSource for DirArchive {
    fn segments(&self) -> Result<Vec<SegmentId>> {
        let unavailable =
            |e: io::Error| ReplayError::SourceUnavailable(format!("{}: {}", self.root.display(), e));
        let entries = fs::read_dir(&self.root).map_err(unavailable)?;

        let mut segments = Vec::new();
        for entry in entries {
            let entry = entry.map_err(unavailable)?;
            if !entry.file_type().map_err(unavailable)?.is_dir() {
                continue;
            }
            segments.push(SegmentId::new(entry.file_name().to_string_lossy()));
        }
        segments.sort();
        Ok(segments)
    }

    fn open_stream(&self, segment: &SegmentId, category: Category) -> Result<Option<StreamReader>> {
        let path = self.stream_path(segment, category);
        match File::open(&path) {
            Ok(file) => Ok(Some(Box::new(BufReader::new(file)))),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(segment = %segment, %category, "No log for category in segment");
                Ok(None)
            }
            Err(e) => Err(ReplayError::SourceUnavailable(format!(
                "{}: {}",
                path.display(),
                e
            ))),
        }
    }

    fn release_stream(&self, segment: &SegmentId, category: Category) {
        if !self.remove_consumed {
            return;
        }
        let path = self.stream_path(segment, category);
        if let Err(e) = fs::remove_file(&path) {
            warn!(
                path = %path.display(),
                error = %e,
                "Could not delete consumed stream file, disk usage will grow"
            );
        }
    }
}
