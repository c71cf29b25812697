//! Per-category stream state and the decoder threads that feed it.

use crate::archive::{ArchiveSource, SegmentId, StreamReader};
use crate::error::{ReplayError, Result};
use crate::records::RecordDecoder;
use crate::types::{Category, Record};
use crossbeam_channel::{bounded, select, Receiver, Sender};
use std::io::BufReader;
use std::sync::Arc;
use std::thread;
use tracing::debug;

use super::CancelToken;

/// What a decoder thread puts on its queue.
#[derive(Debug)]
pub enum StreamItem {
    Record(Record),
    /// Source exhausted; nothing follows.
    End,
}

/// Cursor bookkeeping for one category stream.
#[derive(Debug)]
pub struct StreamState {
    pub category: Category,
    /// A record already read whose slot is ahead of the cursor.
    pub lookahead: Option<Record>,
    /// Set once the end marker was seen. Never cleared.
    pub done: bool,
}

impl StreamState {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            lookahead: None,
            done: false,
        }
    }
}

/// A stream's state together with the queue its decoder writes to.
pub struct StreamFeed {
    pub state: StreamState,
    queue: Option<Receiver<Result<StreamItem>>>,
}

impl StreamFeed {
    pub fn new(category: Category, queue: Receiver<Result<StreamItem>>) -> Self {
        Self {
            state: StreamState::new(category),
            queue: Some(queue),
        }
    }

    /// Feed for a category the segment has no log for.
    pub fn exhausted(category: Category) -> Self {
        let mut state = StreamState::new(category);
        state.done = true;
        Self { state, queue: None }
    }

    /// Next item: the lookahead if one is held, otherwise the queue head.
    ///
    /// Blocks until the decoder produces something or `cancel` fires.
    pub fn pull(&mut self, cancel: &CancelToken) -> Result<StreamItem> {
        if let Some(record) = self.state.lookahead.take() {
            return Ok(StreamItem::Record(record));
        }

        let category = self.state.category;
        let Some(queue) = self.queue.as_ref() else {
            return Ok(StreamItem::End);
        };

        select! {
            recv(queue) -> msg => match msg {
                Ok(item) => item,
                Err(_) => Err(ReplayError::StreamAborted { category }),
            },
            recv(cancel.receiver()) -> _ => Err(ReplayError::Cancelled),
        }
    }
}

/// Calls the archive's release hook when dropped, on every exit path of a
/// decoder thread.
struct ReleaseGuard<A: ArchiveSource> {
    archive: Arc<A>,
    segment: SegmentId,
    category: Category,
}

impl<A: ArchiveSource> Drop for ReleaseGuard<A> {
    fn drop(&mut self) {
        self.archive.release_stream(&self.segment, self.category);
        debug!(segment = %self.segment, category = %self.category, "Released stream");
    }
}

/// Start a decoder thread for `reader` and return the feed it writes to.
///
/// The thread stops when the source is exhausted, on the first decode
/// error (which is forwarded), when the feed is dropped, or on cancel.
pub fn spawn_decoder<A>(
    archive: Arc<A>,
    segment: &SegmentId,
    category: Category,
    reader: StreamReader,
    capacity: usize,
    cancel: &CancelToken,
) -> Result<StreamFeed>
where
    A: ArchiveSource + 'static,
{
    let (tx, rx) = bounded(capacity);
    let guard = ReleaseGuard {
        archive,
        segment: segment.clone(),
        category,
    };
    let cancel = cancel.clone();

    thread::Builder::new()
        .name(format!("decode-{}-{}", segment, category))
        .spawn(move || {
            let _guard = guard;
            decode_into(reader, category, &tx, &cancel);
        })?;

    debug!(segment = %segment, %category, capacity, "Spawned stream decoder");
    Ok(StreamFeed::new(category, rx))
}

fn decode_into(
    reader: StreamReader,
    category: Category,
    tx: &Sender<Result<StreamItem>>,
    cancel: &CancelToken,
) {
    let mut decoder = RecordDecoder::new(BufReader::new(reader), category);
    let mut stopped = false;
    for item in decoder.by_ref() {
        let failed = item.is_err();
        if !forward(tx, item.map(StreamItem::Record), cancel) || failed {
            stopped = true;
            break;
        }
    }
    if stopped {
        debug!(%category, lines = decoder.lines_read(), "Decoder stopped early");
    } else if forward(tx, Ok(StreamItem::End), cancel) {
        debug!(%category, lines = decoder.lines_read(), "Decoder reached end of log");
    }
}

/// Blocking send that gives up on cancel or when the feed was dropped.
fn forward(tx: &Sender<Result<StreamItem>>, item: Result<StreamItem>, cancel: &CancelToken) -> bool {
    select! {
        send(tx, item) -> res => res.is_ok(),
        recv(cancel.receiver()) -> _ => false,
    }
}
