//! Synchronized multi-stream replay.
//!
//! A [`ReplaySession`] walks the archive segment by segment. For every
//! segment it starts one decoder thread per category, each writing into a
//! small bounded queue, and hands the queues to a [`SlotSynchronizer`] that
//! runs on the calling thread:
//!
//! ```text
//! archive ──► decoder (pairs) ──► queue ─┐
//!         └─► decoder (swaps) ──► queue ─┴─► synchronizer ──► registry ──► sink
//! ```
//!
//! The queues are the only state shared between threads. Decoders block when
//! their queue is full, and the synchronizer blocks when the sink is full, so
//! the replay runs as fast as the consumer drains it and no faster.
//!
//! # Example
//!
//! ```ignore
//! let archive = Arc::new(DirArchive::new("./out"));
//! let mut session = ReplaySession::new(archive, ReplayConfig::default())?;
//! let swaps = session.subscribe(Category::Swap);
//!
//! let (tx, rx) = crossbeam_channel::bounded(1);
//! std::thread::spawn(move || session.run(tx));
//! for envelope in rx {
//!     println!("{}", envelope.to_json()?);
//! }
//! ```

mod cancel;
mod session;
mod sink;
mod stream;
mod synchronizer;

pub use cancel::CancelToken;
pub use session::{ReplayConfig, ReplaySession, ReplaySummary};
pub use sink::{EnvelopeSink, TextSink};
pub use stream::{spawn_decoder, StreamFeed, StreamItem, StreamState};
pub use synchronizer::{MergeTotals, SlotSynchronizer};
