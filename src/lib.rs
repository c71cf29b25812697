//! # Slot Replay
//!
//! Replays archived, per-category event logs through a subscription feed
//! in strict slot order, reproducing a live event stream from static data.
//!
//! ## Core Concepts
//!
//! - **Records**: One JSON line each, keyed by slot and tagged with a category
//! - **Segments**: Ordered archive buckets holding one log per category
//! - **Synchronizer**: Merges the category streams one slot at a time
//! - **Subscriptions**: Per-session ids that decide who receives what
//!
//! ## Example
//!
//! ```ignore
//! use slot_replay::{Category, DirArchive, ReplayConfig, ReplaySession};
//! use std::sync::Arc;
//!
//! let archive = Arc::new(DirArchive::new("./out"));
//! let mut session = ReplaySession::new(archive, ReplayConfig::default())?;
//! session.subscribe(Category::NewPair);
//! session.subscribe(Category::Swap);
//!
//! let mut envelopes = Vec::new();
//! let summary = session.run(&mut envelopes)?;
//! println!("replayed {} records up to slot {:?}", summary.records_replayed, summary.last_slot);
//! ```

pub mod archive;
pub mod error;
pub mod protocol;
pub mod records;
pub mod replay;
pub mod subscriptions;
pub mod types;

// Re-exports
pub use archive::{ArchiveSource, DirArchive, MemoryArchive, SegmentId, StreamReader};
pub use error::{ReplayError, Result};
pub use protocol::{Connection, ControlAction, METHOD_START_SIMULATION};
pub use records::{decode_line, RecordDecoder};
pub use replay::{
    CancelToken, EnvelopeSink, ReplayConfig, ReplaySession, ReplaySummary, SlotSynchronizer,
    StreamFeed, StreamItem, StreamState, TextSink,
};
pub use subscriptions::{Subscription, SubscriptionId, SubscriptionRegistry};
pub use types::*;
