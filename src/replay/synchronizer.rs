//! Slot synchronizer: merges category streams into one slot-ordered feed.
//!
//! The cursor advances one slot per tick. On every tick each stream, in
//! declared category order, is drained of all records at or before the
//! cursor; the first record past the cursor is parked in the stream's
//! lookahead until the cursor catches up. The merge of a segment ends on
//! the first tick after which every stream has seen its end marker.
//!
//! Ticks with no records anywhere are still executed one by one.

use crate::error::Result;
use crate::subscriptions::SubscriptionRegistry;
use crate::types::{Record, Slot};
use sha2::{Digest, Sha256};

use super::sink::EnvelopeSink;
use super::stream::{StreamFeed, StreamItem};
use super::CancelToken;

/// Running totals over everything a synchronizer merged.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MergeTotals {
    /// Records drained from streams, emitted or not.
    pub records_replayed: u64,
    /// Envelopes handed to the sink.
    pub envelopes_emitted: u64,
    /// Hex SHA-256 over the emitted envelopes, one JSON line each.
    pub output_digest: String,
}

pub struct SlotSynchronizer<'a, S> {
    registry: &'a SubscriptionRegistry,
    sink: S,
    cancel: CancelToken,
    /// Records below this slot are drained without being emitted.
    emit_from: Slot,
    digest: Sha256,
    records_replayed: u64,
    envelopes_emitted: u64,
}

impl<'a, S: EnvelopeSink> SlotSynchronizer<'a, S> {
    pub fn new(registry: &'a SubscriptionRegistry, sink: S, cancel: CancelToken) -> Self {
        Self {
            registry,
            sink,
            cancel,
            emit_from: Slot(0),
            digest: Sha256::new(),
            records_replayed: 0,
            envelopes_emitted: 0,
        }
    }

    /// Drain, but do not emit, records older than `slot`.
    pub fn with_emit_from(mut self, slot: Slot) -> Self {
        self.emit_from = slot;
        self
    }

    /// Load the first record of every stream into its lookahead.
    ///
    /// Returns the smallest first slot, or `None` if every stream is empty.
    pub fn prime(&self, streams: &mut [StreamFeed]) -> Result<Option<Slot>> {
        let mut first: Option<Slot> = None;
        for stream in streams.iter_mut() {
            if stream.state.done {
                continue;
            }
            match stream.pull(&self.cancel)? {
                StreamItem::End => stream.state.done = true,
                StreamItem::Record(record) => {
                    first = Some(first.map_or(record.slot, |slot| slot.min(record.slot)));
                    stream.state.lookahead = Some(record);
                }
            }
        }
        Ok(first)
    }

    /// Merge `streams` until all of them are done, starting at `cursor`.
    ///
    /// On return `cursor` holds the slot of the final tick, which is where
    /// the next segment continues.
    pub fn merge(&mut self, streams: &mut [StreamFeed], cursor: &mut Slot) -> Result<()> {
        loop {
            for stream in streams.iter_mut() {
                self.drain(stream, *cursor)?;
            }

            if streams.iter().all(|stream| stream.state.done) {
                return Ok(());
            }
            *cursor = cursor.next();
        }
    }

    /// Emit every record of `stream` due at or before `cursor`.
    fn drain(&mut self, stream: &mut StreamFeed, cursor: Slot) -> Result<()> {
        while !stream.state.done {
            match stream.pull(&self.cancel)? {
                StreamItem::End => stream.state.done = true,
                StreamItem::Record(record) if record.slot > cursor => {
                    stream.state.lookahead = Some(record);
                    break;
                }
                StreamItem::Record(record) => self.emit(&record)?,
            }
        }
        Ok(())
    }

    fn emit(&mut self, record: &Record) -> Result<()> {
        self.records_replayed += 1;
        if record.slot < self.emit_from {
            return Ok(());
        }

        let registry = self.registry;
        let sink = &mut self.sink;
        let digest = &mut self.digest;
        let cancel = &self.cancel;
        let emitted = registry.publish(record, |envelope| {
            digest.update(envelope.to_json()?.as_bytes());
            digest.update(b"\n");
            sink.deliver(envelope, cancel)
        })?;
        self.envelopes_emitted += emitted as u64;
        Ok(())
    }

    pub fn totals(&self) -> MergeTotals {
        MergeTotals {
            records_replayed: self.records_replayed,
            envelopes_emitted: self.envelopes_emitted,
            output_digest: hex::encode(self.digest.clone().finalize()),
        }
    }
}
