//! Replay session: drives the synchronizer across archive segments.

use crate::archive::{ArchiveSource, SegmentId};
use crate::error::{ReplayError, Result};
use crate::subscriptions::{SubscriptionId, SubscriptionRegistry};
use crate::types::{Category, Slot};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error, info};

use super::sink::EnvelopeSink;
use super::stream::{spawn_decoder, StreamFeed};
use super::synchronizer::SlotSynchronizer;
use super::CancelToken;

/// Replay configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplayConfig {
    /// Skip segments that start before this date.
    pub from_date: Option<NaiveDate>,

    /// Drain but do not emit records below this slot. Requires `from_date`.
    pub from_slot: Option<u64>,

    /// Records each decoder may queue ahead of the synchronizer.
    /// Default: 1
    pub stream_buffer: usize,
}

impl Default for ReplayConfig {
    fn default() -> Self {
        Self {
            from_date: None,
            from_slot: None,
            stream_buffer: 1,
        }
    }
}

impl ReplayConfig {
    pub fn validate(&self) -> Result<()> {
        if self.from_slot.is_some() && self.from_date.is_none() {
            return Err(ReplayError::InvalidConfig(
                "from_date must be set when from_slot is set".into(),
            ));
        }
        if self.stream_buffer == 0 {
            return Err(ReplayError::InvalidConfig(
                "stream_buffer must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Outcome of a completed replay.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    pub segments_replayed: usize,
    /// Records drained from all streams, emitted or not.
    pub records_replayed: u64,
    pub envelopes_emitted: u64,
    /// Cursor value the replay started at.
    pub first_slot: Option<Slot>,
    /// Cursor value of the final tick.
    pub last_slot: Option<Slot>,
    /// Hex SHA-256 of the emitted envelopes in order.
    pub output_digest: String,
}

/// One replay of an archive for one set of subscriptions.
///
/// Subscriptions are registered first; [`ReplaySession::run`] then consumes
/// the session, so nothing can subscribe once the replay has started.
pub struct ReplaySession<A> {
    archive: Arc<A>,
    config: ReplayConfig,
    registry: SubscriptionRegistry,
    cancel: CancelToken,
}

impl<A: ArchiveSource + 'static> ReplaySession<A> {
    pub fn new(archive: Arc<A>, config: ReplayConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            archive,
            config,
            registry: SubscriptionRegistry::new(),
            cancel: CancelToken::new(),
        })
    }

    pub fn subscribe(&mut self, category: Category) -> SubscriptionId {
        let id = self.registry.subscribe(category);
        debug!(subscription_id = %id, %category, "Subscribed");
        id
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ReplayConfig {
        &self.config
    }

    /// Token that aborts a running replay from another thread.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Replay the whole archive into `sink`.
    ///
    /// Returns once every segment is exhausted, or with the first fatal
    /// error. Envelopes delivered before a failure stay delivered. The sink
    /// is dropped on return, which closes channel-backed sinks.
    pub fn run<S: EnvelopeSink>(self, sink: S) -> Result<ReplaySummary> {
        let result = self.replay(sink);
        // Stops any decoder still running after an early exit.
        self.cancel.cancel();

        match &result {
            Ok(summary) => info!(
                segments = summary.segments_replayed,
                records = summary.records_replayed,
                envelopes = summary.envelopes_emitted,
                ending_slot = ?summary.last_slot,
                "Replay finished"
            ),
            Err(e) => error!(error = %e, "Replay failed"),
        }
        result
    }

    fn replay<S: EnvelopeSink>(&self, sink: S) -> Result<ReplaySummary> {
        let segments = self.selected_segments()?;
        for category in Category::ALL {
            if !self.registry.has_subscribers(category) {
                debug!(%category, "No subscribers, records will be drained only");
            }
        }
        let emit_from = Slot(self.config.from_slot.unwrap_or(0));
        let mut sync = SlotSynchronizer::new(&self.registry, sink, self.cancel.clone())
            .with_emit_from(emit_from);

        let mut summary = ReplaySummary::default();
        let mut cursor: Option<Slot> = None;

        for (index, segment) in segments.iter().enumerate() {
            info!(
                segment = %segment,
                index = index + 1,
                total = segments.len(),
                "Replaying segment"
            );
            let mut streams = self.open_streams(segment)?;
            summary.segments_replayed += 1;

            let mut slot = match cursor {
                Some(slot) => slot,
                None => match sync.prime(&mut streams)? {
                    Some(first) => {
                        let start = first.max(emit_from);
                        debug!(first_slot = %first, start_slot = %start, "Initial cursor");
                        summary.first_slot = Some(start);
                        start
                    }
                    None => {
                        debug!(segment = %segment, "Segment has no records");
                        continue;
                    }
                },
            };

            sync.merge(&mut streams, &mut slot)?;
            cursor = Some(slot);
            debug!(segment = %segment, cursor = %slot, "Segment exhausted");
        }

        let totals = sync.totals();
        summary.records_replayed = totals.records_replayed;
        summary.envelopes_emitted = totals.envelopes_emitted;
        summary.output_digest = totals.output_digest;
        summary.last_slot = cursor;
        Ok(summary)
    }

    fn selected_segments(&self) -> Result<Vec<SegmentId>> {
        let mut segments = self.archive.segments()?;
        if let Some(from) = self.config.from_date {
            segments.retain(|segment| match segment.starts_at {
                Some(starts_at) => starts_at.date() >= from,
                None => true,
            });
        }
        Ok(segments)
    }

    /// One feed per category, in declared order.
    fn open_streams(&self, segment: &SegmentId) -> Result<Vec<StreamFeed>> {
        let mut streams = Vec::with_capacity(Category::ALL.len());
        for category in Category::ALL {
            let feed = match self.archive.open_stream(segment, category)? {
                Some(reader) => spawn_decoder(
                    Arc::clone(&self.archive),
                    segment,
                    category,
                    reader,
                    self.config.stream_buffer,
                    &self.cancel,
                )?,
                None => StreamFeed::exhausted(category),
            };
            streams.push(feed);
        }
        Ok(streams)
    }
}
