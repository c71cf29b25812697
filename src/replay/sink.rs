//! Output sinks for replayed envelopes.

use crate::error::{ReplayError, Result};
use crate::types::Envelope;
use crossbeam_channel::{select, Sender};

use super::CancelToken;

/// Destination for envelopes produced by the synchronizer.
///
/// `deliver` may block; that is how a slow consumer throttles the replay.
/// A blocked delivery must give up with [`ReplayError::Cancelled`] once
/// `cancel` fires.
pub trait EnvelopeSink {
    fn deliver(&mut self, envelope: Envelope, cancel: &CancelToken) -> Result<()>;
}

impl EnvelopeSink for Sender<Envelope> {
    fn deliver(&mut self, envelope: Envelope, cancel: &CancelToken) -> Result<()> {
        let sender: &Sender<Envelope> = self;
        select! {
            send(sender, envelope) -> res => res.map_err(|_| ReplayError::SinkDisconnected),
            recv(cancel.receiver()) -> _ => Err(ReplayError::Cancelled),
        }
    }
}

impl<S: EnvelopeSink + ?Sized> EnvelopeSink for &mut S {
    fn deliver(&mut self, envelope: Envelope, cancel: &CancelToken) -> Result<()> {
        (**self).deliver(envelope, cancel)
    }
}

/// Collects everything; never blocks.
impl EnvelopeSink for Vec<Envelope> {
    fn deliver(&mut self, envelope: Envelope, _cancel: &CancelToken) -> Result<()> {
        self.push(envelope);
        Ok(())
    }
}

/// Serializes envelopes to JSON text frames for a message transport.
#[derive(Clone, Debug)]
pub struct TextSink {
    outbound: Sender<String>,
}

impl TextSink {
    pub fn new(outbound: Sender<String>) -> Self {
        Self { outbound }
    }
}

impl EnvelopeSink for TextSink {
    fn deliver(&mut self, envelope: Envelope, cancel: &CancelToken) -> Result<()> {
        let frame = envelope.to_json()?;
        let outbound = &self.outbound;
        select! {
            send(outbound, frame) -> res => res.map_err(|_| ReplayError::SinkDisconnected),
            recv(cancel.receiver()) -> _ => Err(ReplayError::Cancelled),
        }
    }
}
