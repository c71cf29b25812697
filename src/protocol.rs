//! Control messages of a replay connection.
//!
//! A client first subscribes to the categories it wants, then sends
//! `startSimulation`. From then on the connection only carries
//! notifications until the archive is exhausted, after which the outbound
//! queue is closed so the transport can disconnect. Framing and the socket
//! itself belong to the transport; this module works on text messages.

use crate::archive::ArchiveSource;
use crate::error::{ReplayError, Result};
use crate::replay::{CancelToken, EnvelopeSink, ReplaySession, ReplaySummary, TextSink};
use crate::types::Category;
use crossbeam_channel::{Receiver, Sender};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Method that starts the replay.
pub const METHOD_START_SIMULATION: &str = "startSimulation";

/// Inbound control message.
#[derive(Debug, Deserialize)]
struct ControlRequest {
    #[serde(default)]
    id: i64,
    method: String,
}

#[derive(Debug, Serialize)]
struct SubscribeReply {
    id: i64,
    result: SubscribeResult,
}

#[derive(Debug, Serialize)]
struct SubscribeResult {
    subscription_id: u64,
}

/// What the transport should do after a control message.
#[derive(Debug, PartialEq, Eq)]
pub enum ControlAction {
    /// Send this text frame back to the client.
    Reply(String),
    /// Start replaying.
    Start,
    /// Nothing to send.
    Ignored,
}

/// Server side of one client connection.
pub struct Connection<A> {
    session: ReplaySession<A>,
    started: bool,
}

impl<A: ArchiveSource + 'static> Connection<A> {
    pub fn new(session: ReplaySession<A>) -> Self {
        Self {
            session,
            started: false,
        }
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.session.cancel_token()
    }

    /// Apply one inbound control message.
    pub fn handle(&mut self, message: &str) -> Result<ControlAction> {
        let request: ControlRequest = serde_json::from_str(message)
            .map_err(|e| ReplayError::Protocol(format!("invalid control message: {}", e)))?;

        if request.method == METHOD_START_SIMULATION {
            if self.started {
                return Err(ReplayError::Protocol("simulation already started".into()));
            }
            self.started = true;
            return Ok(ControlAction::Start);
        }

        let Some(category) = Category::from_subscribe_method(&request.method) else {
            warn!(method = %request.method, "Unknown control method");
            return Ok(ControlAction::Ignored);
        };
        if self.started {
            return Err(ReplayError::Protocol(format!(
                "{} rejected: simulation already started",
                request.method
            )));
        }

        let id = self.session.subscribe(category);
        let reply = SubscribeReply {
            id: request.id,
            result: SubscribeResult {
                subscription_id: id.0,
            },
        };
        Ok(ControlAction::Reply(serde_json::to_string(&reply)?))
    }

    /// Run the replay into `sink`, consuming the connection.
    pub fn start<S: EnvelopeSink>(self, sink: S) -> Result<ReplaySummary> {
        self.session.run(sink)
    }

    /// Drive the connection over message queues.
    ///
    /// Replies and notifications share `outbound`. Returns `Ok(None)` if
    /// the client went away before starting the replay.
    pub fn serve(
        mut self,
        inbound: Receiver<String>,
        outbound: Sender<String>,
    ) -> Result<Option<ReplaySummary>> {
        info!("Connection established");
        for message in inbound.iter() {
            match self.handle(&message)? {
                ControlAction::Reply(reply) => outbound
                    .send(reply)
                    .map_err(|_| ReplayError::SinkDisconnected)?,
                ControlAction::Ignored => {}
                ControlAction::Start => {
                    info!(
                        subscriptions = self.session.registry().subscription_count(),
                        "Starting simulation"
                    );
                    return self.start(TextSink::new(outbound)).map(Some);
                }
            }
        }
        info!("Connection closed before the simulation started");
        Ok(None)
    }
}
