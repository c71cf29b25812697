//! Cancellation signal shared by a session and its worker threads.

use crossbeam_channel::{bounded, Receiver, Sender};
use parking_lot::Mutex;
use std::sync::Arc;

/// Cloneable cancellation signal.
///
/// Cancelling drops the only sender of an internal channel, so every clone
/// of [`CancelToken::receiver`] becomes ready at once. Blocking operations
/// include it as one arm of a `select!`.
#[derive(Clone, Debug)]
pub struct CancelToken {
    trigger: Arc<Mutex<Option<Sender<()>>>>,
    signal: Receiver<()>,
}

impl CancelToken {
    pub fn new() -> Self {
        let (trigger, signal) = bounded(0);
        Self {
            trigger: Arc::new(Mutex::new(Some(trigger))),
            signal,
        }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.trigger.lock().take();
    }

    pub fn is_cancelled(&self) -> bool {
        self.trigger.lock().is_none()
    }

    /// Becomes ready (with a disconnect error) once cancelled.
    pub fn receiver(&self) -> &Receiver<()> {
        &self.signal
    }
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}
