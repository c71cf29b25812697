//! Registry that assigns subscription ids and fans records out.

use crate::error::Result;
use crate::types::{Category, Envelope, Record};

use super::types::{Subscription, SubscriptionId};

/// Owns the subscriptions of one session.
///
/// Only the synchronizer reads it once the replay has started, so it needs
/// no interior locking.
#[derive(Debug)]
pub struct SubscriptionRegistry {
    /// Subscriptions in creation order (which is also id order).
    subscriptions: Vec<Subscription>,
    /// Next id to hand out. Ids start at 1 and are never reused.
    next_id: u64,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            subscriptions: Vec::new(),
            next_id: 1,
        }
    }

    /// Register interest in a category.
    pub fn subscribe(&mut self, category: Category) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        self.subscriptions.push(Subscription { id, category });
        id
    }

    /// Get subscription count.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions.len()
    }

    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions
    }

    /// Whether anyone listens to `category`.
    pub fn has_subscribers(&self, category: Category) -> bool {
        self.subscriptions.iter().any(|sub| sub.matches(category))
    }

    /// Hand one envelope per matching subscription to `emit`, in id order.
    ///
    /// Returns how many envelopes were emitted; zero matches is a no-op.
    pub fn publish<F>(&self, record: &Record, mut emit: F) -> Result<usize>
    where
        F: FnMut(Envelope) -> Result<()>,
    {
        let mut emitted = 0;
        for sub in self.subscriptions.iter().filter(|sub| sub.matches(record.category)) {
            emit(Envelope {
                method: record.category.notification_method(),
                subscription_id: sub.id.0,
                params: record.payload.clone(),
            })?;
            emitted += 1;
        }
        Ok(emitted)
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
