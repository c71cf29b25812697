//! Subscription types.

use crate::types::Category;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for a subscription within a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriptionId(pub u64);

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Interest of one subscriber in one category. Never mutated after creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub category: Category,
}

impl Subscription {
    pub fn matches(&self, category: Category) -> bool {
        self.category == category
    }
}
