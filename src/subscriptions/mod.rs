//! Subscription registry for replayed events.
//!
//! A client subscribes to categories before the replay starts; every
//! subscription gets its own id and receives one envelope per matching
//! record. Subscriptions live as long as the session.
//!
//! # Example
//!
//! ```ignore
//! let mut registry = SubscriptionRegistry::new();
//! let swaps = registry.subscribe(Category::Swap);
//!
//! registry.publish(&record, |envelope| {
//!     assert_eq!(envelope.subscription_id, swaps.0);
//!     Ok(())
//! })?;
//! ```

mod manager;
mod types;

pub use manager::SubscriptionRegistry;
pub use types::{Subscription, SubscriptionId};
