//! Core types for the replay engine.

use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::fmt;

/// Temporal key driving the merge (a logical slot number).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Slot(pub u64);

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Slot({})", self.0)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Slot {
    pub fn next(self) -> Self {
        Slot(self.0.saturating_add(1))
    }
}

/// Event classification of a record.
///
/// Variant order is the declared emission order: at equal slots, every
/// `NewPair` record is emitted before any `Swap` record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    NewPair,
    Swap,
}

impl Category {
    /// All categories in declared order.
    pub const ALL: [Category; 2] = [Category::NewPair, Category::Swap];

    /// Field whose presence marks a log line as this category.
    pub fn discriminator(self) -> &'static str {
        match self {
            Category::NewPair => "pair",
            Category::Swap => "swap",
        }
    }

    /// Control method a client sends to subscribe.
    pub fn subscribe_method(self) -> &'static str {
        match self {
            Category::NewPair => "newPairSubscribe",
            Category::Swap => "swapSubscribe",
        }
    }

    /// Method stamped on outgoing notifications.
    pub fn notification_method(self) -> &'static str {
        match self {
            Category::NewPair => "newPairNotification",
            Category::Swap => "swapNotification",
        }
    }

    /// Name of this category's log inside a segment.
    pub fn file_name(self) -> &'static str {
        match self {
            Category::NewPair => "pairs.jsonl",
            Category::Swap => "swaps.jsonl",
        }
    }

    pub fn from_subscribe_method(method: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|category| category.subscribe_method() == method)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.discriminator())
    }
}

/// A single archived event.
#[derive(Clone, Debug)]
pub struct Record {
    /// Ordering key.
    pub slot: Slot,

    /// Decided once at decode time from the discriminator field.
    pub category: Category,

    /// The original log line, verbatim.
    pub payload: Box<RawValue>,
}

/// Notification delivered to the output sink.
#[derive(Clone, Debug, Serialize)]
pub struct Envelope {
    pub method: &'static str,
    pub subscription_id: u64,
    pub params: Box<RawValue>,
}

impl Envelope {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_navigation() {
        assert_eq!(Slot(5).next(), Slot(6));
        assert_eq!(Slot(u64::MAX).next(), Slot(u64::MAX));
        assert!(Slot(1) < Slot(2));
    }

    #[test]
    fn test_category_mapping() {
        assert_eq!(Category::NewPair.notification_method(), "newPairNotification");
        assert_eq!(Category::Swap.notification_method(), "swapNotification");
        assert_eq!(
            Category::from_subscribe_method("swapSubscribe"),
            Some(Category::Swap)
        );
        assert_eq!(Category::from_subscribe_method("startSimulation"), None);
        assert!(Category::ALL.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_envelope_json_keeps_params_verbatim() {
        let params = RawValue::from_string(r#"{"slot":7,"swap":{"amm":"x"}}"#.to_string()).unwrap();
        let envelope = Envelope {
            method: Category::Swap.notification_method(),
            subscription_id: 3,
            params,
        };

        assert_eq!(
            envelope.to_json().unwrap(),
            r#"{"method":"swapNotification","subscription_id":3,"params":{"slot":7,"swap":{"amm":"x"}}}"#
        );
    }
}
