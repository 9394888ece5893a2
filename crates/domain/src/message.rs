//! Message — an immutable value object flowing through the router.

use serde::{Deserialize, Serialize};

use crate::id::ConnectionId;
use crate::time::{Timestamp, now};
use crate::value::Value;

/// A value published to a destination.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub value: Value,
    pub timestamp: Timestamp,
    /// Connection the message entered the router through.
    pub source: ConnectionId,
}

impl Message {
    /// Create a message stamped with the current time.
    #[must_use]
    pub fn new(value: impl Into<Value>, source: impl Into<ConnectionId>) -> Self {
        Self {
            value: value.into(),
            timestamp: now(),
            source: source.into(),
        }
    }

    /// Replace the value, keeping timestamp and source.
    #[must_use]
    pub fn with_value(&self, value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            timestamp: self.timestamp,
            source: self.source.clone(),
        }
    }
}
