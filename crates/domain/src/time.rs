//! Time and timestamp helpers.
//!
//! Two clocks are in play: wall-clock [`Timestamp`]s stamp messages, while
//! debounce windows are measured on the monotonic [`Instant`] clock so that
//! clock adjustments never change a classification.

use chrono::{DateTime, Utc};

pub use std::time::Instant;

/// UTC timestamp carried by messages and datetime toggle literals.
pub type Timestamp = DateTime<Utc>;

/// Return the current UTC time.
#[must_use]
pub fn now() -> Timestamp {
    Utc::now()
}

/// Render a timestamp as the 26-character datetime literal published by
/// press and toggle events, e.g. `2021-10-24T16:23:41.500792`.
#[must_use]
pub fn to_literal(ts: Timestamp) -> String {
    ts.naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Whether `text` looks like a datetime literal: the local 26-character form
/// or the 31-character form with a `+hhmm` zone suffix emitted by hubs.
#[must_use]
pub fn is_datetime_literal(text: &str) -> bool {
    (text.len() == 26 || text.len() == 31) && text.as_bytes().get(10) == Some(&b'T')
}
