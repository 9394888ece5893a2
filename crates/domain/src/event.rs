//! Pin samples and the events classified from them.

use serde::{Deserialize, Serialize};

use crate::time::Instant;

/// One raw observation of a pin's electrical level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinSample {
    /// `true` for HIGH.
    pub level: bool,
    /// Monotonic time of the observation.
    pub at: Instant,
}

impl PinSample {
    #[must_use]
    pub fn new(level: bool, at: Instant) -> Self {
        Self { level, at }
    }
}

/// A classified pin event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// The debounced level changed (polling sensors only).
    SteadyState(bool),
    /// A press/release cycle shorter than the long-press threshold.
    ShortPress(Instant),
    /// A press/release cycle at least as long as the long-press threshold.
    LongPress(Instant),
    /// A confirmed edge on a pin without duration semantics.
    Toggle(Instant),
}

impl Event {
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::SteadyState(_) => EventKind::State,
            Self::ShortPress(_) => EventKind::ShortPress,
            Self::LongPress(_) => EventKind::LongPress,
            Self::Toggle(_) => EventKind::Toggle,
        }
    }
}

/// Event discriminant, used to pick the output destination of a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    State,
    ShortPress,
    LongPress,
    Toggle,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::State => f.write_str("state"),
            Self::ShortPress => f.write_str("short_press"),
            Self::LongPress => f.write_str("long_press"),
            Self::Toggle => f.write_str("toggle"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_map_events_to_kinds() {
        let at = Instant::now();
        assert_eq!(Event::SteadyState(true).kind(), EventKind::State);
        assert_eq!(Event::ShortPress(at).kind(), EventKind::ShortPress);
        assert_eq!(Event::LongPress(at).kind(), EventKind::LongPress);
        assert_eq!(Event::Toggle(at).kind(), EventKind::Toggle);
    }

    #[test]
    fn should_deserialize_kind_from_snake_case() {
        let kind: EventKind = serde_json::from_str("\"long_press\"").unwrap();
        assert_eq!(kind, EventKind::LongPress);
        assert_eq!(kind.to_string(), "long_press");
    }
}
