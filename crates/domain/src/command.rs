//! Command — what actuators understand.
//!
//! Commands travel as plain text values (`ON`, `OFF`, `TOGGLE`, `h,s,v`) so
//! that any connection can carry them. A datetime literal, as published by
//! press and toggle events, is read as a toggle.

use serde::{Deserialize, Serialize};

use crate::time::is_datetime_literal;
use crate::value::Value;

/// Literal published for the ON-equivalent state.
pub const ON: &str = "ON";
/// Literal published for the OFF-equivalent state.
pub const OFF: &str = "OFF";
/// Literal meaning "flip the current state".
pub const TOGGLE: &str = "TOGGLE";

/// Hue / saturation / brightness triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsv {
    /// Degrees, `0..360`.
    pub hue: f64,
    /// Percent, `0..=100`.
    pub saturation: f64,
    /// Percent, `0..=100`.
    pub brightness: f64,
}

impl Hsv {
    /// Parse `h,s,v`. Components are clamped into their ranges.
    #[must_use]
    pub fn parse(text: &str) -> Option<Self> {
        let mut parts = text.split(',').map(|p| p.trim().parse::<f64>());
        let (Some(Ok(h)), Some(Ok(s)), Some(Ok(v)), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return None;
        };
        Some(Self {
            hue: h.rem_euclid(360.0),
            saturation: s.clamp(0.0, 100.0),
            brightness: v.clamp(0.0, 100.0),
        })
    }
}

impl std::fmt::Display for Hsv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{},{},{}", self.hue, self.saturation, self.brightness)
    }
}

/// A decoded actuator command.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    On,
    Off,
    Toggle,
    Hsv(Hsv),
    /// Anything else, forwarded untouched.
    Value(Value),
}

impl Command {
    /// Decode a message value.
    #[must_use]
    pub fn parse(value: &Value) -> Self {
        match value {
            Value::Bool(true) => Self::On,
            Value::Bool(false) => Self::Off,
            Value::Text(text) => match text.trim() {
                ON => Self::On,
                OFF => Self::Off,
                t if is_toggle_literal(t) => Self::Toggle,
                t => Hsv::parse(t).map_or_else(|| Self::Value(value.clone()), Self::Hsv),
            },
            Value::Number(_) => Self::Value(value.clone()),
        }
    }

    /// Encode as the value published on the wire.
    #[must_use]
    pub fn to_value(&self) -> Value {
        match self {
            Self::On => Value::from(ON),
            Self::Off => Value::from(OFF),
            Self::Toggle => Value::from(TOGGLE),
            Self::Hsv(hsv) => Value::Text(hsv.to_string()),
            Self::Value(value) => value.clone(),
        }
    }

    /// `On` for `true`, `Off` for `false`.
    #[must_use]
    pub fn from_bool(on: bool) -> Self {
        if on { Self::On } else { Self::Off }
    }

    #[must_use]
    pub fn is_toggle(&self) -> bool {
        matches!(self, Self::Toggle)
    }
}

/// Whether a text payload is a toggle: the literal `TOGGLE` or a datetime
/// literal.
#[must_use]
pub fn is_toggle_literal(text: &str) -> bool {
    text == TOGGLE || is_datetime_literal(text)
}

impl std::fmt::Display for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.to_value().fmt(f)
    }
}
