//! Typed payload values carried by messages.

use serde::{Deserialize, Serialize};

use crate::error::ValueParseError;

/// A single message payload value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Value {
    /// Interpret the value as a number.
    ///
    /// Text is trimmed and parsed; booleans are never numeric.
    ///
    /// # Errors
    ///
    /// Returns [`ValueParseError`] when the value has no numeric reading.
    pub fn as_number(&self) -> Result<f64, ValueParseError> {
        match self {
            Self::Number(n) => Ok(*n),
            Self::Text(text) => text.trim().parse::<f64>().map_err(|_| ValueParseError {
                value: text.clone(),
            }),
            Self::Bool(b) => Err(ValueParseError {
                value: b.to_string(),
            }),
        }
    }

    /// Borrow the text form, if this is a text value.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            #[allow(clippy::cast_possible_truncation)]
            Self::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}
