//! Threshold rules — the single predicate a value transformer applies.
//!
//! A transformer is configured with up to three candidate rules (`on_eq`,
//! `on_gt`, `on_lt`). Exactly one becomes active, chosen by the fixed
//! precedence `Eq > Gt > Lt`. A candidate set to `false` counts as not
//! supplied.

use crate::error::{ConfigError, ValueParseError};
use crate::value::Value;

/// The active predicate of a value transformer.
#[derive(Debug, Clone, PartialEq)]
pub enum ThresholdRule {
    /// ON when the value equals the literal (numeric or textual comparison,
    /// depending on the literal's type).
    Eq(Value),
    /// ON when the numeric value is strictly greater.
    Gt(f64),
    /// ON when the numeric value is strictly less.
    Lt(f64),
    /// Pass the value through unchanged.
    None,
}

impl ThresholdRule {
    /// Pick the active rule from the configured candidates.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoRuleSelected`] when candidates were given but
    /// every one of them is `false`, and [`ConfigError::Invalid`] when the
    /// selected `Gt`/`Lt` literal is not numeric.
    pub fn select(
        on_eq: Option<Value>,
        on_gt: Option<Value>,
        on_lt: Option<Value>,
    ) -> Result<Self, ConfigError> {
        let any_given = on_eq.is_some() || on_gt.is_some() || on_lt.is_some();

        if let Some(literal) = on_eq.filter(is_supplied) {
            return Ok(Self::Eq(literal));
        }
        if let Some(literal) = on_gt.filter(is_supplied) {
            return numeric("on_gt", &literal).map(Self::Gt);
        }
        if let Some(literal) = on_lt.filter(is_supplied) {
            return numeric("on_lt", &literal).map(Self::Lt);
        }

        if any_given {
            Err(ConfigError::NoRuleSelected)
        } else {
            Ok(Self::None)
        }
    }

    /// Evaluate the rule against a value.
    ///
    /// Returns `Ok(Some(on))` for a predicate outcome and `Ok(None)` for the
    /// pass-through rule.
    ///
    /// # Errors
    ///
    /// Returns [`ValueParseError`] when `Gt`/`Lt` receive a non-numeric value.
    #[allow(clippy::float_cmp)]
    pub fn evaluate(&self, value: &Value) -> Result<Option<bool>, ValueParseError> {
        match self {
            Self::Eq(Value::Number(expected)) => {
                Ok(Some(value.as_number().is_ok_and(|n| n == *expected)))
            }
            Self::Eq(expected) => Ok(Some(value.to_string() == expected.to_string())),
            Self::Gt(limit) => value.as_number().map(|n| Some(n > *limit)),
            Self::Lt(limit) => value.as_number().map(|n| Some(n < *limit)),
            Self::None => Ok(None),
        }
    }
}

fn is_supplied(literal: &Value) -> bool {
    !matches!(literal, Value::Bool(false))
}

fn numeric(field: &'static str, literal: &Value) -> Result<f64, ConfigError> {
    literal.as_number().map_err(|err| ConfigError::Invalid {
        field,
        reason: err.to_string(),
    })
}

impl std::fmt::Display for ThresholdRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Eq(v) => write!(f, "eq({v})"),
            Self::Gt(n) => write!(f, "gt({n})"),
            Self::Lt(n) => write!(f, "lt({n})"),
            Self::None => f.write_str("passthrough"),
        }
    }
}
