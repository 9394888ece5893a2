//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into [`EdgeError`]
//! via `#[from]` when crossing a port boundary.

/// Base error type for edgewire.
#[derive(Debug, thiserror::Error)]
pub enum EdgeError {
    /// A component was configured with missing or conflicting parameters.
    #[error("configuration error")]
    Config(#[from] ConfigError),

    /// A message value could not be interpreted as required by a rule.
    #[error("value parse error")]
    ValueParse(#[from] ValueParseError),

    /// The GPIO backend failed to access a pin.
    #[error("hardware error")]
    Hardware(#[from] HardwareError),

    /// A connection (local or remote) failed.
    #[error("connection error")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Invalid component configuration. Fatal for the component being built,
/// never for the whole agent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A required parameter is absent.
    #[error("missing required parameter `{0}`")]
    Missing(&'static str),

    /// A parameter is present but its value is unusable.
    #[error("invalid value for `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },

    /// A threshold rule value was supplied without any rule flag set.
    #[error("rule values supplied but no rule is enabled")]
    NoRuleSelected,

    /// The referenced connection was not configured.
    #[error("unknown connection `{0}`")]
    UnknownConnection(String),
}

/// A message value that a numeric rule could not interpret.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("`{value}` is not a number")]
pub struct ValueParseError {
    pub value: String,
}

/// Pin access failure reported by a GPIO backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HardwareError {
    /// The pin does not exist or is not exported.
    #[error("pin {0} is not available")]
    PinUnavailable(u8),

    /// The pin is configured in the wrong direction for the request.
    #[error("pin {pin} is not configured as {expected}")]
    WrongDirection { pin: u8, expected: &'static str },

    /// Edge-detection registration was refused by the backend.
    #[error("edge detection on pin {0} could not be registered")]
    EdgeRegistration(u8),

    /// Duty cycle outside `0..=100`.
    #[error("duty cycle {0} is out of range")]
    DutyOutOfRange(u8),
}
