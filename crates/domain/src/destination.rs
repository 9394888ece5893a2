//! Destination — a named publish/subscribe endpoint scoped to one connection.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::id::ConnectionId;

/// Key into a connection's destination registry.
///
/// Within one connection at most one subscriber is active per name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Destination {
    pub connection: ConnectionId,
    pub name: String,
}

impl Destination {
    #[must_use]
    pub fn new(connection: impl Into<ConnectionId>, name: impl Into<String>) -> Self {
        Self {
            connection: connection.into(),
            name: name.into(),
        }
    }
}

impl std::fmt::Display for Destination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.connection, self.name)
    }
}

/// Parses `connection/name`. The name may itself contain `/`.
impl std::str::FromStr for Destination {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((connection, name)) if !connection.is_empty() && !name.is_empty() => {
                Ok(Self::new(connection, name))
            }
            _ => Err(ConfigError::Invalid {
                field: "destination",
                reason: format!("`{s}` is not of the form connection/name"),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_display_connection_and_name() {
        let dest = Destination::new("local", "porch_light");
        assert_eq!(dest.to_string(), "local/porch_light");
    }

    #[test]
    fn should_distinguish_same_name_on_different_connections() {
        let a = Destination::new("local", "lamp");
        let b = Destination::new("mqtt", "lamp");
        assert_ne!(a, b);
    }

    #[test]
    fn should_parse_connection_and_name() {
        let dest: Destination = "mqtt/living/lamp".parse().unwrap();
        assert_eq!(dest, Destination::new("mqtt", "living/lamp"));
    }

    #[test]
    fn should_reject_destination_without_connection() {
        assert!("lamp".parse::<Destination>().is_err());
        assert!("/lamp".parse::<Destination>().is_err());
        assert!("local/".parse::<Destination>().is_err());
    }
}
