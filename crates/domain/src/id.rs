//! Typed name newtypes.
//!
//! Connections and devices are identified by the names given to them in the
//! configuration file, so these wrap a string rather than a UUID.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

macro_rules! define_name {
    ($(#[doc = $doc:expr])* $name:ident) => {
        $(#[doc = $doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Wrap a configured name.
            #[must_use]
            pub fn new(name: impl AsRef<str>) -> Self {
                Self(name.as_ref().to_string())
            }

            /// Access the inner name.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::convert::Infallible;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Ok(Self::new(s))
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self::new(s)
            }
        }
    };
}

define_name!(
    /// Name of a connection as configured; scopes a [`Destination`](crate::destination::Destination).
    ConnectionId
);

define_name!(
    /// Name of a sensor, actuator or logic device as configured.
    DeviceName
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_compare_equal_when_names_match() {
        assert_eq!(ConnectionId::new("local"), ConnectionId::from("local"));
        assert_ne!(ConnectionId::new("local"), ConnectionId::new("mqtt"));
    }

    #[test]
    fn should_display_inner_name() {
        let id = DeviceName::new("front_door");
        assert_eq!(id.to_string(), "front_door");
        assert_eq!(id.as_str(), "front_door");
    }

    #[test]
    fn should_serialize_as_plain_string() {
        let id = ConnectionId::new("local");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"local\"");
        let parsed: ConnectionId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }
}
