//! MQTT adapter error types.

use edgewire_domain::error::EdgeError;

/// Errors specific to the MQTT adapter.
#[derive(Debug, thiserror::Error)]
pub enum MqttError {
    /// The connection was started outside a tokio runtime.
    #[error("MQTT connection requires a tokio runtime")]
    NoRuntime(#[source] tokio::runtime::TryCurrentError),

    /// The rumqttc client refused a request.
    #[error("MQTT client error")]
    Client(#[source] rumqttc::ClientError),

    /// An incoming payload is not valid UTF-8.
    #[error("MQTT payload on `{topic}` is not text")]
    PayloadParse {
        topic: String,
        #[source]
        source: std::str::Utf8Error,
    },

    /// A domain-level error.
    #[error("domain error")]
    Domain(#[source] EdgeError),
}

impl MqttError {
    /// Convert into an [`EdgeError::Connection`] for propagation across port
    /// boundaries.
    pub fn into_domain(self) -> EdgeError {
        match self {
            Self::Domain(err) => err,
            other => EdgeError::Connection(Box::new(other)),
        }
    }
}

impl From<MqttError> for EdgeError {
    fn from(err: MqttError) -> Self {
        err.into_domain()
    }
}

impl From<rumqttc::ClientError> for MqttError {
    fn from(err: rumqttc::ClientError) -> Self {
        Self::Client(err)
    }
}

#[cfg(test)]
mod tests {
    use edgewire_domain::error::ConfigError;

    use super::*;

    fn payload_error() -> MqttError {
        let bytes = vec![0xff, 0xfe];
        MqttError::PayloadParse {
            topic: "edgewire/door".to_string(),
            source: std::str::from_utf8(&bytes).unwrap_err(),
        }
    }

    #[test]
    fn should_display_payload_parse_error() {
        assert_eq!(
            payload_error().to_string(),
            "MQTT payload on `edgewire/door` is not text"
        );
    }

    #[test]
    fn should_convert_payload_error_to_connection_error() {
        let err: EdgeError = payload_error().into();
        assert!(matches!(err, EdgeError::Connection(_)));
    }

    #[test]
    fn should_convert_domain_error_back_to_domain() {
        let mqtt_err = MqttError::Domain(ConfigError::Missing("broker_host").into());
        let back: EdgeError = mqtt_err.into();
        assert!(matches!(back, EdgeError::Config(ConfigError::Missing("broker_host"))));
    }
}
