//! MQTT connection configuration.

use std::time::Duration;

use rumqttc::{LastWill, MqttOptions, QoS};
use serde::Deserialize;

/// Payload retained on the status topic while the agent is connected.
pub const ONLINE: &str = "ONLINE";
/// Payload the broker publishes on the status topic when the agent vanishes.
pub const OFFLINE: &str = "OFFLINE";

/// Configuration for one MQTT connection.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MqttConfig {
    /// MQTT broker hostname or IP address.
    pub broker_host: String,
    /// MQTT broker port.
    pub broker_port: u16,
    /// MQTT client identifier.
    pub client_id: String,
    /// Prefix of every topic; destination `lamp` maps to `<base_topic>/lamp`.
    pub base_topic: String,
    /// Keep-alive interval in seconds.
    pub keep_alive_secs: u16,
    /// Pause between reconnection attempts, in seconds.
    pub reconnect_delay_secs: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            client_id: "edgewire".to_string(),
            base_topic: "edgewire".to_string(),
            keep_alive_secs: 30,
            reconnect_delay_secs: 5,
            username: None,
            password: None,
        }
    }
}

impl MqttConfig {
    /// Topic carrying `ONLINE` / `OFFLINE`.
    #[must_use]
    pub fn status_topic(&self) -> String {
        self.topic(STATUS)
    }

    /// Full topic for a destination name.
    #[must_use]
    pub fn topic(&self, name: &str) -> String {
        format!("{}/{name}", self.base_topic.trim_end_matches('/'))
    }

    /// Destination name for an incoming topic, if it lives under the base.
    #[must_use]
    pub fn destination_name<'a>(&self, topic: &'a str) -> Option<&'a str> {
        topic
            .strip_prefix(self.base_topic.trim_end_matches('/'))
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|name| !name.is_empty())
    }

    #[must_use]
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_secs(u64::from(self.reconnect_delay_secs))
    }

    /// Client options, with the `OFFLINE` last will on the status topic.
    #[must_use]
    pub fn options(&self) -> MqttOptions {
        let mut options =
            MqttOptions::new(&self.client_id, &self.broker_host, self.broker_port);
        options.set_keep_alive(Duration::from_secs(u64::from(self.keep_alive_secs)));
        options.set_last_will(LastWill::new(
            self.status_topic(),
            OFFLINE,
            QoS::AtLeastOnce,
            true,
        ));
        if let Some(username) = &self.username {
            options.set_credentials(username, self.password.as_deref().unwrap_or_default());
        }
        options
    }
}

const STATUS: &str = "status";
