//! Builds the router and the agent from a loaded [`Config`].
//!
//! A connection or device that fails to build is logged and skipped; the
//! rest of the agent still starts.

use std::error::Error;
use std::sync::Arc;

use edgewire_adapter_mqtt::{MqttConnection, MqttError};
use edgewire_app::agent::Agent;
use edgewire_app::components::{
    GpioActuator, GpioSensor, Heartbeat, LogicOr, PwmActuator, ValueTransformer,
};
use edgewire_app::ports::{Connection, GpioBackend};
use edgewire_app::router::{LocalConnection, Router};
use edgewire_domain::error::{ConfigError, EdgeError};

use crate::config::{Config, ConnectionConfig, ConnectionKind, DeviceConfig};

/// Why a single device was skipped.
#[derive(Debug, thiserror::Error)]
pub enum WiringError {
    #[error("malformed device entry")]
    Parse(#[from] toml::de::Error),
    #[error("invalid device configuration")]
    Config(#[from] ConfigError),
    #[error("device could not be built")]
    Device(#[from] EdgeError),
    #[error("connection could not be started")]
    Connection(#[from] MqttError),
}

/// A built agent and the entries that were left out.
pub struct Wired {
    pub agent: Agent,
    /// Names (or positions, for unnamed entries) of skipped devices.
    pub skipped: Vec<String>,
}

/// Start every configured connection.
#[must_use]
pub fn build_router(connections: &[ConnectionConfig]) -> Router {
    let mut router = Router::new();
    for entry in connections {
        match start_connection(entry) {
            Ok(connection) => router.add_connection(connection),
            Err(err) => {
                tracing::error!(connection = %entry.id, error = %report(&err), "connection skipped");
            }
        }
    }
    router
}

fn start_connection(entry: &ConnectionConfig) -> Result<Arc<dyn Connection>, WiringError> {
    Ok(match &entry.kind {
        ConnectionKind::Local => Arc::new(LocalConnection::new(entry.id.as_str())),
        ConnectionKind::Mqtt(mqtt) => {
            Arc::new(MqttConnection::start(entry.id.as_str(), mqtt.clone())?)
        }
    })
}

/// Build the router, then every device on top of it.
///
/// Must be called from within a tokio runtime: sensors are spawned
/// immediately.
pub fn build(config: &Config, gpio: &Arc<dyn GpioBackend>) -> Wired {
    let router = Arc::new(build_router(&config.connections));
    let mut agent = Agent::new(router);
    let mut skipped = Vec::new();

    for (index, table) in config.devices.iter().enumerate() {
        let (label, result) = match DeviceConfig::parse(table.clone()) {
            Ok(device) => (
                device.name().to_string(),
                add_device(&mut agent, &device, gpio),
            ),
            Err(err) => (
                table
                    .get("name")
                    .and_then(toml::Value::as_str)
                    .map_or_else(|| format!("devices[{index}]"), ToString::to_string),
                Err(WiringError::from(err)),
            ),
        };

        match result {
            Ok(()) => tracing::debug!(device = %label, "device ready"),
            Err(err) => {
                tracing::error!(device = %label, error = %report(&err), "device skipped");
                skipped.push(label);
            }
        }
    }

    tracing::info!(
        workers = agent.worker_count(),
        passive = agent.attached_count(),
        skipped = skipped.len(),
        "agent built"
    );
    Wired { agent, skipped }
}

fn add_device(
    agent: &mut Agent,
    device: &DeviceConfig,
    gpio: &Arc<dyn GpioBackend>,
) -> Result<(), WiringError> {
    let router = Arc::clone(agent.router());
    match device {
        DeviceConfig::GpioSensor(section) => {
            let sensor = GpioSensor::new(section.to_config()?, Arc::clone(gpio), router)?;
            agent.spawn(sensor.name().clone(), move |shutdown| sensor.run(shutdown));
        }
        DeviceConfig::Heartbeat(section) => {
            let heartbeat = Heartbeat::new(section.to_config()?, router)?;
            agent.spawn(heartbeat.name().clone(), move |shutdown| {
                heartbeat.run(shutdown)
            });
        }
        DeviceConfig::GpioActuator(section) => {
            let actuator = GpioActuator::attach(section.to_config()?, Arc::clone(gpio), router)?;
            agent.attach(actuator);
        }
        DeviceConfig::PwmActuator(section) => {
            let actuator = PwmActuator::attach(section.to_config()?, Arc::clone(gpio), router)?;
            agent.attach(actuator);
        }
        DeviceConfig::Threshold(section) => {
            agent.attach(ValueTransformer::attach(section.to_config()?, router)?);
        }
        DeviceConfig::LogicOr(section) => {
            agent.attach(LogicOr::attach(section.to_config()?, router)?);
        }
    }
    Ok(())
}

/// Render an error with its whole source chain.
fn report(err: &dyn Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}
