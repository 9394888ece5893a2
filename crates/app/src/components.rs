//! Components — the sensors, logic blocks and actuators an agent runs.
//!
//! Each component receives the shared [`Router`](crate::router::Router) and,
//! where it touches pins, a [`GpioBackend`](crate::ports::GpioBackend) by
//! constructor injection. Sensors are long-running workers driven by
//! [`Agent`](crate::agent::Agent); logic blocks and actuators are passive and
//! react to messages on the destinations they subscribe to.

pub mod gpio_actuator;
pub mod gpio_sensor;
pub mod heartbeat;
pub mod logic_or;
mod outbox;
pub mod pwm_actuator;
pub mod value_transformer;

pub use gpio_actuator::{GpioActuator, GpioActuatorConfig};
pub use gpio_sensor::{Backoff, GpioSensor, GpioSensorConfig, SensorHealth, StateValues};
pub use heartbeat::{Heartbeat, HeartbeatConfig};
pub use logic_or::{LogicOr, LogicOrConfig};
pub use pwm_actuator::{PwmActuator, PwmActuatorConfig};
pub use value_transformer::{ValueTransformer, ValueTransformerConfig};
