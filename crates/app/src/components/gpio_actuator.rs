//! GPIO actuator — drives an output pin from ON/OFF/TOGGLE commands.
//!
//! In simulate-button mode every command produces a pulse instead: the pin
//! leaves its initial level for the pulse length and a deferred timer puts it
//! back, so the subscriber call never sleeps.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;

use edgewire_domain::command::Command;
use edgewire_domain::destination::Destination;
use edgewire_domain::error::{ConfigError, EdgeError};
use edgewire_domain::id::DeviceName;
use edgewire_domain::message::Message;
use edgewire_domain::time::Instant;

use crate::ports::GpioBackend;
use crate::router::Router;
use crate::sampler::monotonic_now;

use super::outbox::Outbox;

pub const DEFAULT_PULSE: Duration = Duration::from_millis(500);
pub const DEFAULT_TOGGLE_DEBOUNCE: Duration = Duration::from_millis(150);

#[derive(Debug, Clone)]
pub struct GpioActuatorConfig {
    pub name: DeviceName,
    pub pin: u8,
    pub command: Destination,
    /// Logical state at startup.
    pub initial: bool,
    /// Drive the pin LOW for ON.
    pub invert: bool,
    pub simulate_button: bool,
    pub pulse: Duration,
    /// Toggles closer together than this are ignored.
    pub toggle_debounce: Duration,
    /// Receives `ON`/`OFF` after every change.
    pub echo: Option<Destination>,
}

impl GpioActuatorConfig {
    #[must_use]
    pub fn new(name: impl Into<DeviceName>, pin: u8, command: Destination) -> Self {
        Self {
            name: name.into(),
            pin,
            command,
            initial: false,
            invert: false,
            simulate_button: false,
            pulse: DEFAULT_PULSE,
            toggle_debounce: DEFAULT_TOGGLE_DEBOUNCE,
            echo: None,
        }
    }
}

#[derive(Debug)]
struct ActuatorState {
    on: bool,
    last_toggle: Option<Instant>,
    pulsing: bool,
    echoes: Outbox<bool>,
}

pub struct GpioActuator<B: ?Sized> {
    config: GpioActuatorConfig,
    backend: Arc<B>,
    router: Arc<Router>,
    runtime: Handle,
    state: Mutex<ActuatorState>,
}

impl<B> GpioActuator<B>
where
    B: GpioBackend + ?Sized + 'static,
{
    /// Claim the pin at its initial level and subscribe to the command
    /// destination. Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// Fails when a destination names an unknown connection, no runtime is
    /// available, or the pin cannot be configured as an output.
    pub fn attach(
        config: GpioActuatorConfig,
        backend: Arc<B>,
        router: Arc<Router>,
    ) -> Result<Arc<Self>, EdgeError> {
        router.validate(config.echo.iter())?;
        let runtime = Handle::try_current().map_err(|err| ConfigError::Invalid {
            field: "runtime",
            reason: err.to_string(),
        })?;
        backend.setup_output(config.pin, config.initial ^ config.invert)?;

        let actuator = Arc::new(Self {
            state: Mutex::new(ActuatorState {
                on: config.initial,
                last_toggle: None,
                pulsing: false,
                echoes: Outbox::default(),
            }),
            config,
            backend,
            router,
            runtime,
        });

        let handler = Arc::downgrade(&actuator);
        actuator.router.register(
            &actuator.config.command,
            Arc::new(move |msg: &Message| {
                if let Some(actuator) = handler.upgrade() {
                    actuator.on_command(&Command::parse(&msg.value));
                }
            }),
        )?;
        tracing::debug!(actuator = %actuator.config.name, pin = actuator.config.pin, "actuator attached");
        Ok(actuator)
    }

    /// Current logical state.
    #[must_use]
    pub fn is_on(&self) -> bool {
        self.lock().on
    }

    /// Apply a command.
    pub fn on_command(self: &Arc<Self>, command: &Command) {
        if self.config.simulate_button {
            self.start_pulse();
            return;
        }

        let drain = {
            let mut state = self.lock();
            let target = match command {
                Command::On | Command::Off => {
                    let target = matches!(command, Command::On);
                    if target == state.on {
                        tracing::debug!(actuator = %self.config.name, %command, "already in requested state");
                        return;
                    }
                    target
                }
                Command::Toggle => {
                    let now = monotonic_now();
                    let too_soon = state.last_toggle.is_some_and(|last| {
                        now.saturating_duration_since(last) < self.config.toggle_debounce
                    });
                    if too_soon {
                        tracing::debug!(actuator = %self.config.name, "toggle ignored, too soon after the last one");
                        return;
                    }
                    state.last_toggle = Some(now);
                    !state.on
                }
                Command::Hsv(_) | Command::Value(_) => {
                    tracing::warn!(actuator = %self.config.name, %command, "unsupported command");
                    return;
                }
            };

            if !self.drive(target) {
                return;
            }
            state.on = target;
            tracing::info!(actuator = %self.config.name, on = target, "output switched");
            state.echoes.push(target)
        };

        if drain {
            self.drain_echoes();
        }
    }

    fn start_pulse(self: &Arc<Self>) {
        let active = !self.config.initial;
        let drain = {
            let mut state = self.lock();
            if state.pulsing {
                tracing::debug!(actuator = %self.config.name, "pulse already in progress");
                return;
            }
            if !self.drive(active) {
                return;
            }
            state.pulsing = true;
            state.on = active;
            state.echoes.push(active)
        };
        if drain {
            self.drain_echoes();
        }

        let this = Arc::clone(self);
        self.runtime.spawn(async move {
            tokio::time::sleep(this.config.pulse).await;
            this.end_pulse();
        });
    }

    fn end_pulse(&self) {
        let idle = self.config.initial;
        let drain = {
            let mut state = self.lock();
            state.pulsing = false;
            if !self.drive(idle) {
                return;
            }
            state.on = idle;
            state.echoes.push(idle)
        };
        if drain {
            self.drain_echoes();
        }
    }

    fn drive(&self, on: bool) -> bool {
        match self.backend.write_pin(self.config.pin, on ^ self.config.invert) {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(actuator = %self.config.name, %err, "failed to drive output");
                false
            }
        }
    }

    fn drain_echoes(&self) {
        loop {
            let next = self.lock().echoes.next();
            let Some(on) = next else {
                return;
            };
            if let Some(destination) = &self.config.echo {
                let value = Command::from_bool(on).to_value();
                self.router
                    .publish(destination, Message::new(value, destination.connection.clone()));
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ActuatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use edgewire_domain::value::Value;

    use crate::testing::{FakeGpio, collect, local, local_router};

    use super::*;

    fn send(router: &Router, value: &str) {
        router.publish(&local("porch_light"), Message::new(value, "local"));
    }

    fn config() -> GpioActuatorConfig {
        GpioActuatorConfig {
            echo: Some(local("porch_light_state")),
            ..GpioActuatorConfig::new("porch", 5, local("porch_light"))
        }
    }

    #[tokio::test]
    async fn should_switch_output_on_and_off() {
        let gpio = Arc::new(FakeGpio::default());
        let router = local_router();
        let echo = collect(&router, &local("porch_light_state"));
        let actuator = GpioActuator::attach(config(), Arc::clone(&gpio), Arc::clone(&router)).unwrap();

        send(&router, "ON");
        assert!(actuator.is_on());
        send(&router, "OFF");

        assert_eq!(gpio.writes(), vec![(5, true), (5, false)]);
        assert_eq!(
            *echo.lock().unwrap(),
            vec![Value::from("ON"), Value::from("OFF")]
        );
    }

    #[tokio::test]
    async fn should_ignore_command_matching_current_state() {
        let gpio = Arc::new(FakeGpio::default());
        let router = local_router();
        let echo = collect(&router, &local("porch_light_state"));
        let _actuator = GpioActuator::attach(config(), Arc::clone(&gpio), Arc::clone(&router)).unwrap();

        send(&router, "OFF");

        assert!(gpio.writes().is_empty());
        assert!(echo.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn should_invert_output_level() {
        let gpio = Arc::new(FakeGpio::default());
        let router = local_router();
        let config = GpioActuatorConfig {
            invert: true,
            ..config()
        };
        let _actuator = GpioActuator::attach(config, Arc::clone(&gpio), Arc::clone(&router)).unwrap();
        assert_eq!(gpio.level(5), Some(true));

        send(&router, "ON");

        assert_eq!(gpio.writes(), vec![(5, false)]);
    }

    #[tokio::test(start_paused = true)]
    async fn should_debounce_rapid_toggles() {
        let gpio = Arc::new(FakeGpio::default());
        let router = local_router();
        let actuator = GpioActuator::attach(config(), Arc::clone(&gpio), Arc::clone(&router)).unwrap();

        send(&router, "TOGGLE");
        tokio::time::sleep(Duration::from_millis(50)).await;
        send(&router, "2021-10-24T16:23:41.500792");
        assert!(actuator.is_on());

        tokio::time::sleep(Duration::from_millis(200)).await;
        send(&router, "TOGGLE");
        assert!(!actuator.is_on());
        assert_eq!(gpio.writes(), vec![(5, true), (5, false)]);
    }

    #[tokio::test(start_paused = true)]
    async fn should_pulse_when_simulating_button() {
        let gpio = Arc::new(FakeGpio::default());
        let router = local_router();
        let echo = collect(&router, &local("porch_light_state"));
        let config = GpioActuatorConfig {
            simulate_button: true,
            ..config()
        };
        let actuator = GpioActuator::attach(config, Arc::clone(&gpio), Arc::clone(&router)).unwrap();

        send(&router, "ON");
        send(&router, "ON");
        assert!(actuator.is_on());
        assert_eq!(gpio.writes(), vec![(5, true)]);

        tokio::time::sleep(Duration::from_millis(600)).await;

        assert!(!actuator.is_on());
        assert_eq!(gpio.writes(), vec![(5, true), (5, false)]);
        assert_eq!(
            *echo.lock().unwrap(),
            vec![Value::from("ON"), Value::from("OFF")]
        );
    }

    #[tokio::test]
    async fn should_ignore_unsupported_commands() {
        let gpio = Arc::new(FakeGpio::default());
        let router = local_router();
        let actuator = GpioActuator::attach(config(), Arc::clone(&gpio), Arc::clone(&router)).unwrap();

        send(&router, "42");
        send(&router, "10,20,30");

        assert!(!actuator.is_on());
        assert!(gpio.writes().is_empty());
    }

    #[tokio::test]
    async fn should_echo_in_order_when_an_echo_triggers_a_command() {
        let gpio = Arc::new(FakeGpio::default());
        let router = local_router();
        let actuator = GpioActuator::attach(config(), Arc::clone(&gpio), Arc::clone(&router)).unwrap();

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let other = Arc::clone(&router);
        router
            .register(
                &local("porch_light_state"),
                Arc::new(move |msg: &Message| {
                    sink.lock().unwrap().push(msg.value.clone());
                    if msg.value == Value::from("ON") {
                        let router = Arc::clone(&other);
                        std::thread::spawn(move || send(&router, "OFF"))
                            .join()
                            .unwrap();
                    }
                }),
            )
            .unwrap();

        send(&router, "ON");

        assert!(!actuator.is_on());
        assert_eq!(gpio.writes(), vec![(5, true), (5, false)]);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Value::from("ON"), Value::from("OFF")]
        );
    }

    #[test]
    fn should_require_a_runtime() {
        let result = GpioActuator::attach(config(), Arc::new(FakeGpio::default()), local_router());
        assert!(matches!(result, Err(EdgeError::Config(_))));
    }
}
