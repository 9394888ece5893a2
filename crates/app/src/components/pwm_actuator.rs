//! PWM actuator — dims an output from ON/OFF/TOGGLE, duty and HSV commands.

use std::sync::{Arc, Mutex, PoisonError};

use edgewire_domain::command::Command;
use edgewire_domain::destination::Destination;
use edgewire_domain::error::EdgeError;
use edgewire_domain::id::DeviceName;
use edgewire_domain::message::Message;
use edgewire_domain::value::Value;

use crate::ports::GpioBackend;
use crate::router::Router;

use super::outbox::Outbox;

/// Duty applied for `ON`.
pub const FULL_DUTY: u8 = 100;

#[derive(Debug, Clone)]
pub struct PwmActuatorConfig {
    pub name: DeviceName,
    pub pin: u8,
    pub command: Destination,
    /// Duty cycle at startup, in percent.
    pub initial_duty: u8,
    /// Receives the applied duty after every change.
    pub echo: Option<Destination>,
}

pub struct PwmActuator<B: ?Sized> {
    config: PwmActuatorConfig,
    backend: Arc<B>,
    router: Arc<Router>,
    state: Mutex<DutyState>,
}

#[derive(Debug)]
struct DutyState {
    duty: u8,
    echoes: Outbox<u8>,
}

impl<B> PwmActuator<B>
where
    B: GpioBackend + ?Sized + 'static,
{
    /// Claim the pin at its initial duty and subscribe to the command
    /// destination.
    ///
    /// # Errors
    ///
    /// Fails when a destination names an unknown connection or the backend
    /// rejects the pin or initial duty.
    pub fn attach(
        config: PwmActuatorConfig,
        backend: Arc<B>,
        router: Arc<Router>,
    ) -> Result<Arc<Self>, EdgeError> {
        router.validate(config.echo.iter())?;
        backend.setup_output(config.pin, false)?;
        backend.set_duty(config.pin, config.initial_duty)?;

        let actuator = Arc::new(Self {
            state: Mutex::new(DutyState {
                duty: config.initial_duty,
                echoes: Outbox::default(),
            }),
            config,
            backend,
            router,
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
        Ok(actuator)
    }

    #[must_use]
    pub fn duty(&self) -> u8 {
        self.lock().duty
    }

    /// Apply a command. Values that are not a duty in `0..=100` are ignored
    /// with a warning.
    pub fn on_command(&self, command: &Command) {
        let drain = {
            let mut state = self.lock();
            let target = match command {
                Command::On => FULL_DUTY,
                Command::Off => 0,
                Command::Toggle if state.duty > 0 => 0,
                Command::Toggle => FULL_DUTY,
                Command::Hsv(hsv) => percent(hsv.brightness),
                Command::Value(value) => match duty_from_value(value) {
                    Some(target) => target,
                    None => {
                        tracing::warn!(actuator = %self.config.name, %value, "not a duty cycle");
                        return;
                    }
                },
            };

            if let Err(err) = self.backend.set_duty(self.config.pin, target) {
                tracing::warn!(actuator = %self.config.name, %err, "failed to set duty");
                return;
            }
            state.duty = target;
            tracing::debug!(actuator = %self.config.name, duty = target, "duty applied");
            state.echoes.push(target)
        };

        if drain {
            self.drain_echoes();
        }
    }

    fn drain_echoes(&self) {
        loop {
            let next = self.lock().echoes.next();
            let Some(duty) = next else {
                return;
            };
            if let Some(destination) = &self.config.echo {
                self.router.publish(
                    destination,
                    Message::new(f64::from(duty), destination.connection.clone()),
                );
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, DutyState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn percent(value: f64) -> u8 {
    value.clamp(0.0, 100.0).round() as u8
}

fn duty_from_value(value: &Value) -> Option<u8> {
    value
        .as_number()
        .ok()
        .filter(|n| (0.0..=100.0).contains(n))
        .map(percent)
}

#[cfg(test)]
mod tests {
    use crate::testing::{FakeGpio, collect, local, local_router};

    use super::*;

    fn config() -> PwmActuatorConfig {
        PwmActuatorConfig {
            name: DeviceName::new("desk_lamp"),
            pin: 12,
            command: local("desk_lamp"),
            initial_duty: 0,
            echo: Some(local("desk_lamp_duty")),
        }
    }

    fn send(router: &Router, value: &str) {
        router.publish(&local("desk_lamp"), Message::new(value, "local"));
    }

    #[test]
    fn should_apply_on_off_and_numeric_duty() {
        let gpio = Arc::new(FakeGpio::default());
        let router = local_router();
        let echo = collect(&router, &local("desk_lamp_duty"));
        let lamp = PwmActuator::attach(config(), Arc::clone(&gpio), Arc::clone(&router)).unwrap();

        send(&router, "ON");
        send(&router, "40");
        send(&router, "OFF");

        assert_eq!(lamp.duty(), 0);
        assert_eq!(gpio.duties(), vec![(12, 0), (12, 100), (12, 40), (12, 0)]);
        assert_eq!(
            *echo.lock().unwrap(),
            vec![Value::Number(100.0), Value::Number(40.0), Value::Number(0.0)]
        );
    }

    #[test]
    fn should_toggle_between_off_and_full() {
        let gpio = Arc::new(FakeGpio::default());
        let router = local_router();
        let lamp = PwmActuator::attach(config(), Arc::clone(&gpio), Arc::clone(&router)).unwrap();

        send(&router, "TOGGLE");
        assert_eq!(lamp.duty(), 100);
        send(&router, "TOGGLE");
        assert_eq!(lamp.duty(), 0);
    }

    #[test]
    fn should_take_brightness_from_hsv() {
        let gpio = Arc::new(FakeGpio::default());
        let router = local_router();
        let lamp = PwmActuator::attach(config(), Arc::clone(&gpio), Arc::clone(&router)).unwrap();

        send(&router, "240,100,62.6");

        assert_eq!(lamp.duty(), 63);
    }

    #[test]
    fn should_echo_in_order_when_an_echo_triggers_a_command() {
        let gpio = Arc::new(FakeGpio::default());
        let router = local_router();
        let lamp = PwmActuator::attach(config(), Arc::clone(&gpio), Arc::clone(&router)).unwrap();

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let other = Arc::clone(&router);
        router
            .register(
                &local("desk_lamp_duty"),
                Arc::new(move |msg: &Message| {
                    sink.lock().unwrap().push(msg.value.clone());
                    if msg.value == Value::Number(100.0) {
                        let router = Arc::clone(&other);
                        std::thread::spawn(move || send(&router, "25")).join().unwrap();
                    }
                }),
            )
            .unwrap();

        send(&router, "ON");

        assert_eq!(lamp.duty(), 25);
        assert_eq!(
            *seen.lock().unwrap(),
            vec![Value::Number(100.0), Value::Number(25.0)]
        );
    }

    #[test]
    fn should_ignore_out_of_range_duty() {
        let gpio = Arc::new(FakeGpio::default());
        let router = local_router();
        let lamp = PwmActuator::attach(config(), Arc::clone(&gpio), Arc::clone(&router)).unwrap();

        send(&router, "150");
        send(&router, "bright");

        assert_eq!(lamp.duty(), 0);
        assert_eq!(gpio.duties(), vec![(12, 0)]);
    }
}
