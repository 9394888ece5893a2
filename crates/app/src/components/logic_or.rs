//! Logic OR — combines several ON/OFF inputs into one output.
//!
//! The output is ON while at least one input is ON and is published only when
//! it changes. An optional enable input suspends publication: while disabled
//! the inputs are still tracked, and re-enabling publishes the current
//! combined state once.
//!
//! Outputs are only published on the in-process connection; remote outputs
//! are skipped.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use edgewire_domain::command::{self, Command};
use edgewire_domain::destination::Destination;
use edgewire_domain::error::ConfigError;
use edgewire_domain::id::DeviceName;
use edgewire_domain::message::Message;

use crate::router::Router;

use super::outbox::Outbox;

/// Input level of a combinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputValue {
    On,
    Off,
    Toggle,
}

impl InputValue {
    /// Anything that is neither ON nor a toggle counts as OFF.
    #[must_use]
    pub fn from_command(command: &Command) -> Self {
        match command {
            Command::On => Self::On,
            Command::Toggle => Self::Toggle,
            _ => Self::Off,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogicOrConfig {
    pub name: DeviceName,
    pub inputs: Vec<Destination>,
    /// Destination whose ON/OFF/TOGGLE messages switch the combinator.
    pub enable: Option<Destination>,
    pub outputs: Vec<Destination>,
    /// Published for OFF and ON.
    pub values: [String; 2],
}

impl LogicOrConfig {
    #[must_use]
    pub fn new(name: impl Into<DeviceName>) -> Self {
        Self {
            name: name.into(),
            inputs: Vec::new(),
            enable: None,
            outputs: Vec::new(),
            values: [command::OFF.to_string(), command::ON.to_string()],
        }
    }
}

#[derive(Debug)]
struct CombinatorState {
    inputs: BTreeMap<Destination, bool>,
    enabled: bool,
    output: bool,
    outbox: Outbox<bool>,
}

impl CombinatorState {
    fn combined(&self) -> bool {
        self.inputs.values().any(|on| *on)
    }
}

pub struct LogicOr {
    config: LogicOrConfig,
    router: Arc<Router>,
    state: Mutex<CombinatorState>,
}

impl LogicOr {
    /// Build and subscribe to every input and the enable destination.
    ///
    /// Every input starts OFF and the combinator starts enabled.
    ///
    /// # Errors
    ///
    /// Fails without inputs, or when a destination names an unknown
    /// connection.
    pub fn attach(config: LogicOrConfig, router: Arc<Router>) -> Result<Arc<Self>, ConfigError> {
        if config.inputs.is_empty() {
            return Err(ConfigError::Missing("inputs"));
        }
        router.validate(&config.outputs)?;
        for output in &config.outputs {
            if !router.is_local(&output.connection) {
                tracing::warn!(
                    combinator = %config.name,
                    %output,
                    "output is not on the local connection and will be skipped"
                );
            }
        }

        let state = CombinatorState {
            inputs: config.inputs.iter().map(|d| (d.clone(), false)).collect(),
            enabled: true,
            output: false,
            outbox: Outbox::default(),
        };
        let combinator = Arc::new(Self {
            config,
            router,
            state: Mutex::new(state),
        });

        for input in &combinator.config.inputs {
            let handler = Arc::downgrade(&combinator);
            let source = input.clone();
            combinator.router.register(
                input,
                subscriber(handler, move |this, msg| {
                    this.on_input(&source, InputValue::from_command(&Command::parse(&msg.value)));
                }),
            )?;
        }
        if let Some(enable) = &combinator.config.enable {
            combinator.router.register(
                enable,
                subscriber(Arc::downgrade(&combinator), |this, msg| {
                    this.on_enable(&Command::parse(&msg.value));
                }),
            )?;
        }
        Ok(combinator)
    }

    /// Record a new value for `input` and publish the combined output if it
    /// changed. Unknown inputs are ignored.
    pub fn on_input(&self, input: &Destination, value: InputValue) {
        let drain = {
            let mut state = self.lock();
            let Some(slot) = state.inputs.get_mut(input) else {
                tracing::debug!(combinator = %self.config.name, %input, "unknown input ignored");
                return;
            };
            *slot = match value {
                InputValue::On => true,
                InputValue::Off => false,
                InputValue::Toggle => !*slot,
            };

            let combined = state.combined();
            if !state.enabled || combined == state.output {
                return;
            }
            state.output = combined;
            state.outbox.push(combined)
        };

        if drain {
            self.drain();
        }
    }

    /// Switch the combinator. `ON`/`OFF` set, a toggle flips. Going from
    /// disabled to enabled republishes the current combined state.
    pub fn on_enable(&self, command: &Command) {
        let drain = {
            let mut state = self.lock();
            let enabled = match command {
                Command::On => true,
                Command::Off => false,
                Command::Toggle => !state.enabled,
                other => {
                    tracing::warn!(combinator = %self.config.name, command = %other, "invalid enable command");
                    return;
                }
            };
            let reconcile = enabled && !state.enabled;
            state.enabled = enabled;
            tracing::info!(combinator = %self.config.name, enabled, "combinator switched");

            if !reconcile {
                return;
            }
            state.output = state.combined();
            let output = state.output;
            state.outbox.push(output)
        };

        if drain {
            self.drain();
        }
    }

    /// Last published (or reconciled) output.
    #[must_use]
    pub fn output(&self) -> bool {
        self.lock().output
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.lock().enabled
    }

    fn drain(&self) {
        loop {
            let next = self.lock().outbox.next();
            let Some(on) = next else {
                return;
            };
            self.publish(on);
        }
    }

    fn publish(&self, on: bool) {
        let value = &self.config.values[usize::from(on)];
        tracing::debug!(combinator = %self.config.name, %value, "output changed");
        for output in &self.config.outputs {
            if self.router.is_local(&output.connection) {
                self.router
                    .publish(output, Message::new(value.as_str(), output.connection.clone()));
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CombinatorState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn subscriber<F>(handler: Weak<LogicOr>, f: F) -> crate::ports::Subscriber
where
    F: Fn(&LogicOr, &Message) + Send + Sync + 'static,
{
    Arc::new(move |msg: &Message| {
        if let Some(this) = handler.upgrade() {
            f(&this, msg);
        }
    })
}
