//! Value transformer — maps incoming values to commands through a
//! [`ThresholdRule`].

use std::sync::Arc;

use edgewire_domain::command::Command;
use edgewire_domain::destination::Destination;
use edgewire_domain::error::ConfigError;
use edgewire_domain::id::DeviceName;
use edgewire_domain::message::Message;
use edgewire_domain::rule::ThresholdRule;

use crate::router::Router;

#[derive(Debug, Clone)]
pub struct ValueTransformerConfig {
    pub name: DeviceName,
    pub input: Destination,
    pub rule: ThresholdRule,
    pub outputs: Vec<Destination>,
}

/// Passive component: reacts to messages on its input destination.
pub struct ValueTransformer {
    config: ValueTransformerConfig,
    router: Arc<Router>,
}

impl ValueTransformer {
    /// Build and subscribe to the input destination.
    ///
    /// The router only keeps a weak handle: the transformer stops reacting
    /// once the returned `Arc` is dropped.
    ///
    /// # Errors
    ///
    /// Fails when the input or an output names an unknown connection.
    pub fn attach(
        config: ValueTransformerConfig,
        router: Arc<Router>,
    ) -> Result<Arc<Self>, ConfigError> {
        router.validate(&config.outputs)?;
        let transformer = Arc::new(Self { config, router });

        let handler = Arc::downgrade(&transformer);
        transformer.router.register(
            &transformer.config.input,
            Arc::new(move |msg: &Message| {
                if let Some(transformer) = handler.upgrade() {
                    transformer.on_message(msg);
                }
            }),
        )?;
        tracing::debug!(
            transformer = %transformer.config.name,
            rule = %transformer.config.rule,
            "transformer attached"
        );
        Ok(transformer)
    }

    /// Map an incoming message to the command to publish, if any.
    ///
    /// A toggle always stays a toggle. A value the rule cannot interpret is
    /// dropped with a warning.
    #[must_use]
    pub fn transform(&self, message: &Message) -> Option<Command> {
        let incoming = Command::parse(&message.value);
        if incoming.is_toggle() {
            return Some(Command::Toggle);
        }

        match self.config.rule.evaluate(&message.value) {
            Ok(Some(on)) => Some(Command::from_bool(on)),
            Ok(None) => Some(Command::Value(message.value.clone())),
            Err(err) => {
                tracing::warn!(
                    transformer = %self.config.name,
                    %err,
                    rule = %self.config.rule,
                    "value ignored"
                );
                None
            }
        }
    }

    fn on_message(&self, message: &Message) {
        let Some(command) = self.transform(message) else {
            return;
        };
        let value = command.to_value();
        for destination in &self.config.outputs {
            self.router.publish(destination, message.with_value(value.clone()));
        }
    }
}
