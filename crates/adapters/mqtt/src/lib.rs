//! # edgewire-adapter-mqtt
//!
//! MQTT adapter — exposes broker topics as an edgewire [`Connection`].
//!
//! Destination `name` on this connection is the topic `<base_topic>/name`.
//! Registering a destination subscribes to its topic; publishing sends the
//! value's text form. Incoming payloads are delivered as text values.
//!
//! The broker is told `ONLINE` (retained) on `<base_topic>/status` after
//! every connect, and holds `OFFLINE` as the last will.
//!
//! ## Dependency rule
//! Depends on `edgewire-app` (the `Connection` port) and `edgewire-domain`.

pub mod config;
pub mod error;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use rumqttc::{AsyncClient, Event, EventLoop, Outgoing, Packet, QoS};
use tokio::task::JoinHandle;

use edgewire_app::ports::{Connection, Subscriber};
use edgewire_app::router::DestinationRegistry;
use edgewire_domain::id::ConnectionId;
use edgewire_domain::message::Message;
use edgewire_domain::value::Value;

pub use config::MqttConfig;
pub use error::MqttError;

/// Capacity of the client request queue.
const REQUEST_CAPACITY: usize = 64;

/// State shared between the connection handle and its event-loop task.
struct Shared {
    id: ConnectionId,
    config: MqttConfig,
    client: AsyncClient,
    registry: DestinationRegistry,
    closing: AtomicBool,
}

/// A connection to one MQTT broker.
pub struct MqttConnection {
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl MqttConnection {
    /// Create the client and spawn its event loop on the current runtime.
    ///
    /// Connecting happens in the background; destinations registered before
    /// the broker answers are subscribed once it does.
    ///
    /// # Errors
    ///
    /// Fails when called outside a tokio runtime.
    pub fn start(id: impl Into<ConnectionId>, config: MqttConfig) -> Result<Self, MqttError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(MqttError::NoRuntime)?;
        let (client, eventloop) = AsyncClient::new(config.options(), REQUEST_CAPACITY);
        let shared = Arc::new(Shared {
            id: id.into(),
            config,
            client,
            registry: DestinationRegistry::new(),
            closing: AtomicBool::new(false),
        });

        tracing::info!(
            connection = %shared.id,
            broker = %shared.config.broker_host,
            port = shared.config.broker_port,
            "starting MQTT connection"
        );
        let task = runtime.spawn(run(Arc::clone(&shared), eventloop));
        Ok(Self {
            shared,
            task: Mutex::new(Some(task)),
        })
    }

    /// Destination names currently subscribed.
    #[must_use]
    pub fn registered(&self) -> Vec<String> {
        self.shared.registry.names()
    }
}

impl Connection for MqttConnection {
    fn id(&self) -> &ConnectionId {
        &self.shared.id
    }

    fn is_local(&self) -> bool {
        false
    }

    fn register(&self, name: &str, subscriber: Subscriber) {
        self.shared.registry.register(name, subscriber);
        let topic = self.shared.config.topic(name);
        if let Err(err) = self.shared.client.try_subscribe(&topic, QoS::AtMostOnce) {
            // Retried on the next ConnAck.
            tracing::debug!(connection = %self.shared.id, %topic, %err, "subscription deferred");
        }
    }

    fn unregister(&self, name: &str) {
        self.shared.registry.unregister(name);
        let topic = self.shared.config.topic(name);
        if let Err(err) = self.shared.client.try_unsubscribe(&topic) {
            tracing::warn!(connection = %self.shared.id, %topic, %err, "failed to unsubscribe");
        }
    }

    fn publish(&self, name: &str, message: Message) {
        let topic = self.shared.config.topic(name);
        let payload = message.value.to_string();
        match self
            .shared
            .client
            .try_publish(&topic, QoS::AtMostOnce, false, payload)
        {
            Ok(()) => tracing::trace!(connection = %self.shared.id, %topic, "published"),
            Err(err) => {
                tracing::warn!(connection = %self.shared.id, %topic, err = %MqttError::from(err), "failed to publish");
            }
        }
    }

    fn disconnect(&self) {
        if self.shared.closing.swap(true, Ordering::SeqCst) {
            return;
        }
        let status = self.shared.config.status_topic();
        let result = self
            .shared
            .client
            .try_publish(status, QoS::AtLeastOnce, true, config::OFFLINE)
            .and_then(|()| self.shared.client.try_disconnect());
        if let Err(err) = result {
            tracing::warn!(connection = %self.shared.id, %err, "failed to disconnect cleanly");
            self.abort();
        }
    }
}

impl MqttConnection {
    fn abort(&self) {
        let task = self
            .task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = task {
            task.abort();
        }
    }
}

impl Drop for MqttConnection {
    fn drop(&mut self) {
        self.abort();
    }
}

/// Drive the event loop until the connection is closed.
async fn run(shared: Arc<Shared>, mut eventloop: EventLoop) {
    loop {
        match eventloop.poll().await {
            Ok(Event::Incoming(Packet::ConnAck(_))) => on_connected(&shared),
            Ok(Event::Incoming(Packet::Publish(publish))) => {
                if let Err(err) = deliver(&shared, &publish.topic, &publish.payload) {
                    tracing::warn!(connection = %shared.id, %err, "incoming message dropped");
                }
            }
            Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
            Ok(_) => {}
            Err(err) => {
                if shared.closing.load(Ordering::SeqCst) {
                    break;
                }
                tracing::warn!(
                    connection = %shared.id,
                    %err,
                    retry_in = ?shared.config.reconnect_delay(),
                    "MQTT connection lost"
                );
                tokio::time::sleep(shared.config.reconnect_delay()).await;
            }
        }
    }
    tracing::info!(connection = %shared.id, "MQTT connection closed");
}

fn on_connected(shared: &Shared) {
    tracing::info!(connection = %shared.id, "connected to broker");
    for name in shared.registry.names() {
        let topic = shared.config.topic(&name);
        if let Err(err) = shared.client.try_subscribe(&topic, QoS::AtMostOnce) {
            tracing::warn!(connection = %shared.id, %topic, %err, "failed to subscribe");
        }
    }
    let status = shared.config.status_topic();
    if let Err(err) = shared
        .client
        .try_publish(status, QoS::AtLeastOnce, true, config::ONLINE)
    {
        tracing::warn!(connection = %shared.id, %err, "failed to announce status");
    }
}

/// Hand an incoming payload to the subscriber of its topic. Returns whether
/// anyone was listening.
fn deliver(shared: &Shared, topic: &str, payload: &[u8]) -> Result<bool, MqttError> {
    let Some(name) = shared.config.destination_name(topic) else {
        tracing::trace!(connection = %shared.id, %topic, "topic outside base ignored");
        return Ok(false);
    };
    let text = std::str::from_utf8(payload).map_err(|source| MqttError::PayloadParse {
        topic: topic.to_string(),
        source,
    })?;
    let message = Message::new(Value::from(text.trim()), shared.id.clone());
    Ok(shared.registry.publish(name, &message))
}
