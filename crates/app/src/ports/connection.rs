//! Connection port — a transport that owns a set of named destinations.
//!
//! The in-process [`LocalConnection`](crate::router::LocalConnection) and
//! remote brokers (`adapter_mqtt`) both implement [`Connection`]. The
//! [`Router`](crate::router::Router) holds them behind `Arc<dyn Connection>`
//! so that components can publish without knowing which transport is behind
//! a destination.

use std::sync::Arc;

use edgewire_domain::id::ConnectionId;
use edgewire_domain::message::Message;

/// Handler registered on a destination.
///
/// Invoked synchronously by whoever publishes; it must not block. Long work
/// belongs on a spawned task.
pub type Subscriber = Arc<dyn Fn(&Message) + Send + Sync>;

/// A transport scoping a namespace of destinations.
pub trait Connection: Send + Sync {
    /// Configured name of this connection.
    fn id(&self) -> &ConnectionId;

    /// `true` for the in-process connection.
    fn is_local(&self) -> bool;

    /// Register `subscriber` for messages arriving on `name`, replacing any
    /// previous subscriber of that name.
    fn register(&self, name: &str, subscriber: Subscriber);

    /// Remove the subscriber of `name`, if any.
    fn unregister(&self, name: &str);

    /// Deliver `message` to `name`. Publishing to a name nobody subscribed
    /// to is a silent no-op.
    fn publish(&self, name: &str, message: Message);

    /// Release transport resources. Called once on agent shutdown.
    fn disconnect(&self) {}
}
