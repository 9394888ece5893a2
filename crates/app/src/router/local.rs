//! In-process connection.

use edgewire_domain::id::ConnectionId;
use edgewire_domain::message::Message;

use super::DestinationRegistry;
use crate::ports::{Connection, Subscriber};

/// Connection whose destinations live entirely inside the agent.
///
/// Publishing calls the subscriber directly on the publisher's task.
pub struct LocalConnection {
    id: ConnectionId,
    registry: DestinationRegistry,
}

impl LocalConnection {
    #[must_use]
    pub fn new(id: impl Into<ConnectionId>) -> Self {
        Self {
            id: id.into(),
            registry: DestinationRegistry::new(),
        }
    }
}

impl Connection for LocalConnection {
    fn id(&self) -> &ConnectionId {
        &self.id
    }

    fn is_local(&self) -> bool {
        true
    }

    fn register(&self, name: &str, subscriber: Subscriber) {
        self.registry.register(name, subscriber);
    }

    fn unregister(&self, name: &str) {
        self.registry.unregister(name);
    }

    fn publish(&self, name: &str, message: Message) {
        self.registry.publish(name, &message);
    }
}
