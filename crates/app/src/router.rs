//! Router — resolves a [`Destination`] to its connection and delivers.
//!
//! Components never hold connections directly. They publish to a
//! [`Destination`] and the router looks up the owning connection by
//! [`ConnectionId`]. Unknown connections and unsubscribed names are silent
//! no-ops: a sensor whose consumer is not configured simply has nobody
//! listening.

mod local;
mod registry;

use std::collections::HashMap;
use std::sync::Arc;

use edgewire_domain::destination::Destination;
use edgewire_domain::error::ConfigError;
use edgewire_domain::id::ConnectionId;
use edgewire_domain::message::Message;

use crate::ports::{Connection, Subscriber};

pub use local::LocalConnection;
pub use registry::DestinationRegistry;

/// Set of connections known to the agent.
///
/// Built once at startup, then shared as `Arc<Router>`.
#[derive(Default)]
pub struct Router {
    connections: HashMap<ConnectionId, Arc<dyn Connection>>,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection, replacing any previous one with the same id.
    pub fn add_connection(&mut self, connection: Arc<dyn Connection>) {
        let id = connection.id().clone();
        if self.connections.insert(id.clone(), connection).is_some() {
            tracing::warn!(connection = %id, "connection configured twice, keeping the last one");
        }
    }

    /// Builder-style [`add_connection`](Self::add_connection).
    #[must_use]
    pub fn with_connection(mut self, connection: Arc<dyn Connection>) -> Self {
        self.add_connection(connection);
        self
    }

    #[must_use]
    pub fn connection(&self, id: &ConnectionId) -> Option<&Arc<dyn Connection>> {
        self.connections.get(id)
    }

    /// Whether `id` names the in-process connection. Unknown ids are not local.
    #[must_use]
    pub fn is_local(&self, id: &ConnectionId) -> bool {
        self.connections.get(id).is_some_and(|c| c.is_local())
    }

    /// Subscribe to a destination.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownConnection`] when the destination's
    /// connection is not configured.
    pub fn register(
        &self,
        destination: &Destination,
        subscriber: Subscriber,
    ) -> Result<(), ConfigError> {
        let connection = self.resolve(destination)?;
        connection.register(&destination.name, subscriber);
        tracing::debug!(%destination, "registered subscriber");
        Ok(())
    }

    /// Remove the subscriber of a destination, if any.
    pub fn unregister(&self, destination: &Destination) {
        if let Ok(connection) = self.resolve(destination) {
            connection.unregister(&destination.name);
        }
    }

    /// Publish `message` to `destination`.
    pub fn publish(&self, destination: &Destination, message: Message) {
        match self.connections.get(&destination.connection) {
            Some(connection) => connection.publish(&destination.name, message),
            None => {
                tracing::trace!(%destination, "unknown connection, message dropped");
            }
        }
    }

    /// Check that every destination refers to a configured connection.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError::UnknownConnection`] found.
    pub fn validate<'a>(
        &self,
        destinations: impl IntoIterator<Item = &'a Destination>,
    ) -> Result<(), ConfigError> {
        destinations
            .into_iter()
            .try_for_each(|d| self.resolve(d).map(|_| ()))
    }

    /// Disconnect every connection.
    pub fn disconnect_all(&self) {
        for (id, connection) in &self.connections {
            tracing::debug!(connection = %id, "disconnecting");
            connection.disconnect();
        }
    }

    fn resolve(&self, destination: &Destination) -> Result<&Arc<dyn Connection>, ConfigError> {
        self.connections
            .get(&destination.connection)
            .ok_or_else(|| ConfigError::UnknownConnection(destination.connection.to_string()))
    }
}
