//! Per-connection table of destination subscribers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use edgewire_domain::message::Message;

use crate::ports::Subscriber;

/// Maps destination names to their single active subscriber.
///
/// The table lock is held only for lookups and updates. Subscribers run after
/// it is released, so a subscriber may itself publish or (un)register
/// without deadlocking.
#[derive(Default)]
pub struct DestinationRegistry {
    subscribers: Mutex<HashMap<String, Subscriber>>,
}

impl DestinationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `subscriber` under `name`, returning the one it replaced.
    pub fn register(&self, name: &str, subscriber: Subscriber) -> Option<Subscriber> {
        let previous = self.lock().insert(name.to_string(), subscriber);
        if previous.is_some() {
            tracing::debug!(destination = name, "replaced existing subscriber");
        }
        previous
    }

    /// Remove the subscriber of `name`, returning it.
    pub fn unregister(&self, name: &str) -> Option<Subscriber> {
        self.lock().remove(name)
    }

    /// Deliver `message` to the subscriber of `name`.
    ///
    /// Returns `false` when nobody is registered; the message is dropped.
    pub fn publish(&self, name: &str, message: &Message) -> bool {
        let subscriber = self.lock().get(name).map(Arc::clone);
        match subscriber {
            Some(subscriber) => {
                subscriber(message);
                true
            }
            None => {
                tracing::trace!(destination = name, "no subscriber, message dropped");
                false
            }
        }
    }

    /// Registered destination names, in no particular order.
    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.lock().contains_key(name)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Subscriber>> {
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
