//! Test doubles shared by unit tests across the crate.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use edgewire_domain::destination::Destination;
use edgewire_domain::error::HardwareError;
use edgewire_domain::id::ConnectionId;
use edgewire_domain::message::Message;
use edgewire_domain::value::Value;

use crate::ports::{Connection, EdgeCallback, GpioBackend, Pull, Subscriber};
use crate::router::{LocalConnection, Router};

/// In-memory GPIO with scriptable failures.
#[derive(Default)]
pub struct FakeGpio {
    levels: Mutex<HashMap<u8, bool>>,
    callbacks: Mutex<HashMap<u8, Arc<EdgeCallback>>>,
    writes: Mutex<Vec<(u8, bool)>>,
    duties: Mutex<Vec<(u8, u8)>>,
    refusals: AtomicU32,
    failing_reads: AtomicBool,
}

impl FakeGpio {
    /// Change an input level, firing its edge callback.
    pub fn set(&self, pin: u8, level: bool) {
        self.levels.lock().unwrap().insert(pin, level);
        let callback = self.callbacks.lock().unwrap().get(&pin).cloned();
        if let Some(callback) = callback {
            callback(level);
        }
    }

    /// Refuse the next `n` edge registrations.
    pub fn refuse_edges(&self, n: u32) {
        self.refusals.store(n, Ordering::SeqCst);
    }

    pub fn fail_reads(&self, failing: bool) {
        self.failing_reads.store(failing, Ordering::SeqCst);
    }

    pub fn has_edge(&self, pin: u8) -> bool {
        self.callbacks.lock().unwrap().contains_key(&pin)
    }

    pub fn level(&self, pin: u8) -> Option<bool> {
        self.levels.lock().unwrap().get(&pin).copied()
    }

    pub fn writes(&self) -> Vec<(u8, bool)> {
        self.writes.lock().unwrap().clone()
    }

    pub fn duties(&self) -> Vec<(u8, u8)> {
        self.duties.lock().unwrap().clone()
    }
}

impl GpioBackend for FakeGpio {
    fn setup_input(&self, pin: u8, pull: Pull) -> Result<(), HardwareError> {
        self.levels.lock().unwrap().insert(pin, pull.idle_level());
        Ok(())
    }

    fn setup_output(&self, pin: u8, level: bool) -> Result<(), HardwareError> {
        self.levels.lock().unwrap().insert(pin, level);
        Ok(())
    }

    fn read_pin(&self, pin: u8) -> Result<bool, HardwareError> {
        if self.failing_reads.load(Ordering::SeqCst) {
            return Err(HardwareError::PinUnavailable(pin));
        }
        self.level(pin).ok_or(HardwareError::PinUnavailable(pin))
    }

    fn write_pin(&self, pin: u8, level: bool) -> Result<(), HardwareError> {
        self.levels.lock().unwrap().insert(pin, level);
        self.writes.lock().unwrap().push((pin, level));
        Ok(())
    }

    fn set_duty(&self, pin: u8, duty: u8) -> Result<(), HardwareError> {
        if duty > 100 {
            return Err(HardwareError::DutyOutOfRange(duty));
        }
        self.duties.lock().unwrap().push((pin, duty));
        Ok(())
    }

    fn on_edge(&self, pin: u8, callback: EdgeCallback) -> Result<(), HardwareError> {
        let refused = self
            .refusals
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused {
            return Err(HardwareError::EdgeRegistration(pin));
        }
        self.callbacks
            .lock()
            .unwrap()
            .insert(pin, Arc::new(callback));
        Ok(())
    }

    fn clear_edge(&self, pin: u8) {
        self.callbacks.lock().unwrap().remove(&pin);
    }
}

/// Router with one local connection named `local`.
pub fn local_router() -> Arc<Router> {
    Arc::new(Router::new().with_connection(Arc::new(LocalConnection::new("local"))))
}

/// Record every value published to `destination`.
pub fn collect(router: &Router, destination: &Destination) -> Arc<Mutex<Vec<Value>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    router
        .register(
            destination,
            Arc::new(move |msg: &Message| sink.lock().unwrap().push(msg.value.clone())),
        )
        .unwrap();
    seen
}

pub fn local(name: &str) -> Destination {
    Destination::new("local", name)
}

/// Non-local connection recording what is published to it.
pub struct RecordingRemote {
    id: ConnectionId,
    published: Mutex<Vec<(String, Value)>>,
    disconnected: AtomicBool,
}

impl RecordingRemote {
    pub fn new(id: &str) -> Self {
        Self {
            id: ConnectionId::new(id),
            published: Mutex::new(Vec::new()),
            disconnected: AtomicBool::new(false),
        }
    }

    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }

    pub fn published(&self) -> Vec<(String, Value)> {
        self.published.lock().unwrap().clone()
    }
}

impl Connection for RecordingRemote {
    fn id(&self) -> &ConnectionId {
        &self.id
    }

    fn is_local(&self) -> bool {
        false
    }

    fn register(&self, _name: &str, _subscriber: Subscriber) {}

    fn unregister(&self, _name: &str) {}

    fn publish(&self, name: &str, message: Message) {
        self.published
            .lock()
            .unwrap()
            .push((name.to_string(), message.value));
    }

    fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }
}
