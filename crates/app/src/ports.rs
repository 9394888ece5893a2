//! Port definitions — traits that adapters implement.
//!
//! Ports are the boundaries between the application core and the outside world.
//! They are defined here (in `app`) so that both the component layer and the
//! adapter layer can depend on them without creating circular dependencies.

pub mod connection;
pub mod gpio;

pub use connection::{Connection, Subscriber};
pub use gpio::{EdgeCallback, GpioBackend, Pull};
