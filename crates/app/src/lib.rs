//! # edgewire-app
//!
//! Application layer — components and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement:
//!   - `GpioBackend` — pin reads, writes, PWM duty and edge callbacks
//!   - `Connection` — a transport scoping a namespace of destinations
//! - Provide the **router** and the in-process `LocalConnection`
//! - Classify raw pin samples into steady states and presses (`debounce`)
//! - Implement the **components**: GPIO sensor, heartbeat, value transformer,
//!   logic OR, GPIO and PWM actuators
//! - Run components and shut them down (`agent`)
//!
//! ## Dependency rule
//! Depends on `edgewire-domain` only (plus `tokio` for tasks, timers and
//! channels). Never imports adapter crates. Adapters depend on *this* crate,
//! not the reverse.

pub mod agent;
pub mod components;
pub mod debounce;
pub mod ports;
pub mod router;
pub mod sampler;

#[cfg(test)]
mod testing;
