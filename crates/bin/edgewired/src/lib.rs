//! # edgewired — edgewire agent
//!
//! Composition root: loads the configuration, builds connections, the router
//! and every configured device, then hands them to an
//! [`Agent`](edgewire_app::agent::Agent).
//!
//! ## Dependency rule
//! This is the **only** crate that depends on all other crates.
//! It is the wiring layer — no classification or routing logic belongs here.

pub mod config;
pub mod wiring;
