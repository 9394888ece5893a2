//! # edgewire-domain
//!
//! Pure domain model for the edgewire edge agent.
//!
//! ## Responsibilities
//! - Foundational types: named identifiers, error conventions, timestamps
//! - Define **pin samples** and the classified **events** derived from them
//! - Define **messages** (values flowing through the router) and **commands**
//!   (what actuators understand: `ON`, `OFF`, `TOGGLE`, HSV, datetime literals)
//! - Define **destinations** (connection-scoped publish/subscribe endpoints)
//! - Define **threshold rules** and their selection precedence
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod error;
pub mod id;
pub mod time;

pub mod command;
pub mod destination;
pub mod event;
pub mod message;
pub mod rule;
pub mod value;
