//! Simulated pin states.

use std::sync::Arc;

use edgewire_app::ports::{EdgeCallback, Pull};

/// An input pin: its level is set from outside via
/// [`VirtualGpio::set_input`](crate::VirtualGpio::set_input).
pub struct InputPin {
    pub pull: Pull,
    pub level: bool,
    pub edge: Option<Arc<EdgeCallback>>,
}

impl InputPin {
    pub fn new(pull: Pull) -> Self {
        Self {
            pull,
            level: pull.idle_level(),
            edge: None,
        }
    }
}

/// An output pin: records every level and duty written to it.
pub struct OutputPin {
    pub level: bool,
    pub duty: Option<u8>,
    pub history: Vec<bool>,
}

impl OutputPin {
    pub fn new(level: bool) -> Self {
        Self {
            level,
            duty: None,
            history: Vec::new(),
        }
    }
}

pub enum VirtualPin {
    Input(InputPin),
    Output(OutputPin),
}
