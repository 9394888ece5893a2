//! GPIO port — pin access for sensors and actuators.
//!
//! The debounce and classification logic never touches hardware directly; it
//! sees pins only through this trait. Adapters provide the implementation
//! (the simulated backend in `adapter_virtual`, a Linux GPIO character device
//! on real boards).

use std::sync::Arc;

use edgewire_domain::error::HardwareError;

/// Input bias resistor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pull {
    /// Pin idles HIGH; a press pulls it LOW.
    #[default]
    Up,
    /// Pin idles LOW; a press drives it HIGH.
    Down,
    /// No bias.
    Off,
}

impl Pull {
    /// Level an idle (released) input reads with this bias.
    #[must_use]
    pub fn idle_level(self) -> bool {
        matches!(self, Self::Up)
    }
}

/// Callback invoked by the backend on every level change of an input pin.
///
/// Runs on whatever thread the backend signals from; it must not block.
pub type EdgeCallback = Box<dyn Fn(bool) + Send + Sync>;

/// Raw pin access.
///
/// All methods are synchronous: pin reads and writes are register or
/// character-device operations that complete immediately.
pub trait GpioBackend: Send + Sync {
    /// Configure `pin` as an input with the given bias.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::PinUnavailable`] when the pin cannot be claimed.
    fn setup_input(&self, pin: u8, pull: Pull) -> Result<(), HardwareError>;

    /// Configure `pin` as an output driven to `level`.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::PinUnavailable`] when the pin cannot be claimed.
    fn setup_output(&self, pin: u8, level: bool) -> Result<(), HardwareError>;

    /// Read the current level of an input pin.
    ///
    /// # Errors
    ///
    /// Fails when the pin is not configured as an input or the read fails.
    fn read_pin(&self, pin: u8) -> Result<bool, HardwareError>;

    /// Drive an output pin.
    ///
    /// # Errors
    ///
    /// Fails when the pin is not configured as an output.
    fn write_pin(&self, pin: u8, level: bool) -> Result<(), HardwareError>;

    /// Set the PWM duty cycle of an output pin, in percent.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::DutyOutOfRange`] above 100.
    fn set_duty(&self, pin: u8, duty: u8) -> Result<(), HardwareError>;

    /// Register a level-change callback for an input pin, replacing any
    /// previous one.
    ///
    /// # Errors
    ///
    /// Returns [`HardwareError::EdgeRegistration`] when the backend refuses.
    fn on_edge(&self, pin: u8, callback: EdgeCallback) -> Result<(), HardwareError>;

    /// Remove the level-change callback of a pin, if any.
    fn clear_edge(&self, pin: u8);
}

impl<T: GpioBackend + ?Sized> GpioBackend for Arc<T> {
    fn setup_input(&self, pin: u8, pull: Pull) -> Result<(), HardwareError> {
        (**self).setup_input(pin, pull)
    }

    fn setup_output(&self, pin: u8, level: bool) -> Result<(), HardwareError> {
        (**self).setup_output(pin, level)
    }

    fn read_pin(&self, pin: u8) -> Result<bool, HardwareError> {
        (**self).read_pin(pin)
    }

    fn write_pin(&self, pin: u8, level: bool) -> Result<(), HardwareError> {
        (**self).write_pin(pin, level)
    }

    fn set_duty(&self, pin: u8, duty: u8) -> Result<(), HardwareError> {
        (**self).set_duty(pin, duty)
    }

    fn on_edge(&self, pin: u8, callback: EdgeCallback) -> Result<(), HardwareError> {
        (**self).on_edge(pin, callback)
    }

    fn clear_edge(&self, pin: u8) {
        (**self).clear_edge(pin);
    }
}
