//! # edgewire-adapter-virtual
//!
//! Simulated GPIO backend for tests and demonstration on machines without
//! pins.
//!
//! ## Behaviour
//!
//! | Operation | Effect |
//! |-----------|--------|
//! | `setup_input` | Pin idles at the level implied by its pull resistor |
//! | `set_input` | Changes an input level and fires its edge callback |
//! | `write_pin` / `set_duty` | Recorded, readable via `output_level`, `duty`, `history` |
//! | `inject_fault` | Makes every access to the pin fail until cleared |
//!
//! ## Dependency rule
//!
//! Depends on `edgewire-app` (port traits) and `edgewire-domain` only.

mod button;
mod pin;

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use edgewire_app::ports::{EdgeCallback, GpioBackend, Pull};
use edgewire_domain::error::HardwareError;

pub use button::VirtualButton;
use pin::{InputPin, OutputPin, VirtualPin};

/// In-memory GPIO chip.
#[derive(Default)]
pub struct VirtualGpio {
    pins: Mutex<HashMap<u8, VirtualPin>>,
    faults: Mutex<HashSet<u8>>,
}

impl VirtualGpio {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drive an input pin from the outside world.
    ///
    /// The edge callback, if any, runs after the pin table is unlocked and
    /// only when the level actually changes.
    ///
    /// # Errors
    ///
    /// Fails when the pin is not configured as an input.
    pub fn set_input(&self, pin: u8, level: bool) -> Result<(), HardwareError> {
        let callback = {
            let mut pins = self.lock_pins();
            let Some(VirtualPin::Input(input)) = pins.get_mut(&pin) else {
                return Err(HardwareError::WrongDirection {
                    pin,
                    expected: "input",
                });
            };
            let changed = input.level != level;
            input.level = level;
            changed.then(|| input.edge.clone()).flatten()
        };

        if let Some(callback) = callback {
            callback(level);
        }
        Ok(())
    }

    /// Last level written to an output pin.
    #[must_use]
    pub fn output_level(&self, pin: u8) -> Option<bool> {
        match self.lock_pins().get(&pin) {
            Some(VirtualPin::Output(output)) => Some(output.level),
            _ => None,
        }
    }

    /// Last duty cycle set on an output pin.
    #[must_use]
    pub fn duty(&self, pin: u8) -> Option<u8> {
        match self.lock_pins().get(&pin) {
            Some(VirtualPin::Output(output)) => output.duty,
            _ => None,
        }
    }

    /// Every level written to an output pin since setup.
    #[must_use]
    pub fn history(&self, pin: u8) -> Vec<bool> {
        match self.lock_pins().get(&pin) {
            Some(VirtualPin::Output(output)) => output.history.clone(),
            _ => Vec::new(),
        }
    }

    #[must_use]
    pub fn has_edge(&self, pin: u8) -> bool {
        matches!(
            self.lock_pins().get(&pin),
            Some(VirtualPin::Input(InputPin { edge: Some(_), .. }))
        )
    }

    /// Make every access to `pin` fail (`true`) or succeed again (`false`).
    pub fn inject_fault(&self, pin: u8, failing: bool) {
        let mut faults = self.faults.lock().unwrap_or_else(PoisonError::into_inner);
        if failing {
            faults.insert(pin);
        } else {
            faults.remove(&pin);
        }
    }

    fn check_fault(&self, pin: u8) -> Result<(), HardwareError> {
        let faults = self.faults.lock().unwrap_or_else(PoisonError::into_inner);
        if faults.contains(&pin) {
            Err(HardwareError::PinUnavailable(pin))
        } else {
            Ok(())
        }
    }

    fn lock_pins(&self) -> MutexGuard<'_, HashMap<u8, VirtualPin>> {
        self.pins.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_output<T>(
        &self,
        pin: u8,
        f: impl FnOnce(&mut OutputPin) -> T,
    ) -> Result<T, HardwareError> {
        self.check_fault(pin)?;
        match self.lock_pins().get_mut(&pin) {
            Some(VirtualPin::Output(output)) => Ok(f(output)),
            Some(VirtualPin::Input(_)) => Err(HardwareError::WrongDirection {
                pin,
                expected: "output",
            }),
            None => Err(HardwareError::PinUnavailable(pin)),
        }
    }
}

impl GpioBackend for VirtualGpio {
    fn setup_input(&self, pin: u8, pull: Pull) -> Result<(), HardwareError> {
        self.check_fault(pin)?;
        self.lock_pins()
            .insert(pin, VirtualPin::Input(InputPin::new(pull)));
        tracing::debug!(pin, ?pull, "virtual input configured");
        Ok(())
    }

    fn setup_output(&self, pin: u8, level: bool) -> Result<(), HardwareError> {
        self.check_fault(pin)?;
        self.lock_pins()
            .insert(pin, VirtualPin::Output(OutputPin::new(level)));
        tracing::debug!(pin, level, "virtual output configured");
        Ok(())
    }

    fn read_pin(&self, pin: u8) -> Result<bool, HardwareError> {
        self.check_fault(pin)?;
        match self.lock_pins().get(&pin) {
            Some(VirtualPin::Input(input)) => Ok(input.level),
            Some(VirtualPin::Output(output)) => Ok(output.level),
            None => Err(HardwareError::PinUnavailable(pin)),
        }
    }

    fn write_pin(&self, pin: u8, level: bool) -> Result<(), HardwareError> {
        self.with_output(pin, |output| {
            output.level = level;
            output.history.push(level);
        })
    }

    fn set_duty(&self, pin: u8, duty: u8) -> Result<(), HardwareError> {
        if duty > 100 {
            return Err(HardwareError::DutyOutOfRange(duty));
        }
        self.with_output(pin, |output| output.duty = Some(duty))
    }

    fn on_edge(&self, pin: u8, callback: EdgeCallback) -> Result<(), HardwareError> {
        self.check_fault(pin)
            .map_err(|_| HardwareError::EdgeRegistration(pin))?;
        match self.lock_pins().get_mut(&pin) {
            Some(VirtualPin::Input(input)) => {
                input.edge = Some(Arc::new(callback));
                Ok(())
            }
            _ => Err(HardwareError::EdgeRegistration(pin)),
        }
    }

    fn clear_edge(&self, pin: u8) {
        if let Some(VirtualPin::Input(input)) = self.lock_pins().get_mut(&pin) {
            input.edge = None;
        }
    }
}
