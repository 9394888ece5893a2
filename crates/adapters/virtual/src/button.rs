//! Scripted push-button on top of a [`VirtualGpio`] input.

use std::sync::Arc;
use std::time::Duration;

use edgewire_domain::error::HardwareError;

use crate::VirtualGpio;

/// Contact chatter between two level flips.
const BOUNCE_STEP: Duration = Duration::from_millis(1);

/// Drives an input pin the way a mechanical button would.
pub struct VirtualButton {
    gpio: Arc<VirtualGpio>,
    pin: u8,
    pressed_level: bool,
    bounces: u8,
}

impl VirtualButton {
    #[must_use]
    pub fn new(gpio: Arc<VirtualGpio>, pin: u8, pressed_level: bool) -> Self {
        Self {
            gpio,
            pin,
            pressed_level,
            bounces: 0,
        }
    }

    /// Chatter `bounces` times on every contact change.
    #[must_use]
    pub fn with_bounces(mut self, bounces: u8) -> Self {
        self.bounces = bounces;
        self
    }

    /// Press, hold for `hold`, release.
    ///
    /// # Errors
    ///
    /// Fails when the pin is not configured as an input.
    pub async fn press(&self, hold: Duration) -> Result<(), HardwareError> {
        self.settle_at(self.pressed_level).await?;
        tokio::time::sleep(hold).await;
        self.settle_at(!self.pressed_level).await
    }

    async fn settle_at(&self, level: bool) -> Result<(), HardwareError> {
        for _ in 0..self.bounces {
            self.gpio.set_input(self.pin, level)?;
            tokio::time::sleep(BOUNCE_STEP).await;
            self.gpio.set_input(self.pin, !level)?;
            tokio::time::sleep(BOUNCE_STEP).await;
        }
        self.gpio.set_input(self.pin, level)
    }
}
