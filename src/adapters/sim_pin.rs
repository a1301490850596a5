//! Simulated output pin.
//!
//! Stands in for a board LED on the host. Clones share state, so a test or
//! the simulation loop can watch the pin a handler owns.

use core::convert::Infallible;

use embedded_hal::digital::{ErrorType, OutputPin, StatefulOutputPin};

use crate::registry::Shared;

#[derive(Debug, Default, Clone, Copy)]
struct PinLevel {
    high: bool,
    toggles: u32,
}

#[derive(Debug, Clone, Default)]
pub struct SimPin {
    level: Shared<PinLevel>,
}

impl SimPin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_high(&self) -> bool {
        self.level.get().high
    }

    /// Number of toggles since construction.
    pub fn toggles(&self) -> u32 {
        self.level.get().toggles
    }
}

impl ErrorType for SimPin {
    type Error = Infallible;
}

impl OutputPin for SimPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.level.with_mut(|l| l.high = false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.level.with_mut(|l| l.high = true);
        Ok(())
    }
}

impl StatefulOutputPin for SimPin {
    fn is_set_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.is_high())
    }

    fn is_set_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.is_high())
    }

    fn toggle(&mut self) -> Result<(), Self::Error> {
        self.level.with_mut(|l| {
            l.high = !l.high;
            l.toggles += 1;
        });
        Ok(())
    }
}
