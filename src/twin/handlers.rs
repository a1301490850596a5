//! Stock command handlers.

use embedded_hal::digital::StatefulOutputPin;
use log::{info, warn};

use super::commands::{CommandHandler, CommandRequest, HandlerOutcome, Resolution};

/// Longest deferral, in ticks, a toggle request may ask for.
pub const MAX_TOGGLE_DELAY: i64 = 3;

/// Toggles an output pin, optionally after a number of periodic ticks.
///
/// With no arguments the pin flips immediately. A `ticks` argument in
/// `1..=MAX_TOGGLE_DELAY` defers the flip and the response; any other
/// value is treated as zero.
pub struct DelayedToggle<P> {
    pin: P,
    arg_name: &'static str,
    remaining: u8,
}

impl<P: StatefulOutputPin> DelayedToggle<P> {
    pub fn new(pin: P) -> Self {
        Self::with_arg_name(pin, "ticks")
    }

    /// Use a different argument name for the delay count.
    pub fn with_arg_name(pin: P, arg_name: &'static str) -> Self {
        Self {
            pin,
            arg_name,
            remaining: 0,
        }
    }

    pub fn pin(&self) -> &P {
        &self.pin
    }

    /// Ticks left before the deferred toggle fires.
    pub fn remaining(&self) -> u8 {
        self.remaining
    }

    fn toggle(&mut self) -> bool {
        match self.pin.toggle() {
            Ok(()) => true,
            Err(e) => {
                warn!("CMD: toggle failed: {:?}", e);
                false
            }
        }
    }
}

impl<P: StatefulOutputPin + Send> CommandHandler for DelayedToggle<P> {
    fn handle(&mut self, request: &CommandRequest) -> HandlerOutcome {
        let delay = match request.int_arg(self.arg_name) {
            Some(n) if (1..=MAX_TOGGLE_DELAY).contains(&n) => n as u8,
            _ => 0,
        };
        self.remaining = delay;
        if delay == 0 {
            return if self.toggle() {
                HandlerOutcome::Ok
            } else {
                HandlerOutcome::Error
            };
        }
        info!("CMD: toggle deferred by {} ticks", delay);
        HandlerOutcome::Pending
    }

    fn poll_deferred(&mut self) -> Option<Resolution> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        if self.remaining > 0 {
            return None;
        }
        Some(if self.toggle() {
            Resolution::Ok
        } else {
            Resolution::Error
        })
    }
}

/// Closure-backed handler for immediate commands.
pub struct FnHandler<F>(pub F);

impl<F> CommandHandler for FnHandler<F>
where
    F: FnMut(&CommandRequest) -> HandlerOutcome + Send,
{
    fn handle(&mut self, request: &CommandRequest) -> HandlerOutcome {
        (self.0)(request)
    }
}
