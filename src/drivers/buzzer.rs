//! Alarm buzzer behind a relay.  HIGH energises the relay and sounds the buzzer.

use embedded_hal::digital::OutputPin;

use crate::error::ActuatorError;

pub struct BuzzerRelay<P> {
    pin: P,
}

impl<P: OutputPin> BuzzerRelay<P> {
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    /// Drive the relay.  The caller owns the retry if the write fails.
    pub fn set(&mut self, on: bool) -> Result<(), ActuatorError> {
        if on { self.pin.set_high() } else { self.pin.set_low() }.map_err(|_| ActuatorError::GpioWriteFailed)
    }
}
