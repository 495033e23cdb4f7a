//! Hardware adapter: bridges the valve stepper and buzzer relay to the
//! domain port traits.
//!
//! The drivers are generic over `embedded-hal`, so on ESP-IDF this wraps
//! `PinDriver`s and on host it wraps whatever mock pins a test supplies.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;
use log::debug;

use crate::app::ports::{BuzzerPort, ValveDirection, ValvePort};
use crate::drivers::buzzer::BuzzerRelay;
use crate::drivers::stepper::StepperDriver;
use crate::error::ActuatorError;

/// Concrete adapter that combines all actuators behind port traits.
pub struct HardwareAdapter<STEP, DIR, EN, D, BZ> {
    stepper: StepperDriver<STEP, DIR, EN, D>,
    buzzer: BuzzerRelay<BZ>,
}

impl<STEP, DIR, EN, D, BZ> HardwareAdapter<STEP, DIR, EN, D, BZ>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    D: DelayNs,
    BZ: OutputPin,
{
    pub fn new(stepper: StepperDriver<STEP, DIR, EN, D>, buzzer: BuzzerRelay<BZ>) -> Self {
        Self { stepper, buzzer }
    }
}

// ── ValvePort implementation ──────────────────────────────────

impl<STEP, DIR, EN, D, BZ> ValvePort for HardwareAdapter<STEP, DIR, EN, D, BZ>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    D: DelayNs,
    BZ: OutputPin,
{
    fn move_valve(&mut self, direction: ValveDirection, steps: u32) -> Result<(), ActuatorError> {
        debug!("Stepper: {:?} x{}", direction, steps);
        self.stepper.step(direction, steps)
    }
}

// ── BuzzerPort implementation ─────────────────────────────────

impl<STEP, DIR, EN, D, BZ> BuzzerPort for HardwareAdapter<STEP, DIR, EN, D, BZ>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    D: DelayNs,
    BZ: OutputPin,
{
    fn set_alarm(&mut self, on: bool) -> Result<(), ActuatorError> {
        self.buzzer.set(on)
    }
}
