//! Valve stepper driver (A4988 STEP/DIR/EN).
//!
//! One step is a full HIGH/LOW period on STEP with `step_pulse_us` held on
//! each edge.  DIR HIGH opens the valve.  EN is active low and is asserted
//! once at construction; the driver then holds torque for its lifetime.
//!
//! Generic over `embedded-hal` pins and delay so the same code runs on
//! ESP-IDF `PinDriver`s and on host mocks.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::app::ports::ValveDirection;
use crate::error::ActuatorError;

pub struct StepperDriver<STEP, DIR, EN, D> {
    step: STEP,
    dir: DIR,
    enable: EN,
    delay: D,
    pulse_us: u32,
}

impl<STEP, DIR, EN, D> StepperDriver<STEP, DIR, EN, D>
where
    STEP: OutputPin,
    DIR: OutputPin,
    EN: OutputPin,
    D: DelayNs,
{
    /// Take ownership of the pins and energise the driver.
    pub fn new(step: STEP, dir: DIR, enable: EN, delay: D, pulse_us: u32) -> Result<Self, ActuatorError> {
        let mut driver = Self {
            step,
            dir,
            enable,
            delay,
            pulse_us,
        };
        driver.step.set_low().map_err(|_| ActuatorError::GpioWriteFailed)?;
        driver.enable.set_low().map_err(|_| ActuatorError::GpioWriteFailed)?;
        Ok(driver)
    }

    /// Pulse out `steps` in `direction`.  Blocks for `steps × 2 × pulse_us`.
    ///
    /// A DIR fault means nothing moved and yields `GpioWriteFailed`.  A STEP
    /// fault mid-move yields `Stalled` with the pulses already out: the A4988
    /// steps on the rising edge, so a pulse counts once STEP went high.
    pub fn step(&mut self, direction: ValveDirection, steps: u32) -> Result<(), ActuatorError> {
        match direction {
            ValveDirection::Open => self.dir.set_high(),
            ValveDirection::Close => self.dir.set_low(),
        }
        .map_err(|_| ActuatorError::GpioWriteFailed)?;

        for completed in 0..steps {
            self.step.set_high().map_err(|_| ActuatorError::Stalled { completed })?;
            self.delay.delay_us(self.pulse_us);
            self.step
                .set_low()
                .map_err(|_| ActuatorError::Stalled { completed: completed + 1 })?;
            self.delay.delay_us(self.pulse_us);
        }
        Ok(())
    }
}
