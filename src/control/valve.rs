//! Bounded proportional-step valve controller.
//!
//! Each reading is compared against the target SpO2 and nudges the valve
//! by at most `max_steps_per_reading`.  There is no integral or derivative
//! term: every reading is evaluated on its own against the live position.
//!
//! ```text
//!   spo2 < target ──▶ open  min(cap, max − pos)
//!   spo2 > target ──▶ close min(cap, pos)
//!   spo2 = target ──▶ hold
//! ```
//!
//! The clamp is applied before the move is issued, so the tracked position
//! can never leave `[0, max_steps]`.  A move that stalls part-way still
//! advances the position by the pulses that actually went out.

use log::{info, warn};

use crate::app::ports::{ValveDirection, ValvePort};
use crate::config::SystemConfig;
use crate::error::ActuatorError;
use crate::telemetry::Reading;

/// Tracked valve state.  The controller is its only owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ValveState {
    /// Steps open from the fully-closed stop.
    pub position_steps: u32,
    /// True only while a move is being pulsed out.
    pub moving: bool,
}

/// What the controller did with one reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValveAction {
    Opened { steps: u32, position: u32 },
    Closed { steps: u32, position: u32 },
    /// SpO2 low but the valve is already at `max_steps`.
    FullyOpen,
    /// SpO2 high but the valve is already closed.
    FullyClosed,
    /// SpO2 on target.
    Hold,
    /// The motor faulted after `steps` of the requested pulses; the position
    /// reflects only those.
    MoveFailed { steps: u32, position: u32 },
}

pub struct ValveController {
    state: ValveState,
    target_spo2: u8,
    step_cap: u32,
    max_steps: u32,
}

impl ValveController {
    /// A fresh controller assumes the valve is fully closed.
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            state: ValveState::default(),
            target_spo2: config.target_spo2_percent,
            step_cap: config.max_steps_per_reading,
            max_steps: config.valve_max_steps,
        }
    }

    /// Apply one reading, moving the valve synchronously if needed.
    pub fn apply(&mut self, reading: &Reading, valve: &mut impl ValvePort) -> ValveAction {
        let spo2 = reading.spo2_percent();
        let pos = self.state.position_steps;

        if spo2 < self.target_spo2 {
            let steps = self.step_cap.min(self.max_steps - pos);
            if steps == 0 {
                info!("SpO2 {}% low, valve already fully open", spo2);
                return ValveAction::FullyOpen;
            }
            info!("SpO2 {}% low, opening {} steps", spo2, steps);
            match self.drive(valve, ValveDirection::Open, steps) {
                Ok(()) => {
                    self.state.position_steps = pos + steps;
                    ValveAction::Opened { steps, position: self.state.position_steps }
                }
                Err(done) => {
                    self.state.position_steps = (pos + done).min(self.max_steps);
                    ValveAction::MoveFailed { steps: done, position: self.state.position_steps }
                }
            }
        } else if spo2 > self.target_spo2 {
            let steps = self.step_cap.min(pos);
            if steps == 0 {
                info!("SpO2 {}% high, valve already fully closed", spo2);
                return ValveAction::FullyClosed;
            }
            info!("SpO2 {}% high, closing {} steps", spo2, steps);
            match self.drive(valve, ValveDirection::Close, steps) {
                Ok(()) => {
                    self.state.position_steps = pos - steps;
                    ValveAction::Closed { steps, position: self.state.position_steps }
                }
                Err(done) => {
                    self.state.position_steps = pos.saturating_sub(done);
                    ValveAction::MoveFailed { steps: done, position: self.state.position_steps }
                }
            }
        } else {
            info!("SpO2 {}% on target, no adjustment", spo2);
            ValveAction::Hold
        }
    }

    pub fn state(&self) -> ValveState {
        self.state
    }

    pub fn position(&self) -> u32 {
        self.state.position_steps
    }

    pub fn max_steps(&self) -> u32 {
        self.max_steps
    }

    /// Issue the move.  On failure, returns how many of `steps` completed.
    fn drive(&mut self, valve: &mut impl ValvePort, dir: ValveDirection, steps: u32) -> Result<(), u32> {
        self.state.moving = true;
        let result = valve.move_valve(dir, steps);
        self.state.moving = false;
        result.map_err(|e| {
            warn!("Valve {:?} {} steps failed: {}", dir, steps, e);
            match e {
                ActuatorError::Stalled { completed } => completed.min(steps),
                ActuatorError::GpioWriteFailed => 0,
            }
        })
    }
}
