//! Mock hardware and event sink for integration tests.
//!
//! Records every actuator call so tests can assert on the full command
//! history without touching real GPIO.

use autooxy::app::events::AppEvent;
use autooxy::app::ports::{BuzzerPort, EventSink, ValveDirection, ValvePort};
use autooxy::error::ActuatorError;
use autooxy::notify::NotificationQueue;

// ── Actuator call record ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwCall {
    Move { direction: ValveDirection, steps: u32 },
    Alarm(bool),
}

// ── MockHardware ──────────────────────────────────────────────

#[derive(Default)]
pub struct MockHardware {
    pub calls: Vec<HwCall>,
    pub fail_moves: bool,
    /// Moves longer than this stall after pulsing this many steps.
    pub stall_after: Option<u32>,
    /// Reject this many buzzer writes before accepting any.
    pub buzzer_failures: u32,
}

#[allow(dead_code)]
impl MockHardware {
    pub fn new() -> Self {
        Self::default()
    }

    /// Level of the most recent buzzer write (`false` if never written).
    pub fn buzzer_on(&self) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                HwCall::Alarm(on) => Some(*on),
                HwCall::Move { .. } => None,
            })
            .unwrap_or(false)
    }

    pub fn buzzer_writes(&self) -> usize {
        self.calls.iter().filter(|c| matches!(c, HwCall::Alarm(_))).count()
    }

    pub fn moves(&self) -> Vec<(ValveDirection, u32)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                HwCall::Move { direction, steps } => Some((*direction, *steps)),
                HwCall::Alarm(_) => None,
            })
            .collect()
    }
}

impl ValvePort for MockHardware {
    fn move_valve(&mut self, direction: ValveDirection, steps: u32) -> Result<(), ActuatorError> {
        if self.fail_moves {
            return Err(ActuatorError::GpioWriteFailed);
        }
        if let Some(completed) = self.stall_after.filter(|&k| k < steps) {
            self.calls.push(HwCall::Move { direction, steps: completed });
            return Err(ActuatorError::Stalled { completed });
        }
        self.calls.push(HwCall::Move { direction, steps });
        Ok(())
    }
}

impl BuzzerPort for MockHardware {
    fn set_alarm(&mut self, on: bool) -> Result<(), ActuatorError> {
        if self.buzzer_failures > 0 {
            self.buzzer_failures -= 1;
            return Err(ActuatorError::GpioWriteFailed);
        }
        self.calls.push(HwCall::Alarm(on));
        Ok(())
    }
}

// ── Event sink ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Helpers ───────────────────────────────────────────────────

/// A queue with the `'static` lifetime the transport needs.
pub fn leak_queue() -> &'static NotificationQueue {
    Box::leak(Box::new(NotificationQueue::new()))
}

/// Oximeter frame carrying `hr` and `spo2` at their wire offsets.
#[allow(dead_code)]
pub fn frame(hr: u8, spo2: u8) -> [u8; 5] {
    [0x81, 0x00, 0x00, hr, spo2]
}
