//! Alarm supervisor.
//!
//! Drives the relay-switched buzzer from exactly two inputs:
//!
//! 1. **Staleness**: evaluated every control tick.  Once more than
//!    `staleness_timeout_ms` has passed since the last decoded reading,
//!    the alarm is asserted.  Detection latency is bounded by the tick.
//! 2. **Fresh data**: every decoded reading forces the alarm off, whatever
//!    its SpO2 value.
//!
//! The alarm never clears on a timer; only a new reading silences it.
//! A lost link has no alarm edge of its own: it surfaces through the same
//! staleness check once the timeout elapses.
//!
//! The buzzer is only written when the wanted level differs from the one
//! last applied.  A rejected write leaves the applied level untouched, so
//! the next tick retries it.

use log::{error, info, warn};

use crate::app::ports::BuzzerPort;
use crate::config::SystemConfig;

/// Supervisor-owned alarm state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AlarmState {
    /// Level the buzzer actually holds.
    pub active: bool,
    /// Last contact: the most recent decoded reading, or the moment the
    /// staleness clock was armed at startup.
    pub last_reading_at_ms: Option<u64>,
}

pub struct AlarmSupervisor {
    state: AlarmState,
    timeout_ms: u64,
    /// Level the supervisor has decided on; may be ahead of `state.active`
    /// while a buzzer write is failing.
    wanted: bool,
    /// Whether any level has been written to the buzzer successfully.
    driven: bool,
}

impl AlarmSupervisor {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            state: AlarmState::default(),
            timeout_ms: config.staleness_timeout_ms,
            wanted: false,
            driven: false,
        }
    }

    /// Start the staleness clock and put the buzzer in a known (off) state.
    ///
    /// Arming at boot means a peripheral that is never reachable still ends
    /// up alarming once the timeout elapses.
    pub fn arm(&mut self, now_ms: u64, buzzer: &mut impl BuzzerPort) {
        self.state.last_reading_at_ms = Some(now_ms);
        self.wanted = false;
        self.sync(buzzer);
    }

    /// A reading was decoded: record contact and silence the alarm.
    /// Returns `true` if the buzzer level changed.
    pub fn on_reading(&mut self, at_ms: u64, buzzer: &mut impl BuzzerPort) -> bool {
        self.state.last_reading_at_ms = Some(at_ms);
        self.wanted = false;
        self.sync(buzzer)
    }

    /// Per-tick staleness check, which also retries a buzzer write that
    /// failed earlier.  Returns `true` if the buzzer level changed; read
    /// [`is_active`](Self::is_active) for the new level.
    pub fn evaluate(&mut self, now_ms: u64, buzzer: &mut impl BuzzerPort) -> bool {
        let Some(last) = self.state.last_reading_at_ms else {
            return false;
        };
        let silent_for = now_ms.saturating_sub(last);
        if silent_for > self.timeout_ms && !self.wanted {
            error!("ALARM: no telemetry for {} ms", silent_for);
            self.wanted = true;
        }
        self.sync(buzzer)
    }

    pub fn state(&self) -> AlarmState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state.active
    }

    // ── Internal ──────────────────────────────────────────────────

    fn sync(&mut self, buzzer: &mut impl BuzzerPort) -> bool {
        let on = self.wanted;
        if self.driven && self.state.active == on {
            return false;
        }
        if let Err(e) = buzzer.set_alarm(on) {
            warn!("Buzzer {} failed: {}; retrying next tick", if on { "ON" } else { "OFF" }, e);
            return false;
        }
        let changed = self.state.active != on;
        self.state.active = on;
        self.driven = true;
        if changed {
            if on {
                error!("ALARM ON");
            } else {
                info!("ALARM OFF");
            }
        }
        changed
    }
}
