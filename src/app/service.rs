//! Application service: the hexagonal core.
//!
//! [`AppService`] owns the link supervisor, valve controller and alarm
//! supervisor.  It exposes a hardware-agnostic, clock-agnostic API: the
//! caller passes the monotonic time in and the ports to act on, which keeps
//! every tick deterministic under test.
//!
//! ```text
//!  CentralPort ──▶ ┌──────────────────────────┐ ──▶ EventSink
//!  (notify queue)  │        AppService        │
//!   ValvePort  ◀── │ Link · Valve · Alarm     │
//!   BuzzerPort ◀── └──────────────────────────┘
//! ```

use log::{debug, info, warn};

use crate::alarm::AlarmSupervisor;
use crate::config::SystemConfig;
use crate::control::valve::{ValveAction, ValveController};
use crate::link::{LinkState, LinkSupervisor, ReconnectTimer};
use crate::notify::NotificationQueue;
use crate::telemetry::{self, Reading};

use super::events::{AppEvent, TelemetryData};
use super::ports::{BuzzerPort, CentralPort, EventSink, ValvePort};

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService<C: CentralPort> {
    link: LinkSupervisor<C>,
    reconnect: ReconnectTimer,
    valve: ValveController,
    alarm: AlarmSupervisor,
    last_reading: Option<Reading>,
    tick_count: u64,
}

impl<C: CentralPort> AppService<C> {
    /// Construct the service.  Nothing is driven until [`start`](Self::start).
    pub fn new(config: &SystemConfig, central: C, queue: &'static NotificationQueue) -> Self {
        Self {
            link: LinkSupervisor::new(central, config.peripheral, queue),
            reconnect: ReconnectTimer::new(config.reconnect_interval_ms),
            valve: ValveController::new(config),
            alarm: AlarmSupervisor::new(config),
            last_reading: None,
            tick_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Put the outputs in a known state, arm the staleness clock and make
    /// the first connect attempt.
    pub fn start(&mut self, now_ms: u64, hw: &mut (impl ValvePort + BuzzerPort), sink: &mut impl EventSink) {
        self.alarm.arm(now_ms, hw);
        warn!(
            "Valve position not persisted; assuming fully closed (0/{})",
            self.valve.max_steps()
        );
        sink.emit(&AppEvent::Started);
        info!("AppService started");
        self.attempt_connect(now_ms, sink);
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one control cycle: link health → reconnect → notifications → staleness.
    ///
    /// `hw` satisfies both [`ValvePort`] and [`BuzzerPort`], which avoids a
    /// double mutable borrow while keeping the port boundary explicit.
    pub fn tick(&mut self, now_ms: u64, hw: &mut (impl ValvePort + BuzzerPort), sink: &mut impl EventSink) {
        self.tick_count += 1;

        // 1. Silent drops reported by the stack
        let before = self.link.state();
        if self.link.check_alive() {
            sink.emit(&AppEvent::LinkChanged {
                from: before,
                to: self.link.state(),
            });
        }

        // 2. Fixed-cadence reconnect
        if !self.link.is_connected() && self.reconnect.is_due(now_ms) {
            self.attempt_connect(now_ms, sink);
        }

        // 3. Route queued notifications
        self.drain_notifications(now_ms, hw, sink);

        // 4. Staleness (and any buzzer write still pending)
        if self.alarm.evaluate(now_ms, hw) {
            sink.emit(&AppEvent::AlarmChanged {
                active: self.alarm.is_active(),
            });
        }
    }

    /// Decode and apply every notification queued for the live subscription.
    /// Returns the number of payloads processed.
    pub fn drain_notifications(
        &mut self,
        now_ms: u64,
        hw: &mut (impl ValvePort + BuzzerPort),
        sink: &mut impl EventSink,
    ) -> usize {
        let mut handled = 0;
        while let Some(n) = self.link.next_notification() {
            self.handle_payload(&n.payload, now_ms, hw, sink);
            handled += 1;
        }
        handled
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn link(&self) -> &LinkSupervisor<C> {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut LinkSupervisor<C> {
        &mut self.link
    }

    pub fn link_state(&self) -> LinkState {
        self.link.state()
    }

    pub fn valve(&self) -> &ValveController {
        &self.valve
    }

    pub fn alarm(&self) -> &AlarmSupervisor {
        &self.alarm
    }

    pub fn last_reading(&self) -> Option<Reading> {
        self.last_reading
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Snapshot of the latest reading with current outputs, if any reading
    /// has arrived yet.
    pub fn build_telemetry(&self) -> Option<TelemetryData> {
        self.last_reading.map(|r| TelemetryData {
            spo2_percent: r.spo2_percent(),
            heart_rate_bpm: r.heart_rate_bpm(),
            valve_position: self.valve.position(),
            alarm_active: self.alarm.is_active(),
        })
    }

    // ── Internal ──────────────────────────────────────────────

    fn attempt_connect(&mut self, now_ms: u64, sink: &mut impl EventSink) {
        let from = self.link.state();
        self.reconnect.record_attempt(now_ms);
        let result = self.link.connect(now_ms);
        let to = self.link.state();
        if from != to {
            sink.emit(&AppEvent::LinkChanged { from, to });
        }
        if let Err(e) = result {
            warn!(
                "Link attempt failed: {}; next retry in {} ms",
                e,
                self.reconnect.interval_ms()
            );
            sink.emit(&AppEvent::LinkFailed(e));
        }
    }

    /// decode → controller → alarm, as one uninterrupted transition.
    fn handle_payload(
        &mut self,
        bytes: &[u8],
        now_ms: u64,
        hw: &mut (impl ValvePort + BuzzerPort),
        sink: &mut impl EventSink,
    ) {
        debug!("RX [{}] {}", bytes.len(), telemetry::hex_dump(bytes));

        let reading = match telemetry::decode(bytes, now_ms) {
            Ok(r) => r,
            Err(e) => {
                warn!("Dropping notification: {}", e);
                sink.emit(&AppEvent::DecodeRejected(e));
                return;
            }
        };
        info!(
            "SpO2 {}%, HR {} bpm",
            reading.spo2_percent(),
            reading.heart_rate_bpm()
        );

        let action = self.valve.apply(&reading, hw);
        let alarm_cleared = self.alarm.on_reading(reading.received_at_ms(), hw);
        self.last_reading = Some(reading);

        if let Some(t) = self.build_telemetry() {
            sink.emit(&AppEvent::Reading(t));
        }
        if action != ValveAction::Hold {
            sink.emit(&AppEvent::ValveMoved(action));
        }
        if alarm_cleared {
            sink.emit(&AppEvent::AlarmChanged { active: false });
        }
    }
}
