//! End-to-end orchestration: AppService over the simulated central and
//! mock actuators, driven with an explicit clock.

use autooxy::adapters::ble_central::{BleCentral, SimPeripheral};
use autooxy::app::events::AppEvent;
use autooxy::app::ports::ValveDirection;
use autooxy::app::service::AppService;
use autooxy::config::SystemConfig;
use autooxy::control::valve::ValveAction;
use autooxy::error::{DecodeError, LinkError};
use autooxy::link::LinkState;

use crate::mock_hw::{frame, leak_queue, MockHardware, RecordingSink};

struct Rig {
    app: AppService<BleCentral>,
    hw: MockHardware,
    sink: RecordingSink,
}

impl Rig {
    fn start(peripheral: SimPeripheral) -> Self {
        let config = SystemConfig::default();
        let mut rig = Self {
            app: AppService::new(&config, BleCentral::new(peripheral), leak_queue()),
            hw: MockHardware::new(),
            sink: RecordingSink::new(),
        };
        rig.app.start(0, &mut rig.hw, &mut rig.sink);
        rig
    }

    fn tick(&mut self, now_ms: u64) {
        self.app.tick(now_ms, &mut self.hw, &mut self.sink);
    }

    /// Peripheral notifies, then the next tick at `now_ms` routes it.
    fn reading_at(&mut self, now_ms: u64, spo2: u8) {
        assert!(self.app.link().central().sim_notify(&frame(72, spo2)));
        self.tick(now_ms);
    }

    fn central(&mut self) -> &mut BleCentral {
        self.app.link_mut().central_mut()
    }
}

// ── Startup ───────────────────────────────────────────────────

#[test]
fn start_connects_and_silences_buzzer() {
    let rig = Rig::start(SimPeripheral::oximeter());

    assert_eq!(rig.app.link_state(), LinkState::Connected { since_ms: 0 });
    assert_eq!(rig.sink.events[0], AppEvent::Started);
    assert_eq!(
        rig.sink.events[1],
        AppEvent::LinkChanged {
            from: LinkState::Disconnected,
            to: LinkState::Connected { since_ms: 0 },
        }
    );
    assert_eq!(rig.hw.buzzer_writes(), 1);
    assert!(!rig.hw.buzzer_on());
    assert_eq!(rig.app.valve().position(), 0);
}

// ── Control ───────────────────────────────────────────────────

#[test]
fn low_readings_open_valve_in_capped_steps() {
    let mut rig = Rig::start(SimPeripheral::oximeter());
    let mut positions = Vec::new();
    for (i, t) in [1_000, 2_000, 3_000].into_iter().enumerate() {
        rig.reading_at(t, 90);
        positions.push(rig.app.valve().position());
        assert_eq!(rig.app.tick_count(), i as u64 + 1);
    }

    assert_eq!(positions, vec![50, 100, 150]);
    assert_eq!(rig.hw.moves(), vec![(ValveDirection::Open, 50); 3]);
    assert_eq!(
        rig.sink.count(|e| matches!(e, AppEvent::ValveMoved(ValveAction::Opened { .. }))),
        3
    );
}

#[test]
fn telemetry_reflects_latest_reading() {
    let mut rig = Rig::start(SimPeripheral::oximeter());
    assert!(rig.app.build_telemetry().is_none());

    rig.reading_at(500, 93);
    let t = rig.app.build_telemetry().unwrap();
    assert_eq!(t.spo2_percent, 93);
    assert_eq!(t.heart_rate_bpm, 72);
    assert_eq!(t.valve_position, 50);
    assert!(!t.alarm_active);
    assert!(rig.sink.events.contains(&AppEvent::Reading(t)));
}

#[test]
fn on_target_reading_holds_without_event() {
    let mut rig = Rig::start(SimPeripheral::oximeter());
    rig.reading_at(100, 98);
    assert!(rig.hw.moves().is_empty());
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::ValveMoved(_))), 0);
}

#[test]
fn short_payload_is_dropped() {
    let mut rig = Rig::start(SimPeripheral::oximeter());
    assert!(rig.app.link().central().sim_notify(&[1, 2, 3, 4]));
    rig.tick(100);

    assert!(rig
        .sink
        .events
        .contains(&AppEvent::DecodeRejected(DecodeError::TooShort { len: 4 })));
    assert!(rig.hw.moves().is_empty());
    assert!(rig.app.last_reading().is_none());
}

#[test]
fn failed_move_keeps_position() {
    let mut rig = Rig::start(SimPeripheral::oximeter());
    rig.hw.fail_moves = true;
    rig.reading_at(100, 85);

    assert_eq!(rig.app.valve().position(), 0);
    assert!(rig
        .sink
        .events
        .contains(&AppEvent::ValveMoved(ValveAction::MoveFailed { steps: 0, position: 0 })));
}

#[test]
fn stalled_move_tracks_pulses_that_went_out() {
    let mut rig = Rig::start(SimPeripheral::oximeter());
    rig.hw.stall_after = Some(30);
    rig.reading_at(100, 90);

    assert_eq!(rig.app.valve().position(), 30);
    assert!(rig
        .sink
        .events
        .contains(&AppEvent::ValveMoved(ValveAction::MoveFailed { steps: 30, position: 30 })));

    // The next reading continues from where the valve really is.
    rig.hw.stall_after = None;
    rig.reading_at(200, 90);
    assert_eq!(rig.app.valve().position(), 80);
    assert_eq!(rig.hw.moves(), vec![(ValveDirection::Open, 30), (ValveDirection::Open, 50)]);
}

// ── Staleness alarm ───────────────────────────────────────────

#[test]
fn alarm_fires_strictly_after_staleness_window() {
    let mut rig = Rig::start(SimPeripheral::oximeter());
    rig.reading_at(0, 97);

    rig.tick(29_900);
    assert!(!rig.hw.buzzer_on());
    rig.tick(30_000);
    assert!(!rig.hw.buzzer_on());
    rig.tick(30_100);
    assert!(rig.hw.buzzer_on());
    assert!(rig.app.alarm().is_active());
    assert!(rig
        .sink
        .events
        .contains(&AppEvent::AlarmChanged { active: true }));
}

#[test]
fn alarm_holds_until_next_reading() {
    let mut rig = Rig::start(SimPeripheral::oximeter());
    for t in (100..=60_000).step_by(100) {
        rig.tick(t);
    }
    assert!(rig.hw.buzzer_on());
    let writes = rig.hw.buzzer_writes();

    rig.reading_at(60_100, 96);
    assert!(!rig.hw.buzzer_on());
    assert_eq!(rig.hw.buzzer_writes(), writes + 1);
    assert!(rig
        .sink
        .events
        .contains(&AppEvent::AlarmChanged { active: false }));
}

#[test]
fn rejected_buzzer_write_is_retried_until_it_sounds() {
    let mut rig = Rig::start(SimPeripheral::oximeter());
    rig.hw.buzzer_failures = 5;

    for t in (100..=30_500).step_by(100) {
        rig.tick(t);
    }
    assert!(!rig.hw.buzzer_on());
    assert!(!rig.app.alarm().is_active());
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::AlarmChanged { .. })), 0);

    rig.tick(30_600);
    assert!(rig.hw.buzzer_on());
    assert!(rig.app.alarm().is_active());
    assert_eq!(
        rig.sink.count(|e| *e == AppEvent::AlarmChanged { active: true }),
        1
    );
}

#[test]
fn rejected_clear_is_retried_on_next_tick() {
    let mut rig = Rig::start(SimPeripheral::oximeter());
    rig.tick(30_100);
    assert!(rig.hw.buzzer_on());

    // Both the clear on the reading and the retry in the same tick fail.
    rig.hw.buzzer_failures = 2;
    rig.reading_at(30_200, 96);
    assert!(rig.hw.buzzer_on());
    assert!(rig.app.alarm().is_active());

    rig.tick(30_300);
    assert!(!rig.hw.buzzer_on());
    assert!(rig
        .sink
        .events
        .contains(&AppEvent::AlarmChanged { active: false }));
}

#[test]
fn unreachable_peripheral_alarms_after_window() {
    let mut p = SimPeripheral::oximeter();
    p.reachable = false;
    let mut rig = Rig::start(p);

    for t in (100..=30_000).step_by(100) {
        rig.tick(t);
    }
    assert!(!rig.hw.buzzer_on());
    // Attempts at 0, 5 s, 10 s ... 30 s.
    assert_eq!(rig.central().sim_connects(), 7);

    rig.tick(30_100);
    assert!(rig.hw.buzzer_on());
}

#[test]
fn reconnect_does_not_reset_staleness() {
    let mut rig = Rig::start(SimPeripheral::oximeter());
    rig.reading_at(0, 97);

    rig.central().sim_drop_link();
    rig.tick(10_000);
    assert!(rig.app.link().is_connected());

    rig.tick(30_100);
    assert!(rig.hw.buzzer_on());
}

// ── Link recovery ─────────────────────────────────────────────

#[test]
fn missing_service_retries_on_cadence() {
    let mut p = SimPeripheral::oximeter();
    p.service_uuid = None;
    let mut rig = Rig::start(p);

    assert_eq!(rig.app.link_state(), LinkState::ServiceUnavailable);
    assert!(rig
        .sink
        .events
        .contains(&AppEvent::LinkFailed(LinkError::ServiceUnavailable)));
    assert_eq!(rig.central().sim_disconnects(), 1);

    for t in (100..5_000).step_by(100) {
        rig.tick(t);
    }
    assert_eq!(rig.central().sim_connects(), 1);

    rig.central().sim().service_uuid = Some(autooxy::config::OXIMETER_SERVICE_UUID);
    rig.tick(5_000);
    assert_eq!(rig.central().sim_connects(), 2);
    assert_eq!(rig.app.link_state(), LinkState::Connected { since_ms: 5_000 });
}

#[test]
fn silent_drop_reconnects_when_due() {
    let mut rig = Rig::start(SimPeripheral::oximeter());
    rig.central().sim_drop_link();
    rig.tick(2_000);

    assert_eq!(rig.app.link_state(), LinkState::Disconnected);
    assert!(rig.sink.events.contains(&AppEvent::LinkChanged {
        from: LinkState::Connected { since_ms: 0 },
        to: LinkState::Disconnected,
    }));
    assert_eq!(rig.central().sim_disconnects(), 1);

    rig.tick(4_900);
    assert!(!rig.app.link().is_connected());
    rig.tick(5_000);
    assert_eq!(rig.app.link_state(), LinkState::Connected { since_ms: 5_000 });
}

#[test]
fn stale_session_notification_never_reaches_valve() {
    let mut rig = Rig::start(SimPeripheral::oximeter());
    let old_sink = rig.app.link().central().sim_sink().unwrap();

    rig.central().sim_drop_link();
    rig.tick(5_000);
    assert!(rig.app.link().is_connected());

    // Late delivery on the revoked subscription.
    assert!(old_sink.deliver(&frame(60, 80)));
    rig.tick(5_100);

    assert!(rig.hw.moves().is_empty());
    assert!(rig.app.last_reading().is_none());
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::Reading(_))), 0);
}
