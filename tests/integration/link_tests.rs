//! Link supervisor against the simulated BLE central.

use autooxy::adapters::ble_central::{BleCentral, SimPeripheral};
use autooxy::config::PeripheralConfig;
use autooxy::error::LinkError;
use autooxy::link::{LinkState, LinkSupervisor};

use crate::mock_hw::{frame, leak_queue};

fn supervisor(peripheral: SimPeripheral) -> LinkSupervisor<BleCentral> {
    LinkSupervisor::new(
        BleCentral::new(peripheral),
        PeripheralConfig::default(),
        leak_queue(),
    )
}

#[test]
fn connect_subscribes_and_records_since() {
    let mut link = supervisor(SimPeripheral::oximeter());
    link.connect(1_234).unwrap();

    assert_eq!(link.state(), LinkState::Connected { since_ms: 1_234 });
    let sink = link.central().sim_sink().expect("subscribed");
    assert_eq!(sink.session(), link.session_id());
}

#[test]
fn unreachable_peripheral_stays_disconnected() {
    let mut p = SimPeripheral::oximeter();
    p.reachable = false;
    let mut link = supervisor(p);

    assert_eq!(link.connect(0), Err(LinkError::ConnectFailed));
    assert_eq!(link.state(), LinkState::Disconnected);
    assert_eq!(link.central().sim_disconnects(), 0);
}

#[test]
fn missing_service_tears_down() {
    let mut p = SimPeripheral::oximeter();
    p.service_uuid = None;
    let mut link = supervisor(p);

    assert_eq!(link.connect(0), Err(LinkError::ServiceUnavailable));
    assert_eq!(link.state(), LinkState::ServiceUnavailable);
    assert_eq!(link.central().sim_disconnects(), 1);
    assert!(link.central().sim_sink().is_none());
}

#[test]
fn missing_characteristic_tears_down() {
    let mut p = SimPeripheral::oximeter();
    p.notify_char_uuid = Some(0xDEAD);
    let mut link = supervisor(p);

    assert_eq!(link.connect(0), Err(LinkError::CharacteristicUnavailable));
    assert_eq!(link.state(), LinkState::ServiceUnavailable);
    assert_eq!(link.central().sim_disconnects(), 1);
}

#[test]
fn subscribe_failure_tears_down() {
    let mut p = SimPeripheral::oximeter();
    p.subscribe_ok = false;
    let mut link = supervisor(p);

    assert_eq!(link.connect(0), Err(LinkError::CharacteristicUnavailable));
    assert_eq!(link.state(), LinkState::ServiceUnavailable);
    assert_eq!(link.central().sim_disconnects(), 1);
}

#[test]
fn teardown_is_idempotent() {
    let mut link = supervisor(SimPeripheral::oximeter());
    link.teardown();
    assert_eq!(link.central().sim_disconnects(), 0);

    link.connect(0).unwrap();
    link.teardown();
    link.teardown();
    assert_eq!(link.state(), LinkState::Disconnected);
    assert_eq!(link.central().sim_disconnects(), 1);
    assert!(link.central().sim_sink().is_none());
}

#[test]
fn reconnect_replaces_previous_link() {
    let mut link = supervisor(SimPeripheral::oximeter());
    link.connect(0).unwrap();
    let first = link.session_id();
    link.connect(5_000).unwrap();

    assert_eq!(link.central().sim_disconnects(), 1);
    assert_ne!(link.session_id(), first);
    assert_eq!(link.state(), LinkState::Connected { since_ms: 5_000 });
}

#[test]
fn silent_drop_detected_once() {
    let mut link = supervisor(SimPeripheral::oximeter());
    link.connect(0).unwrap();
    assert!(!link.check_alive());

    link.central_mut().sim_drop_link();
    assert!(link.check_alive());
    assert_eq!(link.state(), LinkState::Disconnected);
    assert!(!link.check_alive());
}

#[test]
fn notifications_from_old_session_are_discarded() {
    let mut link = supervisor(SimPeripheral::oximeter());
    link.connect(0).unwrap();
    let old_sink = link.central().sim_sink().unwrap();

    link.teardown();
    link.connect(100).unwrap();

    // A late callback from the previous subscription.
    assert!(old_sink.deliver(&frame(70, 90)));
    assert!(link.central().sim_notify(&frame(71, 97)));

    let n = link.next_notification().unwrap();
    assert_eq!(n.payload.as_slice(), &frame(71, 97));
    assert!(link.next_notification().is_none());
}

#[test]
fn nothing_is_routed_while_disconnected() {
    let mut link = supervisor(SimPeripheral::oximeter());
    link.connect(0).unwrap();
    let sink = link.central().sim_sink().unwrap();
    link.central_mut().sim_drop_link();
    link.check_alive();

    sink.deliver(&frame(70, 90));
    assert!(link.next_notification().is_none());
}
