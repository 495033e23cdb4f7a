//! Fuzz target: notification queue → decode → valve controller
//!
//! Splits the input into notification payloads, pushes them through the
//! bounded queue and applies every decoded reading against a valve that
//! may stall mid-move.  The valve position must stay within travel no
//! matter what arrives.
//!
//! cargo fuzz run fuzz_notification_path

#![no_main]

use autooxy::app::ports::{ValveDirection, ValvePort};
use autooxy::config::SystemConfig;
use autooxy::control::valve::ValveController;
use autooxy::error::ActuatorError;
use autooxy::notify::{NotificationQueue, NotifySink};
use autooxy::telemetry::decode;
use libfuzzer_sys::fuzz_target;

static QUEUE: NotificationQueue = NotificationQueue::new();

/// Stalls any move longer than `stall_after` steps.
struct StallingValve {
    stall_after: u32,
}

impl ValvePort for StallingValve {
    fn move_valve(&mut self, _: ValveDirection, steps: u32) -> Result<(), ActuatorError> {
        if steps > self.stall_after {
            return Err(ActuatorError::Stalled { completed: self.stall_after });
        }
        Ok(())
    }
}

fuzz_target!(|data: &[u8]| {
    while QUEUE.pop().is_some() {}

    // First byte picks where moves stall; 0xFF never stalls.
    let Some((&stall, data)) = data.split_first() else {
        return;
    };
    let mut valve = StallingValve {
        stall_after: if stall == 0xFF { u32::MAX } else { u32::from(stall) },
    };

    let config = SystemConfig::default();
    let mut ctl = ValveController::new(&config);
    let sink = NotifySink::new(1, &QUEUE);

    // 0xFF separates payloads.
    for chunk in data.split(|&b| b == 0xFF) {
        sink.deliver(chunk);
        while let Some(n) = QUEUE.pop() {
            if let Ok(r) = decode(&n.payload, 0) {
                ctl.apply(&r, &mut valve);
                assert!(ctl.position() <= config.valve_max_steps);
            }
        }
    }
});
