//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (UART / USB-CDC in production).  Telemetry snapshots
//! are rendered as one JSON object per line so a host script can tail the
//! console.

use log::{error, info, warn};

use crate::app::events::{AppEvent, TelemetryData};
use crate::app::ports::EventSink;
use crate::control::valve::ValveAction;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

/// JSON line for a telemetry snapshot.
pub fn telemetry_json(t: &TelemetryData) -> String {
    serde_json::to_string(t).unwrap_or_else(|_| String::from("{}"))
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started => {
                info!("START | autooxy controller up");
            }
            AppEvent::LinkChanged { from, to } => {
                info!("LINK  | {:?} -> {:?}", from, to);
            }
            AppEvent::LinkFailed(e) => {
                warn!("LINK  | attempt failed: {}", e);
            }
            AppEvent::Reading(t) => {
                info!("TELEM | {}", telemetry_json(t));
            }
            AppEvent::DecodeRejected(e) => {
                warn!("RX    | rejected: {}", e);
            }
            AppEvent::ValveMoved(action) => match action {
                ValveAction::Opened { steps, position } => {
                    info!("VALVE | +{} -> {}", steps, position);
                }
                ValveAction::Closed { steps, position } => {
                    info!("VALVE | -{} -> {}", steps, position);
                }
                ValveAction::FullyOpen => info!("VALVE | at open stop"),
                ValveAction::FullyClosed => info!("VALVE | at closed stop"),
                ValveAction::Hold => {}
                ValveAction::MoveFailed { steps, position } => {
                    error!("VALVE | move failed after {} steps -> {}", steps, position);
                }
            },
            AppEvent::AlarmChanged { active } => {
                if *active {
                    error!("ALARM | ON (telemetry stale)");
                } else {
                    info!("ALARM | OFF");
                }
            }
        }
    }
}
