//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them.

use serde::Serialize;

use crate::control::valve::ValveAction;
use crate::error::{DecodeError, LinkError};
use crate::link::LinkState;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// The application service has started.
    Started,

    /// The peripheral link changed state.
    LinkChanged { from: LinkState, to: LinkState },

    /// A connect attempt failed.
    LinkFailed(LinkError),

    /// A reading was decoded and applied.
    Reading(TelemetryData),

    /// A notification payload was dropped by the decoder.
    DecodeRejected(DecodeError),

    /// The valve controller acted on a reading.
    ValveMoved(ValveAction),

    /// The buzzer level changed.
    AlarmChanged { active: bool },
}

/// A point-in-time telemetry snapshot suitable for logging or transmission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TelemetryData {
    pub spo2_percent: u8,
    pub heart_rate_bpm: u8,
    pub valve_position: u32,
    pub alarm_active: bool,
}
