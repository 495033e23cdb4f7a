//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (BLE central, stepper, relay, event sinks) implement these
//! traits.  The [`AppService`](super::service::AppService) consumes them via
//! generics, so the domain core never touches the radio or GPIO directly.
//!
//! ## Ownership
//!
//! - Connection, service and characteristic handles are associated types
//!   owned by whoever called [`CentralPort::connect`].  Only the
//!   [`LinkSupervisor`](crate::link::LinkSupervisor) ever holds them.
//! - [`CentralPort::disconnect`] consumes the connection handle: once it
//!   returns, no handle derived from that connection is reachable.

use crate::config::PeerAddress;
use crate::error::{ActuatorError, TransportError};
use crate::notify::NotifySink;

// ───────────────────────────────────────────────────────────────
// BLE central port (driven adapter: domain ↔ radio)
// ───────────────────────────────────────────────────────────────

/// GATT-client capabilities the link supervisor needs from the BLE stack.
///
/// Every call is blocking: it returns once the stack has answered.
pub trait CentralPort {
    /// Live connection handle.
    type Conn;
    /// Discovered primary service.
    type Service;
    /// Discovered characteristic.
    type Char;

    /// Open a connection to `address`.
    fn connect(&mut self, address: &PeerAddress) -> Result<Self::Conn, TransportError>;

    /// Whether the stack still considers `conn` connected.
    fn is_alive(&self, conn: &Self::Conn) -> bool;

    /// Look up a primary service by 128-bit UUID.
    fn lookup_service(&mut self, conn: &Self::Conn, uuid: u128) -> Option<Self::Service>;

    /// Look up a characteristic of `service` by 128-bit UUID.
    fn lookup_characteristic(&mut self, service: &Self::Service, uuid: u128) -> Option<Self::Char>;

    /// Enable notifications on `characteristic`; payloads go to `sink`.
    fn subscribe(&mut self, characteristic: &Self::Char, sink: NotifySink) -> Result<(), TransportError>;

    /// Close the connection and drop any subscription riding on it.
    fn disconnect(&mut self, conn: Self::Conn);
}

// ───────────────────────────────────────────────────────────────
// Actuator ports (driven adapters: domain → hardware)
// ───────────────────────────────────────────────────────────────

/// Valve travel direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValveDirection {
    /// More oxygen flow.
    Open,
    /// Less oxygen flow.
    Close,
}

/// Stepper-driven valve.
pub trait ValvePort {
    /// Move `steps` in `direction`.  Blocks until the last pulse is out.
    fn move_valve(&mut self, direction: ValveDirection, steps: u32) -> Result<(), ActuatorError>;
}

/// Relay-switched audible alarm.
pub trait BuzzerPort {
    /// Drive the buzzer level.  On error the previous level is still in force.
    fn set_alarm(&mut self, on: bool) -> Result<(), ActuatorError>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.
pub trait EventSink {
    fn emit(&mut self, event: &super::events::AppEvent);
}
