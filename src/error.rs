//! Unified error types for the AutoOxy firmware.
//!
//! Every fault the core can observe is recoverable: link errors become a
//! state transition plus a scheduled retry, decode errors drop one payload,
//! actuator errors are retried or folded into the tracked valve position.  All variants
//! are `Copy` so they can be logged and emitted as events without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The peripheral link could not be established.
    Link(LinkError),
    /// A notification payload could not be decoded.
    Decode(DecodeError),
    /// The BLE stack rejected an operation.
    Transport(TransportError),
    /// An actuator command failed.
    Actuator(ActuatorError),
    /// Configuration is invalid.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Link(e) => write!(f, "link: {e}"),
            Self::Decode(e) => write!(f, "decode: {e}"),
            Self::Transport(e) => write!(f, "transport: {e}"),
            Self::Actuator(e) => write!(f, "actuator: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Link errors
// ---------------------------------------------------------------------------

/// Outcome of a failed [`LinkSupervisor::connect`](crate::link::LinkSupervisor::connect).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkError {
    /// Transport-level connect to the peripheral address failed.
    ConnectFailed,
    /// The oximeter GATT service is not exposed by the peripheral.
    ServiceUnavailable,
    /// The notify characteristic is missing or refused the subscription.
    CharacteristicUnavailable,
}

impl fmt::Display for LinkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectFailed => write!(f, "connect failed"),
            Self::ServiceUnavailable => write!(f, "service unavailable"),
            Self::CharacteristicUnavailable => write!(f, "notify characteristic unavailable"),
        }
    }
}

impl From<LinkError> for Error {
    fn from(e: LinkError) -> Self {
        Self::Link(e)
    }
}

// ---------------------------------------------------------------------------
// Decode errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    /// Payload shorter than the five bytes a reading needs.
    TooShort { len: usize },
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { len } => write!(f, "payload too short ({len} bytes)"),
        }
    }
}

impl From<DecodeError> for Error {
    fn from(e: DecodeError) -> Self {
        Self::Decode(e)
    }
}

// ---------------------------------------------------------------------------
// Transport errors (raised by CentralPort implementations)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// The stack has not been brought up (or failed to).
    NotInitialised,
    /// The peripheral did not answer the connection request.
    Unreachable,
    /// A GATT operation returned a non-OK status.
    Gatt(i32),
    /// No response from the stack within its internal deadline.
    Timeout,
    /// An earlier request is still outstanding in the stack.
    Busy,
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotInitialised => write!(f, "BLE stack not initialised"),
            Self::Unreachable => write!(f, "peripheral unreachable"),
            Self::Gatt(status) => write!(f, "GATT status {status}"),
            Self::Timeout => write!(f, "BLE stack timeout"),
            Self::Busy => write!(f, "BLE stack busy with an earlier request"),
        }
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Self::Transport(e)
    }
}

// ---------------------------------------------------------------------------
// Actuator errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorError {
    /// GPIO set failed on the stepper or relay pins before any step went out.
    GpioWriteFailed,
    /// A STEP write failed mid-move after `completed` pulses were issued.
    Stalled { completed: u32 },
}

impl fmt::Display for ActuatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GpioWriteFailed => write!(f, "GPIO write failed"),
            Self::Stalled { completed } => write!(f, "stalled after {completed} steps"),
        }
    }
}

impl From<ActuatorError> for Error {
    fn from(e: ActuatorError) -> Self {
        Self::Actuator(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// A peripheral address string is not `XX:XX:XX:XX:XX:XX`.
    BadAddress,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
            Self::BadAddress => write!(f, "malformed peripheral address"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
