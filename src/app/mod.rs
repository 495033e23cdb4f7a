//! Application core: domain orchestration, zero I/O.
//!
//! [`service::AppService`] ties the link supervisor, valve controller and
//! alarm supervisor together.  All interaction with the radio and GPIO
//! happens through **port traits** defined in [`ports`], so this layer is
//! testable without real peripherals.

pub mod events;
pub mod ports;
pub mod service;
