//! AutoOxy controller library.
//!
//! Closed-loop SpO2 control: a BLE pulse oximeter feeds readings, a
//! stepper-driven valve is nudged toward the target saturation, and a relay
//! buzzer sounds when telemetry goes stale.
//!
//! Exposes the pure-logic modules for integration testing.  All
//! ESP-IDF-specific code is guarded by `#[cfg(target_os = "espidf")]`
//! within each module.

#![deny(unused_must_use)]

pub mod alarm;
pub mod app;
pub mod config;
pub mod control;
pub mod error;
pub mod link;
pub mod notify;
pub mod pins;
pub mod telemetry;

pub mod adapters;
pub mod drivers;
