//! System configuration parameters
//!
//! All tunable parameters for the AutoOxy controller.  Values are static:
//! nothing is persisted, a restart always comes back with these defaults.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Transparent-UART service exposed by the oximeter.
pub const OXIMETER_SERVICE_UUID: u128 = 0x49535343_fe7d_4ae5_8fa9_9fafd205e455;
/// Characteristic the oximeter notifies readings on.
pub const OXIMETER_NOTIFY_UUID: u128 = 0x49535343_1e4d_4bd9_ba61_23c647249616;

/// Public BLE device address of the paired oximeter.
pub const OXIMETER_ADDRESS: PeerAddress = PeerAddress([0x00, 0xA0, 0x50, 0x4A, 0x9B, 0x7C]);

// ---------------------------------------------------------------------------
// Peer address
// ---------------------------------------------------------------------------

/// 48-bit BLE device address, most significant byte first (display order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeerAddress(pub [u8; 6]);

impl PeerAddress {
    pub const fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl FromStr for PeerAddress {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut out = [0u8; 6];
        let mut parts = s.split(':');
        for slot in &mut out {
            let part = parts.next().ok_or(ConfigError::BadAddress)?;
            if part.len() != 2 || !part.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(ConfigError::BadAddress);
            }
            *slot = u8::from_str_radix(part, 16).map_err(|_| ConfigError::BadAddress)?;
        }
        if parts.next().is_some() {
            return Err(ConfigError::BadAddress);
        }
        Ok(Self(out))
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

// ---------------------------------------------------------------------------
// Peripheral identity
// ---------------------------------------------------------------------------

/// Fixed identifiers of the telemetry peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PeripheralConfig {
    pub address: PeerAddress,
    pub service_uuid: u128,
    pub notify_char_uuid: u128,
}

impl Default for PeripheralConfig {
    fn default() -> Self {
        Self {
            address: OXIMETER_ADDRESS,
            service_uuid: OXIMETER_SERVICE_UUID,
            notify_char_uuid: OXIMETER_NOTIFY_UUID,
        }
    }
}

// ---------------------------------------------------------------------------
// System configuration
// ---------------------------------------------------------------------------

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- Valve control ---
    /// SpO2 (%) the valve controller steers towards
    pub target_spo2_percent: u8,
    /// Largest move issued for a single reading (steps)
    pub max_steps_per_reading: u32,
    /// Fully-open valve position (steps from closed)
    pub valve_max_steps: u32,
    /// Half-period of one step pulse (microseconds)
    pub step_pulse_us: u32,

    // --- Supervision ---
    /// Time without a decoded reading before the alarm sounds (milliseconds)
    pub staleness_timeout_ms: u64,
    /// Minimum spacing between reconnect attempts (milliseconds)
    pub reconnect_interval_ms: u64,
    /// Control loop interval (milliseconds)
    pub control_loop_interval_ms: u64,

    // --- Peripheral ---
    pub peripheral: PeripheralConfig,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            // Valve
            target_spo2_percent: 98,
            max_steps_per_reading: 50,
            valve_max_steps: 500,
            step_pulse_us: 800,

            // Supervision
            staleness_timeout_ms: 30_000,
            reconnect_interval_ms: 5_000,
            control_loop_interval_ms: 100, // 10 Hz

            peripheral: PeripheralConfig::default(),
        }
    }
}

impl SystemConfig {
    /// Range-check every field.  Invalid values are rejected, never clamped.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(80..=100).contains(&self.target_spo2_percent) {
            return Err(ConfigError::ValidationFailed(
                "target_spo2_percent must be 80–100",
            ));
        }
        if self.valve_max_steps == 0 {
            return Err(ConfigError::ValidationFailed("valve_max_steps must be > 0"));
        }
        if self.max_steps_per_reading == 0 || self.max_steps_per_reading > self.valve_max_steps {
            return Err(ConfigError::ValidationFailed(
                "max_steps_per_reading must be 1..=valve_max_steps",
            ));
        }
        if !(100..=10_000).contains(&self.step_pulse_us) {
            return Err(ConfigError::ValidationFailed(
                "step_pulse_us must be 100–10000",
            ));
        }
        if self.control_loop_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "control_loop_interval_ms must be > 0",
            ));
        }
        if self.reconnect_interval_ms < self.control_loop_interval_ms {
            return Err(ConfigError::ValidationFailed(
                "reconnect_interval_ms must be >= control_loop_interval_ms",
            ));
        }
        if self.staleness_timeout_ms <= self.reconnect_interval_ms {
            return Err(ConfigError::ValidationFailed(
                "staleness_timeout_ms must exceed reconnect_interval_ms",
            ));
        }
        Ok(())
    }

    /// Worst-case duration of one capped valve move (milliseconds).
    pub fn max_move_duration_ms(&self) -> u64 {
        u64::from(self.max_steps_per_reading) * 2 * u64::from(self.step_pulse_us) / 1000
    }
}
