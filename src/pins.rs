//! GPIO pin assignments for the AutoOxy controller board.
//!
//! Single source of truth: `main` builds every driver from these numbers
//! rather than hard-coding them.

// ---------------------------------------------------------------------------
// Valve stepper (A4988)
// ---------------------------------------------------------------------------

/// STEP input: one rising edge per microstep.
pub const VALVE_STEP_GPIO: i32 = 18;
/// DIR input: HIGH = open (more flow), LOW = close.
pub const VALVE_DIR_GPIO: i32 = 19;
/// EN input, active low.
pub const VALVE_EN_GPIO: i32 = 21;

// ---------------------------------------------------------------------------
// Alarm
// ---------------------------------------------------------------------------

/// Relay coil for the audible alarm.  HIGH = buzzer on.
pub const BUZZER_RELAY_GPIO: i32 = 22;
