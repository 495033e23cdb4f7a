//! Actuator drivers over `embedded-hal` pins.

pub mod buzzer;
pub mod stepper;
