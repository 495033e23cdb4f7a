//! Closed-loop control.

pub mod valve;
