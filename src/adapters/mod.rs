//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter        | Implements         | Connects to                 |
//! |----------------|--------------------|-----------------------------|
//! | `ble_central`  | CentralPort        | Bluedroid GATT client       |
//! | `hardware`     | ValvePort          | A4988 stepper over GPIO     |
//! |                | BuzzerPort         | Alarm relay over GPIO       |
//! | `log_sink`     | EventSink          | Serial log output           |
//! | `time`         | (clock)            | ESP32 high-resolution timer |

pub mod ble_central;
pub mod hardware;
pub mod log_sink;
pub mod time;
