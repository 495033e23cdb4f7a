//! AutoOxy firmware: main entry point.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  Adapters (outer ring)                   │
//! │                                                          │
//! │  BleCentral      HardwareAdapter      LogEventSink       │
//! │  (CentralPort)   (Valve + Buzzer)     (EventSink)        │
//! │                                                          │
//! │  ─────────────── Port Trait Boundary ─────────────────   │
//! │                                                          │
//! │  ┌────────────────────────────────────────────────────┐  │
//! │  │            AppService (pure logic)                 │  │
//! │  │  LinkSupervisor · ValveController · Alarm          │  │
//! │  └────────────────────────────────────────────────────┘  │
//! └──────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use anyhow::Result;
use esp_idf_svc::hal::delay::Ets;
use esp_idf_svc::hal::gpio::{AnyOutputPin, PinDriver};
use log::{info, warn};

use autooxy::adapters::ble_central::BleCentral;
use autooxy::adapters::hardware::HardwareAdapter;
use autooxy::adapters::log_sink::LogEventSink;
use autooxy::adapters::time::Esp32TimeAdapter;
use autooxy::app::service::AppService;
use autooxy::config::SystemConfig;
use autooxy::drivers::buzzer::BuzzerRelay;
use autooxy::drivers::stepper::StepperDriver;
use autooxy::error::Error;
use autooxy::notify::NotificationQueue;
use autooxy::pins;

/// Filled by the GATTC callback, drained by the control loop.
static NOTIFICATIONS: NotificationQueue = NotificationQueue::new();

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  AutoOxy v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration ──────────────────────────────────────
    let config = SystemConfig::default();
    config.validate().map_err(Error::from)?;
    info!(
        "Target SpO2 {}%, step cap {}, valve travel {} steps, peripheral {}",
        config.target_spo2_percent,
        config.max_steps_per_reading,
        config.valve_max_steps,
        config.peripheral.address
    );
    info!("Worst-case valve move {} ms", config.max_move_duration_ms());

    // ── 3. Actuators ──────────────────────────────────────────
    // SAFETY: each GPIO number is claimed exactly once, here.
    let step = PinDriver::output(unsafe { AnyOutputPin::new(pins::VALVE_STEP_GPIO) })?;
    let dir = PinDriver::output(unsafe { AnyOutputPin::new(pins::VALVE_DIR_GPIO) })?;
    let en = PinDriver::output(unsafe { AnyOutputPin::new(pins::VALVE_EN_GPIO) })?;
    let relay = PinDriver::output(unsafe { AnyOutputPin::new(pins::BUZZER_RELAY_GPIO) })?;

    let stepper = StepperDriver::new(step, dir, en, Ets, config.step_pulse_us).map_err(Error::from)?;
    let mut hw = HardwareAdapter::new(stepper, BuzzerRelay::new(relay));

    // ── 4. BLE central ────────────────────────────────────────
    let central = BleCentral::new().map_err(Error::from)?;

    // ── 5. Application service ────────────────────────────────
    let clock = Esp32TimeAdapter::new();
    let mut sink = LogEventSink::new();
    let mut app = AppService::new(&config, central, &NOTIFICATIONS);
    app.start(clock.uptime_ms(), &mut hw, &mut sink);

    info!("System ready. Entering control loop.");

    // ── 6. Control loop ───────────────────────────────────────
    loop {
        app.tick(clock.uptime_ms(), &mut hw, &mut sink);

        let dropped = NOTIFICATIONS.dropped();
        if dropped > 0 && app.tick_count() % 600 == 0 {
            warn!("{} notifications dropped on a full queue so far", dropped);
        }

        std::thread::sleep(std::time::Duration::from_millis(config.control_loop_interval_ms));
    }
}
