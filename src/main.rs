//! ButtonLed Firmware: Main Entry Point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                  Adapters (outer ring)                     │
//! │                                                            │
//! │  GpioAdapter        LogEventSink       MonotonicClock      │
//! │  (PinPort + IRQ)    (EventSink)        (Clock)             │
//! │                                                            │
//! │  ──────────────── Port Trait Boundary ──────────────────   │
//! │                                                            │
//! │  ┌──────────────────────────────────────────────────────┐  │
//! │  │  ButtonLedService  ─▶  DeferredRunner  ─▶  ToggleEngine │
//! │  └──────────────────────────────────────────────────────┘  │
//! └────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use log::{info, warn};

use button_led::adapters::gpio::GpioAdapter;
use button_led::adapters::log_sink::LogEventSink;
use button_led::adapters::time::MonotonicClock;
use button_led::{ButtonLedService, ControllerConfig};

/// How often the idle loop checks that the worker is still alive.
const SUPERVISE_INTERVAL: Duration = Duration::from_secs(1);

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  ButtonLed v{}                    ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    // ── 2. Configuration (env override or defaults) ───────────
    let config = match ControllerConfig::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            warn!("Config override rejected ({}), using defaults", e);
            ControllerConfig::default()
        }
    };

    // ── 3. Bring the controller up ────────────────────────────
    let service = ButtonLedService::start(
        &config,
        Arc::new(GpioAdapter::new()),
        MonotonicClock::new(),
        LogEventSink::new(),
    )
    .context("startup failed")?;

    // ── 4. Supervise ──────────────────────────────────────────
    // All work happens in the ISR and the deferred worker.  A write fault
    // halts the worker; tear down cleanly so the LED is left off.
    while service.is_running() {
        std::thread::sleep(SUPERVISE_INTERVAL);
    }

    warn!("Worker halted, shutting down");
    let report = service.stop().context("shutdown")?;
    info!("Shutdown complete: {:?}", report);
    Ok(())
}
