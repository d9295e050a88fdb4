//! ButtonLed firmware library.
//!
//! An active-low push button toggles an LED.  Edges are caught by a GPIO
//! interrupt, handed to a single deferred worker through a one-slot
//! coalescing queue, debounced against a monotonic clock and applied to
//! the LED line.  All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module; host builds run the
//! same logic against a simulated GPIO bank.

#![deny(unused_must_use)]

pub mod adapters;
pub mod app;
pub mod config;
pub mod debounce;
pub mod drivers;
pub mod error;
pub mod pins;
pub mod runner;

pub use app::service::{ButtonLedService, ShutdownReport};
pub use config::{ControllerConfig, EdgePolarity};
pub use error::{Error, Result};
