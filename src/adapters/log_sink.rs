//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing controller events to the ESP-IDF
//! logger (UART / USB-CDC on the device, stderr on the host).  Bounce
//! rejections go out at debug so a noisy switch does not flood the console.

use log::{debug, error, info};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Started {
                button_gpio,
                led_gpio,
                edge,
                debounce_ms,
            } => {
                info!(
                    "START | button=GPIO{} led=GPIO{} edge={:?} debounce={}ms",
                    button_gpio, led_gpio, edge, debounce_ms
                );
            }
            AppEvent::Toggled { led_on } => {
                info!("Button pressed, LED {}", if *led_on { "ON" } else { "OFF" });
            }
            AppEvent::EdgeRejected { since_accept_ms } => {
                debug!("BOUNCE | edge {}ms after last accept, ignored", since_accept_ms);
            }
            AppEvent::ReleasedOnEvaluation => {
                debug!("BOUNCE | button already released, no toggle");
            }
            AppEvent::Fault(e) => {
                error!("FAULT | {}", e);
            }
            AppEvent::Stopped { led_was_on, toggles } => {
                info!(
                    "STOP | led_was={} toggles={}",
                    if *led_was_on { "ON" } else { "OFF" },
                    toggles
                );
            }
        }
    }
}
