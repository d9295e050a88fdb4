//! Outbound application events.
//!
//! The engine and the service emit these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them.

use crate::config::EdgePolarity;
use crate::error::LineWriteError;

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Lines acquired, worker running, edge interrupt armed.
    Started {
        button_gpio: i32,
        led_gpio: i32,
        edge: EdgePolarity,
        debounce_ms: u32,
    },

    /// An accepted press flipped the LED.
    Toggled { led_on: bool },

    /// An edge fell inside the debounce window and was dropped.
    EdgeRejected { since_accept_ms: u64 },

    /// An edge passed the window but the button read released.
    ReleasedOnEvaluation,

    /// Writing the LED failed; the worker has halted.
    Fault(LineWriteError),

    /// Edge interrupt withdrawn, worker joined, LED forced off.
    Stopped { led_was_on: bool, toggles: u32 },
}
