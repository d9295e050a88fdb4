//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter    | Implements | Connects to                         |
//! |------------|------------|-------------------------------------|
//! | `gpio`     | PinPort    | ESP32 GPIO matrix / simulated bank  |
//! | `log_sink` | EventSink  | Serial log output                   |
//! | `time`     | Clock      | ESP32 system timer / `Instant`      |

pub mod gpio;
pub mod log_sink;
pub mod time;
