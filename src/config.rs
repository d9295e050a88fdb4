//! Controller configuration parameters.
//!
//! Read once at startup and never again.  Defaults reproduce the
//! reference wiring; an optional JSON override can replace any field.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::pins;

/// Environment variable holding an optional JSON override.
pub const CONFIG_ENV_VAR: &str = "BUTTON_LED_CONFIG";

/// Which electrical transitions on the button line raise a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgePolarity {
    /// High → low: the moment an active-low switch is pressed.
    Falling,
    /// Low → high: release of an active-low switch.
    Rising,
    Both,
}

impl EdgePolarity {
    /// Whether a transition between `from_high` and `to_high` qualifies.
    pub fn matches(self, from_high: bool, to_high: bool) -> bool {
        match self {
            Self::Falling => from_high && !to_high,
            Self::Rising => !from_high && to_high,
            Self::Both => from_high != to_high,
        }
    }
}

/// Core controller configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    // --- Wiring ---
    /// Input line the button is attached to.
    pub button_gpio: i32,
    /// Output line driving the LED.
    pub led_gpio: i32,

    // --- Debounce ---
    /// Minimum spacing between accepted edges (milliseconds).
    pub debounce_ms: u32,
    /// Edge(s) that trigger an evaluation.
    pub edge: EdgePolarity,

    // --- Worker ---
    /// Stack for the deferred-work thread (KB).
    pub worker_stack_kb: u16,
    /// FreeRTOS priority of the deferred-work thread (ignored on host).
    pub worker_priority: u8,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            button_gpio: pins::BUTTON_GPIO,
            led_gpio: pins::LED_GPIO,

            debounce_ms: 200,
            edge: EdgePolarity::Falling,

            worker_stack_kb: 4,
            worker_priority: 5,
        }
    }
}

impl ControllerConfig {
    /// Upper bound on the debounce window; anything longer swallows real presses.
    pub const MAX_DEBOUNCE_MS: u32 = 10_000;

    /// Range-check every field.
    ///
    /// Pin numbers are deliberately not checked here: an unusable pad is
    /// the pin provider's [`AcquisitionError`](crate::error::AcquisitionError).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.button_gpio == self.led_gpio {
            return Err(ConfigError::ValidationFailed(
                "button_gpio and led_gpio must differ",
            ));
        }
        if self.debounce_ms == 0 || self.debounce_ms > Self::MAX_DEBOUNCE_MS {
            return Err(ConfigError::ValidationFailed(
                "debounce_ms must be within 1..=10000",
            ));
        }
        if self.worker_stack_kb < 2 {
            return Err(ConfigError::ValidationFailed(
                "worker_stack_kb must be at least 2",
            ));
        }
        Ok(())
    }

    /// Parse a JSON override and validate it.  Missing fields take defaults.
    pub fn from_json(doc: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(doc).map_err(|_| ConfigError::Malformed)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from [`CONFIG_ENV_VAR`] if set, otherwise defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        match std::env::var(CONFIG_ENV_VAR) {
            Ok(doc) => Self::from_json(&doc),
            Err(_) => Ok(Self::default()),
        }
    }
}
