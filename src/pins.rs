//! GPIO pin assignments for the button/LED board.
//!
//! Single source of truth for default wiring.  Every other module takes
//! pin numbers from [`ControllerConfig`](crate::config::ControllerConfig),
//! whose defaults come from here.

// ---------------------------------------------------------------------------
// User button (active-low with pull-up)
// ---------------------------------------------------------------------------

/// Momentary push-button.  Pressing pulls the line to ground.
pub const BUTTON_GPIO: i32 = 16;

// ---------------------------------------------------------------------------
// Indicator LED
// ---------------------------------------------------------------------------

/// Discrete LED through a series resistor, active HIGH.
pub const LED_GPIO: i32 = 21;

// ---------------------------------------------------------------------------
// Chip limits
// ---------------------------------------------------------------------------

/// Number of GPIO pads on the ESP32-S3 (GPIO0 – GPIO48).
pub const GPIO_COUNT: i32 = 49;

/// Pads 22–25 are not bonded out on the ESP32-S3.
const UNBONDED: [i32; 4] = [22, 23, 24, 25];

/// Whether `gpio` names a usable pad on this chip.
pub fn is_valid_gpio(gpio: i32) -> bool {
    (0..GPIO_COUNT).contains(&gpio) && !UNBONDED.contains(&gpio)
}
