//! GPIO adapter: the pin provider behind [`PinPort`].
//!
//! Tracks line ownership in two lock-free bitmasks (claimed, output) so
//! double acquisition and writes to released lines are caught on every
//! target.
//!
//! - **`target_os = "espidf"`**: raw `gpio_config` / `gpio_set_level` /
//!   `gpio_get_level` calls, as configured once at boot.
//! - **`not(target_os = "espidf")`**: an in-memory pad bank.  Tests drive
//!   input levels with [`GpioAdapter::drive_input`] and observe the LED
//!   with [`GpioAdapter::output_level`]; armed edges post to their work
//!   slot exactly like the hardware ISR would.

use core::sync::atomic::{AtomicU64, Ordering};

use embedded_hal::digital::PinState;
use log::{debug, info};

use crate::app::ports::{InputLine, OutputLine, PinPort};
use crate::drivers::button::ButtonIrq;
use crate::error::{AcquisitionError, LineWriteError, RegistrationError};
use crate::pins;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(not(target_os = "espidf"))]
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[cfg(not(target_os = "espidf"))]
pub(crate) use sim::SimBank;

// ── Ownership bookkeeping ─────────────────────────────────────

fn bit(gpio: i32) -> u64 {
    if (0..64).contains(&gpio) { 1u64 << gpio } else { 0 }
}

#[derive(Default)]
struct LineClaims {
    claimed: AtomicU64,
    outputs: AtomicU64,
}

impl LineClaims {
    /// `true` if the line was free and is now ours.
    fn claim(&self, gpio: i32) -> bool {
        let b = bit(gpio);
        b != 0 && self.claimed.fetch_or(b, Ordering::AcqRel) & b == 0
    }

    fn mark_output(&self, gpio: i32) {
        self.outputs.fetch_or(bit(gpio), Ordering::AcqRel);
    }

    fn unclaim(&self, gpio: i32) {
        let b = bit(gpio);
        self.outputs.fetch_and(!b, Ordering::AcqRel);
        self.claimed.fetch_and(!b, Ordering::AcqRel);
    }

    fn is_claimed(&self, gpio: i32) -> bool {
        self.claimed.load(Ordering::Acquire) & bit(gpio) != 0
    }

    fn is_output(&self, gpio: i32) -> bool {
        self.outputs.load(Ordering::Acquire) & bit(gpio) != 0
    }

    fn is_input(&self, gpio: i32) -> bool {
        self.is_claimed(gpio) && !self.is_output(gpio)
    }
}

// ── Adapter ───────────────────────────────────────────────────

pub struct GpioAdapter {
    claims: LineClaims,
    #[cfg(not(target_os = "espidf"))]
    bank: Arc<Mutex<SimBank>>,
}

impl Default for GpioAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl GpioAdapter {
    pub fn new() -> Self {
        #[cfg(not(target_os = "espidf"))]
        info!("GpioAdapter: simulation backend");

        Self {
            claims: LineClaims::default(),
            #[cfg(not(target_os = "espidf"))]
            bank: Arc::new(Mutex::new(SimBank::new())),
        }
    }

    /// Whether `gpio` is currently owned through this adapter.
    pub fn is_claimed(&self, gpio: i32) -> bool {
        self.claims.is_claimed(gpio)
    }

    fn claim(&self, gpio: i32) -> Result<(), AcquisitionError> {
        if !pins::is_valid_gpio(gpio) {
            return Err(AcquisitionError::InvalidLine(gpio));
        }
        if !self.claims.claim(gpio) {
            return Err(AcquisitionError::AlreadyOwned(gpio));
        }
        Ok(())
    }
}

impl PinPort for GpioAdapter {
    type Edge = ButtonIrq;

    fn acquire_input(&self, gpio: i32) -> Result<InputLine, AcquisitionError> {
        self.claim(gpio)?;
        if let Err(e) = self.configure_input(gpio) {
            self.claims.unclaim(gpio);
            return Err(e);
        }
        debug!("gpio: GPIO {} acquired as input", gpio);
        Ok(InputLine::new(gpio))
    }

    fn acquire_output(
        &self,
        gpio: i32,
        initial: PinState,
    ) -> Result<OutputLine, AcquisitionError> {
        self.claim(gpio)?;
        if let Err(e) = self.configure_output(gpio, initial) {
            self.claims.unclaim(gpio);
            return Err(e);
        }
        self.claims.mark_output(gpio);
        debug!("gpio: GPIO {} acquired as output ({:?})", gpio, initial);
        Ok(OutputLine::new(gpio))
    }

    fn release_input(&self, line: InputLine) {
        let gpio = line.gpio();
        if !self.claims.is_input(gpio) {
            return;
        }
        self.reset_pin(gpio);
        self.claims.unclaim(gpio);
        debug!("gpio: GPIO {} released", gpio);
    }

    fn release_output(&self, line: OutputLine) {
        let gpio = line.gpio();
        if !self.claims.is_output(gpio) {
            return;
        }
        self.reset_pin(gpio);
        self.claims.unclaim(gpio);
        debug!("gpio: GPIO {} released", gpio);
    }

    fn read(&self, line: InputLine) -> PinState {
        self.sample(line.gpio())
    }

    fn write(&self, line: OutputLine, level: PinState) -> Result<(), LineWriteError> {
        let gpio = line.gpio();
        if !self.claims.is_output(gpio) {
            return Err(LineWriteError::NotOpen(gpio));
        }
        self.drive(gpio, level)
    }

    fn edge_source(&self, line: InputLine) -> Result<ButtonIrq, RegistrationError> {
        let gpio = line.gpio();
        if !self.claims.is_input(gpio) {
            return Err(RegistrationError::NotAcquired(gpio));
        }
        Ok(self.irq_for(gpio))
    }
}

// ── ESP-IDF backend ───────────────────────────────────────────

#[cfg(target_os = "espidf")]
impl GpioAdapter {
    fn configure_input(&self, gpio: i32) -> Result<(), AcquisitionError> {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << gpio,
            mode: gpio_mode_t_GPIO_MODE_INPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_ENABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        // SAFETY: `gpio` was validated and claimed; the config struct is
        // fully initialised and only read by the driver.
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(AcquisitionError::ConfigFailed { gpio, rc: ret });
        }
        Ok(())
    }

    fn configure_output(&self, gpio: i32, initial: PinState) -> Result<(), AcquisitionError> {
        let cfg = gpio_config_t {
            pin_bit_mask: 1u64 << gpio,
            mode: gpio_mode_t_GPIO_MODE_OUTPUT,
            pull_up_en: gpio_pullup_t_GPIO_PULLUP_DISABLE,
            pull_down_en: gpio_pulldown_t_GPIO_PULLDOWN_DISABLE,
            intr_type: gpio_int_type_t_GPIO_INTR_DISABLE,
        };
        // SAFETY: as above; the level write targets the pad just configured.
        let ret = unsafe { gpio_config(&cfg) };
        if ret != ESP_OK as i32 {
            return Err(AcquisitionError::ConfigFailed { gpio, rc: ret });
        }
        let ret = unsafe { gpio_set_level(gpio, level_bit(initial)) };
        if ret != ESP_OK as i32 {
            return Err(AcquisitionError::ConfigFailed { gpio, rc: ret });
        }
        Ok(())
    }

    fn irq_for(&self, gpio: i32) -> ButtonIrq {
        ButtonIrq::new(gpio)
    }

    fn reset_pin(&self, gpio: i32) {
        // SAFETY: the pad is owned by this adapter until unclaimed below.
        let _ = unsafe { gpio_reset_pin(gpio) };
    }

    fn sample(&self, gpio: i32) -> PinState {
        // SAFETY: gpio_get_level is a read-only register access.
        if unsafe { gpio_get_level(gpio) } != 0 {
            PinState::High
        } else {
            PinState::Low
        }
    }

    fn drive(&self, gpio: i32, level: PinState) -> Result<(), LineWriteError> {
        // SAFETY: the pad was configured as an output in `configure_output`.
        let ret = unsafe { gpio_set_level(gpio, level_bit(level)) };
        if ret != ESP_OK as i32 {
            return Err(LineWriteError::WriteFailed { gpio, rc: ret });
        }
        Ok(())
    }
}

#[cfg(target_os = "espidf")]
fn level_bit(level: PinState) -> u32 {
    match level {
        PinState::High => 1,
        PinState::Low => 0,
    }
}

// ── Simulation backend ────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
pub(crate) fn lock(bank: &Mutex<SimBank>) -> MutexGuard<'_, SimBank> {
    bank.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(not(target_os = "espidf"))]
impl GpioAdapter {
    #[allow(clippy::unnecessary_wraps)]
    fn configure_input(&self, gpio: i32) -> Result<(), AcquisitionError> {
        // Pulled up: an idle active-low switch reads high.
        lock(&self.bank).insert(gpio, PinState::High);
        Ok(())
    }

    #[allow(clippy::unnecessary_wraps)]
    fn configure_output(&self, gpio: i32, initial: PinState) -> Result<(), AcquisitionError> {
        lock(&self.bank).insert(gpio, initial);
        Ok(())
    }

    fn irq_for(&self, gpio: i32) -> ButtonIrq {
        ButtonIrq::new(gpio, Arc::clone(&self.bank))
    }

    fn reset_pin(&self, gpio: i32) {
        lock(&self.bank).remove(gpio);
    }

    fn sample(&self, gpio: i32) -> PinState {
        lock(&self.bank).level(gpio).unwrap_or(PinState::High)
    }

    #[allow(clippy::unnecessary_wraps)]
    fn drive(&self, gpio: i32, level: PinState) -> Result<(), LineWriteError> {
        lock(&self.bank).set_level(gpio, level);
        Ok(())
    }

    /// Set a simulated input pad as the outside world would.  If an edge
    /// source is armed on it and the transition qualifies, its work slot
    /// is notified.
    pub fn drive_input(&self, gpio: i32, level: PinState) {
        let notify = lock(&self.bank).set_level(gpio, level);
        if let Some(slot) = notify {
            slot.submit();
        }
    }

    /// Current level of a simulated pad, `None` if it is not acquired.
    pub fn output_level(&self, gpio: i32) -> Option<PinState> {
        lock(&self.bank).level(gpio)
    }
}

#[cfg(not(target_os = "espidf"))]
mod sim {
    use std::sync::Arc;

    use embedded_hal::digital::PinState;
    use heapless::FnvIndexMap;

    use crate::config::EdgePolarity;
    use crate::runner::WorkSlot;

    struct SimLine {
        level: PinState,
        edge: Option<(EdgePolarity, Arc<WorkSlot>)>,
    }

    /// In-memory pad state, keyed by GPIO number.
    pub(crate) struct SimBank {
        lines: FnvIndexMap<i32, SimLine, 64>,
    }

    impl SimBank {
        pub(crate) fn new() -> Self {
            Self {
                lines: FnvIndexMap::new(),
            }
        }

        pub(crate) fn insert(&mut self, gpio: i32, level: PinState) {
            // Capacity exceeds the pad count, and pads are validated first.
            let _ = self.lines.insert(gpio, SimLine { level, edge: None });
        }

        pub(crate) fn remove(&mut self, gpio: i32) {
            self.lines.remove(&gpio);
        }

        pub(crate) fn level(&self, gpio: i32) -> Option<PinState> {
            self.lines.get(&gpio).map(|line| line.level)
        }

        /// Update a pad; returns the slot to notify if the transition
        /// matches an armed edge.
        pub(crate) fn set_level(&mut self, gpio: i32, level: PinState) -> Option<Arc<WorkSlot>> {
            let line = self.lines.get_mut(&gpio)?;
            let from_high = line.level == PinState::High;
            let to_high = level == PinState::High;
            line.level = level;
            match &line.edge {
                Some((polarity, slot)) if polarity.matches(from_high, to_high) => {
                    Some(Arc::clone(slot))
                }
                _ => None,
            }
        }

        /// Attach an edge handler.  `false` if the pad is not acquired.
        pub(crate) fn bind(&mut self, gpio: i32, polarity: EdgePolarity, slot: Arc<WorkSlot>) -> bool {
            match self.lines.get_mut(&gpio) {
                Some(line) => {
                    line.edge = Some((polarity, slot));
                    true
                }
                None => false,
            }
        }

        pub(crate) fn unbind(&mut self, gpio: i32) {
            if let Some(line) = self.lines.get_mut(&gpio) {
                line.edge = None;
            }
        }
    }
}
