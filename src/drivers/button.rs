//! Button edge interrupt binding.
//!
//! ## Hardware
//!
//! Active-low momentary switch with pull-up.  The GPIO fires on the
//! configured edge (falling by default: the moment of the press) and the
//! ISR posts one notification to the deferred-work slot.  No debounce
//! happens here; the ISR is a lock-free atomic swap plus, on the device,
//! an ISR-safe task notification.
//!
//! The registered slot is kept alive by [`ButtonIrq`] for as long as the
//! handler is attached, so the raw pointer handed to the ISR never dangles.

use std::sync::Arc;

use log::info;

use crate::app::ports::EdgeSource;
use crate::config::EdgePolarity;
use crate::error::RegistrationError;
use crate::runner::WorkSlot;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(not(target_os = "espidf"))]
use std::sync::Mutex;

#[cfg(not(target_os = "espidf"))]
use crate::adapters::gpio::{SimBank, lock};

pub struct ButtonIrq {
    gpio: i32,
    armed: Option<Arc<WorkSlot>>,
    #[cfg(not(target_os = "espidf"))]
    bank: Arc<Mutex<SimBank>>,
}

impl ButtonIrq {
    #[cfg(target_os = "espidf")]
    pub(crate) fn new(gpio: i32) -> Self {
        Self { gpio, armed: None }
    }

    #[cfg(not(target_os = "espidf"))]
    pub(crate) fn new(gpio: i32, bank: Arc<Mutex<SimBank>>) -> Self {
        Self {
            gpio,
            armed: None,
            bank,
        }
    }

    /// GPIO pin this binding is attached to.
    pub fn gpio(&self) -> i32 {
        self.gpio
    }
}

impl EdgeSource for ButtonIrq {
    fn arm(&mut self, polarity: EdgePolarity, slot: Arc<WorkSlot>) -> Result<(), RegistrationError> {
        if self.armed.is_some() {
            return Err(RegistrationError::AlreadyBound(self.gpio));
        }
        self.attach(polarity, &slot)?;
        info!("button: GPIO {} armed on {:?} edge", self.gpio, polarity);
        self.armed = Some(slot);
        Ok(())
    }

    fn disarm(&mut self) {
        if self.armed.is_some() {
            self.detach();
            // The ISR is gone; only now may the slot reference drop.
            self.armed = None;
            info!("button: GPIO {} disarmed", self.gpio);
        }
    }

    fn is_armed(&self) -> bool {
        self.armed.is_some()
    }
}

impl Drop for ButtonIrq {
    fn drop(&mut self) {
        self.disarm();
    }
}

// ── ESP-IDF backend ───────────────────────────────────────────

#[cfg(target_os = "espidf")]
unsafe extern "C" fn button_gpio_isr(arg: *mut core::ffi::c_void) {
    // SAFETY: `arg` is the WorkSlot held by the ButtonIrq that attached this
    // handler; it outlives the handler (see `disarm`).  `submit` is atomics
    // plus an ISR-safe task notification.
    let slot = unsafe { &*(arg as *const WorkSlot) };
    slot.submit();
}

#[cfg(target_os = "espidf")]
impl ButtonIrq {
    fn attach(&self, polarity: EdgePolarity, slot: &Arc<WorkSlot>) -> Result<(), RegistrationError> {
        let intr_type = match polarity {
            EdgePolarity::Falling => gpio_int_type_t_GPIO_INTR_NEGEDGE,
            EdgePolarity::Rising => gpio_int_type_t_GPIO_INTR_POSEDGE,
            EdgePolarity::Both => gpio_int_type_t_GPIO_INTR_ANYEDGE,
        };

        // SAFETY: gpio_install_isr_service is idempotent; ESP_ERR_INVALID_STATE
        // means it was already installed (acceptable).  The handler argument
        // points into an Arc that `self.armed` keeps alive until detach.
        unsafe {
            let ret = gpio_install_isr_service(0);
            if ret != ESP_OK as i32 && ret != ESP_ERR_INVALID_STATE as i32 {
                return Err(RegistrationError::IsrServiceFailed(ret));
            }

            gpio_set_intr_type(self.gpio, intr_type);
            let ret = gpio_isr_handler_add(
                self.gpio,
                Some(button_gpio_isr),
                Arc::as_ptr(slot) as *mut core::ffi::c_void,
            );
            if ret != ESP_OK as i32 {
                return Err(RegistrationError::HandlerAddFailed { gpio: self.gpio, rc: ret });
            }
            gpio_intr_enable(self.gpio);
        }
        Ok(())
    }

    fn detach(&self) {
        // SAFETY: removes the handler attached in `attach`; after this
        // returns the ISR can no longer dereference the slot.
        unsafe {
            gpio_intr_disable(self.gpio);
            gpio_isr_handler_remove(self.gpio);
        }
    }
}

// ── Simulation backend ────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
impl ButtonIrq {
    fn attach(&self, polarity: EdgePolarity, slot: &Arc<WorkSlot>) -> Result<(), RegistrationError> {
        if lock(&self.bank).bind(self.gpio, polarity, Arc::clone(slot)) {
            Ok(())
        } else {
            Err(RegistrationError::NotAcquired(self.gpio))
        }
    }

    fn detach(&self) {
        lock(&self.bank).unbind(self.gpio);
    }
}
