//! Interrupt bindings and task helpers.

pub mod button;
pub mod task_pin;
