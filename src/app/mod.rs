//! Application core: pure domain logic, zero direct I/O.
//!
//! The debounce/toggle rules live in [`engine`], the start/stop lifecycle
//! in [`service`].  All interaction with hardware happens through the
//! **port traits** defined in [`ports`], keeping this layer fully testable
//! without real peripherals.

pub mod engine;
pub mod events;
pub mod ports;
pub mod service;
