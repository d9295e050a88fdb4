//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ ToggleEngine / ButtonLedService (domain)
//! ```
//!
//! Driven adapters (GPIO, edge interrupts, clock, event sinks) implement
//! these traits.  The domain consumes them via generics, so the debounce
//! and toggle logic never touches hardware directly.

use std::sync::Arc;

use embedded_hal::digital::PinState;

use crate::config::EdgePolarity;
use crate::error::{AcquisitionError, LineWriteError, RegistrationError};
use crate::runner::WorkSlot;

// ───────────────────────────────────────────────────────────────
// Line handles
// ───────────────────────────────────────────────────────────────

/// A GPIO claimed as an input.  Minted by a [`PinPort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InputLine(i32);

/// A GPIO claimed as an output.  Minted by a [`PinPort`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OutputLine(i32);

impl InputLine {
    /// Only pin providers should call this, after claiming the pad.
    pub fn new(gpio: i32) -> Self {
        Self(gpio)
    }

    pub fn gpio(self) -> i32 {
        self.0
    }
}

impl OutputLine {
    /// Only pin providers should call this, after claiming the pad.
    pub fn new(gpio: i32) -> Self {
        Self(gpio)
    }

    pub fn gpio(self) -> i32 {
        self.0
    }
}

/// The button is wired active-low: pressed reads as logic 0.
pub const PRESSED: PinState = PinState::Low;

// ───────────────────────────────────────────────────────────────
// Pin provider (driven adapter: domain ↔ GPIO)
// ───────────────────────────────────────────────────────────────

/// Owns GPIO line lifecycle.  Shared between the lifecycle thread and the
/// deferred worker, hence `&self` methods and `Send + Sync`.
pub trait PinPort: Send + Sync + 'static {
    /// Edge interrupt binding produced by [`edge_source`](Self::edge_source).
    type Edge: EdgeSource;

    /// Claim `gpio` as a pulled-up input.
    fn acquire_input(&self, gpio: i32) -> Result<InputLine, AcquisitionError>;

    /// Claim `gpio` as an output, driven to `initial` before returning.
    fn acquire_output(&self, gpio: i32, initial: PinState)
        -> Result<OutputLine, AcquisitionError>;

    /// Return an input line to the provider.  Releasing twice is a no-op.
    fn release_input(&self, line: InputLine);

    /// Return an output line to the provider.  Releasing twice is a no-op.
    fn release_output(&self, line: OutputLine);

    /// Sample the current level.  Never cached.
    fn read(&self, line: InputLine) -> PinState;

    /// Drive the line.  Fails if the line is not open for output.
    fn write(&self, line: OutputLine, level: PinState) -> Result<(), LineWriteError>;

    /// Bind an edge interrupt facility to an acquired input.
    fn edge_source(&self, line: InputLine) -> Result<Self::Edge, RegistrationError>;
}

// ───────────────────────────────────────────────────────────────
// Edge event source (driven adapter: hardware → runner)
// ───────────────────────────────────────────────────────────────

/// Signal boundary between the pin and the deferred-work runner.  Holds no
/// debounce or toggle logic.
pub trait EdgeSource: Send {
    /// Start posting one notification to `slot` per qualifying transition.
    fn arm(&mut self, polarity: EdgePolarity, slot: Arc<WorkSlot>)
        -> Result<(), RegistrationError>;

    /// Stop posting.  Idempotent; safe before any `arm`.
    fn disarm(&mut self);

    fn is_armed(&self) -> bool;
}

// ───────────────────────────────────────────────────────────────
// Clock (driven adapter: domain ← monotonic timer)
// ───────────────────────────────────────────────────────────────

pub trait Clock: Send + 'static {
    /// Milliseconds on a monotonic timebase.
    fn now_ms(&self) -> u64;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`](super::events::AppEvent)s
/// through this port.  Adapters decide where they go.  Both the worker
/// and the lifecycle path emit, so sinks are cloned across them.
pub trait EventSink: Clone + Send + 'static {
    fn emit(&mut self, event: &super::events::AppEvent);
}
