//! Debounce & toggle engine.
//!
//! Runs on the deferred worker, once per drained edge notification:
//!
//! | Step | Action                                                   |
//! |------|----------------------------------------------------------|
//! | 1    | read monotonic time `t`                                  |
//! | 2    | `t` inside the debounce window → reject, no side effects |
//! | 3    | restart the window at `t`                                |
//! | 4    | button reads pressed → flip `led_on`, drive the LED      |
//! |      | button reads released → no-op (window stays consumed)    |
//!
//! `led_on` only changes after the LED write succeeds, so it always mirrors
//! the last level on the line.  The engine is the sole writer of both
//! `led_on` and the window, and only the single worker calls it, so neither
//! needs a lock.

use std::sync::Arc;

use embedded_hal::digital::PinState;
use log::debug;

use crate::debounce::DebounceWindow;
use crate::error::LineWriteError;
use crate::runner::EdgeHandler;

use super::events::AppEvent;
use super::ports::{Clock, EventSink, InputLine, OutputLine, PRESSED, PinPort};

/// Decision state.  `Evaluating` only exists for the duration of one
/// [`ToggleEngine::on_edge`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvalState {
    Idle,
    Evaluating,
}

/// Result of evaluating one edge notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeOutcome {
    /// Inside the debounce window.
    Rejected,
    /// Window passed, but the button was not held.
    Released,
    /// The LED was flipped to `led_on`.
    Toggled { led_on: bool },
}

pub struct ToggleEngine<P: PinPort, C: Clock, S: EventSink> {
    pins: Arc<P>,
    clock: C,
    sink: S,
    input: InputLine,
    output: OutputLine,
    window: DebounceWindow,
    led_on: bool,
    state: EvalState,
    toggles: u32,
}

impl<P: PinPort, C: Clock, S: EventSink> ToggleEngine<P, C, S> {
    /// The LED line must already be driven low; the engine starts with
    /// `led_on == false`.
    pub fn new(
        pins: Arc<P>,
        clock: C,
        sink: S,
        input: InputLine,
        output: OutputLine,
        debounce_ms: u32,
    ) -> Self {
        Self {
            pins,
            clock,
            sink,
            input,
            output,
            window: DebounceWindow::new(debounce_ms),
            led_on: false,
            state: EvalState::Idle,
            toggles: 0,
        }
    }

    /// Evaluate one edge notification.
    pub fn on_edge(&mut self) -> Result<EdgeOutcome, LineWriteError> {
        debug_assert_eq!(self.state, EvalState::Idle, "re-entrant evaluation");
        self.state = EvalState::Evaluating;
        let outcome = self.evaluate();
        self.state = EvalState::Idle;
        outcome
    }

    fn evaluate(&mut self) -> Result<EdgeOutcome, LineWriteError> {
        let now = self.clock.now_ms();

        if !self.window.admit(now) {
            let since_accept_ms = self.window.elapsed_since_accept(now).unwrap_or(0);
            self.sink.emit(&AppEvent::EdgeRejected { since_accept_ms });
            return Ok(EdgeOutcome::Rejected);
        }

        if self.pins.read(self.input) != PRESSED {
            self.sink.emit(&AppEvent::ReleasedOnEvaluation);
            return Ok(EdgeOutcome::Released);
        }

        let next = !self.led_on;
        if let Err(e) = self.pins.write(self.output, PinState::from(next)) {
            self.sink.emit(&AppEvent::Fault(e));
            return Err(e);
        }
        self.led_on = next;
        self.toggles = self.toggles.wrapping_add(1);
        debug!("engine: toggle #{} at {}ms", self.toggles, now);
        self.sink.emit(&AppEvent::Toggled { led_on: next });

        Ok(EdgeOutcome::Toggled { led_on: next })
    }

    pub fn led_on(&self) -> bool {
        self.led_on
    }

    pub fn toggles(&self) -> u32 {
        self.toggles
    }

    #[cfg(test)]
    fn state(&self) -> EvalState {
        self.state
    }

    pub fn last_accepted_at(&self) -> Option<u64> {
        self.window.last_accepted_at()
    }
}

impl<P: PinPort, C: Clock, S: EventSink> EdgeHandler for ToggleEngine<P, C, S> {
    fn handle_edge(&mut self) -> Result<(), LineWriteError> {
        self.on_edge().map(|_| ())
    }
}
