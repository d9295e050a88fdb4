//! Controller service: lifecycle around the toggle engine.
//!
//! [`ButtonLedService`] acquires both lines, starts the deferred worker
//! and arms the edge interrupt.  All I/O flows through port traits, so
//! the whole lifecycle is testable with mock adapters.
//!
//! ```text
//!  start:  acquire input → acquire output (low) → spawn worker → arm edge
//!  stop:   disarm edge → join worker → force output low → release output → release input
//! ```
//!
//! Any startup failure unwinds what was already done, in reverse order,
//! before the error is returned.  Arming is the last startup step, so a
//! failed start never leaves an interrupt live.
//!
//! Dropping a running service performs the same teardown as
//! [`ButtonLedService::stop`]; only the report and error are lost.

use std::sync::Arc;

use embedded_hal::digital::PinState;
use log::{error, info, warn};

use crate::config::ControllerConfig;
use crate::error::Result;
use crate::runner::{DeferredRunner, WorkSlot};

use super::engine::ToggleEngine;
use super::events::AppEvent;
use super::ports::{Clock, EdgeSource, EventSink, InputLine, OutputLine, PinPort};

/// What the engine looked like when the service was stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// LED level right before it was forced off.
    pub led_was_on: bool,
    /// Accepted presses over the service lifetime.
    pub toggles: u32,
    /// Edge notifications folded into an already-pending one.
    pub coalesced: u32,
}

pub struct ButtonLedService<P: PinPort, C: Clock, S: EventSink> {
    pins: Arc<P>,
    sink: S,
    input: InputLine,
    output: OutputLine,
    edge: P::Edge,
    slot: Arc<WorkSlot>,
    /// `None` once torn down.
    runner: Option<DeferredRunner<ToggleEngine<P, C, S>>>,
}

impl<P: PinPort, C: Clock, S: EventSink> ButtonLedService<P, C, S> {
    /// Bring the controller up.  On success the button is live.
    pub fn start(config: &ControllerConfig, pins: Arc<P>, clock: C, mut sink: S) -> Result<Self> {
        info!(
            "ButtonLed: initialising (button GPIO {}, LED GPIO {})",
            config.button_gpio, config.led_gpio
        );
        config.validate()?;

        let input = pins.acquire_input(config.button_gpio).map_err(|e| {
            error!("ButtonLed: failed to acquire button GPIO: {}", e);
            e
        })?;

        let output = match pins.acquire_output(config.led_gpio, PinState::Low) {
            Ok(line) => line,
            Err(e) => {
                error!("ButtonLed: failed to acquire LED GPIO: {}", e);
                pins.release_input(input);
                return Err(e.into());
            }
        };

        let mut edge = match pins.edge_source(input) {
            Ok(edge) => edge,
            Err(e) => {
                error!("ButtonLed: no edge interrupt for button GPIO: {}", e);
                pins.release_output(output);
                pins.release_input(input);
                return Err(e.into());
            }
        };

        let slot = Arc::new(WorkSlot::new());
        let engine = ToggleEngine::new(
            Arc::clone(&pins),
            clock,
            sink.clone(),
            input,
            output,
            config.debounce_ms,
        );
        let runner = match DeferredRunner::spawn(
            Arc::clone(&slot),
            engine,
            usize::from(config.worker_stack_kb),
            config.worker_priority,
        ) {
            Ok(runner) => runner,
            Err(e) => {
                pins.release_output(output);
                pins.release_input(input);
                return Err(e.into());
            }
        };

        if let Err(e) = edge.arm(config.edge, Arc::clone(&slot)) {
            error!("ButtonLed: failed to arm edge interrupt: {}", e);
            if let Err(stop_err) = runner.drain_and_stop() {
                warn!("ButtonLed: worker did not stop cleanly: {}", stop_err);
            }
            pins.release_output(output);
            pins.release_input(input);
            return Err(e.into());
        }

        info!(
            "ButtonLed: loaded (button GPIO {}, LED GPIO {}, {:?} edge, {}ms debounce)",
            config.button_gpio, config.led_gpio, config.edge, config.debounce_ms
        );
        sink.emit(&AppEvent::Started {
            button_gpio: config.button_gpio,
            led_gpio: config.led_gpio,
            edge: config.edge,
            debounce_ms: config.debounce_ms,
        });

        Ok(Self {
            pins,
            sink,
            input,
            output,
            edge,
            slot,
            runner: Some(runner),
        })
    }

    /// `false` once the worker has halted on a write fault.
    pub fn is_running(&self) -> bool {
        self.runner.as_ref().is_some_and(DeferredRunner::is_running)
    }

    pub fn slot(&self) -> &Arc<WorkSlot> {
        &self.slot
    }

    pub fn input(&self) -> InputLine {
        self.input
    }

    pub fn output(&self) -> OutputLine {
        self.output
    }

    /// Tear the controller down.  Blocks until any in-flight evaluation
    /// has finished.  Both lines are released even when an error is
    /// returned; the first fault encountered wins.
    pub fn stop(mut self) -> Result<ShutdownReport> {
        match self.runner.take() {
            Some(runner) => self.teardown(runner),
            // Only `stop` and `Drop` take the runner, and `stop` consumes self.
            None => Ok(ShutdownReport {
                led_was_on: false,
                toggles: 0,
                coalesced: self.slot.coalesced(),
            }),
        }
    }

    fn teardown(&mut self, runner: DeferredRunner<ToggleEngine<P, C, S>>) -> Result<ShutdownReport> {
        info!("ButtonLed: cleaning up");

        self.edge.disarm();
        let joined = runner.drain_and_stop();
        let forced = self.pins.write(self.output, PinState::Low);
        if let Err(e) = forced {
            error!("ButtonLed: could not force LED off: {}", e);
        }
        self.pins.release_output(self.output);
        self.pins.release_input(self.input);

        let exit = joined?;
        let report = ShutdownReport {
            led_was_on: exit.handler.led_on(),
            toggles: exit.handler.toggles(),
            coalesced: self.slot.coalesced(),
        };
        self.sink.emit(&AppEvent::Stopped {
            led_was_on: report.led_was_on,
            toggles: report.toggles,
        });
        info!("ButtonLed: unloaded");

        if let Some(fault) = exit.fault {
            return Err(fault.into());
        }
        forced?;
        Ok(report)
    }
}

impl<P: PinPort, C: Clock, S: EventSink> Drop for ButtonLedService<P, C, S> {
    fn drop(&mut self) {
        if let Some(runner) = self.runner.take() {
            warn!("ButtonLed: dropped without stop, tearing down");
            if let Err(e) = self.teardown(runner) {
                error!("ButtonLed: teardown on drop failed: {}", e);
            }
        }
    }
}
