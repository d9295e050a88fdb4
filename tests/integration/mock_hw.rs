//! Mock pin provider for integration tests.
//!
//! Records every pin call so tests can assert on the full lifecycle
//! history (acquire, arm, write, release order) without touching real
//! GPIO registers.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

use button_led::app::events::AppEvent;
use button_led::app::ports::{Clock, EdgeSource, EventSink, InputLine, OutputLine, PinPort};
use button_led::config::EdgePolarity;
use button_led::error::{AcquisitionError, LineWriteError, RegistrationError};
use button_led::runner::WorkSlot;
use embedded_hal::digital::PinState;

// ── Pin call record ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinCall {
    AcquireInput(i32),
    AcquireOutput(i32, PinState),
    ReleaseInput(i32),
    ReleaseOutput(i32),
    Read(i32),
    Write(i32, PinState),
    EdgeSource(i32),
    Arm(i32),
    Disarm(i32),
}

type Journal = Arc<Mutex<Vec<PinCall>>>;

fn guard<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

// ── Read gate ─────────────────────────────────────────────────
//
// When closed, `read` parks the calling (worker) thread so a test can
// observe the service while an evaluation is in flight.

#[derive(Default)]
struct Gate {
    state: Mutex<GateState>,
    cv: Condvar,
}

#[derive(Default)]
struct GateState {
    closed: bool,
    waiting: bool,
}

// ── MockPins ──────────────────────────────────────────────────

pub struct MockPins {
    calls: Journal,
    level: Mutex<PinState>,
    invalid: Vec<i32>,
    fail_edge_source: bool,
    fail_arm: bool,
    fail_writes: Mutex<bool>,
    armed: Arc<Mutex<Option<Arc<WorkSlot>>>>,
    gate: Gate,
}

#[allow(dead_code)]
impl MockPins {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(Mutex::new(Vec::new())),
            level: Mutex::new(PinState::High),
            invalid: Vec::new(),
            fail_edge_source: false,
            fail_arm: false,
            fail_writes: Mutex::new(false),
            armed: Arc::new(Mutex::new(None)),
            gate: Gate::default(),
        }
    }

    /// Lines that fail acquisition with `InvalidLine`.
    pub fn with_invalid(mut self, gpio: i32) -> Self {
        self.invalid.push(gpio);
        self
    }

    pub fn failing_edge_source(mut self) -> Self {
        self.fail_edge_source = true;
        self
    }

    pub fn failing_arm(mut self) -> Self {
        self.fail_arm = true;
        self
    }

    pub fn fail_writes(&self, fail: bool) {
        *guard(&self.fail_writes) = fail;
    }

    pub fn calls(&self) -> Vec<PinCall> {
        guard(&self.calls).clone()
    }

    pub fn set_level(&self, level: PinState) {
        *guard(&self.level) = level;
    }

    /// Simulate the ISR firing.  Returns `false` when nothing is armed.
    pub fn fire_edge(&self) -> bool {
        match guard(&self.armed).as_ref() {
            Some(slot) => {
                slot.submit();
                true
            }
            None => false,
        }
    }

    pub fn writes(&self) -> Vec<PinState> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                PinCall::Write(_, level) => Some(level),
                _ => None,
            })
            .collect()
    }

    pub fn close_gate(&self) {
        guard(&self.gate.state).closed = true;
    }

    pub fn open_gate(&self) {
        guard(&self.gate.state).closed = false;
        self.gate.cv.notify_all();
    }

    /// Wait until a reader is parked on the closed gate.
    pub fn wait_for_blocked_read(&self, timeout: Duration) -> bool {
        let state = guard(&self.gate.state);
        let (state, _) = self
            .gate
            .cv
            .wait_timeout_while(state, timeout, |s| !s.waiting)
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        state.waiting
    }

    /// Poll until `pred` holds over the journal or `timeout` passes.
    pub fn wait_until(&self, timeout: Duration, pred: impl Fn(&[PinCall]) -> bool) -> bool {
        let deadline = std::time::Instant::now() + timeout;
        while std::time::Instant::now() < deadline {
            if pred(&guard(&self.calls)) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        pred(&guard(&self.calls))
    }

    fn record(&self, call: PinCall) {
        guard(&self.calls).push(call);
    }
}

impl Default for MockPins {
    fn default() -> Self {
        Self::new()
    }
}

impl PinPort for MockPins {
    type Edge = MockEdge;

    fn acquire_input(&self, gpio: i32) -> Result<InputLine, AcquisitionError> {
        if self.invalid.contains(&gpio) {
            return Err(AcquisitionError::InvalidLine(gpio));
        }
        self.record(PinCall::AcquireInput(gpio));
        Ok(InputLine::new(gpio))
    }

    fn acquire_output(&self, gpio: i32, initial: PinState) -> Result<OutputLine, AcquisitionError> {
        if self.invalid.contains(&gpio) {
            return Err(AcquisitionError::InvalidLine(gpio));
        }
        self.record(PinCall::AcquireOutput(gpio, initial));
        Ok(OutputLine::new(gpio))
    }

    fn release_input(&self, line: InputLine) {
        self.record(PinCall::ReleaseInput(line.gpio()));
    }

    fn release_output(&self, line: OutputLine) {
        self.record(PinCall::ReleaseOutput(line.gpio()));
    }

    fn read(&self, line: InputLine) -> PinState {
        self.record(PinCall::Read(line.gpio()));
        let mut state = guard(&self.gate.state);
        if state.closed {
            state.waiting = true;
            self.gate.cv.notify_all();
            while state.closed {
                state = self
                    .gate
                    .cv
                    .wait(state)
                    .unwrap_or_else(std::sync::PoisonError::into_inner);
            }
            state.waiting = false;
        }
        drop(state);
        *guard(&self.level)
    }

    fn write(&self, line: OutputLine, level: PinState) -> Result<(), LineWriteError> {
        if *guard(&self.fail_writes) {
            return Err(LineWriteError::WriteFailed {
                gpio: line.gpio(),
                rc: -1,
            });
        }
        self.record(PinCall::Write(line.gpio(), level));
        Ok(())
    }

    fn edge_source(&self, line: InputLine) -> Result<MockEdge, RegistrationError> {
        if self.fail_edge_source {
            return Err(RegistrationError::NotAcquired(line.gpio()));
        }
        self.record(PinCall::EdgeSource(line.gpio()));
        Ok(MockEdge {
            gpio: line.gpio(),
            fail_arm: self.fail_arm,
            calls: Arc::clone(&self.calls),
            armed: Arc::clone(&self.armed),
        })
    }
}

// ── MockEdge ──────────────────────────────────────────────────

pub struct MockEdge {
    gpio: i32,
    fail_arm: bool,
    calls: Journal,
    armed: Arc<Mutex<Option<Arc<WorkSlot>>>>,
}

impl EdgeSource for MockEdge {
    fn arm(&mut self, _polarity: EdgePolarity, slot: Arc<WorkSlot>) -> Result<(), RegistrationError> {
        if self.fail_arm {
            return Err(RegistrationError::HandlerAddFailed {
                gpio: self.gpio,
                rc: -1,
            });
        }
        let mut armed = guard(&self.armed);
        if armed.is_some() {
            return Err(RegistrationError::AlreadyBound(self.gpio));
        }
        *armed = Some(slot);
        guard(&self.calls).push(PinCall::Arm(self.gpio));
        Ok(())
    }

    fn disarm(&mut self) {
        if guard(&self.armed).take().is_some() {
            guard(&self.calls).push(PinCall::Disarm(self.gpio));
        }
    }

    fn is_armed(&self) -> bool {
        guard(&self.armed).is_some()
    }
}

// ── MockClock ─────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MockClock(Arc<AtomicU64>);

#[allow(dead_code)]
impl MockClock {
    pub fn set(&self, ms: u64) {
        self.0.store(ms, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.0.load(Ordering::SeqCst)
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct RecordingSink(Arc<Mutex<Vec<AppEvent>>>);

#[allow(dead_code)]
impl RecordingSink {
    pub fn events(&self) -> Vec<AppEvent> {
        guard(&self.0).clone()
    }

    pub fn toggles(&self) -> Vec<bool> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                AppEvent::Toggled { led_on } => Some(led_on),
                _ => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        guard(&self.0).push(event.clone());
    }
}
