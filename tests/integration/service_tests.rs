//! Lifecycle tests for `ButtonLedService` against the recording mock.
//!
//! Covers the startup order and its unwinding on every failure point, the
//! debounce/toggle pipeline through the real worker thread, and the
//! shutdown ordering while an evaluation is still in flight.

use std::sync::Arc;
use std::time::Duration;

use button_led::app::events::AppEvent;
use button_led::error::{
    AcquisitionError, ConfigError, Error, LineWriteError, RegistrationError,
};
use button_led::{ButtonLedService, ControllerConfig, ShutdownReport};
use embedded_hal::digital::PinState;

use crate::mock_hw::{MockClock, MockPins, PinCall, RecordingSink};

const TIMEOUT: Duration = Duration::from_secs(2);

type Service = ButtonLedService<MockPins, MockClock, RecordingSink>;

fn start_with(pins: MockPins) -> (Result<Service, Error>, Arc<MockPins>, MockClock, RecordingSink) {
    let pins = Arc::new(pins);
    let clock = MockClock::default();
    let sink = RecordingSink::default();
    let service = ButtonLedService::start(
        &ControllerConfig::default(),
        Arc::clone(&pins),
        clock.clone(),
        sink.clone(),
    );
    (service, pins, clock, sink)
}

fn wait_for_events(sink: &RecordingSink, count: usize) -> bool {
    let deadline = std::time::Instant::now() + TIMEOUT;
    while std::time::Instant::now() < deadline {
        if sink.events().len() >= count {
            return true;
        }
        std::thread::sleep(Duration::from_millis(2));
    }
    false
}

// ── Startup ───────────────────────────────────────────────────

#[test]
fn start_acquires_both_lines_and_arms_last() {
    let (service, pins, _, sink) = start_with(MockPins::new());
    let service = service.unwrap();

    assert_eq!(
        pins.calls(),
        vec![
            PinCall::AcquireInput(16),
            PinCall::AcquireOutput(21, PinState::Low),
            PinCall::EdgeSource(16),
            PinCall::Arm(16),
        ]
    );
    assert!(service.is_running());
    assert!(matches!(sink.events()[0], AppEvent::Started { button_gpio: 16, led_gpio: 21, .. }));

    service.stop().unwrap();
}

#[test]
fn invalid_output_releases_input_and_never_arms() {
    let (service, pins, _, sink) = start_with(MockPins::new().with_invalid(21));

    assert_eq!(
        service.err(),
        Some(Error::Acquisition(AcquisitionError::InvalidLine(21)))
    );
    assert_eq!(
        pins.calls(),
        vec![PinCall::AcquireInput(16), PinCall::ReleaseInput(16)]
    );
    assert!(!pins.fire_edge(), "no interrupt may be armed");
    assert!(sink.events().is_empty());
}

#[test]
fn invalid_input_touches_nothing_else() {
    let (service, pins, _, _) = start_with(MockPins::new().with_invalid(16));

    assert_eq!(
        service.err(),
        Some(Error::Acquisition(AcquisitionError::InvalidLine(16)))
    );
    assert!(pins.calls().is_empty());
}

#[test]
fn edge_source_failure_releases_in_reverse_order() {
    let (service, pins, _, _) = start_with(MockPins::new().failing_edge_source());

    assert_eq!(
        service.err(),
        Some(Error::Registration(RegistrationError::NotAcquired(16)))
    );
    assert_eq!(
        pins.calls(),
        vec![
            PinCall::AcquireInput(16),
            PinCall::AcquireOutput(21, PinState::Low),
            PinCall::ReleaseOutput(21),
            PinCall::ReleaseInput(16),
        ]
    );
}

#[test]
fn arm_failure_stops_worker_and_releases_lines() {
    let (service, pins, _, _) = start_with(MockPins::new().failing_arm());

    assert_eq!(
        service.err(),
        Some(Error::Registration(RegistrationError::HandlerAddFailed { gpio: 16, rc: -1 }))
    );
    assert_eq!(
        pins.calls(),
        vec![
            PinCall::AcquireInput(16),
            PinCall::AcquireOutput(21, PinState::Low),
            PinCall::EdgeSource(16),
            PinCall::ReleaseOutput(21),
            PinCall::ReleaseInput(16),
        ]
    );
}

#[test]
fn rejected_config_touches_no_pin() {
    let pins = Arc::new(MockPins::new());
    let config = ControllerConfig {
        led_gpio: 16,
        ..ControllerConfig::default()
    };
    let result = ButtonLedService::start(
        &config,
        Arc::clone(&pins),
        MockClock::default(),
        RecordingSink::default(),
    );

    assert!(matches!(
        result.err(),
        Some(Error::Config(ConfigError::ValidationFailed(_)))
    ));
    assert!(pins.calls().is_empty());
}

// ── Edge pipeline ─────────────────────────────────────────────

#[test]
fn bounce_is_filtered_through_the_worker() {
    let (service, pins, clock, sink) = start_with(MockPins::new());
    let service = service.unwrap();
    pins.set_level(PinState::Low);

    clock.set(0);
    assert!(pins.fire_edge());
    assert!(wait_for_events(&sink, 2));

    clock.set(50);
    pins.fire_edge();
    assert!(wait_for_events(&sink, 3));

    clock.set(250);
    pins.fire_edge();
    assert!(wait_for_events(&sink, 4));

    assert_eq!(sink.toggles(), vec![true, false]);
    assert_eq!(sink.events()[2], AppEvent::EdgeRejected { since_accept_ms: 50 });
    assert_eq!(pins.writes(), vec![PinState::High, PinState::Low]);

    let report = service.stop().unwrap();
    assert_eq!(
        report,
        ShutdownReport {
            led_was_on: false,
            toggles: 2,
            coalesced: 0,
        }
    );
}

#[test]
fn released_button_consumes_window_without_writing() {
    let (service, pins, clock, sink) = start_with(MockPins::new());
    let service = service.unwrap();
    pins.set_level(PinState::High);

    clock.set(0);
    pins.fire_edge();
    assert!(wait_for_events(&sink, 2));

    assert_eq!(sink.events()[1], AppEvent::ReleasedOnEvaluation);
    assert!(pins.writes().is_empty());

    let report = service.stop().unwrap();
    assert!(!report.led_was_on);
    assert_eq!(report.toggles, 0);
}

#[test]
fn write_fault_halts_worker_and_surfaces_on_stop() {
    let (service, pins, clock, sink) = start_with(MockPins::new());
    let service = service.unwrap();
    pins.set_level(PinState::Low);
    pins.fail_writes(true);

    clock.set(0);
    pins.fire_edge();
    let deadline = std::time::Instant::now() + TIMEOUT;
    while service.is_running() && std::time::Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(2));
    }
    assert!(!service.is_running());

    let fault = LineWriteError::WriteFailed { gpio: 21, rc: -1 };
    assert!(sink.events().contains(&AppEvent::Fault(fault)));
    assert_eq!(service.stop(), Err(Error::LineWrite(fault)));

    // Lines are returned even on the error path.
    let calls = pins.calls();
    assert_eq!(
        &calls[calls.len() - 2..],
        &[PinCall::ReleaseOutput(21), PinCall::ReleaseInput(16)]
    );
}

// ── Shutdown ──────────────────────────────────────────────────

#[test]
fn stop_forces_led_low_then_releases_output_then_input() {
    let (service, pins, _, sink) = start_with(MockPins::new());
    let report = service.unwrap().stop().unwrap();

    assert_eq!(
        pins.calls()[4..],
        [
            PinCall::Disarm(16),
            PinCall::Write(21, PinState::Low),
            PinCall::ReleaseOutput(21),
            PinCall::ReleaseInput(16),
        ]
    );
    assert!(!report.led_was_on);
    assert_eq!(
        sink.events().last(),
        Some(&AppEvent::Stopped {
            led_was_on: false,
            toggles: 0,
        })
    );
    assert!(!pins.fire_edge(), "edge source must be disarmed");
}

#[test]
fn dropping_a_lit_service_forces_led_low_and_releases_lines() {
    let (service, pins, clock, sink) = start_with(MockPins::new());
    let service = service.unwrap();
    pins.set_level(PinState::Low);

    clock.set(0);
    pins.fire_edge();
    assert!(wait_for_events(&sink, 2));
    assert_eq!(sink.toggles(), vec![true]);

    drop(service);

    assert_eq!(
        pins.calls()[4..],
        [
            PinCall::Read(16),
            PinCall::Write(21, PinState::High),
            PinCall::Disarm(16),
            PinCall::Write(21, PinState::Low),
            PinCall::ReleaseOutput(21),
            PinCall::ReleaseInput(16),
        ]
    );
    assert_eq!(
        sink.events().last(),
        Some(&AppEvent::Stopped {
            led_was_on: true,
            toggles: 1,
        })
    );
    assert!(!pins.fire_edge());
}

#[test]
fn stop_waits_for_in_flight_evaluation() {
    let (service, pins, clock, _) = start_with(MockPins::new());
    let service = service.unwrap();
    pins.set_level(PinState::Low);
    pins.close_gate();

    clock.set(0);
    pins.fire_edge();
    assert!(pins.wait_for_blocked_read(TIMEOUT));

    let stopper = std::thread::spawn(move || service.stop());
    assert!(pins.wait_until(TIMEOUT, |c| c.contains(&PinCall::Disarm(16))));

    // Evaluation is parked inside the read: shutdown must not go further.
    std::thread::sleep(Duration::from_millis(50));
    assert!(!stopper.is_finished());
    assert!(pins.writes().is_empty());

    pins.open_gate();
    let report = stopper.join().unwrap().unwrap();
    assert!(report.led_was_on, "the in-flight press completed");
    assert_eq!(report.toggles, 1);

    assert_eq!(
        pins.calls()[4..],
        [
            PinCall::Read(16),
            PinCall::Disarm(16),
            PinCall::Write(21, PinState::High),
            PinCall::Write(21, PinState::Low),
            PinCall::ReleaseOutput(21),
            PinCall::ReleaseInput(16),
        ]
    );
}

#[test]
fn edges_while_pending_are_coalesced() {
    let (service, pins, clock, sink) = start_with(MockPins::new());
    let service = service.unwrap();
    pins.set_level(PinState::Low);
    pins.close_gate();

    clock.set(0);
    pins.fire_edge();
    assert!(pins.wait_for_blocked_read(TIMEOUT));

    // The worker is busy: the first of these re-arms the slot, the rest fold in.
    pins.fire_edge();
    pins.fire_edge();
    pins.fire_edge();
    assert_eq!(service.slot().coalesced(), 2);

    clock.set(500);
    pins.open_gate();
    // Started, first toggle, then exactly one more evaluation.
    assert!(wait_for_events(&sink, 3));
    std::thread::sleep(Duration::from_millis(50));
    assert_eq!(sink.toggles(), vec![true, false]);

    let report = service.stop().unwrap();
    assert_eq!(report.coalesced, 2);
    assert_eq!(report.toggles, 2);
}
