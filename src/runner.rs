//! Deferred-work runner: interrupt-side notification, worker-side evaluation.
//!
//! The edge ISR must return in bounded time without blocking or allocating,
//! so all it does is [`WorkSlot::submit`].  A single worker thread drains
//! the slot and runs the [`EdgeHandler`] to completion.
//!
//! ```text
//! ┌─────────────┐  submit()  ┌──────────────┐  handle_edge()  ┌─────────────┐
//! │  GPIO ISR   │──────────▶│   WorkSlot    │───────────────▶│  Handler    │
//! │ (no alloc)  │            │ (1 pending)   │   worker thread │ (owns state)│
//! └─────────────┘            └──────────────┘                 └─────────────┘
//! ```
//!
//! The slot holds at most one pending notification.  Edges that arrive
//! while one is already pending are coalesced into it; an edge that arrives
//! while the handler is running re-arms the slot, so the backlog never
//! exceeds one evaluation.

use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use log::{error, info};

use crate::drivers::task_pin::{Core, spawn_on_core};
use crate::error::{LineWriteError, RunnerError};

#[cfg(not(target_os = "espidf"))]
use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, signal::Signal};

#[cfg(target_os = "espidf")]
use esp_idf_hal::task::notification::{Notification, Notifier};

/// Work executed on the deferred worker for each drained notification.
pub trait EdgeHandler: Send + 'static {
    /// Evaluate one edge.  An error stops the worker; it is never retried.
    fn handle_edge(&mut self) -> Result<(), LineWriteError>;
}

// ── Single-slot work item ─────────────────────────────────────

enum Work {
    Edge,
    Stop,
}

/// The hand-off point between interrupt context and the worker.
pub struct WorkSlot {
    pending: AtomicBool,
    stop: AtomicBool,
    submitted: AtomicU32,
    coalesced: AtomicU32,
    wake: Wake,
}

impl Default for WorkSlot {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkSlot {
    pub fn new() -> Self {
        Self {
            pending: AtomicBool::new(false),
            stop: AtomicBool::new(false),
            submitted: AtomicU32::new(0),
            coalesced: AtomicU32::new(0),
            wake: Wake::new(),
        }
    }

    /// Post one notification.  Safe to call from ISR context.
    ///
    /// Returns `false` if a notification was already pending and this one
    /// was folded into it.
    pub fn submit(&self) -> bool {
        self.submitted.fetch_add(1, Ordering::Relaxed);
        if self.pending.swap(true, Ordering::AcqRel) {
            self.coalesced.fetch_add(1, Ordering::Relaxed);
            return false;
        }
        self.wake.wake();
        true
    }

    /// Whether a notification is waiting for the worker.
    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Total notifications posted, coalesced ones included.
    pub fn submitted(&self) -> u32 {
        self.submitted.load(Ordering::Relaxed)
    }

    /// Notifications folded into one that was already pending.
    pub fn coalesced(&self) -> u32 {
        self.coalesced.load(Ordering::Relaxed)
    }

    fn request_stop(&self) {
        self.stop.store(true, Ordering::Release);
        self.wake.wake();
    }

    /// Block until there is something to do.  Stop wins over a pending edge.
    fn next(&self, parker: &Parker) -> Work {
        loop {
            if self.stop.load(Ordering::Acquire) {
                return Work::Stop;
            }
            if self.pending.swap(false, Ordering::AcqRel) {
                return Work::Edge;
            }
            parker.park();
        }
    }
}

// ── Wake primitive ────────────────────────────────────────────
//
// Host: an embassy `Signal` awaited with `futures_lite::block_on`.
// Device: a FreeRTOS task notification, which is ISR-safe.  The worker
// publishes its notifier on startup; a submit before that only sets
// `pending`, which the worker checks before it first parks.

#[cfg(not(target_os = "espidf"))]
struct Wake(Signal<CriticalSectionRawMutex, ()>);

#[cfg(not(target_os = "espidf"))]
impl Wake {
    const fn new() -> Self {
        Self(Signal::new())
    }

    fn wake(&self) {
        self.0.signal(());
    }
}

#[cfg(not(target_os = "espidf"))]
struct Parker(Arc<WorkSlot>);

#[cfg(not(target_os = "espidf"))]
impl Parker {
    fn bind(slot: &Arc<WorkSlot>) -> Self {
        Self(Arc::clone(slot))
    }

    fn park(&self) {
        futures_lite::future::block_on(self.0.wake.0.wait());
    }
}

#[cfg(target_os = "espidf")]
const WAKE_BITS: core::num::NonZeroU32 = core::num::NonZeroU32::MIN;

#[cfg(target_os = "espidf")]
struct Wake(std::sync::OnceLock<Arc<Notifier>>);

#[cfg(target_os = "espidf")]
impl Wake {
    const fn new() -> Self {
        Self(std::sync::OnceLock::new())
    }

    fn wake(&self) {
        if let Some(notifier) = self.0.get() {
            // SAFETY: the worker task outlives every armed ISR; the edge
            // source is disarmed before the worker is joined.
            let _ = unsafe { notifier.notify_and_yield(WAKE_BITS) };
        }
    }
}

#[cfg(target_os = "espidf")]
struct Parker(Notification);

#[cfg(target_os = "espidf")]
impl Parker {
    fn bind(slot: &Arc<WorkSlot>) -> Self {
        let notification = Notification::new();
        let _ = slot.wake.0.set(notification.notifier());
        Self(notification)
    }

    fn park(&self) {
        let _ = self.0.wait(esp_idf_hal::delay::BLOCK);
    }
}

// ── Worker ────────────────────────────────────────────────────

/// What the worker hands back when it is joined.
pub struct WorkerExit<H> {
    /// The handler, with whatever state it accumulated.
    pub handler: H,
    /// Set if the worker stopped because an evaluation failed.
    pub fault: Option<LineWriteError>,
    /// Edges evaluated over the worker's lifetime.
    pub evaluated: u32,
}

/// Owns the worker thread that drains a [`WorkSlot`].
pub struct DeferredRunner<H: EdgeHandler> {
    slot: Arc<WorkSlot>,
    worker: JoinHandle<WorkerExit<H>>,
}

impl<H: EdgeHandler> DeferredRunner<H> {
    /// Start the worker.  The handler moves onto the worker thread and
    /// comes back from [`drain_and_stop`](Self::drain_and_stop).
    pub fn spawn(
        slot: Arc<WorkSlot>,
        handler: H,
        stack_kb: usize,
        priority: u8,
    ) -> Result<Self, RunnerError> {
        let worker_slot = Arc::clone(&slot);
        let worker = spawn_on_core(Core::App, priority, stack_kb, "btn-work\0", move || {
            worker_loop(&worker_slot, handler)
        })
        .map_err(|e| {
            error!("runner: worker spawn failed: {}", e);
            RunnerError::SpawnFailed
        })?;

        Ok(Self { slot, worker })
    }

    pub fn slot(&self) -> &Arc<WorkSlot> {
        &self.slot
    }

    /// `false` once the worker has exited, e.g. after a write fault.
    pub fn is_running(&self) -> bool {
        !self.worker.is_finished()
    }

    /// Stop the worker and wait for it.  An evaluation already in progress
    /// runs to completion first; a notification still pending is dropped.
    pub fn drain_and_stop(self) -> Result<WorkerExit<H>, RunnerError> {
        self.slot.request_stop();
        self.worker.join().map_err(|_| RunnerError::WorkerPanicked)
    }
}

fn worker_loop<H: EdgeHandler>(slot: &Arc<WorkSlot>, mut handler: H) -> WorkerExit<H> {
    let parker = Parker::bind(slot);
    let mut evaluated = 0u32;

    loop {
        match slot.next(&parker) {
            Work::Stop => {
                info!("runner: stop requested after {} evaluations", evaluated);
                return WorkerExit {
                    handler,
                    fault: None,
                    evaluated,
                };
            }
            Work::Edge => {
                evaluated = evaluated.wrapping_add(1);
                if let Err(e) = handler.handle_edge() {
                    error!("runner: evaluation failed, worker halted: {}", e);
                    return WorkerExit {
                        handler,
                        fault: Some(e),
                        evaluated,
                    };
                }
            }
        }
    }
}
