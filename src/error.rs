//! Unified error types for the button/LED controller.
//!
//! A single `Error` enum that every subsystem converts into, so the
//! startup/shutdown paths handle failures uniformly.  All variants are
//! `Copy` so they can cross the worker thread boundary without allocation.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level controller error
// ---------------------------------------------------------------------------

/// Every fallible lifecycle operation funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A GPIO line could not be claimed or configured.
    Acquisition(AcquisitionError),
    /// The edge interrupt could not be bound.
    Registration(RegistrationError),
    /// A write hit a line that is not open for output.
    LineWrite(LineWriteError),
    /// The deferred-work worker could not be started or died.
    Runner(RunnerError),
    /// Startup configuration was rejected.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Acquisition(e) => write!(f, "acquisition: {e}"),
            Self::Registration(e) => write!(f, "registration: {e}"),
            Self::LineWrite(e) => write!(f, "line write: {e}"),
            Self::Runner(e) => write!(f, "runner: {e}"),
            Self::Config(e) => write!(f, "config: {e}"),
        }
    }
}

impl std::error::Error for Error {}

// ---------------------------------------------------------------------------
// Pin acquisition
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionError {
    /// The GPIO number does not exist on this chip.
    InvalidLine(i32),
    /// The line is already claimed by another owner.
    AlreadyOwned(i32),
    /// Direction / pull configuration was refused by the driver.
    ConfigFailed { gpio: i32, rc: i32 },
}

impl fmt::Display for AcquisitionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidLine(gpio) => write!(f, "invalid GPIO {gpio}"),
            Self::AlreadyOwned(gpio) => write!(f, "GPIO {gpio} already owned"),
            Self::ConfigFailed { gpio, rc } => {
                write!(f, "GPIO {gpio} configuration failed (rc={rc})")
            }
        }
    }
}

impl From<AcquisitionError> for Error {
    fn from(e: AcquisitionError) -> Self {
        Self::Acquisition(e)
    }
}

// ---------------------------------------------------------------------------
// Edge interrupt registration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistrationError {
    /// The line was not acquired as an input, so it cannot raise edges.
    NotAcquired(i32),
    /// An edge handler is already bound to this line.
    AlreadyBound(i32),
    /// The shared GPIO ISR service could not be installed.
    IsrServiceFailed(i32),
    /// The per-pin handler could not be attached.
    HandlerAddFailed { gpio: i32, rc: i32 },
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAcquired(gpio) => write!(f, "GPIO {gpio} is not an acquired input"),
            Self::AlreadyBound(gpio) => write!(f, "GPIO {gpio} already has an edge handler"),
            Self::IsrServiceFailed(rc) => write!(f, "GPIO ISR service install failed (rc={rc})"),
            Self::HandlerAddFailed { gpio, rc } => {
                write!(f, "GPIO {gpio} ISR handler add failed (rc={rc})")
            }
        }
    }
}

impl From<RegistrationError> for Error {
    fn from(e: RegistrationError) -> Self {
        Self::Registration(e)
    }
}

// ---------------------------------------------------------------------------
// Output writes
// ---------------------------------------------------------------------------

/// Writing the LED line failed.  Under correct lifecycle sequencing this
/// never happens, so it is reported as a defect and never retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineWriteError {
    /// The line is released or was never opened for output.
    NotOpen(i32),
    /// The driver rejected the level write.
    WriteFailed { gpio: i32, rc: i32 },
}

impl fmt::Display for LineWriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotOpen(gpio) => write!(f, "GPIO {gpio} is not open for output"),
            Self::WriteFailed { gpio, rc } => write!(f, "GPIO {gpio} write failed (rc={rc})"),
        }
    }
}

impl From<LineWriteError> for Error {
    fn from(e: LineWriteError) -> Self {
        Self::LineWrite(e)
    }
}

// ---------------------------------------------------------------------------
// Deferred-work runner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerError {
    /// The worker thread could not be created.
    SpawnFailed,
    /// The worker thread panicked before it could be joined.
    WorkerPanicked,
}

impl fmt::Display for RunnerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SpawnFailed => write!(f, "worker spawn failed"),
            Self::WorkerPanicked => write!(f, "worker panicked"),
        }
    }
}

impl From<RunnerError> for Error {
    fn from(e: RunnerError) -> Self {
        Self::Runner(e)
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The override document could not be parsed.
    Malformed,
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Malformed => write!(f, "malformed config document"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {msg}"),
        }
    }
}

impl From<ConfigError> for Error {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Crate-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;
