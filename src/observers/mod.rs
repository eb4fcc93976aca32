//! Observer pattern for per-iteration progress reporting.
//!
//! A [`Monitor`](crate::Monitor) notifies its observers once per
//! [`report`](crate::Monitor::report) call with a [`ProgressRecord`]. Observers
//! only watch: nothing they do can change the monitor's history, its
//! iteration counter or the convergence decision.
//!
//! ```text
//! ┌─────────────────┐
//! │   EM loop       │
//! └────────┬────────┘
//!          │ monitor.report(logprob)
//!          ▼
//! ┌─────────────────┐  observers.notify(&record)
//! │    Monitor      ├──────────────┬──────────────┐
//! └─────────────────┘              ▼              ▼
//!                          ┌──────────────┐ ┌──────────────┐
//!                          │ StreamProgress│ │   Custom     │
//!                          │   (stderr)    │ │   Observer   │
//!                          └──────────────┘ └──────────────┘
//! ```
//!
//! The verbose progress line matches the classic EM monitor layout: iteration
//! (width 10), objective value (width 16, 4 decimals) and signed delta
//! (width 16, 4 decimals). The first line has no delta and shows `NaN`.
//!
//! ```text
//!          1       -1234.5678              NaN
//!          2       -1200.0000         +34.5678
//! ```

use std::fmt::{self, Display, Formatter};
use std::io::{self, Write};
use std::sync::Mutex;
use thiserror::Error;
use tracing::{error, info, warn};

/// Observer-specific error types
#[derive(Debug, Error)]
pub enum ProgressError {
    /// Writing the progress line failed
    #[error("Failed to write progress line: {0}")]
    Write(#[from] io::Error),

    /// Mutex was poisoned (thread panicked while holding lock)
    #[error("Mutex poisoned in {context}: {reason}")]
    MutexPoisoned { context: String, reason: String },
}

impl ProgressError {
    /// Log the error with tracing::error and return self for chaining
    #[must_use]
    pub fn log(self) -> Self {
        error!("{}", self);
        self
    }
}

/// Result type for observer operations
pub type ProgressResult<T> = Result<T, ProgressError>;

/// What a monitor knows about one reported iteration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressRecord {
    /// 1-based iteration number (counter value after the report)
    pub iteration: usize,
    /// Objective value reported for this iteration
    pub value: f64,
    /// `value - previous`, `None` on the first report after construction or reset
    pub delta: Option<f64>,
}

impl Display for ProgressRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{:>10} {:>16.4} ", self.iteration, self.value)?;
        match self.delta {
            Some(delta) => write!(f, "{delta:>+16.4}"),
            None => write!(f, "{:>16}", "NaN"),
        }
    }
}

/// Observer trait for per-report notifications.
///
/// Observers must be `Send` so a monitor can be moved to a worker thread.
/// Use interior mutability if state needs to change in `on_report`.
pub trait ProgressObserver: Send {
    /// Called after the monitor has recorded `record.value`.
    ///
    /// Failures must be handled internally (log, don't panic).
    fn on_report(&self, record: &ProgressRecord);
}

/// Writes one formatted progress line per report to an `io::Write` sink.
///
/// A failed write is logged and dropped.
pub struct StreamProgress<W: Write + Send> {
    writer: Mutex<W>,
}

impl StreamProgress<io::Stderr> {
    /// Progress lines on standard error (the verbose monitor output).
    pub fn stderr() -> Self {
        Self::new(io::stderr())
    }
}

impl<W: Write + Send> StreamProgress<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    /// Format `record` and flush it to the underlying writer.
    pub fn write_record(&self, record: &ProgressRecord) -> ProgressResult<()> {
        let mut writer = self.writer.lock().map_err(|e| ProgressError::MutexPoisoned {
            context: "StreamProgress::write_record".to_string(),
            reason: e.to_string(),
        })?;
        writeln!(writer, "{record}")?;
        writer.flush()?;
        Ok(())
    }

    /// Recover the writer, e.g. to inspect buffered output.
    pub fn into_inner(self) -> ProgressResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| ProgressError::MutexPoisoned {
                context: "StreamProgress::into_inner".to_string(),
                reason: e.to_string(),
            })
    }
}

impl<W: Write + Send> ProgressObserver for StreamProgress<W> {
    fn on_report(&self, record: &ProgressRecord) {
        if let Err(e) = self.write_record(record) {
            warn!("Dropping progress line for iteration {}: {}", record.iteration, e);
        }
    }
}

/// Emits progress as `tracing` events instead of raw stream output.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressObserver for TracingProgress {
    fn on_report(&self, record: &ProgressRecord) {
        info!(
            iteration = record.iteration,
            value = record.value,
            delta = ?record.delta,
            "{record}"
        );
    }
}

/// Collection of observers owned by a monitor.
#[derive(Default)]
pub struct ProgressObserverVec {
    observers: Vec<Box<dyn ProgressObserver>>,
}

impl ProgressObserverVec {
    pub fn new() -> Self {
        Self {
            observers: Vec::new(),
        }
    }

    /// Add an observer; observers are notified in insertion order.
    pub fn add(&mut self, observer: impl ProgressObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Notify every observer. No-op when empty.
    #[inline]
    pub fn notify(&self, record: &ProgressRecord) {
        for observer in &self.observers {
            observer.on_report(record);
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.observers.len()
    }
}

impl fmt::Debug for ProgressObserverVec {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressObserverVec")
            .field("len", &self.observers.len())
            .finish()
    }
}
