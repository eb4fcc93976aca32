//! Recorded objective traces.
//!
//! A trace is a plain text file with one objective value per line, in
//! iteration order. Blank lines and lines starting with `#` are skipped.
//!
//! ```text
//! # EM log-likelihood, 3 components
//! -1523.81
//! -1198.02
//! -1187.4
//! ```
//!
//! [`replay`] feeds a trace through a [`Monitor`] exactly as a fitting loop
//! would, stopping at the first iteration where the monitor reports
//! convergence.

use crate::error::MonitorResult;
use crate::monitor::{Monitor, MonitorStatus};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, error};

/// Trace loading error types
#[derive(Debug, Error)]
pub enum TraceError {
    /// Reading from the trace source failed
    #[error("Failed to read trace '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },

    /// A line did not hold a floating point number
    #[error("Invalid objective value on line {line} of '{path}': '{content}'")]
    Parse {
        path: String,
        line: usize,
        content: String,
    },
}

impl TraceError {
    /// Log the error with tracing::error and return self for chaining
    #[must_use]
    pub fn log(self) -> Self {
        error!("{}", self);
        self
    }

    /// Log the error together with the underlying parse error
    #[must_use]
    pub fn log_with_source<E: std::fmt::Debug>(self, source_error: E) -> Self {
        error!("{} | Source: {:?}", self, source_error);
        self
    }
}

/// Parse a trace from any buffered reader; `name` labels error messages.
pub fn read_trace<R: BufRead>(reader: R, name: &str) -> Result<Vec<f64>, TraceError> {
    let mut values = Vec::new();

    for (index, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| {
            TraceError::Io {
                path: name.to_string(),
                source,
            }
            .log()
        })?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let value = trimmed.parse::<f64>().map_err(|e| {
            TraceError::Parse {
                path: name.to_string(),
                line: index + 1,
                content: trimmed.to_string(),
            }
            .log_with_source(e)
        })?;
        values.push(value);
    }

    debug!("Loaded {} objective values from '{}'", values.len(), name);
    Ok(values)
}

/// Open and parse a trace file.
pub fn load_trace<P: AsRef<Path>>(path: P) -> Result<Vec<f64>, TraceError> {
    let path = path.as_ref();
    let name = path.display().to_string();
    let file = File::open(path).map_err(|source| {
        TraceError::Io {
            path: name.clone(),
            source,
        }
        .log()
    })?;
    read_trace(BufReader::new(file), &name)
}

/// Summary of a replayed trace.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayOutcome {
    /// Values reported before the replay stopped
    pub iterations: usize,
    /// Last value reported, if any
    pub final_value: Option<f64>,
    /// Monitor status after the last report
    pub status: MonitorStatus,
}

impl ReplayOutcome {
    pub fn converged(&self) -> bool {
        self.status.is_converged()
    }
}

/// Report `values` to `monitor` in order, stopping once it has converged.
///
/// The monitor is used as-is; call [`Monitor::reset`] first to start a
/// fresh run.
///
/// # Errors
/// Returns [`MonitorError::Criterion`](crate::MonitorError::Criterion) when the
/// convergence check hits an arithmetic-domain error.
pub fn replay(monitor: &mut Monitor, values: &[f64]) -> MonitorResult<ReplayOutcome> {
    let mut reported = 0;
    let mut final_value = None;

    for &value in values {
        monitor.report(value);
        reported += 1;
        final_value = Some(value);
        if monitor.converged()? {
            break;
        }
    }

    Ok(ReplayOutcome {
        iterations: reported,
        final_value,
        status: monitor.status()?,
    })
}
