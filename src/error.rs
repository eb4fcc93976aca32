//! Error types for the convergence-monitor library
//!
//! Each module owns its error enum; [`MonitorError`] is the top-level type that
//! wraps them while keeping the source chain intact.
//!
//! - **`ConfigError`**: rejected monitor configuration (raised at construction)
//! - **`CriterionError`**: arithmetic-domain failures inside a convergence criterion
//! - **`ProgressError`**: progress line could not be written
//! - **`TraceError`**: a recorded objective trace could not be read or parsed
//!
//! Example error chain:
//! ```text
//! MonitorError::Criterion(
//!     CriterionError::DivisionByZero { current: 1.0 }
//! )
//! ```

use crate::{
    monitor::{ConfigError, criterion::CriterionError},
    observers::ProgressError,
    trace::TraceError,
};
use std::error::Error as StdError;
use thiserror::Error;

/// Main result type used throughout the convergence-monitor library
pub type MonitorResult<T> = Result<T, MonitorError>;

/// Main error type for the convergence-monitor library
#[derive(Debug, Error)]
pub enum MonitorError {
    /// Invalid monitor configuration
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Convergence criterion could not be evaluated
    #[error(transparent)]
    Criterion(#[from] CriterionError),

    /// Progress output failed
    #[error(transparent)]
    Progress(#[from] ProgressError),

    /// Objective trace loading failed
    #[error(transparent)]
    Trace(#[from] TraceError),
}

impl MonitorError {
    /// Get the full error chain as a multi-line string.
    ///
    /// ```rust,ignore
    /// if let Err(e) = monitor.converged() {
    ///     warn!("Convergence check failed:\n{}", MonitorError::from(e).chain());
    /// }
    /// ```
    pub fn chain(&self) -> String {
        let mut chain = vec![self.to_string()];
        let mut source = self.source();

        while let Some(err) = source {
            chain.push(format!("  → {}", err));
            source = err.source();
        }

        chain.join("\n")
    }

    /// Single-line variant of [`chain`](Self::chain) joined with arrows.
    pub fn chain_compact(&self) -> String {
        let mut chain = vec![self.to_string()];
        let mut source = self.source();

        while let Some(err) = source {
            chain.push(err.to_string());
            source = err.source();
        }

        chain.join(" → ")
    }

    /// Whether the error was raised while evaluating a convergence criterion.
    pub fn is_domain_error(&self) -> bool {
        matches!(self, MonitorError::Criterion(_))
    }
}
