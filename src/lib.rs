//! # Convergence Monitor
//!
//! Convergence monitoring for iterative fitting loops such as
//! Expectation-Maximization. After every iteration the loop reports its
//! objective value (typically the log-likelihood); the monitor keeps the two
//! most recent values, counts iterations, optionally prints a progress line,
//! and decides whether the fit has converged.
//!
//! ## Convergence Criteria
//!
//! - **Absolute gain**: `current - previous < tol`
//! - **Relative gain**: `(current - previous) / previous < tol`, failing with a
//!   domain error when `previous` is zero
//! - **Threshold**: `current >= tol`
//!
//! Independently of the criterion, a monitor reports convergence once the
//! iteration counter reaches `max_iterations`.
//!
//! ## Example
//!
//! ```
//! use convergence_monitor::{Monitor, MonitorConfig, MonitorStatus};
//!
//! # fn main() -> Result<(), convergence_monitor::MonitorError> {
//! let mut monitor = Monitor::new(MonitorConfig::absolute_gain(1e-3, 50, false))?;
//!
//! // Each step halves the remaining gap to the optimum at -10.
//! let mut logprob = -1000.0_f64;
//! loop {
//!     logprob = -10.0 + (logprob + 10.0) * 0.5;
//!     monitor.report(logprob);
//!     if monitor.converged()? {
//!         break;
//!     }
//! }
//! assert_eq!(monitor.status()?, MonitorStatus::CriterionMet);
//! assert!(monitor.iteration() < 50);
//! # Ok(())
//! # }
//! ```

pub mod error;
#[cfg(feature = "logging")]
pub mod logger;
pub mod monitor;
pub mod observers;
pub mod trace;

pub use error::{MonitorError, MonitorResult};
#[cfg(feature = "logging")]
pub use logger::{init_logger, init_logger_with_level};
pub use monitor::criterion::{ConvergenceCriterion, CriterionError};
pub use monitor::history::History;
pub use monitor::{ConfigError, Monitor, MonitorConfig, MonitorStatus};
pub use observers::{
    ProgressError, ProgressObserver, ProgressObserverVec, ProgressRecord, StreamProgress,
    TracingProgress,
};
pub use trace::{ReplayOutcome, TraceError, load_trace, read_trace, replay};
