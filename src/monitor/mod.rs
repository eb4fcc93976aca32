//! Convergence monitor for Expectation-Maximization style fitting loops.
//!
//! The fitting loop calls [`Monitor::report`] once per completed iteration
//! with the objective value (usually the log-likelihood) and then asks
//! [`Monitor::converged`] whether it should stop:
//!
//! ```
//! use convergence_monitor::{ConvergenceCriterion, Monitor, MonitorConfig};
//!
//! # fn main() -> Result<(), convergence_monitor::MonitorError> {
//! let config = MonitorConfig::new(ConvergenceCriterion::AbsoluteGain, 1e-2, 100, false);
//! let mut monitor = Monitor::new(config)?;
//!
//! for logprob in [-120.0, -80.0, -79.5, -79.495] {
//!     monitor.report(logprob);
//!     if monitor.converged()? {
//!         break;
//!     }
//! }
//! assert_eq!(monitor.iteration(), 4);
//! # Ok(())
//! # }
//! ```
//!
//! # State machine
//!
//! ```text
//! Idle ──report──▶ Running ──report──▶ CriterionMet
//!                     │
//!                     └────report────▶ MaxIterationsReached
//! ```
//!
//! Only `report` moves the monitor between states; `converged` and `status`
//! are pure queries. Reporting after convergence is allowed and keeps
//! accumulating history.

pub mod criterion;
pub mod history;

use crate::observers::{ProgressObserver, ProgressObserverVec, ProgressRecord, StreamProgress};
use criterion::{ConvergenceCriterion, CriterionResult};
use history::History;
use std::{
    fmt,
    fmt::{Display, Formatter},
};
use thiserror::Error;
use tracing::{debug, error, warn};

/// Monitor configuration error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// A monitor must allow at least one iteration
    #[error("max_iterations must be positive, got 0")]
    ZeroMaxIterations,

    /// Tolerance outside the numeric domain of the chosen criterion
    #[error("Tolerance {tolerance} is not supported by the {criterion} criterion")]
    InvalidTolerance {
        criterion: ConvergenceCriterion,
        tolerance: f64,
    },
}

impl ConfigError {
    /// Log the error with tracing::error and return self for chaining
    #[must_use]
    pub fn log(self) -> Self {
        error!("{}", self);
        self
    }
}

/// Configuration of a [`Monitor`].
///
/// There are no defaults: the criterion, tolerance, iteration cap and
/// verbosity are always chosen by the caller.
///
/// ```
/// use convergence_monitor::{ConvergenceCriterion, MonitorConfig};
///
/// let config = MonitorConfig::absolute_gain(1e-2, 10, false)
///     .with_max_iterations(250)
///     .with_verbose(true);
/// assert_eq!(config.criterion, ConvergenceCriterion::AbsoluteGain);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonitorConfig {
    /// Decision rule applied to the history
    pub criterion: ConvergenceCriterion,
    /// Threshold whose meaning depends on `criterion`
    pub tolerance: f64,
    /// Maximum number of iterations; reaching it counts as converged
    pub max_iterations: usize,
    /// Write a progress line to stderr on every report
    pub verbose: bool,
}

impl MonitorConfig {
    pub fn new(
        criterion: ConvergenceCriterion,
        tolerance: f64,
        max_iterations: usize,
        verbose: bool,
    ) -> Self {
        Self {
            criterion,
            tolerance,
            max_iterations,
            verbose,
        }
    }

    /// Stop once the absolute gain drops below `tolerance`.
    pub fn absolute_gain(tolerance: f64, max_iterations: usize, verbose: bool) -> Self {
        Self::new(
            ConvergenceCriterion::AbsoluteGain,
            tolerance,
            max_iterations,
            verbose,
        )
    }

    /// Stop once the relative gain drops below `tolerance`.
    pub fn relative_gain(tolerance: f64, max_iterations: usize, verbose: bool) -> Self {
        Self::new(
            ConvergenceCriterion::RelativeGain,
            tolerance,
            max_iterations,
            verbose,
        )
    }

    /// Stop once the objective reaches `tolerance`.
    pub fn threshold(tolerance: f64, max_iterations: usize, verbose: bool) -> Self {
        Self::new(
            ConvergenceCriterion::Threshold,
            tolerance,
            max_iterations,
            verbose,
        )
    }

    pub fn with_criterion(mut self, criterion: ConvergenceCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Check the configuration without building a monitor.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iterations == 0 {
            return Err(ConfigError::ZeroMaxIterations);
        }
        if !self.criterion.accepts_tolerance(self.tolerance) {
            return Err(ConfigError::InvalidTolerance {
                criterion: self.criterion,
                tolerance: self.tolerance,
            });
        }
        Ok(())
    }

    pub fn print_configuration(&self) {
        debug!(
            "Monitor configuration:\n  Criterion:      {}\n  Tolerance:      {:.2e}\n  Max iterations: {}\n  Verbose:        {}",
            self.criterion, self.tolerance, self.max_iterations, self.verbose
        );
    }
}

/// Where a monitor stands in its run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorStatus {
    /// Nothing reported yet
    Idle,
    /// Reports received, not converged
    Running,
    /// The convergence criterion holds
    CriterionMet,
    /// The iteration counter reached `max_iterations`
    MaxIterationsReached,
}

impl MonitorStatus {
    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            MonitorStatus::CriterionMet | MonitorStatus::MaxIterationsReached
        )
    }
}

impl Display for MonitorStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            MonitorStatus::Idle => write!(f, "Idle"),
            MonitorStatus::Running => write!(f, "Running"),
            MonitorStatus::CriterionMet => write!(f, "Convergence criterion met"),
            MonitorStatus::MaxIterationsReached => write!(f, "Maximum iterations reached"),
        }
    }
}

/// Tracks the objective of an iterative fit and decides when it has converged.
///
/// One monitor belongs to one fitting loop. Construct it with a validated
/// [`MonitorConfig`], call [`report`](Self::report) after every iteration and
/// poll [`converged`](Self::converged). [`reset`](Self::reset) prepares it for
/// another fit with the same configuration.
#[derive(Debug)]
pub struct Monitor {
    config: MonitorConfig,
    history: History,
    iteration: usize,
    observers: ProgressObserverVec,
}

impl Monitor {
    /// Build a monitor, rejecting configurations the criterion cannot evaluate.
    ///
    /// A verbose configuration registers a stderr progress observer.
    pub fn new(config: MonitorConfig) -> Result<Self, ConfigError> {
        config.validate().map_err(ConfigError::log)?;
        config.print_configuration();

        let mut observers = ProgressObserverVec::new();
        if config.verbose {
            observers.add(StreamProgress::stderr());
        }

        Ok(Self {
            config,
            history: History::new(),
            iteration: 0,
            observers,
        })
    }

    /// Register an additional progress observer.
    pub fn add_observer(&mut self, observer: impl ProgressObserver + 'static) {
        self.observers.add(observer);
    }

    /// Record the objective value of the iteration that just finished.
    ///
    /// The value enters the history (evicting the oldest entry), the counter
    /// is incremented, then observers are notified. Nothing an observer does
    /// can change the recorded state.
    pub fn report(&mut self, value: f64) {
        let previous = self.history.current();
        let delta = previous.map(|previous| value - previous);

        if !value.is_finite() {
            warn!(
                "Non-finite objective value {} reported at iteration {}",
                value,
                self.iteration + 1
            );
        } else if let Some(previous) = previous
            && value < previous
        {
            warn!(
                "Objective is not increasing. Current: {:.4} is not greater than {:.4}. Delta is {:.4}",
                value,
                previous,
                value - previous
            );
        }

        self.history.push(value);
        self.iteration += 1;

        if !self.observers.is_empty() {
            self.observers.notify(&ProgressRecord {
                iteration: self.iteration,
                value,
                delta,
            });
        }
    }

    /// `true` once the iteration cap is hit or the criterion holds.
    ///
    /// # Errors
    /// Propagates [`CriterionError`](criterion::CriterionError) from the
    /// relative gain criterion (zero or non-finite denominators).
    pub fn converged(&self) -> CriterionResult<bool> {
        if self.iteration == self.config.max_iterations {
            return Ok(true);
        }
        self.config
            .criterion
            .check(&self.history, self.config.tolerance)
    }

    /// Current state, with the reason when converged.
    pub fn status(&self) -> CriterionResult<MonitorStatus> {
        if self.iteration == self.config.max_iterations {
            return Ok(MonitorStatus::MaxIterationsReached);
        }
        if self
            .config
            .criterion
            .check(&self.history, self.config.tolerance)?
        {
            return Ok(MonitorStatus::CriterionMet);
        }
        if self.iteration == 0 {
            Ok(MonitorStatus::Idle)
        } else {
            Ok(MonitorStatus::Running)
        }
    }

    /// Forget all reports; configuration and observers are kept.
    pub fn reset(&mut self) {
        self.history.clear();
        self.iteration = 0;
    }

    /// Number of reports since construction or the last reset.
    pub fn iteration(&self) -> usize {
        self.iteration
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    pub fn criterion(&self) -> ConvergenceCriterion {
        self.config.criterion
    }

    pub fn tolerance(&self) -> f64 {
        self.config.tolerance
    }

    pub fn max_iterations(&self) -> usize {
        self.config.max_iterations
    }

    pub fn verbose(&self) -> bool {
        self.config.verbose
    }
}

impl Display for Monitor {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}(history={}, iter={}, n_iter={}, tol={:?}, verbose={})",
            self.config.criterion.monitor_name(),
            self.history,
            self.iteration,
            self.config.max_iterations,
            self.config.tolerance,
            self.config.verbose
        )
    }
}
