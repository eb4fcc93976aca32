//! Convergence criteria.
//!
//! A criterion is a pure decision over the two-slot [`History`] and a
//! tolerance. It never sees the iteration counter; the max-iteration cap is
//! enforced by [`Monitor`](crate::Monitor) before a criterion is consulted.
//!
//! | Criterion        | Converged when                                   | Observations |
//! |------------------|--------------------------------------------------|--------------|
//! | `AbsoluteGain`   | `current - previous < tol`                       | 2            |
//! | `RelativeGain`   | `(current - previous) / previous < tol`          | 2            |
//! | `Threshold`      | `current >= tol`                                 | 1            |
//!
//! The relative gain divides by the signed previous value. With a zero
//! previous value the gain is undefined and the check fails with
//! [`CriterionError::DivisionByZero`] instead of yielding an infinite ratio.

use super::history::History;
use std::{
    fmt,
    fmt::{Display, Formatter},
    str::FromStr,
};
use thiserror::Error;
use tracing::error;

/// Criterion-specific error types
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CriterionError {
    /// Relative gain requested with a previous value of exactly zero
    #[error("Relative gain undefined: previous objective value is zero (current = {current})")]
    DivisionByZero { current: f64 },

    /// Relative gain overflowed or involved non-finite values
    #[error(
        "Relative gain is not finite: ({current} - {previous}) / {previous} = {ratio}"
    )]
    NonFiniteGain {
        previous: f64,
        current: f64,
        ratio: f64,
    },

    /// Criterion name could not be parsed
    #[error("Unknown convergence criterion '{0}' (expected absolute, relative or threshold)")]
    UnknownCriterion(String),
}

impl CriterionError {
    /// Log the error with tracing::error and return self for chaining
    #[must_use]
    pub fn log(self) -> Self {
        error!("{}", self);
        self
    }
}

/// Result type for criterion evaluation
pub type CriterionResult<T> = Result<T, CriterionError>;

/// Decision rule used by a monitor to declare convergence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConvergenceCriterion {
    /// Absolute gain in the objective is below the tolerance.
    ///
    /// Assumes a non-decreasing objective; a decrease counts as a (negative)
    /// gain and therefore as converged.
    AbsoluteGain,
    /// Gain relative to the previous objective value is below the tolerance.
    RelativeGain,
    /// Current objective value reached the tolerance.
    Threshold,
}

impl ConvergenceCriterion {
    pub const ALL: [ConvergenceCriterion; 3] = [
        ConvergenceCriterion::AbsoluteGain,
        ConvergenceCriterion::RelativeGain,
        ConvergenceCriterion::Threshold,
    ];

    /// Evaluate the criterion against the current history.
    ///
    /// Returns `Ok(false)` while fewer than
    /// [`min_observations`](Self::min_observations) values are available.
    ///
    /// # Errors
    /// `RelativeGain` fails with [`CriterionError::DivisionByZero`] when the
    /// previous value is zero and with [`CriterionError::NonFiniteGain`] when
    /// the ratio is not finite.
    pub fn check(&self, history: &History, tolerance: f64) -> CriterionResult<bool> {
        match self {
            ConvergenceCriterion::AbsoluteGain => Ok(history
                .pair()
                .is_some_and(|(previous, current)| current - previous < tolerance)),
            ConvergenceCriterion::RelativeGain => {
                let Some((previous, current)) = history.pair() else {
                    return Ok(false);
                };
                let ratio = relative_gain(previous, current)?;
                Ok(ratio < tolerance)
            }
            ConvergenceCriterion::Threshold => {
                Ok(history.current().is_some_and(|current| current >= tolerance))
            }
        }
    }

    /// Number of observations needed before the criterion can hold.
    pub fn min_observations(&self) -> usize {
        match self {
            ConvergenceCriterion::AbsoluteGain | ConvergenceCriterion::RelativeGain => 2,
            ConvergenceCriterion::Threshold => 1,
        }
    }

    /// Whether `tolerance` lies in the numeric domain of this criterion.
    ///
    /// NaN is never accepted. Gain criteria also reject infinite tolerances.
    /// Zero and negative values are accepted everywhere.
    pub fn accepts_tolerance(&self, tolerance: f64) -> bool {
        match self {
            ConvergenceCriterion::AbsoluteGain | ConvergenceCriterion::RelativeGain => {
                tolerance.is_finite()
            }
            ConvergenceCriterion::Threshold => !tolerance.is_nan(),
        }
    }

    /// Class-style name used in the monitor representation.
    pub fn monitor_name(&self) -> &'static str {
        match self {
            ConvergenceCriterion::AbsoluteGain => "ConvergenceMonitor",
            ConvergenceCriterion::RelativeGain => "RelativeMonitor",
            ConvergenceCriterion::Threshold => "ThresholdMonitor",
        }
    }
}

/// `(current - previous) / previous`, guarded against a zero denominator.
pub fn relative_gain(previous: f64, current: f64) -> CriterionResult<f64> {
    if previous == 0.0 {
        return Err(CriterionError::DivisionByZero { current }.log());
    }

    let ratio = (current - previous) / previous;
    if !ratio.is_finite() {
        return Err(CriterionError::NonFiniteGain {
            previous,
            current,
            ratio,
        }
        .log());
    }
    Ok(ratio)
}

impl Display for ConvergenceCriterion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ConvergenceCriterion::AbsoluteGain => write!(f, "absolute-gain"),
            ConvergenceCriterion::RelativeGain => write!(f, "relative-gain"),
            ConvergenceCriterion::Threshold => write!(f, "threshold"),
        }
    }
}

impl FromStr for ConvergenceCriterion {
    type Err = CriterionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "abs" | "absolute" | "absolute-gain" => Ok(ConvergenceCriterion::AbsoluteGain),
            "rel" | "relative" | "relative-gain" => Ok(ConvergenceCriterion::RelativeGain),
            "threshold" => Ok(ConvergenceCriterion::Threshold),
            other => Err(CriterionError::UnknownCriterion(other.to_string())),
        }
    }
}
