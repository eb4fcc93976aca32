//! Integration tests for convergence-monitor
//!
//! These tests drive monitors the way a fitting loop does: a small
//! Expectation-Maximization fit of a two-component Gaussian mixture reports
//! its log-likelihood every iteration and stops when the monitor says so.
//!
//! # Test Coverage
//!
//! - All three criteria on a real EM log-likelihood sequence
//! - Max-iteration short-circuit, reset and replay determinism
//! - Verbose progress output captured through an observer
//! - Independent monitors on parallel worker threads

use convergence_monitor::{
    ConvergenceCriterion, History, Monitor, MonitorConfig, MonitorError,
    MonitorStatus, ProgressObserver, ProgressRecord, StreamProgress, replay,
};
use std::f64::consts::PI;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::thread;

/// Two-component 1-D Gaussian mixture with unit variances.
struct Mixture {
    weight: f64,
    means: [f64; 2],
}

fn gaussian(x: f64, mean: f64) -> f64 {
    (-(x - mean).powi(2) / 2.0).exp() / (2.0 * PI).sqrt()
}

fn sample_data() -> Vec<f64> {
    // Deterministic, clearly bimodal around -2 and 3.
    let mut data = Vec::new();
    for i in 0..40 {
        let offset = (f64::from(i) * 0.37).sin();
        data.push(-2.0 + offset);
        data.push(3.0 + 0.8 * offset);
    }
    data
}

impl Mixture {
    fn log_likelihood(&self, data: &[f64]) -> f64 {
        data.iter()
            .map(|&x| {
                (self.weight * gaussian(x, self.means[0])
                    + (1.0 - self.weight) * gaussian(x, self.means[1]))
                .ln()
            })
            .sum()
    }

    /// One EM iteration; returns the log-likelihood of the parameters used
    /// in the E-step.
    fn em_step(&mut self, data: &[f64]) -> f64 {
        let logprob = self.log_likelihood(data);

        let mut resp_sum = 0.0;
        let mut weighted = [0.0, 0.0];
        for &x in data {
            let p0 = self.weight * gaussian(x, self.means[0]);
            let p1 = (1.0 - self.weight) * gaussian(x, self.means[1]);
            let r = p0 / (p0 + p1);
            resp_sum += r;
            weighted[0] += r * x;
            weighted[1] += (1.0 - r) * x;
        }

        let n = data.len() as f64;
        self.weight = resp_sum / n;
        self.means = [weighted[0] / resp_sum, weighted[1] / (n - resp_sum)];
        logprob
    }
}

/// Run EM until the monitor converges; returns the recorded log-likelihoods.
fn fit(monitor: &mut Monitor, data: &[f64]) -> Result<Vec<f64>, MonitorError> {
    let mut mixture = Mixture {
        weight: 0.5,
        means: [-0.5, 0.5],
    };
    let mut trace = Vec::new();

    for _ in 0..monitor.max_iterations() {
        let logprob = mixture.em_step(data);
        trace.push(logprob);
        monitor.report(logprob);
        if monitor.converged()? {
            break;
        }
    }
    Ok(trace)
}

#[derive(Clone, Default)]
struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut guard = self
            .0
            .lock()
            .map_err(|e| io::Error::other(e.to_string()))?;
        guard.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedBuffer {
    fn text(&self) -> String {
        match self.0.lock() {
            Ok(guard) => String::from_utf8_lossy(&guard).into_owned(),
            Err(e) => panic!("progress buffer poisoned: {e}"),
        }
    }
}

#[test]
fn test_em_fit_converges_on_absolute_gain() -> Result<(), MonitorError> {
    let data = sample_data();
    let mut monitor = Monitor::new(MonitorConfig::absolute_gain(1e-6, 500, false))?;

    let trace = fit(&mut monitor, &data)?;

    assert_eq!(monitor.status()?, MonitorStatus::CriterionMet);
    assert_eq!(monitor.iteration(), trace.len());
    assert!(trace.len() < 500);
    // EM never decreases the log-likelihood (up to rounding).
    for pair in trace.windows(2) {
        assert!(pair[1] >= pair[0] - 1e-9, "log-likelihood decreased: {pair:?}");
    }
    let Some((previous, current)) = monitor.history().pair() else {
        panic!("converged monitor should hold two values");
    };
    assert!(current - previous < 1e-6);
    Ok(())
}

#[test]
fn test_em_fit_relative_gain_on_negative_log_likelihood() -> Result<(), MonitorError> {
    // Log-likelihoods are negative, so an improving step has a negative
    // relative gain and satisfies any non-negative tolerance right away.
    let data = sample_data();
    let mut monitor = Monitor::new(MonitorConfig::relative_gain(0.0, 500, false))?;

    let trace = fit(&mut monitor, &data)?;
    assert!(trace[0] < 0.0);
    assert_eq!(monitor.iteration(), 2);
    assert_eq!(monitor.status()?, MonitorStatus::CriterionMet);
    Ok(())
}

#[test]
fn test_em_fit_threshold() -> Result<(), MonitorError> {
    let data = sample_data();

    // Fit once to find a reachable bar.
    let mut reference = Monitor::new(MonitorConfig::absolute_gain(1e-8, 500, false))?;
    let trace = fit(&mut reference, &data)?;
    let best = trace.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let bar = best - 1.0;

    let mut monitor = Monitor::new(MonitorConfig::threshold(bar, 500, false))?;
    let thresholded = fit(&mut monitor, &data)?;
    assert!(thresholded.len() <= trace.len());
    assert!(*thresholded.last().unwrap_or(&f64::NEG_INFINITY) >= bar);
    assert!(thresholded[..thresholded.len() - 1].iter().all(|&v| v < bar));
    Ok(())
}

#[test]
fn test_max_iterations_caps_every_criterion() -> Result<(), MonitorError> {
    let data = sample_data();
    for criterion in ConvergenceCriterion::ALL {
        let tolerance = match criterion {
            ConvergenceCriterion::Threshold => f64::INFINITY,
            _ => f64::MIN,
        };
        let mut monitor = Monitor::new(MonitorConfig::new(criterion, tolerance, 3, false))?;

        let trace = fit(&mut monitor, &data)?;
        assert_eq!(trace.len(), 3, "{criterion}");
        assert_eq!(monitor.status()?, MonitorStatus::MaxIterationsReached);
    }
    Ok(())
}

#[test]
fn test_reset_then_replay_reproduces_decisions() -> Result<(), MonitorError> {
    let values = [-50.0, -20.0, -19.0, -18.99, -18.5, -18.49];
    let mut monitor = Monitor::new(MonitorConfig::absolute_gain(0.05, 100, false))?;

    let mut first_run = Vec::new();
    for &value in &values {
        monitor.report(value);
        first_run.push(monitor.converged()?);
        assert!(monitor.history().len() <= History::CAPACITY);
    }

    monitor.reset();
    assert_eq!(monitor.iteration(), 0);
    assert!(monitor.history().is_empty());

    let mut second_run = Vec::new();
    for &value in &values {
        monitor.report(value);
        second_run.push(monitor.converged()?);
    }

    assert_eq!(first_run, second_run);
    assert_eq!(first_run, vec![false, false, false, true, false, true]);
    Ok(())
}

#[test]
fn test_replay_matches_manual_loop() -> Result<(), MonitorError> {
    let data = sample_data();
    let mut manual = Monitor::new(MonitorConfig::absolute_gain(1e-4, 200, false))?;
    let trace = fit(&mut manual, &data)?;

    let mut replayed = Monitor::new(MonitorConfig::absolute_gain(1e-4, 200, false))?;
    let outcome = replay(&mut replayed, &trace)?;

    assert_eq!(outcome.iterations, manual.iteration());
    assert_eq!(outcome.status, manual.status()?);
    assert_eq!(replayed.history(), manual.history());
    Ok(())
}

#[test]
fn test_relative_gain_zero_previous_surfaces_as_domain_error() -> Result<(), MonitorError> {
    let mut monitor = Monitor::new(MonitorConfig::relative_gain(0.1, 10, false))?;
    monitor.report(0.0);
    monitor.report(1.0);

    let error = MonitorError::from(match monitor.converged() {
        Err(e) => e,
        Ok(converged) => panic!("expected a domain error, got {converged}"),
    });
    assert!(error.is_domain_error());
    assert!(error.chain_compact().contains("zero"));
    Ok(())
}

#[test]
fn test_progress_lines_through_stream_observer() -> Result<(), MonitorError> {
    let buffer = SharedBuffer::default();
    let mut monitor = Monitor::new(MonitorConfig::absolute_gain(1e-3, 10, false))?;
    monitor.add_observer(StreamProgress::new(buffer.clone()));

    monitor.report(-12.5);
    monitor.report(-10.25);
    monitor.report(-10.5);

    let text = buffer.text();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "         1         -12.5000              NaN",
            "         2         -10.2500          +2.2500",
            "         3         -10.5000          -0.2500",
        ]
    );
    Ok(())
}

#[test]
fn test_observer_failures_do_not_touch_state() -> Result<(), MonitorError> {
    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[derive(Clone, Default)]
    struct Counter(Arc<Mutex<usize>>);

    impl ProgressObserver for Counter {
        fn on_report(&self, _record: &ProgressRecord) {
            if let Ok(mut count) = self.0.lock() {
                *count += 1;
            }
        }
    }

    let counter = Counter::default();
    let mut monitor = Monitor::new(MonitorConfig::threshold(5.0, 10, false))?;
    monitor.add_observer(StreamProgress::new(BrokenPipe));
    monitor.add_observer(counter.clone());

    monitor.report(1.0);
    monitor.report(6.0);

    assert_eq!(monitor.iteration(), 2);
    assert_eq!(monitor.history().pair(), Some((1.0, 6.0)));
    assert!(monitor.converged()?);
    // Observers after the failing one still run.
    assert_eq!(counter.0.lock().map(|count| *count).unwrap_or(0), 2);
    Ok(())
}

#[test]
fn test_independent_monitors_on_worker_threads() -> Result<(), MonitorError> {
    let data = Arc::new(sample_data());
    let handles: Vec<_> = [1e-2, 1e-4, 1e-6]
        .into_iter()
        .map(|tolerance| {
            let data = Arc::clone(&data);
            thread::spawn(move || -> Result<usize, MonitorError> {
                let mut monitor =
                    Monitor::new(MonitorConfig::absolute_gain(tolerance, 1000, false))?;
                fit(&mut monitor, &data)?;
                Ok(monitor.iteration())
            })
        })
        .collect();

    let mut iterations = Vec::new();
    for handle in handles {
        match handle.join() {
            Ok(result) => iterations.push(result?),
            Err(_) => panic!("worker thread panicked"),
        }
    }

    // Tighter tolerances never stop earlier.
    assert!(iterations.windows(2).all(|w| w[0] <= w[1]), "{iterations:?}");
    Ok(())
}
