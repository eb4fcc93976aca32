use std::io;
use std::path::PathBuf;

use clap::Parser;
use convergence_monitor::{
    ConvergenceCriterion, Monitor, MonitorConfig, MonitorResult, ReplayOutcome,
    init_logger_with_level, load_trace, read_trace, replay,
};
use tracing::{Level, info, warn};

#[derive(Parser)]
#[command(name = "replay_trace")]
#[command(about = "Replay a recorded objective trace through a convergence monitor")]
struct Args {
    /// Trace file with one objective value per line (reads stdin when omitted)
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Convergence criterion: "abs" (absolute gain), "rel" (relative gain) or "threshold"
    #[arg(short, long, default_value = "abs")]
    criterion: ConvergenceCriterion,

    /// Tolerance; its meaning depends on the criterion
    #[arg(short, long, default_value = "0.01", allow_negative_numbers = true)]
    tolerance: f64,

    /// Maximum number of iterations
    #[arg(short, long, default_value = "100")]
    max_iterations: usize,

    /// Print the per-iteration progress table on stderr
    #[arg(short, long)]
    verbose: bool,

    /// Default log level (RUST_LOG takes precedence)
    #[arg(long, default_value = "info")]
    log_level: Level,
}

fn run(args: &Args) -> MonitorResult<ReplayOutcome> {
    let values = match &args.input {
        Some(path) => load_trace(path)?,
        None => read_trace(io::stdin().lock(), "<stdin>")?,
    };

    let config = MonitorConfig::new(
        args.criterion,
        args.tolerance,
        args.max_iterations,
        args.verbose,
    );
    let mut monitor = Monitor::new(config)?;

    let outcome = replay(&mut monitor, &values)?;
    if outcome.iterations < values.len() {
        info!(
            "Stopped after {} of {} recorded iterations",
            outcome.iterations,
            values.len()
        );
    }
    info!("{}", monitor);
    Ok(outcome)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    init_logger_with_level(args.log_level);

    match run(&args) {
        Ok(outcome) => {
            let final_value = outcome
                .final_value
                .map_or_else(|| "-".to_string(), |value| format!("{value:.4}"));
            info!(
                "{}: {} after {} iterations (final objective {})",
                args.criterion, outcome.status, outcome.iterations, final_value
            );
            if !outcome.converged() {
                warn!("Trace ended before the monitor converged");
            }
            Ok(())
        }
        Err(e) => {
            warn!("Replay failed");
            warn!("Full error chain:\n{}", e.chain());
            Err(e.into())
        }
    }
}
