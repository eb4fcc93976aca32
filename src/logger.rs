//! Logging setup for binaries and tests built on convergence-monitor.
//!
//! The library itself only emits `tracing` events; installing a subscriber is
//! up to the application. These helpers install a `tracing-subscriber` fmt
//! subscriber with an [`EnvFilter`] and a compact bracketed format:
//!
//! ```text
//! [WARN 2026-10-19 14:03:12 convergence_monitor::monitor] Objective is not increasing. ...
//! ```

use tracing::Level;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::{FmtContext, FormatEvent, FormatFields, format::Writer};
use tracing_subscriber::registry::LookupSpan;

/// Install the standard subscriber at INFO (overridable via `RUST_LOG`).
///
/// # Example
/// ```no_run
/// convergence_monitor::init_logger();
/// tracing::info!("fit started");
/// ```
pub fn init_logger() {
    init_logger_with_level(Level::INFO)
}

/// Install the standard subscriber with a custom default level.
///
/// Does nothing if a global subscriber is already set, so it is safe to call
/// from several tests.
///
/// ```bash
/// RUST_LOG=convergence_monitor=debug replay_trace --input trace.txt
/// ```
pub fn init_logger_with_level(default_level: Level) {
    if let Err(e) = try_init_logger_with_level(default_level) {
        tracing::debug!("Logger already initialized: {}", e);
    }
}

/// Like [`init_logger_with_level`] but reports whether installation failed.
pub fn try_init_logger_with_level(
    default_level: Level,
) -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .event_format(MonitorFormatter)
        .try_init()
}

/// `[LEVEL timestamp target] message`, with colored levels on ANSI writers.
struct MonitorFormatter;

impl MonitorFormatter {
    fn level_label(level: Level, ansi: bool) -> String {
        if !ansi {
            return level.to_string();
        }
        let color = match level {
            Level::ERROR => 31,
            Level::WARN => 33,
            Level::INFO => 32,
            Level::DEBUG => 34,
            _ => 35,
        };
        format!("\x1b[{color}m{level}\x1b[0m")
    }
}

impl<S, N> FormatEvent<S, N> for MonitorFormatter
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let metadata = event.metadata();
        let label = Self::level_label(*metadata.level(), writer.has_ansi_escapes());

        write!(
            writer,
            "[{} {} {}] ",
            label,
            chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
            metadata.target()
        )?;
        ctx.field_format().format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}
