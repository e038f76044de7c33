use clap::ValueEnum;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::filter::Targets;
use tracing_subscriber::prelude::*;

/// Targets whose verbosity follows `--log-level`.
const RELAY_TARGETS: [&str; 4] = ["irlink", "irlink_transport", "irlink_frame", "irlink_relay"];

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_filter(self) -> LevelFilter {
        match self {
            LogLevel::Error => LevelFilter::ERROR,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Trace => LevelFilter::TRACE,
        }
    }
}

/// Relay crates log at `level`; dependencies stay at warnings unless the
/// user asked for errors only.
fn log_filter(level: LogLevel) -> Targets {
    let dependencies = match level {
        LogLevel::Error => LevelFilter::ERROR,
        _ => LevelFilter::WARN,
    };
    Targets::new()
        .with_targets(RELAY_TARGETS.map(|target| (target, level.as_filter())))
        .with_default(dependencies)
}

/// Install the stderr subscriber. Stdout stays reserved for packet output.
///
/// Every event carries the emitting thread's name, so lines from the
/// `irlink-io` worker, the `irlink-stdin` reader and the main thread can be
/// told apart. The target is kept to show which layer logged.
pub fn init_logging(format: LogFormat, level: LogLevel) {
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_thread_names(true)
        .with_target(true);
    let registry = tracing_subscriber::registry().with(log_filter(level));

    let _ = match format {
        LogFormat::Text => registry.with(layer).try_init(),
        LogFormat::Json => registry.with(layer.json()).try_init(),
    };
}
