use std::path::Path;
use std::sync::Once;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static TELEMETRY_INIT: Once = Once::new();

/// Installs the global subscriber: JSON to stderr, plus a daily-rolling JSON
/// file under `log_dir` when one is given.
///
/// Only the first call does anything. The returned guard flushes the file
/// writer on drop and must be held for the life of the process.
pub fn init(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let mut guard = None;

    TELEMETRY_INIT.call_once(|| {
        if let Err(err) = tracing_log::LogTracer::init() {
            eprintln!("failed to set log tracer: {err}");
            std::process::exit(1);
        }

        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|e| {
            eprintln!("invalid RUST_LOG filter, using default: {e}");
            EnvFilter::new("vento_swap=info,warn")
        });

        let file_layer = log_dir.map(|dir| {
            let appender = tracing_appender::rolling::daily(dir, "vento_swap.log");
            let (writer, file_guard) = tracing_appender::non_blocking(appender);
            guard = Some(file_guard);
            fmt::layer().json().with_writer(writer)
        });

        let init_result = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(file_layer)
            .try_init();

        if let Err(err) = init_result {
            eprintln!("failed to initialize tracing subscriber: {err}");
            std::process::exit(1);
        }
    });

    guard
}
