use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{Result, UdepsError};

/// Initializes logging: human-readable output on stderr, plus JSON lines
/// appended to `log_file` when given. `RUST_LOG` directives apply on top of
/// the `udeps=info` (or `udeps=debug`) default.
///
/// Keep the returned guards alive until exit so buffered lines get flushed.
pub fn init_logging(debug: bool, log_file: Option<&Path>) -> Result<Vec<WorkerGuard>> {
    let default_directive = if debug { "udeps=debug" } else { "udeps=info" };
    let directive = default_directive
        .parse()
        .map_err(|e| UdepsError::Config(format!("Invalid log directive '{}': {}", default_directive, e)))?;
    let filter = EnvFilter::from_default_env().add_directive(directive);

    let mut guards = Vec::new();

    let (stderr_writer, stderr_guard) = tracing_appender::non_blocking(std::io::stderr());
    guards.push(stderr_guard);
    let console_layer = fmt::layer()
        .with_writer(stderr_writer)
        .with_target(debug)
        .without_time();

    let file_layer = match log_file {
        Some(path) => {
            let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
            std::fs::create_dir_all(dir)?;
            let file_name = path
                .file_name()
                .ok_or_else(|| UdepsError::Config(format!("Invalid log file path '{}'", path.display())))?;
            let appender = tracing_appender::rolling::never(dir, file_name);
            let (file_writer, file_guard) = tracing_appender::non_blocking(appender);
            guards.push(file_guard);
            Some(fmt::layer().json().with_writer(file_writer))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| UdepsError::Config(format!("Failed to install log subscriber: {}", e)))?;

    Ok(guards)
}
