//! Log setup for the binary.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use super::CliError;

/// Install the global subscriber.
///
/// `RUST_LOG` picks the filter (default `info`). Logs go to stderr, or to
/// `log_path` without colors when given.
pub(crate) fn init(log_path: Option<&Path>) -> Result<(), CliError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    let installed = match log_path {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                CliError::new(format!("Failed to create log file {}: {e}", path.display()))
            })?;
            builder.with_ansi(false).with_writer(Mutex::new(file)).try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    installed.map_err(|e| CliError::new(format!("Failed to install logger: {e}")))
}
