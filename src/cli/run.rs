//! Run command implementation.

use super::output::format_match_text;
use super::{CliError, OutputFormat};
use toe::{MatchConfig, run_match};

/// Execute the run command.
///
/// # Errors
///
/// Returns an error if setup fails or a debug-mode strategy crashes.
pub(crate) fn execute(config: &MatchConfig, format: OutputFormat) -> Result<(), CliError> {
    let result = run_match(config)?;

    match format {
        OutputFormat::Text => print!("{}", format_match_text(&result)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&result)?),
    }

    Ok(())
}
