//! Tournament command implementation.

use super::output::format_batch_text;
use super::{CliError, OutputFormat};
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Instant;
use toe::tournament::run_batch_with_progress;
use toe::{BatchStats, MatchConfig};

/// Matches played when neither the flag nor the config file says.
const DEFAULT_GAMES: u32 = 100;

#[derive(Debug, Serialize)]
struct JsonBatchResult<'a> {
    games: u32,
    average_rounds: f64,
    duration_secs: f64,
    #[serde(flatten)]
    stats: &'a BatchStats,
}

/// Execute the tournament command.
///
/// # Errors
///
/// Returns an error if the config is invalid.
pub(crate) fn execute(
    config: &MatchConfig,
    games: Option<u32>,
    threads: Option<usize>,
    format: OutputFormat,
    progress: bool,
) -> Result<(), CliError> {
    let games = games.unwrap_or(if config.repeat > 1 {
        config.repeat
    } else {
        DEFAULT_GAMES
    });

    // Set thread pool size if specified
    if let Some(num_threads) = threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .build_global()
            .ok(); // Ignore error if already initialized
    }

    let pb = if progress {
        let pb = ProgressBar::new(u64::from(games));
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} games ({per_sec})")
            .map_err(|e| CliError::new(format!("Invalid progress template: {e}")))?
            .progress_chars("=>-");
        pb.set_style(style);
        Some(pb)
    } else {
        None
    };

    let start = Instant::now();
    let stats = run_batch_with_progress(config, games, &|| {
        if let Some(pb) = &pb {
            pb.inc(1);
        }
    })?;
    if let Some(pb) = pb {
        pb.finish_with_message("done");
    }
    let duration = start.elapsed();

    match format {
        OutputFormat::Text => {
            println!();
            print!("{}", format_batch_text(&stats, &config.players));
            println!();
            println!("Duration: {:.2}s", duration.as_secs_f64());
        }
        OutputFormat::Json => {
            let json = JsonBatchResult {
                games,
                average_rounds: stats.average_rounds(),
                duration_secs: duration.as_secs_f64(),
                stats: &stats,
            };
            println!("{}", serde_json::to_string_pretty(&json)?);
        }
    }

    Ok(())
}
