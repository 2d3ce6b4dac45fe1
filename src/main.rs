//! Toe CLI - run matches, batch tournaments, and strategy servers.

// Allow print in the CLI binary
#![allow(clippy::print_stdout, clippy::print_stderr)]

mod cli;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args as ClapArgs, Parser, Subcommand};

/// Toe - a grid-conquest match engine
#[derive(Parser, Debug)]
#[command(name = "toe")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by `run` and `tournament`.
#[derive(ClapArgs, Debug, Clone)]
struct MatchArgs {
    /// Players as name:strategy or name:strategy:x.y, comma separated
    #[arg(short, long, value_delimiter = ',')]
    players: Vec<toe::PlayerSpec>,

    /// TOML config file; explicit flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Grid width (default: 40)
    #[arg(long)]
    width: Option<u16>,

    /// Grid height (default: 20)
    #[arg(long)]
    height: Option<u16>,

    /// Per-turn deadline in milliseconds (default: 500)
    #[arg(long)]
    turn_timeout: Option<u64>,

    /// Stop after this many turns; survivors share the win
    #[arg(short = 't', long)]
    max_turns: Option<u32>,

    /// Random seed (default: random)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Run strategies inline; a crashing strategy stops the match
    #[arg(long)]
    debug: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run a single match
    Run {
        #[command(flatten)]
        settings: MatchArgs,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,
    },

    /// Run many matches in parallel and aggregate the winners
    Tournament {
        #[command(flatten)]
        settings: MatchArgs,

        /// Number of matches (default: the config's repeat, else 100)
        #[arg(short, long)]
        games: Option<u32>,

        /// Parallel threads (default: CPU count)
        #[arg(short = 'j', long)]
        threads: Option<usize>,

        /// Output format: text or json
        #[arg(short, long, default_value = "text")]
        format: cli::OutputFormat,

        /// Show progress bar
        #[arg(long)]
        progress: bool,
    },

    /// Serve one built-in strategy over HTTP for remote matches
    Serve {
        /// The hosted player as name:strategy
        #[arg(long)]
        player: toe::PlayerSpec,

        /// Address to listen on
        #[arg(short, long, default_value = "0.0.0.0:8000")]
        bind: String,
    },
}

fn main() -> ExitCode {
    let args = Args::parse();

    if let Err(e) = cli::logging::init(args.log_path.as_deref()) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    let result = match args.command {
        Commands::Run { settings, format } => settings
            .into_config()
            .and_then(|config| cli::run::execute(&config, format)),

        Commands::Tournament {
            settings,
            games,
            threads,
            format,
            progress,
        } => settings
            .into_config()
            .and_then(|config| cli::tournament::execute(&config, games, threads, format, progress)),

        Commands::Serve { player, bind } => cli::serve::execute(&player, &bind),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

impl MatchArgs {
    /// Merge the flags over the config file (or the defaults).
    fn into_config(self) -> Result<toe::MatchConfig, cli::CliError> {
        let mut config = match &self.config {
            Some(path) => toe::MatchConfig::load(path)?,
            None => toe::MatchConfig::default(),
        };

        if !self.players.is_empty() {
            config.players = self.players;
        }
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(timeout) = self.turn_timeout {
            config.turn_timeout_ms = timeout;
        }
        if self.max_turns.is_some() {
            config.max_rounds = self.max_turns;
        }
        if self.seed.is_some() {
            config.seed = self.seed;
        }
        config.debug |= self.debug;

        config.validate()?;
        Ok(config)
    }
}
