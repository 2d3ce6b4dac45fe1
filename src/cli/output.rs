//! Output formatting utilities for CLI.

use toe::{BatchStats, MatchResult, PlayerSpec};

/// Format a match result as human-readable text.
pub(super) fn format_match_text(result: &MatchResult) -> String {
    let mut output = String::new();

    let headline = match result.winners.as_slice() {
        [] => format!("Nobody won after {} turns.", result.rounds_played),
        [winner] => format!("{winner} won in {} turns!", result.rounds_played),
        [rest @ .., last] => format!(
            "{} and {last} won in {} turns!",
            rest.join(", "),
            result.rounds_played
        ),
    };
    output.push_str(&headline);
    output.push_str("\n\n");

    for standing in &result.standings {
        output.push_str(&format!(
            "  {}: {} tiles, {} castles, {} resources",
            standing.name, standing.tiles, standing.castles, standing.resources
        ));
        if !standing.alive {
            output.push_str(" [eliminated]");
        }
        output.push('\n');
    }

    output
}

/// Format batch statistics as human-readable text.
pub(super) fn format_batch_text(stats: &BatchStats, players: &[PlayerSpec]) -> String {
    let mut output = String::new();

    output.push_str(&format!("Tournament Results ({} games)\n", stats.games_played));
    output.push_str(&format!("  Average turns: {:.1}\n", stats.average_rounds()));
    output.push_str(&format!(
        "  Ties: {}  No winner: {}  Failed: {}\n\n",
        stats.ties, stats.no_winner, stats.failures
    ));

    for player in players {
        let wins = stats.wins.get(&player.name).copied().unwrap_or(0);
        let shared = stats.shared_wins.get(&player.name).copied().unwrap_or(0);
        #[allow(clippy::cast_precision_loss)]
        let rate = if stats.games_played > 0 {
            wins as f64 * 100.0 / stats.games_played as f64
        } else {
            0.0
        };
        output.push_str(&format!(
            "  {:<16} {wins:>6} wins ({rate:>5.1}%)  {shared:>6} shared\n",
            player.to_string()
        ));
    }

    output
}
