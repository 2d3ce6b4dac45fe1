//! Error types shared across the crate.
//!
//! Rule violations are not errors: they become rejected
//! [`TurnOutcome`](crate::game::TurnOutcome)s and the match goes on. The
//! types here are for conditions that stop setup or the match itself.

use std::path::PathBuf;

use thiserror::Error;

use crate::game::Position;

/// Errors from the world grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum WorldError {
    /// A grid needs at least one tile.
    #[error("map size must be positive, got {width}x{height}")]
    EmptyGrid {
        /// Requested width.
        width: u16,
        /// Requested height.
        height: u16,
    },
    /// Position is off the grid.
    #[error("position {pos} is outside the {width}x{height} map")]
    OutOfBounds {
        /// The offending position.
        pos: Position,
        /// Grid width.
        width: u16,
        /// Grid height.
        height: u16,
    },
}

/// Fatal problems found while setting up a match.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Bad map size.
    #[error(transparent)]
    World(#[from] WorldError),
    /// No players configured.
    #[error("a match needs at least one player")]
    NoPlayers,
    /// More players than seats.
    #[error("too many players: {0}")]
    TooManyPlayers(usize),
    /// Player name is empty or the reserved `mine` sentinel.
    #[error("player name {0:?} is reserved")]
    ReservedName(String),
    /// A player name contains control characters.
    #[error("player name {0:?} contains control characters")]
    InvalidName(String),
    /// Two players share a name.
    #[error("duplicate player name {0:?}")]
    DuplicateName(String),
    /// Player spec does not follow `name:strategy[:x.y]`.
    #[error("invalid player info: {0}. Should be name:strategy or name:strategy:x.y")]
    InvalidPlayerSpec(String),
    /// Strategy kind is not known.
    #[error("unknown strategy {0:?}")]
    UnknownStrategy(String),
    /// Start position is off the grid.
    #[error("start position {pos} for {name} is off the map")]
    StartOffMap {
        /// Player name.
        name: String,
        /// Requested start.
        pos: Position,
    },
    /// Start position is already taken.
    #[error("start position {pos} for {name} is already occupied")]
    StartOccupied {
        /// Player name.
        name: String,
        /// Requested start.
        pos: Position,
    },
    /// No unowned land is left for a random start.
    #[error("no free land left for another castle")]
    NoFreeTile,
    /// Turn timeout must be positive.
    #[error("turn timeout must be positive")]
    ZeroTimeout,
    /// Config file could not be read.
    #[error("failed to read config {path}: {source}")]
    Io {
        /// File path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },
    /// Config file could not be parsed.
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    /// Custom strategies do not match the configured players.
    #[error("expected {expected} strategies, got {got}")]
    StrategyCount {
        /// Configured players.
        expected: usize,
        /// Strategies supplied.
        got: usize,
    },
    /// The strategy could not be started.
    #[error("failed to start strategy for {name}: {reason}")]
    StrategySpawn {
        /// Player name.
        name: String,
        /// What went wrong.
        reason: String,
    },
}

/// Errors that stop a match after setup.
#[derive(Debug, Error)]
pub enum MatchError {
    /// Setup failed.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// A strategy failed in direct (debug) mode.
    #[error("strategy of {player} failed: {reason}")]
    StrategyFailed {
        /// Player name.
        player: String,
        /// Failure text.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WorldError::EmptyGrid {
            width: 0,
            height: 3,
        };
        assert_eq!(err.to_string(), "map size must be positive, got 0x3");

        let err = ConfigError::from(err);
        assert!(err.to_string().contains("0x3"));

        let err = MatchError::StrategyFailed {
            player: "alice".to_string(),
            reason: "boom".to_string(),
        };
        assert_eq!(err.to_string(), "strategy of alice failed: boom");
    }
}
