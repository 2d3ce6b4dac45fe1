//! Match configuration.
//!
//! Every field has a serde default, so a TOML file only needs the players:
//!
//! ```toml
//! width = 20
//! height = 10
//! max_rounds = 500
//!
//! [[players]]
//! name = "alice"
//! strategy = "aggressive"
//! start = { x = 0, y = 0 }
//!
//! [[players]]
//! name = "bob"
//! strategy = "remote:http://127.0.0.1:8000"
//! ```

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, WorldError};
use crate::game::{DEFAULT_CASTLE_TILE_LIMIT, MAX_PLAYERS, MINE, Position};
use crate::strategy;

/// Default grid width.
pub const DEFAULT_WIDTH: u16 = 40;
/// Default grid height.
pub const DEFAULT_HEIGHT: u16 = 20;
/// Default per-turn deadline in milliseconds.
pub const DEFAULT_TURN_TIMEOUT_MS: u64 = 500;

/// One seat at the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerSpec {
    /// Unique player name.
    pub name: String,
    /// Strategy kind, see [`strategy::create`].
    pub strategy: String,
    /// Position of the initial castle; random free land when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<Position>,
}

impl PlayerSpec {
    /// A player with a random start.
    #[must_use]
    pub fn new(name: impl Into<String>, strategy: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            strategy: strategy.into(),
            start: None,
        }
    }

    /// Fix the initial castle position.
    #[must_use]
    pub fn at(mut self, pos: Position) -> Self {
        self.start = Some(pos);
        self
    }
}

/// Parses `name:strategy` or `name:strategy:x.y`.
///
/// The strategy part may itself contain colons (`remote:http://host:8000`);
/// only a trailing `x.y` segment is taken as the start position.
impl FromStr for PlayerSpec {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConfigError::InvalidPlayerSpec(s.to_string());

        let (name, rest) = s.split_once(':').ok_or_else(invalid)?;
        let (strategy, start) = match rest.rsplit_once(':') {
            Some((strategy, tail)) => match parse_start(tail) {
                Some(pos) => (strategy, Some(pos)),
                None => (rest, None),
            },
            None => (rest, None),
        };

        if name.is_empty() || strategy.is_empty() {
            return Err(invalid());
        }
        Ok(Self {
            name: name.to_string(),
            strategy: strategy.to_string(),
            start,
        })
    }
}

fn parse_start(s: &str) -> Option<Position> {
    let (x, y) = s.split_once('.')?;
    Some(Position::new(x.parse().ok()?, y.parse().ok()?))
}

impl fmt::Display for PlayerSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.strategy)?;
        if let Some(pos) = self.start {
            write!(f, ":{}.{}", pos.x, pos.y)?;
        }
        Ok(())
    }
}

/// Everything needed to set up and run matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchConfig {
    /// Grid width.
    pub width: u16,
    /// Grid height.
    pub height: u16,
    /// Seats, in seating order.
    pub players: Vec<PlayerSpec>,
    /// Per-turn deadline for isolated strategies.
    pub turn_timeout_ms: u64,
    /// Stop after this many rounds; all survivors then share the win.
    pub max_rounds: Option<u32>,
    /// Number of matches for batch scoring.
    pub repeat: u32,
    /// Run strategies inline and let their failures stop the match.
    pub debug: bool,
    /// Seed for turn order and start positions; entropy when absent.
    pub seed: Option<u64>,
    /// Tiles-per-castle ratio a player must exceed to build another castle.
    pub castle_tile_limit: u32,
    /// How often the arbiter checks an isolated strategy for an answer.
    pub poll_interval_ms: u64,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            players: Vec::new(),
            turn_timeout_ms: DEFAULT_TURN_TIMEOUT_MS,
            max_rounds: None,
            repeat: 1,
            debug: false,
            seed: None,
            castle_tile_limit: DEFAULT_CASTLE_TILE_LIMIT,
            poll_interval_ms: 1,
        }
    }
}

impl MatchConfig {
    /// Parse a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] for invalid TOML or unknown fields.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Read and parse a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read and
    /// [`ConfigError::Parse`] if it is not a valid config.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Per-turn deadline.
    #[must_use]
    pub fn turn_timeout(&self) -> Duration {
        Duration::from_millis(self.turn_timeout_ms)
    }

    /// Arbiter poll interval.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    /// Check everything that can be checked before the grid exists.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_layout()?;
        match self.players.iter().find(|p| !strategy::is_known_kind(&p.strategy)) {
            Some(player) => Err(ConfigError::UnknownStrategy(player.strategy.clone())),
            None => Ok(()),
        }
    }

    /// [`validate`](Self::validate) without the strategy kinds, for matches
    /// whose strategies are supplied directly.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate_layout(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(WorldError::EmptyGrid {
                width: self.width,
                height: self.height,
            }
            .into());
        }
        if self.players.is_empty() {
            return Err(ConfigError::NoPlayers);
        }
        if self.players.len() > MAX_PLAYERS {
            return Err(ConfigError::TooManyPlayers(self.players.len()));
        }
        if self.turn_timeout_ms == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        let mut names = HashSet::new();
        let mut starts = HashSet::new();
        for player in &self.players {
            if player.name.is_empty() || player.name == MINE {
                return Err(ConfigError::ReservedName(player.name.clone()));
            }
            if player.name.chars().any(char::is_control) {
                return Err(ConfigError::InvalidName(player.name.clone()));
            }
            if !names.insert(player.name.as_str()) {
                return Err(ConfigError::DuplicateName(player.name.clone()));
            }
            if let Some(pos) = player.start {
                if pos.x >= self.width || pos.y >= self.height {
                    return Err(ConfigError::StartOffMap {
                        name: player.name.clone(),
                        pos,
                    });
                }
                if !starts.insert(pos) {
                    return Err(ConfigError::StartOccupied {
                        name: player.name.clone(),
                        pos,
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_players() -> MatchConfig {
        MatchConfig {
            players: vec![PlayerSpec::new("a", "harvester"), PlayerSpec::new("b", "farmer")],
            ..MatchConfig::default()
        }
    }

    #[test]
    fn test_player_spec_forms() {
        assert_eq!("a:aggressive".parse::<PlayerSpec>().unwrap(), PlayerSpec::new("a", "aggressive"));
        assert_eq!(
            "b:farmer:3.4".parse::<PlayerSpec>().unwrap(),
            PlayerSpec::new("b", "farmer").at(Position::new(3, 4))
        );
        assert_eq!(
            "c:remote:http://127.0.0.1:8000".parse::<PlayerSpec>().unwrap(),
            PlayerSpec::new("c", "remote:http://127.0.0.1:8000")
        );
        assert_eq!(
            "c:remote:http://127.0.0.1:8000:1.2".parse::<PlayerSpec>().unwrap(),
            PlayerSpec::new("c", "remote:http://127.0.0.1:8000").at(Position::new(1, 2))
        );
    }

    #[test]
    fn test_player_spec_invalid() {
        for bad in ["alone", ":farmer", "a:", "a::1.2"] {
            assert!(
                matches!(bad.parse::<PlayerSpec>(), Err(ConfigError::InvalidPlayerSpec(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn test_player_spec_display_round_trips() {
        let spec = PlayerSpec::new("b", "farmer").at(Position::new(3, 4));
        assert_eq!(spec.to_string(), "b:farmer:3.4");
        assert_eq!(spec.to_string().parse::<PlayerSpec>().unwrap(), spec);
    }

    #[test]
    fn test_defaults() {
        let config = MatchConfig::default();
        assert_eq!((config.width, config.height), (40, 20));
        assert_eq!(config.turn_timeout(), Duration::from_millis(500));
        assert_eq!(config.castle_tile_limit, 50);
        assert_eq!(config.max_rounds, None);
    }

    #[test]
    fn test_from_toml() {
        let config = MatchConfig::from_toml_str(
            r#"
            width = 5
            max_rounds = 10

            [[players]]
            name = "a"
            strategy = "harvester"
            start = { x = 1, y = 2 }
            "#,
        )
        .unwrap();
        assert_eq!(config.width, 5);
        assert_eq!(config.height, DEFAULT_HEIGHT);
        assert_eq!(config.max_rounds, Some(10));
        assert_eq!(config.players[0].start, Some(Position::new(1, 2)));
    }

    #[test]
    fn test_validate() {
        assert!(two_players().validate().is_ok());

        let mut config = two_players();
        config.players.clear();
        assert!(matches!(config.validate(), Err(ConfigError::NoPlayers)));

        let mut config = two_players();
        config.width = 0;
        assert!(matches!(config.validate(), Err(ConfigError::World(_))));

        let mut config = two_players();
        config.players[1].name = "a".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::DuplicateName(_))));

        let mut config = two_players();
        config.players[0].name = "mine".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::ReservedName(_))));

        for bad in ["a\0b", "tab\there", "line\n"] {
            let mut config = two_players();
            config.players[0].name = bad.to_string();
            assert!(matches!(config.validate(), Err(ConfigError::InvalidName(_))), "{bad:?}");
        }

        let mut config = two_players();
        config.players[0].strategy = "telepathy".to_string();
        assert!(matches!(config.validate(), Err(ConfigError::UnknownStrategy(_))));

        let mut config = two_players();
        config.players[0].start = Some(Position::new(40, 0));
        assert!(matches!(config.validate(), Err(ConfigError::StartOffMap { .. })));

        let mut config = two_players();
        config.players[0].start = Some(Position::new(1, 1));
        config.players[1].start = Some(Position::new(1, 1));
        assert!(matches!(config.validate(), Err(ConfigError::StartOccupied { .. })));

        let mut config = two_players();
        config.turn_timeout_ms = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroTimeout)));
    }
}
