//! Player state management.

use std::sync::Arc;

/// Seat index of a player in a match.
pub type PlayerId = u8;

/// State for a single player.
#[derive(Debug, Clone)]
pub struct Player {
    /// Seat index of this player.
    pub id: PlayerId,
    /// Unique display name.
    pub name: Arc<str>,
    /// Strategy kind this player was configured with.
    pub strategy: String,
    /// Resource balance.
    pub resources: u64,
    /// Whether the player still owns a castle.
    pub alive: bool,
}

impl Player {
    /// Create a new player with no resources.
    #[must_use]
    pub fn new(id: PlayerId, name: impl Into<Arc<str>>, strategy: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            strategy: strategy.into(),
            resources: 0,
            alive: true,
        }
    }

    /// Eliminate this player.
    pub fn eliminate(&mut self) {
        self.alive = false;
    }
}

impl std::fmt::Display for Player {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.name, self.strategy)
    }
}
