// Allow unwrap and unreadable literals in tests (test code is not production)
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::unreadable_literal))]
//! Toe: a grid-conquest match engine that referees untrusted strategies.
//!
//! Players own tiles, harvest resources, build farms, forts and castles, and
//! conquer neighboring land until one player holds every surviving castle.
//! Each player's moves come from a [`Strategy`] that the engine runs behind
//! an isolation boundary with a per-turn deadline.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │   Match controller / batch runner   │  tournament
//! ├─────────────────────────────────────┤
//! │          Turn arbiter               │  arbiter
//! ├──────────────────┬──────────────────┤
//! │  Strategy        │  World, economy, │  strategy, game
//! │  channels        │  win detection   │
//! ├──────────────────┴──────────────────┤
//! │  Wire protocol (HTTP + JSON)        │  wire, server
//! └─────────────────────────────────────┘
//! ```

pub mod arbiter;
pub mod config;
pub mod error;
pub mod game;
pub mod server;
pub mod strategy;
pub mod tournament;
pub mod wire;

pub use arbiter::{TurnArbiter, TurnRecord};
pub use config::{MatchConfig, PlayerSpec};
pub use error::{ConfigError, MatchError, WorldError};

// Re-export key game types at crate root for convenience
pub use game::{
    ActionRequest, Buildable, GameState, Player, PlayerId, PlayerView, Position, StructureKind,
    Tile, TurnOutcome, World,
};
pub use strategy::{Strategy, StrategyChannel, StrategyError, TurnInput};
pub use tournament::{BatchStats, Match, MatchResult, run_batch, run_match};
