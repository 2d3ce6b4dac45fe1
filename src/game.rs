//! Game layer for Toe.
//!
//! Implements the rules of the match:
//! - World grid with tiles (land, farms, forts, castles)
//! - Players with resources and alive flags
//! - Economy (harvest, build and conquer costs)
//! - Per-player recolored views of the world
//! - Win detection

mod action;
pub mod economy;
mod invariants;
mod map;
mod player;
mod state;
mod view;

pub use action::{ActionParseError, ActionRequest, Buildable, TurnOutcome};
pub use economy::{ConquerQuote, DEFAULT_CASTLE_TILE_LIMIT, RuleViolation};
pub use invariants::{InvariantViolation, assert_invariants, check_invariants};
pub use map::{Position, StructureKind, Tile, World};
pub use player::{Player, PlayerId};
pub use state::{GameState, MAX_PLAYERS, Standing, WinCheck};
pub use view::{MINE, PlayerView, ViewOwner, ViewTile};
