//! Economic rules: costs, production and eligibility checks.
//!
//! Everything here is a pure function over a [`World`] snapshot. Applying
//! an action lives in [`GameState`](crate::game::GameState).

use std::fmt;

use thiserror::Error;

use crate::game::{Buildable, PlayerId, Position, StructureKind, World};

/// Default minimum tiles-per-castle ratio a player must exceed to build another castle.
pub const DEFAULT_CASTLE_TILE_LIMIT: u32 = 50;

/// Resources produced by one tile on harvest.
#[must_use]
pub const fn production(kind: StructureKind) -> u64 {
    match kind {
        StructureKind::Land | StructureKind::Fort => 0,
        StructureKind::Farm | StructureKind::Castle => 5,
    }
}

/// Price of building a structure.
#[must_use]
pub const fn build_cost(kind: Buildable) -> u64 {
    match kind {
        Buildable::Farm => 5,
        Buildable::Fort => 25,
        Buildable::Castle => 75,
    }
}

/// Entry of the conquer cost table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostEntry {
    /// Cost depends on whether the target is defended.
    Graded {
        /// Cost with no defending neighbor.
        undefended: u64,
        /// Cost with at least one defending neighbor.
        defended: u64,
    },
    /// Cost ignores adjacency.
    Flat(u64),
}

/// Conquer cost table.
#[must_use]
pub const fn conquer_cost_entry(kind: StructureKind) -> CostEntry {
    match kind {
        StructureKind::Land => CostEntry::Graded {
            undefended: 1,
            defended: 25,
        },
        StructureKind::Farm => CostEntry::Graded {
            undefended: 2,
            defended: 25,
        },
        StructureKind::Fort => CostEntry::Flat(50),
        StructureKind::Castle => CostEntry::Flat(100),
    }
}

/// The price of conquering a specific tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConquerQuote {
    /// Structure on the target.
    pub structure: StructureKind,
    /// Resources required.
    pub cost: u64,
    /// Whether a defender raised the cost (`None` for flat-cost structures).
    pub defended: Option<bool>,
}

impl fmt::Display for ConquerQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.defended {
            Some(true) => write!(f, "defended {}", self.structure),
            Some(false) => write!(f, "unprotected {}", self.structure),
            None => write!(f, "{}", self.structure),
        }
    }
}

/// A rejected action. The `Display` text is the turn's reason string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleViolation {
    /// The target position is not on the grid.
    #[error("can't {verb} a position that isn't on the map {pos}")]
    OffMap {
        /// What was attempted ("conquer" or "build on").
        verb: &'static str,
        /// The requested position.
        pos: Position,
    },
    /// Conquer target already belongs to the player.
    #[error("can't conquer terrain that is already yours")]
    AlreadyOwned,
    /// Conquer target does not touch the player's empire.
    #[error("can't conquer terrain that isn't adjacent to your empire")]
    NotAdjacent,
    /// Not enough resources to conquer.
    #[error("not enough resources to conquer {quote}, costs {}", .quote.cost)]
    CannotAffordConquer {
        /// The price that could not be paid.
        quote: ConquerQuote,
    },
    /// Not enough resources to build.
    #[error("not enough resources to build {}, costs {cost}", .kind.structure())]
    CannotAffordBuild {
        /// What was to be built.
        kind: Buildable,
        /// Its price.
        cost: u64,
    },
    /// Build target is not owned by the player.
    #[error("can't build structures on terrain that you don't own")]
    NotOwned,
    /// The player has too few tiles per castle.
    #[error(
        "can't build more castles, you need more tiles (you have {castles} castles and {tiles} tiles)"
    )]
    CastleLimit {
        /// Castles owned.
        castles: usize,
        /// Tiles owned.
        tiles: usize,
    },
}

/// Resources `player` would gain by harvesting now.
#[must_use]
pub fn harvest_yield(world: &World, player: PlayerId) -> u64 {
    world
        .tiles()
        .iter()
        .filter(|tile| tile.owner == Some(player))
        .map(|tile| production(tile.structure))
        .sum()
}

/// Whether the tile at `pos` is defended.
///
/// A tile is defended when an orthogonal neighbor has the same owner and
/// holds a fort or castle. Unowned tiles are never defended.
#[must_use]
pub fn is_defended(world: &World, pos: Position) -> bool {
    let Ok(target) = world.get(pos) else {
        return false;
    };
    let Some(owner) = target.owner else {
        return false;
    };

    world.neighbors4(pos).any(|n| {
        world
            .get(n)
            .is_ok_and(|tile| tile.owner == Some(owner) && tile.structure.is_defender())
    })
}

/// Price of conquering the tile at `pos`.
///
/// # Errors
///
/// Returns [`RuleViolation::OffMap`] if `pos` is not on the grid.
pub fn conquer_cost(world: &World, pos: Position) -> Result<ConquerQuote, RuleViolation> {
    let target = world.get(pos).map_err(|_| RuleViolation::OffMap {
        verb: "conquer",
        pos,
    })?;

    let quote = match conquer_cost_entry(target.structure) {
        CostEntry::Flat(cost) => ConquerQuote {
            structure: target.structure,
            cost,
            defended: None,
        },
        CostEntry::Graded {
            undefended,
            defended,
        } => {
            let is_defended = is_defended(world, pos);
            ConquerQuote {
                structure: target.structure,
                cost: if is_defended { defended } else { undefended },
                defended: Some(is_defended),
            }
        }
    };
    Ok(quote)
}

/// Check whether `player` may conquer `pos` with `resources`.
///
/// # Errors
///
/// Returns the first violated rule, checked in order: on the map, not
/// already owned, adjacent to the empire, affordable.
pub fn can_conquer(
    world: &World,
    player: PlayerId,
    resources: u64,
    pos: Position,
) -> Result<ConquerQuote, RuleViolation> {
    let target = world.get(pos).map_err(|_| RuleViolation::OffMap {
        verb: "conquer",
        pos,
    })?;

    if target.owner == Some(player) {
        return Err(RuleViolation::AlreadyOwned);
    }

    let in_range = world
        .neighbors4(pos)
        .any(|n| world.get(n).is_ok_and(|tile| tile.owner == Some(player)));
    if !in_range {
        return Err(RuleViolation::NotAdjacent);
    }

    let quote = conquer_cost(world, pos)?;
    if resources < quote.cost {
        return Err(RuleViolation::CannotAffordConquer { quote });
    }

    Ok(quote)
}

/// Check whether `player` may build `kind` on `pos` with `resources`.
///
/// Returns the build cost on success.
///
/// # Errors
///
/// Returns the first violated rule, checked in order: affordable, on the
/// map, owned, and for castles the tiles-per-castle ratio.
pub fn can_build(
    world: &World,
    player: PlayerId,
    resources: u64,
    kind: Buildable,
    pos: Position,
    castle_tile_limit: u32,
) -> Result<u64, RuleViolation> {
    let cost = build_cost(kind);
    if resources < cost {
        return Err(RuleViolation::CannotAffordBuild { kind, cost });
    }

    let target = world.get(pos).map_err(|_| RuleViolation::OffMap {
        verb: "build on",
        pos,
    })?;
    if target.owner != Some(player) {
        return Err(RuleViolation::NotOwned);
    }

    if kind == Buildable::Castle {
        let castles = world.count_castles(player);
        let tiles = world.count_tiles(player);
        // tiles / castles <= limit, without the division
        if castles > 0 && tiles <= castles.saturating_mul(castle_tile_limit as usize) {
            return Err(RuleViolation::CastleLimit { castles, tiles });
        }
    }

    Ok(cost)
}
