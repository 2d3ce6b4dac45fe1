//! Reference strategies shipped with the engine.
//!
//! Real bots are written elsewhere and plugged in through [`Strategy`] or
//! the HTTP protocol; these keep a match runnable out of the box.

use rand::rngs::StdRng;
use rand::seq::{IteratorRandom, SliceRandom};
use rand::{Rng, SeedableRng};

use super::{Strategy, StrategyError, TurnInput};
use crate::game::economy::{CostEntry, build_cost, conquer_cost_entry};
use crate::game::{ActionRequest, Buildable, Position, StructureKind};

/// Resources the aggressive strategy hoards before attacking a player.
const AGGRESSIVE_RESERVE: u64 = 100;

/// Always harvests.
#[derive(Debug, Clone, Copy, Default)]
pub struct Harvester;

impl Strategy for Harvester {
    fn turn(&mut self, _input: &TurnInput) -> Result<ActionRequest, StrategyError> {
        Ok(ActionRequest::Harvest)
    }
}

/// Never builds; attacks other players first, then neutral land.
#[derive(Debug, Clone)]
pub struct Aggressive {
    rng: StdRng,
}

impl Aggressive {
    /// Create with an entropy-seeded RNG.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Create with a fixed seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for Aggressive {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for Aggressive {
    fn turn(&mut self, input: &TurnInput) -> Result<ActionRequest, StrategyError> {
        let enemies: Vec<Position> = input
            .view
            .frontier()
            .filter(|(_, tile)| tile.is_enemy())
            .map(|(pos, _)| pos)
            .collect();

        if !enemies.is_empty() {
            if input.resources < AGGRESSIVE_RESERVE {
                return Ok(ActionRequest::Harvest);
            }
            if let Some(&target) = enemies.choose(&mut self.rng) {
                return Ok(ActionRequest::Conquer(target));
            }
        }

        let neutral = input
            .view
            .frontier()
            .filter(|(_, tile)| tile.owner.is_none())
            .map(|(pos, _)| pos)
            .choose(&mut self.rng);

        match neutral {
            Some(target) if input.resources >= 1 => Ok(ActionRequest::Conquer(target)),
            _ => Ok(ActionRequest::Harvest),
        }
    }
}

/// Turns owned land into farms, expanding onto cheap neutral land.
#[derive(Debug, Clone, Copy, Default)]
pub struct Farmer;

impl Strategy for Farmer {
    fn turn(&mut self, input: &TurnInput) -> Result<ActionRequest, StrategyError> {
        let farm_cost = build_cost(Buildable::Farm);
        if input.resources >= farm_cost {
            let bare = input
                .view
                .mine()
                .find(|pos| input.view.get(*pos).is_some_and(|t| t.structure == StructureKind::Land));
            if let Some(pos) = bare {
                return Ok(ActionRequest::Build(Buildable::Farm, pos));
            }
        }

        let cheapest = match conquer_cost_entry(StructureKind::Land) {
            CostEntry::Graded { undefended, .. } => undefended,
            CostEntry::Flat(cost) => cost,
        };
        if input.resources >= cheapest {
            let target = input
                .view
                .frontier()
                .find(|(_, tile)| tile.owner.is_none() && tile.structure == StructureKind::Land)
                .map(|(pos, _)| pos);
            if let Some(pos) = target {
                return Ok(ActionRequest::Conquer(pos));
            }
        }

        Ok(ActionRequest::Harvest)
    }
}

/// Picks a random plausible action each turn.
#[derive(Debug, Clone)]
pub struct RandomMoves {
    rng: StdRng,
}

impl RandomMoves {
    /// Create with an entropy-seeded RNG.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Create with a fixed seed.
    #[must_use]
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomMoves {
    fn default() -> Self {
        Self::new()
    }
}

impl Strategy for RandomMoves {
    fn turn(&mut self, input: &TurnInput) -> Result<ActionRequest, StrategyError> {
        let action = match self.rng.gen_range(0..3) {
            0 => input
                .view
                .frontier()
                .map(|(pos, _)| pos)
                .choose(&mut self.rng)
                .map(ActionRequest::Conquer),
            1 => {
                let kind = *[Buildable::Farm, Buildable::Fort, Buildable::Castle]
                    .choose(&mut self.rng)
                    .unwrap_or(&Buildable::Farm);
                input
                    .view
                    .mine()
                    .choose(&mut self.rng)
                    .map(|pos| ActionRequest::Build(kind, pos))
            }
            _ => None,
        };
        Ok(action.unwrap_or(ActionRequest::Harvest))
    }
}
