//! Game state management.

use std::collections::BTreeSet;

use rand::Rng;
use rand::seq::IteratorRandom;
use serde::Serialize;
use tracing::info;

use crate::error::ConfigError;
use crate::game::economy::{can_build, can_conquer, harvest_yield};
use crate::game::{
    ActionRequest, Buildable, MINE, Player, PlayerId, PlayerView, Position, StructureKind, Tile,
    TurnOutcome, World,
};

/// Maximum number of players in a match.
pub const MAX_PLAYERS: usize = u8::MAX as usize;

/// Result of a win check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WinCheck {
    /// Exactly one player still owns a castle.
    Winner(PlayerId),
    /// More than one player still owns a castle.
    Ongoing,
    /// Nobody owns a castle any more.
    NoneAlive,
}

/// Final per-player summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Standing {
    /// Player name.
    pub name: String,
    /// Whether the player still owns a castle.
    pub alive: bool,
    /// Resource balance.
    pub resources: u64,
    /// Tiles owned.
    pub tiles: usize,
    /// Castles owned.
    pub castles: usize,
}

/// Authoritative match state: the world plus every registered player.
#[derive(Debug, Clone)]
pub struct GameState {
    /// The grid.
    pub world: World,
    /// All players, indexed by [`PlayerId`].
    pub players: Vec<Player>,
    /// Rounds completed so far.
    pub round: u32,
    /// Minimum tiles-per-castle ratio to exceed before building another castle.
    pub castle_tile_limit: u32,
}

impl GameState {
    /// Create a game state with no players.
    #[must_use]
    pub fn new(world: World, castle_tile_limit: u32) -> Self {
        Self {
            world,
            players: Vec::new(),
            round: 0,
            castle_tile_limit,
        }
    }

    /// Register a player and place its first castle.
    ///
    /// Without a start position a random unowned land tile is chosen.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the name is reserved or taken, the start
    /// position is off the grid or already occupied, or no free land is left.
    pub fn add_player<R: Rng>(
        &mut self,
        name: &str,
        strategy: &str,
        start: Option<Position>,
        rng: &mut R,
    ) -> Result<PlayerId, ConfigError> {
        self.add_player_reserving(name, strategy, start, &[], rng)
    }

    /// [`add_player`](Self::add_player), but a random start never lands on
    /// one of `reserved`, the fixed starts of players not yet seated.
    ///
    /// # Errors
    ///
    /// Same as [`add_player`](Self::add_player).
    pub fn add_player_reserving<R: Rng>(
        &mut self,
        name: &str,
        strategy: &str,
        start: Option<Position>,
        reserved: &[Position],
        rng: &mut R,
    ) -> Result<PlayerId, ConfigError> {
        if name.is_empty() || name == MINE {
            return Err(ConfigError::ReservedName(name.to_string()));
        }
        if name.chars().any(char::is_control) {
            return Err(ConfigError::InvalidName(name.to_string()));
        }
        if self.players.iter().any(|p| &*p.name == name) {
            return Err(ConfigError::DuplicateName(name.to_string()));
        }
        let id = PlayerId::try_from(self.players.len())
            .map_err(|_| ConfigError::TooManyPlayers(self.players.len() + 1))?;

        let castle = match start {
            Some(pos) => {
                let tile = self
                    .world
                    .get(pos)
                    .map_err(|_| ConfigError::StartOffMap { name: name.to_string(), pos })?;
                if tile != Tile::land() {
                    return Err(ConfigError::StartOccupied { name: name.to_string(), pos });
                }
                pos
            }
            None => self
                .world
                .iter()
                .filter(|(pos, tile)| *tile == Tile::land() && !reserved.contains(pos))
                .map(|(pos, _)| pos)
                .choose(rng)
                .ok_or(ConfigError::NoFreeTile)?,
        };

        self.world
            .set(castle, Tile::owned(StructureKind::Castle, id))
            .map_err(|_| ConfigError::StartOffMap { name: name.to_string(), pos: castle })?;

        let player = Player::new(id, name, strategy);
        info!(player = %player, castle = %castle, "player added with initial castle");
        self.players.push(player);
        Ok(id)
    }

    /// Get a player by ID.
    #[must_use]
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(usize::from(id))
    }

    /// Name of a player, or `"?"` for an unknown ID.
    #[must_use]
    pub fn name_of(&self, id: PlayerId) -> &str {
        self.player(id).map_or("?", |p| &p.name)
    }

    /// All alive players.
    pub fn alive_players(&self) -> impl Iterator<Item = &Player> {
        self.players.iter().filter(|p| p.alive)
    }

    /// The recolored copy of the world for `viewer`.
    #[must_use]
    pub fn view_for(&self, viewer: PlayerId) -> PlayerView {
        self.world.build_view(viewer, |id| self.name_of(id))
    }

    /// Validate and apply one action for `player_id`.
    ///
    /// Rejected actions leave the state untouched.
    pub fn apply(&mut self, player_id: PlayerId, action: ActionRequest) -> TurnOutcome {
        match action {
            ActionRequest::Harvest => self.apply_harvest(player_id),
            ActionRequest::Conquer(pos) => self.apply_conquer(player_id, pos),
            ActionRequest::Build(kind, pos) => self.apply_build(player_id, kind, pos),
        }
    }

    /// Credit the player with the production of every tile it owns.
    pub fn apply_harvest(&mut self, player_id: PlayerId) -> TurnOutcome {
        if self.player(player_id).is_none() {
            return TurnOutcome::rejected(format!("unknown player {player_id}"));
        }
        let produced = harvest_yield(&self.world, player_id);
        self.credit(player_id, produced);
        TurnOutcome::applied(format!("harvest produced {produced} resources"))
    }

    /// Seize `pos`, leaving owned land behind.
    pub fn apply_conquer(&mut self, player_id: PlayerId, pos: Position) -> TurnOutcome {
        let Some(resources) = self.player(player_id).map(|p| p.resources) else {
            return TurnOutcome::rejected(format!("unknown player {player_id}"));
        };
        let quote = match can_conquer(&self.world, player_id, resources, pos) {
            Ok(quote) => quote,
            Err(violation) => return TurnOutcome::rejected(violation.to_string()),
        };

        let previous = self.world.get(pos).ok().and_then(|t| t.owner);
        let enemy = previous.map_or("neutral", |id| self.name_of(id)).to_string();
        if let Err(e) = self.world.set(pos, Tile::owned(StructureKind::Land, player_id)) {
            return TurnOutcome::rejected(e.to_string());
        }
        self.debit(player_id, quote.cost);
        TurnOutcome::applied(format!(
            "conquered {quote} from {enemy} spending {} resources",
            quote.cost
        ))
    }

    /// Replace the structure on an owned tile.
    pub fn apply_build(&mut self, player_id: PlayerId, kind: Buildable, pos: Position) -> TurnOutcome {
        let Some(resources) = self.player(player_id).map(|p| p.resources) else {
            return TurnOutcome::rejected(format!("unknown player {player_id}"));
        };
        let cost = match can_build(
            &self.world,
            player_id,
            resources,
            kind,
            pos,
            self.castle_tile_limit,
        ) {
            Ok(cost) => cost,
            Err(violation) => return TurnOutcome::rejected(violation.to_string()),
        };

        if let Err(e) = self.world.set(pos, Tile::owned(kind.structure(), player_id)) {
            return TurnOutcome::rejected(e.to_string());
        }
        self.debit(player_id, cost);
        TurnOutcome::applied(format!("built {} spending {cost} resources", kind.structure()))
    }

    fn credit(&mut self, player_id: PlayerId, amount: u64) {
        if let Some(player) = self.players.get_mut(usize::from(player_id)) {
            player.resources = player.resources.saturating_add(amount);
        }
    }

    fn debit(&mut self, player_id: PlayerId, amount: u64) {
        if let Some(player) = self.players.get_mut(usize::from(player_id)) {
            debug_assert!(player.resources >= amount);
            player.resources = player.resources.saturating_sub(amount);
        }
    }

    /// Players that own at least one castle.
    #[must_use]
    pub fn castle_owners(&self) -> BTreeSet<PlayerId> {
        self.world
            .tiles()
            .iter()
            .filter(|t| t.structure == StructureKind::Castle)
            .filter_map(|t| t.owner)
            .collect()
    }

    /// Recompute every player's alive flag from castle ownership and report
    /// whether the match has a sole winner.
    ///
    /// Death is terminal: a dead player is never revived here.
    pub fn check_winner(&mut self) -> WinCheck {
        let owners = self.castle_owners();

        for player in &mut self.players {
            let still_alive = player.alive && owners.contains(&player.id);
            if player.alive && !still_alive {
                info!(player = %player, "player died, it no longer has castles");
                player.eliminate();
            }
        }

        let mut alive = self.players.iter().filter(|p| p.alive);
        match (alive.next(), alive.next()) {
            (Some(winner), None) => WinCheck::Winner(winner.id),
            (None, _) => WinCheck::NoneAlive,
            _ => WinCheck::Ongoing,
        }
    }

    /// Per-player summary in seating order.
    #[must_use]
    pub fn standings(&self) -> Vec<Standing> {
        self.players
            .iter()
            .map(|p| Standing {
                name: p.name.to_string(),
                alive: p.alive,
                resources: p.resources,
                tiles: self.world.count_tiles(p.id),
                castles: self.world.count_castles(p.id),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn two_player_state() -> GameState {
        let mut rng = StdRng::seed_from_u64(7);
        let mut state = GameState::new(World::new(3, 1).unwrap(), 50);
        state.add_player("a", "harvester", Some(Position::new(0, 0)), &mut rng).unwrap();
        state.add_player("b", "harvester", Some(Position::new(2, 0)), &mut rng).unwrap();
        state
    }

    #[test]
    fn test_add_player_places_castle() {
        let state = two_player_state();
        assert_eq!(
            state.world.get(Position::new(0, 0)).unwrap(),
            Tile::owned(StructureKind::Castle, 0)
        );
        assert_eq!(state.players[1].resources, 0);
        assert!(state.players.iter().all(|p| p.alive));
    }

    #[test]
    fn test_random_start_avoids_reserved_tiles() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut state = GameState::new(World::new(3, 1).unwrap(), 50);
            let reserved = [Position::new(0, 0), Position::new(2, 0)];
            state.add_player_reserving("a", "t", None, &reserved, &mut rng).unwrap();
            assert_eq!(
                state.world.get(Position::new(1, 0)).unwrap(),
                Tile::owned(StructureKind::Castle, 0)
            );
        }

        let mut rng = StdRng::seed_from_u64(1);
        let mut state = GameState::new(World::new(1, 1).unwrap(), 50);
        assert!(matches!(
            state.add_player_reserving("a", "t", None, &[Position::new(0, 0)], &mut rng),
            Err(ConfigError::NoFreeTile)
        ));
    }

    #[test]
    fn test_add_player_rejects_bad_setup() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut state = two_player_state();
        assert!(matches!(
            state.add_player("a", "x", None, &mut rng),
            Err(ConfigError::DuplicateName(_))
        ));
        assert!(matches!(
            state.add_player("mine", "x", None, &mut rng),
            Err(ConfigError::ReservedName(_))
        ));
        assert!(matches!(
            state.add_player("c", "x", Some(Position::new(0, 0)), &mut rng),
            Err(ConfigError::StartOccupied { .. })
        ));
        assert!(matches!(
            state.add_player("c", "x", Some(Position::new(9, 0)), &mut rng),
            Err(ConfigError::StartOffMap { .. })
        ));
        state.add_player("c", "x", None, &mut rng).unwrap();
        assert_eq!(state.world.get(Position::new(1, 0)).unwrap().owner, Some(2));
        assert!(matches!(
            state.add_player("d", "x", None, &mut rng),
            Err(ConfigError::NoFreeTile)
        ));
    }

    #[test]
    fn test_harvest_adds_production() {
        let mut state = two_player_state();
        let outcome = state.apply(0, ActionRequest::Harvest);
        assert!(outcome.success);
        assert_eq!(outcome.reason, "harvest produced 5 resources");
        assert_eq!(state.players[0].resources, 5);
    }

    #[test]
    fn test_conquer_resets_to_owned_land() {
        let mut state = two_player_state();
        state.world.set(Position::new(1, 0), Tile::owned(StructureKind::Farm, 1)).unwrap();
        state.players[0].resources = 100;

        // b's castle at (2, 0) defends the farm.
        let outcome = state.apply(0, ActionRequest::Conquer(Position::new(1, 0)));
        assert!(outcome.success, "{}", outcome.reason);
        assert_eq!(outcome.reason, "conquered defended farm from b spending 25 resources");
        assert_eq!(
            state.world.get(Position::new(1, 0)).unwrap(),
            Tile::owned(StructureKind::Land, 0)
        );
        assert_eq!(state.players[0].resources, 75);
    }

    #[test]
    fn test_rejected_action_changes_nothing() {
        let mut state = two_player_state();
        let before = state.world.clone();

        let outcome = state.apply(0, ActionRequest::Build(Buildable::Fort, Position::new(0, 0)));
        assert!(!outcome.success);
        assert_eq!(state.world, before);
        assert_eq!(state.players[0].resources, 0);
    }

    #[test]
    fn test_build_replaces_structure() {
        let mut state = two_player_state();
        state.players[0].resources = 5;
        let outcome = state.apply(0, ActionRequest::Build(Buildable::Farm, Position::new(0, 0)));
        assert!(outcome.success);
        assert_eq!(outcome.reason, "built farm spending 5 resources");
        assert_eq!(state.world.get(Position::new(0, 0)).unwrap().structure, StructureKind::Farm);
        assert_eq!(state.players[0].resources, 0);
    }

    #[test]
    fn test_check_winner_is_idempotent() {
        let mut state = two_player_state();
        assert_eq!(state.check_winner(), WinCheck::Ongoing);

        state.world.set(Position::new(2, 0), Tile::owned(StructureKind::Land, 0)).unwrap();
        assert_eq!(state.check_winner(), WinCheck::Winner(0));
        assert_eq!(state.check_winner(), WinCheck::Winner(0));
        assert!(!state.players[1].alive);
    }

    #[test]
    fn test_view_uses_mine_sentinel() {
        let state = two_player_state();
        let view = state.view_for(1);
        assert!(view.get(Position::new(2, 0)).unwrap().is_mine());
        assert_eq!(view.get(Position::new(0, 0)).unwrap().owner.as_ref().map(|o| o.as_str()), Some("a"));
    }

    #[test]
    fn test_standings() {
        let state = two_player_state();
        let standings = state.standings();
        assert_eq!(standings.len(), 2);
        assert_eq!(standings[0].name, "a");
        assert_eq!(standings[0].castles, 1);
        assert_eq!(standings[0].tiles, 1);
    }
}
