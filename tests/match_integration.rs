//! End-to-end match tests: rule scenarios, win detection, and the
//! isolation boundary under misbehaving strategies.
//!
//! Run with: cargo test --test match_integration

#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]

use std::thread;
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand::rngs::StdRng;
use toe::game::{WinCheck, check_invariants};
use toe::strategy::{Harvester, from_fn};
use toe::{
    ActionRequest, Buildable, GameState, Match, MatchConfig, MatchError, PlayerSpec, Position,
    Strategy, StrategyError, StructureKind, Tile, TurnInput, World,
};

fn pos(x: u16, y: u16) -> Position {
    Position::new(x, y)
}

fn state_with(width: u16, height: u16, starts: &[(&str, Position)]) -> GameState {
    let mut rng = StdRng::seed_from_u64(1);
    let mut state = GameState::new(World::new(width, height).unwrap(), 50);
    for (name, start) in starts {
        state.add_player(name, "test", Some(*start), &mut rng).unwrap();
    }
    state
}

fn config(players: &[(&str, Position)]) -> MatchConfig {
    MatchConfig {
        width: 3,
        height: 1,
        players: players
            .iter()
            .map(|(name, start)| PlayerSpec::new(*name, "custom").at(*start))
            .collect(),
        seed: Some(9),
        turn_timeout_ms: 100,
        ..MatchConfig::default()
    }
}

fn always(action: ActionRequest) -> Box<dyn Strategy> {
    Box::new(from_fn(move |_: &TurnInput| Ok(action)))
}

#[test]
fn scenario_a_conquer_undefended_land() {
    let mut state = state_with(2, 1, &[("a", pos(0, 0))]);
    state.players[0].resources = 1;

    let outcome = state.apply(0, ActionRequest::Conquer(pos(1, 0)));

    assert!(outcome.success, "{}", outcome.reason);
    assert_eq!(outcome.reason, "conquered unprotected land from neutral spending 1 resources");
    assert_eq!(state.world.get(pos(1, 0)).unwrap(), Tile::owned(StructureKind::Land, 0));
    assert_eq!(state.players[0].resources, 0);
}

#[test]
fn scenario_b_diagonal_fort_does_not_defend() {
    // a at (0,0); b owns (1,0) with a fort at (0,1), diagonal to (1,0).
    let mut state = state_with(3, 3, &[("a", pos(0, 0)), ("b", pos(2, 2))]);
    state.world.set(pos(1, 0), Tile::owned(StructureKind::Land, 1)).unwrap();
    state.world.set(pos(0, 1), Tile::owned(StructureKind::Fort, 1)).unwrap();
    state.players[0].resources = 1;

    let outcome = state.apply(0, ActionRequest::Conquer(pos(1, 0)));

    assert!(outcome.success, "{}", outcome.reason);
    assert_eq!(outcome.reason, "conquered unprotected land from b spending 1 resources");
    assert_eq!(state.players[0].resources, 0);
}

#[test]
fn orthogonal_fort_defends() {
    let mut state = state_with(3, 3, &[("a", pos(0, 0)), ("b", pos(2, 2))]);
    state.world.set(pos(1, 0), Tile::owned(StructureKind::Land, 1)).unwrap();
    state.world.set(pos(2, 0), Tile::owned(StructureKind::Fort, 1)).unwrap();
    state.players[0].resources = 24;

    let outcome = state.apply(0, ActionRequest::Conquer(pos(1, 0)));
    assert!(!outcome.success);
    assert!(outcome.reason.contains("defended land"), "{}", outcome.reason);
    assert_eq!(state.players[0].resources, 24);
}

#[test]
fn scenario_c_castle_ratio() {
    let mut state = state_with(51, 2, &[("a", pos(0, 0))]);
    for x in 1..51 {
        state.world.set(pos(x, 0), Tile::owned(StructureKind::Land, 0)).unwrap();
    }
    state.players[0].resources = 150;
    assert_eq!(state.world.count_tiles(0), 51);

    let first = state.apply(0, ActionRequest::Build(Buildable::Castle, pos(1, 0)));
    assert!(first.success, "{}", first.reason);
    assert_eq!(state.world.count_castles(0), 2);
    assert_eq!(state.players[0].resources, 75);

    let second = state.apply(0, ActionRequest::Build(Buildable::Castle, pos(2, 0)));
    assert!(!second.success);
    assert_eq!(
        second.reason,
        "can't build more castles, you need more tiles (you have 2 castles and 51 tiles)"
    );
    assert_eq!(state.players[0].resources, 75);
}

#[test]
fn scenario_d_timeout_is_skipped_and_late_answer_discarded() {
    let mut calls = 0;
    let slow = from_fn(move |_: &TurnInput| {
        calls += 1;
        if calls == 1 {
            thread::sleep(Duration::from_millis(400));
            // Would be legal if it ever got applied.
            return Ok(ActionRequest::Conquer(Position::new(1, 0)));
        }
        Ok(ActionRequest::Harvest)
    });

    let mut config = config(&[("slow", pos(0, 0)), ("b", pos(2, 0))]);
    config.max_rounds = Some(3);
    let mut game = Match::with_strategies(&config, vec![Box::new(slow), Box::new(Harvester)]).unwrap();
    game.state_mut().players[0].resources = 10;

    let started = Instant::now();
    assert_eq!(game.play_round().unwrap(), WinCheck::Ongoing);
    assert!(started.elapsed() < Duration::from_millis(350));
    assert_eq!(game.state().players[0].resources, 10);

    thread::sleep(Duration::from_millis(500));
    game.play_round().unwrap();
    // The stale conquer never landed; the fresh harvest did.
    assert_eq!(game.state().world.get(pos(1, 0)).unwrap(), Tile::land());
    assert_eq!(game.state().players[0].resources, 15);

    let result = game.play().unwrap();
    assert_eq!(result.rounds_played, 3);
}

#[test]
fn scenario_e_last_castle_owner_wins() {
    let config = MatchConfig {
        debug: true,
        ..config(&[("a", pos(0, 0)), ("b", pos(2, 0))])
    };
    let mut game = Match::with_strategies(
        &config,
        vec![always(ActionRequest::Conquer(pos(2, 0))), Box::new(Harvester)],
    )
    .unwrap();
    game.state_mut().world.set(pos(1, 0), Tile::owned(StructureKind::Land, 0)).unwrap();
    game.state_mut().players[0].resources = 100;

    let result = game.play().unwrap();

    assert_eq!(result.winners, vec!["a".to_string()]);
    assert_eq!(result.rounds_played, 1);
    assert!(!result.standings[1].alive);
    assert_eq!(result.standings[0].tiles, 3);
}

#[test]
fn win_check_is_idempotent_after_elimination() {
    let mut state = state_with(3, 1, &[("a", pos(0, 0)), ("b", pos(2, 0))]);
    state.world.set(pos(2, 0), Tile::owned(StructureKind::Land, 0)).unwrap();

    assert_eq!(state.check_winner(), WinCheck::Winner(0));
    assert_eq!(state.check_winner(), WinCheck::Winner(0));
    assert!(check_invariants(&state).is_empty());
}

#[test]
fn building_over_the_last_castle_leaves_no_winner() {
    let config = MatchConfig {
        width: 1,
        debug: true,
        ..config(&[("solo", pos(0, 0))])
    };
    let mut game =
        Match::with_strategies(&config, vec![always(ActionRequest::Build(Buildable::Farm, pos(0, 0)))])
            .unwrap();
    game.state_mut().players[0].resources = 5;

    let result = game.play().unwrap();
    assert!(result.winners.is_empty());
    assert_eq!(result.rounds_played, 1);
}

#[test]
fn round_cap_declares_survivors_co_winners() {
    let mut config = config(&[("a", pos(0, 0)), ("b", pos(2, 0))]);
    config.max_rounds = Some(4);
    config.debug = true;
    let game = Match::with_strategies(&config, vec![Box::new(Harvester), Box::new(Harvester)]).unwrap();

    let result = game.play().unwrap();
    assert_eq!(result.winners, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(result.rounds_played, 4);
    assert_eq!(result.standings[1].resources, 20);
}

#[test]
fn debug_mode_strategy_failure_stops_the_match() {
    let mut config = config(&[("a", pos(0, 0)), ("b", pos(2, 0))]);
    config.debug = true;
    config.max_rounds = Some(5);
    let broken = from_fn(|_: &TurnInput| -> Result<ActionRequest, StrategyError> {
        Err(StrategyError::Failed("index out of range".to_string()))
    });
    let game = Match::with_strategies(&config, vec![Box::new(broken), Box::new(Harvester)]).unwrap();

    let err = game.play().unwrap_err();
    assert!(
        matches!(&err, MatchError::StrategyFailed { player, reason } if player == "a" && reason.contains("index out of range")),
        "{err}"
    );
}

#[test]
fn isolated_crash_only_forfeits_turns() {
    let mut config = config(&[("crashy", pos(0, 0)), ("b", pos(2, 0))]);
    config.max_rounds = Some(3);
    let crashy = from_fn(|_: &TurnInput| -> Result<ActionRequest, StrategyError> {
        panic!("strategy bug");
    });
    let game = Match::with_strategies(&config, vec![Box::new(crashy), Box::new(Harvester)]).unwrap();

    let result = game.play().unwrap();
    assert_eq!(result.rounds_played, 3);
    assert_eq!(result.winners.len(), 2);
    assert_eq!(result.standings[0].resources, 0);
    assert_eq!(result.standings[1].resources, 15);
}

#[test]
fn builtin_strategies_play_to_completion() {
    let config = MatchConfig {
        width: 8,
        height: 6,
        players: vec![
            PlayerSpec::new("agg", "aggressive"),
            PlayerSpec::new("farm", "farmer"),
            PlayerSpec::new("rnd", "random"),
            PlayerSpec::new("pac", "pacifist"),
        ],
        max_rounds: Some(60),
        seed: Some(42),
        ..MatchConfig::default()
    };

    let result = toe::run_match(&config).unwrap();
    assert!(result.rounds_played <= 60);
    assert_eq!(result.standings.len(), 4);
    for winner in &result.winners {
        let standing = result.standings.iter().find(|s| &s.name == winner).unwrap();
        assert!(standing.alive);
        assert!(standing.castles > 0);
    }
    let tiles: usize = result.standings.iter().map(|s| s.tiles).sum();
    assert!(tiles <= 48);
}

#[test]
fn bad_configuration_is_fatal_before_play() {
    let mut config = config(&[("a", pos(0, 0)), ("a", pos(2, 0))]);
    assert!(matches!(
        Match::from_config(&config),
        Err(toe::ConfigError::DuplicateName(_))
    ));

    config.players[1] = PlayerSpec::new("b", "nonsense");
    assert!(matches!(
        Match::from_config(&config),
        Err(toe::ConfigError::UnknownStrategy(_))
    ));
}

#[test]
fn control_characters_in_names_fail_setup_cleanly() {
    let mut config = config(&[("a", pos(0, 0)), ("b", pos(2, 0))]);
    config.players[0] = PlayerSpec::new("a\0b", "harvester").at(pos(0, 0));
    config.players[1].strategy = "harvester".to_string();

    assert!(matches!(
        toe::run_match(&config),
        Err(MatchError::Config(toe::ConfigError::InvalidName(_)))
    ));
    assert!(matches!(
        Match::with_strategies(&config, vec![Box::new(Harvester), Box::new(Harvester)]),
        Err(toe::ConfigError::InvalidName(_))
    ));
}
