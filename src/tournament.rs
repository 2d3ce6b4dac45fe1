//! Match controller and batch scoring.
//!
//! A [`Match`] drives rounds until one player owns every surviving castle
//! or the round cap is hit. [`run_batch`] plays many independent matches in
//! parallel and tallies the winners.

use std::collections::BTreeMap;

use rand::SeedableRng;
use rand::rngs::StdRng;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::arbiter::TurnArbiter;
use crate::config::MatchConfig;
use crate::error::{ConfigError, MatchError};
use crate::game::{GameState, Standing, WinCheck, World, assert_invariants};
use crate::strategy::{self, Strategy, StrategyChannel};

/// Final result of a match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchResult {
    /// Winner names: one normally, every survivor on a round-cap tie, none
    /// if the last castles fell in the same round.
    pub winners: Vec<String>,
    /// Rounds played.
    pub rounds_played: u32,
    /// Per-player summary in seating order.
    pub standings: Vec<Standing>,
}

impl MatchResult {
    /// Whether more than one player shares the win.
    #[must_use]
    pub fn is_tie(&self) -> bool {
        self.winners.len() > 1
    }
}

/// One match, set up and ready to play.
#[derive(Debug)]
pub struct Match {
    state: GameState,
    arbiter: TurnArbiter,
    max_rounds: Option<u32>,
}

impl Match {
    /// Set up a match with the strategies named in the config.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the config is invalid or a strategy
    /// cannot be created.
    pub fn from_config(config: &MatchConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let strategies = config
            .players
            .iter()
            .map(|p| strategy::create(&p.strategy))
            .collect::<Result<Vec<_>, _>>()?;
        Self::with_strategies(config, strategies)
    }

    /// Set up a match with one supplied strategy per configured player.
    ///
    /// The players' `strategy` fields are kept as labels only.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the config is invalid, the strategy count
    /// does not match, or an isolated worker cannot be spawned.
    pub fn with_strategies(
        config: &MatchConfig,
        strategies: Vec<Box<dyn Strategy>>,
    ) -> Result<Self, ConfigError> {
        config.validate_layout()?;
        if strategies.len() != config.players.len() {
            return Err(ConfigError::StrategyCount {
                expected: config.players.len(),
                got: strategies.len(),
            });
        }

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let world = World::new(config.width, config.height)?;
        let mut state = GameState::new(world, config.castle_tile_limit);
        info!(
            width = config.width,
            height = config.height,
            players = config.players.len(),
            debug = config.debug,
            "match created"
        );

        let fixed_starts: Vec<_> = config.players.iter().filter_map(|p| p.start).collect();
        let mut seats = Vec::with_capacity(strategies.len());
        for (spec, strategy) in config.players.iter().zip(strategies) {
            state.add_player_reserving(
                &spec.name,
                &spec.strategy,
                spec.start,
                &fixed_starts,
                &mut rng,
            )?;
            let channel = if config.debug {
                StrategyChannel::direct(strategy)
            } else {
                StrategyChannel::isolated(&spec.name, strategy, config.poll_interval()).map_err(
                    |e| ConfigError::StrategySpawn {
                        name: spec.name.clone(),
                        reason: e.to_string(),
                    },
                )?
            };
            seats.push(channel);
        }

        Ok(Self {
            state,
            arbiter: TurnArbiter::new(seats, config.turn_timeout(), rng),
            max_rounds: config.max_rounds,
        })
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// Mutable state, for setting up positions before play.
    pub fn state_mut(&mut self) -> &mut GameState {
        &mut self.state
    }

    /// Play one round and run the win check.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::StrategyFailed`] if a direct-mode strategy fails.
    pub fn play_round(&mut self) -> Result<WinCheck, MatchError> {
        self.arbiter.play_round(&mut self.state)?;
        let check = self.state.check_winner();
        assert_invariants(&self.state);
        Ok(check)
    }

    /// Play until there is a winner or the round cap is reached, then stop
    /// every strategy.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::StrategyFailed`] if a direct-mode strategy fails.
    pub fn play(mut self) -> Result<MatchResult, MatchError> {
        let outcome = self.play_to_end();
        self.arbiter.shutdown();
        let winners = outcome?;

        if winners.is_empty() {
            warn!(rounds = self.state.round, "no castles left, nobody won");
        } else {
            info!(
                winners = %winners.join(", "),
                rounds = self.state.round,
                "match finished"
            );
        }

        Ok(MatchResult {
            winners,
            rounds_played: self.state.round,
            standings: self.state.standings(),
        })
    }

    fn play_to_end(&mut self) -> Result<Vec<String>, MatchError> {
        loop {
            if self.max_rounds.is_some_and(|cap| self.state.round >= cap) {
                info!(rounds = self.state.round, "round cap reached");
                return Ok(self
                    .state
                    .alive_players()
                    .map(|p| p.name.to_string())
                    .collect());
            }

            match self.play_round()? {
                WinCheck::Winner(id) => return Ok(vec![self.state.name_of(id).to_string()]),
                WinCheck::NoneAlive => return Ok(Vec::new()),
                WinCheck::Ongoing => {}
            }
        }
    }
}

/// Set up and play one match.
///
/// # Errors
///
/// Returns a [`MatchError`] if setup fails or a direct-mode strategy fails.
pub fn run_match(config: &MatchConfig) -> Result<MatchResult, MatchError> {
    Match::from_config(config)?.play()
}

/// Aggregated results of many matches.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchStats {
    /// Matches that ran to completion.
    pub games_played: u64,
    /// Outright wins per player name.
    pub wins: BTreeMap<String, u64>,
    /// Shared wins per player name (round-cap ties).
    pub shared_wins: BTreeMap<String, u64>,
    /// Matches that ended in a tie.
    pub ties: u64,
    /// Matches where nobody won.
    pub no_winner: u64,
    /// Matches that stopped with an error.
    pub failures: u64,
    /// Sum of rounds over completed matches.
    pub total_rounds: u64,
}

impl BatchStats {
    /// Record one match result.
    pub fn add_result(&mut self, result: &MatchResult) {
        self.games_played += 1;
        self.total_rounds += u64::from(result.rounds_played);
        match result.winners.as_slice() {
            [] => self.no_winner += 1,
            [winner] => *self.wins.entry(winner.clone()).or_default() += 1,
            winners => {
                self.ties += 1;
                for winner in winners {
                    *self.shared_wins.entry(winner.clone()).or_default() += 1;
                }
            }
        }
    }

    /// Fold another accumulator into this one.
    pub fn merge(&mut self, other: &Self) {
        self.games_played += other.games_played;
        self.ties += other.ties;
        self.no_winner += other.no_winner;
        self.failures += other.failures;
        self.total_rounds += other.total_rounds;
        for (name, count) in &other.wins {
            *self.wins.entry(name.clone()).or_default() += count;
        }
        for (name, count) in &other.shared_wins {
            *self.shared_wins.entry(name.clone()).or_default() += count;
        }
    }

    /// Mean rounds per completed match.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_rounds(&self) -> f64 {
        if self.games_played == 0 {
            0.0
        } else {
            self.total_rounds as f64 / self.games_played as f64
        }
    }
}

/// Play `repeat` independent matches in parallel.
///
/// With a seed, match `i` uses `seed + i`.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the config is invalid. Failures of
/// individual matches are counted in [`BatchStats::failures`].
pub fn run_batch(config: &MatchConfig, repeat: u32) -> Result<BatchStats, ConfigError> {
    run_batch_with_progress(config, repeat, &|| {})
}

/// [`run_batch`], calling `tick` after each match.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the config is invalid.
pub fn run_batch_with_progress(
    config: &MatchConfig,
    repeat: u32,
    tick: &(dyn Fn() + Sync),
) -> Result<BatchStats, ConfigError> {
    config.validate()?;

    // Each worker thread accumulates locally; the partial stats are merged at the end.
    let stats = (0..u64::from(repeat))
        .into_par_iter()
        .fold(BatchStats::default, |mut local, i| {
            let mut match_config = config.clone();
            match_config.seed = config.seed.map(|seed| seed.wrapping_add(i));

            match run_match(&match_config) {
                Ok(result) => local.add_result(&result),
                Err(e) => {
                    warn!(game = i, error = %e, "match failed");
                    local.failures += 1;
                }
            }
            tick();
            local
        })
        .reduce(BatchStats::default, |mut a, b| {
            a.merge(&b);
            a
        });

    Ok(stats)
}
