//! Per-round orchestration: turn order, views, validation, bookkeeping.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::debug;

use crate::error::MatchError;
use crate::game::{ActionRequest, GameState, PlayerId, TurnOutcome};
use crate::strategy::{ChannelReply, StrategyChannel, TurnInput};

/// What happened on one player's turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnRecord {
    /// Who acted.
    pub player: PlayerId,
    /// The requested action, if the strategy produced one.
    pub action: Option<ActionRequest>,
    /// Applied or rejected, with the reason.
    pub outcome: TurnOutcome,
}

/// Asks every live player for one action per round and applies the answers.
///
/// Seats are indexed by [`PlayerId`]. Turn order is reshuffled every round.
#[derive(Debug)]
pub struct TurnArbiter {
    seats: Vec<StrategyChannel>,
    deadline: Duration,
    rng: StdRng,
}

impl TurnArbiter {
    /// Create an arbiter over one channel per player, in seating order.
    #[must_use]
    pub fn new(seats: Vec<StrategyChannel>, deadline: Duration, rng: StdRng) -> Self {
        Self {
            seats,
            deadline,
            rng,
        }
    }

    /// Per-turn deadline for isolated strategies.
    #[must_use]
    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Play one round: every alive player acts once, in random order.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::StrategyFailed`] if a direct-mode strategy fails.
    pub fn play_round(&mut self, state: &mut GameState) -> Result<Vec<TurnRecord>, MatchError> {
        let mut order: Vec<PlayerId> = state.alive_players().map(|p| p.id).collect();
        order.shuffle(&mut self.rng);

        let round = state.round + 1;
        debug!(
            round,
            order = %order.iter().map(|&id| state.name_of(id)).collect::<Vec<_>>().join(", "),
            "round started"
        );

        let mut records = Vec::with_capacity(order.len());
        for player in order {
            if !state.player(player).is_some_and(|p| p.alive) {
                continue;
            }
            records.push(self.play_turn(state, player)?);
        }

        state.round = round;
        Ok(records)
    }

    /// Ask one player for an action and apply or reject it.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::StrategyFailed`] if a direct-mode strategy fails.
    pub fn play_turn(
        &mut self,
        state: &mut GameState,
        player: PlayerId,
    ) -> Result<TurnRecord, MatchError> {
        let name = state.name_of(player).to_string();
        let Some(channel) = self.seats.get_mut(usize::from(player)) else {
            return Ok(TurnRecord {
                player,
                action: None,
                outcome: TurnOutcome::rejected(format!("no strategy seated for {name}")),
            });
        };

        let input = TurnInput {
            map_size: state.world.size(),
            resources: state.player(player).map_or(0, |p| p.resources),
            view: state.view_for(player),
        };

        let reply = channel
            .request_action(input, self.deadline)
            .map_err(|e| MatchError::StrategyFailed {
                player: name.clone(),
                reason: e.to_string(),
            })?;

        let (action, outcome) = match reply {
            ChannelReply::Action(action) => {
                debug!(player = %name, %action, "action requested");
                (Some(action), state.apply(player, action))
            }
            ChannelReply::Failed(error) => (None, TurnOutcome::rejected(error)),
            ChannelReply::Timeout(waited) => (
                None,
                TurnOutcome::rejected(format!(
                    "timeout, did not return an action in {} seconds",
                    waited.as_secs_f64()
                )),
            ),
        };

        if outcome.success {
            debug!(player = %name, reason = %outcome.reason, "turn applied");
        } else {
            debug!(player = %name, reason = %outcome.reason, "turn rejected");
        }

        Ok(TurnRecord {
            player,
            action,
            outcome,
        })
    }

    /// Stop every isolated strategy.
    pub fn shutdown(&mut self) {
        for seat in &mut self.seats {
            seat.shutdown();
        }
    }
}
