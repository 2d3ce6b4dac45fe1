//! Request/response slot shared by the arbiter and one isolated strategy.
//!
//! Exactly two parties touch a mailbox: the arbiter posts requests and
//! polls for answers, the worker thread waits for requests and delivers
//! answers. Every request carries a turn tag; an answer whose tag does not
//! match the outstanding request is stale and dropped.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use crate::game::ActionRequest;
use crate::strategy::TurnInput;

/// Observable handshake state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Nothing outstanding.
    Idle,
    /// A request was posted and has not been answered.
    AwaitingAction,
    /// The worker produced an action.
    ActionReady,
    /// The worker caught a failure.
    ActionFailed,
}

#[derive(Debug)]
enum SlotState {
    Idle,
    AwaitingAction {
        turn: u64,
        // Taken by the worker once it starts computing.
        input: Option<TurnInput>,
    },
    ActionReady {
        turn: u64,
        action: ActionRequest,
    },
    ActionFailed {
        turn: u64,
        error: String,
    },
}

#[derive(Debug)]
struct Slot {
    state: SlotState,
    closed: bool,
}

/// What the arbiter finds when it polls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Poll {
    /// No answer for this turn yet.
    Pending,
    /// The answer for this turn.
    Answered(Result<ActionRequest, String>),
}

#[derive(Debug)]
pub(crate) struct Mailbox {
    slot: Mutex<Slot>,
    wake: Condvar,
}

impl Mailbox {
    pub(crate) fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                state: SlotState::Idle,
                closed: false,
            }),
            wake: Condvar::new(),
        }
    }

    // A worker panic is caught outside the lock, so poisoning only means a
    // bug elsewhere; the slot itself is always in a valid state.
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current handshake state.
    pub(crate) fn status(&self) -> Status {
        match self.lock().state {
            SlotState::Idle => Status::Idle,
            SlotState::AwaitingAction { .. } => Status::AwaitingAction,
            SlotState::ActionReady { .. } => Status::ActionReady,
            SlotState::ActionFailed { .. } => Status::ActionFailed,
        }
    }

    /// Arbiter side: post the inputs for `turn`.
    ///
    /// Anything still in the slot belongs to an abandoned turn and is
    /// overwritten.
    pub(crate) fn post(&self, turn: u64, input: TurnInput) {
        let mut slot = self.lock();
        slot.state = SlotState::AwaitingAction {
            turn,
            input: Some(input),
        };
        self.wake.notify_all();
    }

    /// Arbiter side: non-blocking check for the answer to `turn`.
    pub(crate) fn poll(&self, turn: u64) -> Poll {
        let mut slot = self.lock();
        let answered_turn = match &slot.state {
            SlotState::ActionReady { turn, .. } | SlotState::ActionFailed { turn, .. } => *turn,
            SlotState::Idle | SlotState::AwaitingAction { .. } => return Poll::Pending,
        };

        if answered_turn != turn {
            tracing::debug!(stale = answered_turn, current = turn, "discarding stale answer");
            slot.state = SlotState::Idle;
            return Poll::Pending;
        }

        match std::mem::replace(&mut slot.state, SlotState::Idle) {
            SlotState::ActionReady { action, .. } => Poll::Answered(Ok(action)),
            SlotState::ActionFailed { error, .. } => Poll::Answered(Err(error)),
            SlotState::Idle | SlotState::AwaitingAction { .. } => Poll::Pending,
        }
    }

    /// Worker side: block until a request is posted or the mailbox closes.
    ///
    /// Returns `None` once closed.
    pub(crate) fn wait_for_request(&self) -> Option<(u64, TurnInput)> {
        let mut slot = self.lock();
        loop {
            if slot.closed {
                return None;
            }
            if let SlotState::AwaitingAction { turn, input } = &mut slot.state
                && let Some(input) = input.take()
            {
                return Some((*turn, input));
            }
            slot = self.wake.wait(slot).unwrap_or_else(PoisonError::into_inner);
        }
    }

    /// Worker side: deliver the answer for `turn`.
    ///
    /// Returns `false` if the arbiter has moved on and the answer was dropped.
    pub(crate) fn deliver(&self, turn: u64, answer: Result<ActionRequest, String>) -> bool {
        let mut slot = self.lock();
        let current = matches!(
            slot.state,
            SlotState::AwaitingAction { turn: posted, input: None } if posted == turn
        );
        if !current {
            return false;
        }

        slot.state = match answer {
            Ok(action) => SlotState::ActionReady { turn, action },
            Err(error) => SlotState::ActionFailed { turn, error },
        };
        true
    }

    /// Tell the worker to exit after its current computation.
    pub(crate) fn close(&self) {
        let mut slot = self.lock();
        slot.closed = true;
        self.wake.notify_all();
    }
}
