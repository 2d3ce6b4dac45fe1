//! Running a strategy in direct or isolated mode.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use super::mailbox::{Mailbox, Poll, Status};
use super::{Strategy, StrategyError, TurnInput};
use crate::game::ActionRequest;

/// Default interval between polls of an isolated strategy's mailbox.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// How long [`StrategyChannel::shutdown`] waits for a worker to exit.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(50);

/// What a channel reports for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelReply {
    /// The strategy chose an action.
    Action(ActionRequest),
    /// The strategy failed; the turn is rejected with this text.
    Failed(String),
    /// No answer before the deadline.
    Timeout(Duration),
}

struct Worker {
    mailbox: Arc<Mailbox>,
    handle: Option<JoinHandle<()>>,
    poll_interval: Duration,
}

enum Mode {
    Direct(Box<dyn Strategy>),
    Isolated(Worker),
}

/// The isolation boundary around one player's strategy.
///
/// In direct mode the strategy runs on the caller's thread with no
/// deadline, and its failures stop the match. In isolated mode it runs on
/// a dedicated thread; the caller never waits longer than the deadline and
/// a crashing strategy only forfeits its turn.
pub struct StrategyChannel {
    mode: Mode,
    /// Tag of the most recent request.
    turn: u64,
}

impl std::fmt::Debug for StrategyChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mode = match self.mode {
            Mode::Direct(_) => "direct",
            Mode::Isolated(_) => "isolated",
        };
        f.debug_struct("StrategyChannel")
            .field("mode", &mode)
            .field("turn", &self.turn)
            .finish_non_exhaustive()
    }
}

impl StrategyChannel {
    /// Run `strategy` inline on the caller's thread.
    #[must_use]
    pub fn direct(strategy: Box<dyn Strategy>) -> Self {
        Self {
            mode: Mode::Direct(strategy),
            turn: 0,
        }
    }

    /// Move `strategy` onto its own thread.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if the thread cannot be spawned.
    pub fn isolated(
        name: &str,
        strategy: Box<dyn Strategy>,
        poll_interval: Duration,
    ) -> std::io::Result<Self> {
        let mailbox = Arc::new(Mailbox::new());
        let worker_mailbox = Arc::clone(&mailbox);
        let label: String = name.chars().filter(|c| !c.is_control()).collect();
        let handle = thread::Builder::new()
            .name(format!("toe-strategy-{label}"))
            .spawn(move || worker_loop(strategy, &worker_mailbox))?;

        Ok(Self {
            mode: Mode::Isolated(Worker {
                mailbox,
                handle: Some(handle),
                poll_interval: poll_interval.max(Duration::from_micros(100)),
            }),
            turn: 0,
        })
    }

    /// Whether this channel runs its strategy on another thread.
    #[must_use]
    pub fn is_isolated(&self) -> bool {
        matches!(self.mode, Mode::Isolated(_))
    }

    /// Handshake state of an isolated channel (`None` in direct mode).
    #[must_use]
    pub fn status(&self) -> Option<Status> {
        match &self.mode {
            Mode::Direct(_) => None,
            Mode::Isolated(worker) => Some(worker.mailbox.status()),
        }
    }

    /// Ask the strategy for one action.
    ///
    /// Isolated mode returns within roughly `deadline`, whatever the
    /// strategy does. Direct mode ignores the deadline and lets panics
    /// propagate.
    ///
    /// # Errors
    ///
    /// Direct mode only: any strategy error other than a malformed action.
    pub fn request_action(
        &mut self,
        input: TurnInput,
        deadline: Duration,
    ) -> Result<ChannelReply, StrategyError> {
        self.turn += 1;
        let turn = self.turn;

        match &mut self.mode {
            Mode::Direct(strategy) => match strategy.turn(&input) {
                Ok(action) => Ok(ChannelReply::Action(action)),
                Err(StrategyError::Malformed(e)) => Ok(ChannelReply::Failed(e.to_string())),
                Err(e) => Err(e),
            },
            Mode::Isolated(worker) => Ok(worker.request(turn, input, deadline)),
        }
    }

    /// Best-effort stop of the isolated worker.
    ///
    /// A worker stuck inside its strategy cannot be interrupted; it is
    /// detached and exits whenever the strategy returns.
    pub fn shutdown(&mut self) {
        let Mode::Isolated(worker) = &mut self.mode else {
            return;
        };
        worker.mailbox.close();

        let Some(handle) = worker.handle.take() else {
            return;
        };
        let started = Instant::now();
        while !handle.is_finished() && started.elapsed() < SHUTDOWN_GRACE {
            thread::sleep(worker.poll_interval);
        }
        if handle.is_finished() {
            if handle.join().is_err() {
                warn!("strategy worker exited with a panic");
            }
        } else {
            warn!("strategy worker still busy, detaching it");
        }
    }
}

impl Drop for StrategyChannel {
    fn drop(&mut self) {
        if let Mode::Isolated(worker) = &self.mode {
            worker.mailbox.close();
        }
    }
}

impl Worker {
    fn request(&self, turn: u64, input: TurnInput, deadline: Duration) -> ChannelReply {
        self.mailbox.post(turn, input);

        let started = Instant::now();
        loop {
            if let Poll::Answered(answer) = self.mailbox.poll(turn) {
                return match answer {
                    Ok(action) => ChannelReply::Action(action),
                    Err(error) => ChannelReply::Failed(error),
                };
            }

            let elapsed = started.elapsed();
            if elapsed >= deadline {
                debug!(turn, "no answer before the deadline, abandoning request");
                return ChannelReply::Timeout(deadline);
            }
            thread::sleep(self.poll_interval.min(deadline - elapsed));
        }
    }
}

fn worker_loop(mut strategy: Box<dyn Strategy>, mailbox: &Mailbox) {
    while let Some((turn, input)) = mailbox.wait_for_request() {
        let answer = match panic::catch_unwind(AssertUnwindSafe(|| strategy.turn(&input))) {
            Ok(Ok(action)) => Ok(action),
            Ok(Err(e)) => Err(e.to_string()),
            Err(payload) => Err(StrategyError::Panicked(panic_message(payload.as_ref())).to_string()),
        };

        if !mailbox.deliver(turn, answer) {
            debug!(turn, "late answer discarded");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{ActionParseError, Position, World};
    use crate::strategy::{Harvester, from_fn};

    fn input() -> TurnInput {
        let world = World::new(3, 3).unwrap();
        TurnInput {
            map_size: world.size(),
            resources: 3,
            view: world.build_view(0, |_| "x"),
        }
    }

    const DEADLINE: Duration = Duration::from_secs(5);

    #[test]
    fn test_direct_mode_answers() {
        let mut channel = StrategyChannel::direct(Box::new(Harvester));
        assert!(!channel.is_isolated());
        assert_eq!(channel.status(), None);
        assert_eq!(
            channel.request_action(input(), DEADLINE).unwrap(),
            ChannelReply::Action(ActionRequest::Harvest)
        );
    }

    #[test]
    fn test_direct_mode_failure_is_fatal() {
        let mut channel = StrategyChannel::direct(Box::new(from_fn(|_| {
            Err(StrategyError::Failed("bad".to_string()))
        })));
        assert!(channel.request_action(input(), DEADLINE).is_err());
    }

    #[test]
    fn test_direct_mode_malformed_is_a_rejection() {
        let mut channel = StrategyChannel::direct(Box::new(from_fn(|_| {
            Err(ActionParseError::UnknownKind("dig".to_string()).into())
        })));
        assert_eq!(
            channel.request_action(input(), DEADLINE).unwrap(),
            ChannelReply::Failed("unknown action type dig".to_string())
        );
    }

    #[test]
    fn test_isolated_mode_answers() {
        let strategy = from_fn(|input: &TurnInput| {
            assert_eq!(input.resources, 3);
            Ok(ActionRequest::Conquer(Position::new(1, 1)))
        });
        let mut channel =
            StrategyChannel::isolated("t", Box::new(strategy), DEFAULT_POLL_INTERVAL).unwrap();
        assert!(channel.is_isolated());

        for _ in 0..3 {
            assert_eq!(
                channel.request_action(input(), DEADLINE).unwrap(),
                ChannelReply::Action(ActionRequest::Conquer(Position::new(1, 1)))
            );
        }
        assert_eq!(channel.status(), Some(Status::Idle));
        channel.shutdown();
    }

    #[test]
    fn test_isolated_panic_becomes_failure() {
        let mut calls = 0;
        let strategy = from_fn(move |_: &TurnInput| {
            calls += 1;
            if calls == 1 {
                panic!("kaboom");
            }
            Ok(ActionRequest::Harvest)
        });
        let mut channel =
            StrategyChannel::isolated("p", Box::new(strategy), DEFAULT_POLL_INTERVAL).unwrap();

        match channel.request_action(input(), DEADLINE).unwrap() {
            ChannelReply::Failed(text) => assert!(text.contains("kaboom"), "{text}"),
            other => panic!("expected failure, got {other:?}"),
        }
        // The worker survives its strategy's panic.
        assert_eq!(
            channel.request_action(input(), DEADLINE).unwrap(),
            ChannelReply::Action(ActionRequest::Harvest)
        );
        channel.shutdown();
    }

    #[test]
    fn test_isolated_timeout_then_fresh_answer() {
        let mut calls = 0;
        let strategy = from_fn(move |_: &TurnInput| {
            calls += 1;
            if calls == 1 {
                thread::sleep(Duration::from_millis(300));
                return Ok(ActionRequest::Conquer(Position::new(0, 1)));
            }
            Ok(ActionRequest::Harvest)
        });
        let mut channel =
            StrategyChannel::isolated("slow", Box::new(strategy), DEFAULT_POLL_INTERVAL).unwrap();

        let started = Instant::now();
        let reply = channel.request_action(input(), Duration::from_millis(50)).unwrap();
        assert_eq!(reply, ChannelReply::Timeout(Duration::from_millis(50)));
        assert!(started.elapsed() < Duration::from_millis(250));

        // The stale conquer answer must never surface.
        assert_eq!(
            channel.request_action(input(), DEADLINE).unwrap(),
            ChannelReply::Action(ActionRequest::Harvest)
        );
        channel.shutdown();
    }

    #[test]
    fn test_shutdown_detaches_hung_worker() {
        let strategy = from_fn(|_: &TurnInput| {
            thread::sleep(Duration::from_secs(2));
            Ok(ActionRequest::Harvest)
        });
        let mut channel =
            StrategyChannel::isolated("hung", Box::new(strategy), DEFAULT_POLL_INTERVAL).unwrap();
        let reply = channel.request_action(input(), Duration::from_millis(10)).unwrap();
        assert!(matches!(reply, ChannelReply::Timeout(_)));

        let started = Instant::now();
        channel.shutdown();
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_isolated_name_with_nul_spawns() {
        let mut channel =
            StrategyChannel::isolated("a\0b", Box::new(Harvester), DEFAULT_POLL_INTERVAL).unwrap();
        assert_eq!(
            channel.request_action(input(), DEADLINE).unwrap(),
            ChannelReply::Action(ActionRequest::Harvest)
        );
        channel.shutdown();
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(3_u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
