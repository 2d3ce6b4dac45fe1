//! Strategies and the isolation boundary that runs them.
//!
//! A [`Strategy`] decides one action per turn from a private
//! [`PlayerView`]. The [`StrategyChannel`] decides *where* it runs: inline
//! (debug) or on its own thread behind a deadline.

mod builtin;
mod channel;
mod mailbox;
mod remote;

pub use builtin::{Aggressive, Farmer, Harvester, RandomMoves};
pub use channel::{ChannelReply, DEFAULT_POLL_INTERVAL, StrategyChannel};
pub use mailbox::Status;
pub use remote::RemoteStrategy;

use thiserror::Error;

use crate::error::ConfigError;
use crate::game::{ActionParseError, ActionRequest, PlayerView};

/// Strategy kinds accepted by [`create`], besides `remote:<url>`.
pub const BUILTIN_STRATEGIES: [&str; 5] = ["harvester", "pacifist", "aggressive", "farmer", "random"];

/// Everything a strategy sees on its turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnInput {
    /// `(width, height)` of the grid.
    pub map_size: (u16, u16),
    /// The player's resource balance.
    pub resources: u64,
    /// Private copy of the world.
    pub view: PlayerView,
}

/// Failure of a strategy to produce an action.
#[derive(Debug, Error)]
pub enum StrategyError {
    /// The strategy answered with something that is not an action.
    #[error(transparent)]
    Malformed(#[from] ActionParseError),
    /// A remote strategy could not be reached or answered garbage.
    #[error("transport error: {0}")]
    Transport(String),
    /// The strategy panicked.
    #[error("strategy panicked: {0}")]
    Panicked(String),
    /// Any other failure reported by the strategy.
    #[error("{0}")]
    Failed(String),
}

/// A decision routine for one player.
///
/// Called at most once per round. Any state the strategy wants to keep
/// between turns lives in `self`.
pub trait Strategy: Send {
    /// Choose this turn's action.
    ///
    /// # Errors
    ///
    /// Returns a [`StrategyError`] if no action could be produced.
    fn turn(&mut self, input: &TurnInput) -> Result<ActionRequest, StrategyError>;
}

impl<S: Strategy + ?Sized> Strategy for Box<S> {
    fn turn(&mut self, input: &TurnInput) -> Result<ActionRequest, StrategyError> {
        (**self).turn(input)
    }
}

/// A strategy backed by a closure.
pub struct FnStrategy<F>(F);

impl<F> std::fmt::Debug for FnStrategy<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnStrategy").finish_non_exhaustive()
    }
}

impl<F> Strategy for FnStrategy<F>
where
    F: FnMut(&TurnInput) -> Result<ActionRequest, StrategyError> + Send,
{
    fn turn(&mut self, input: &TurnInput) -> Result<ActionRequest, StrategyError> {
        (self.0)(input)
    }
}

/// Wrap a closure as a strategy.
pub fn from_fn<F>(f: F) -> FnStrategy<F>
where
    F: FnMut(&TurnInput) -> Result<ActionRequest, StrategyError> + Send,
{
    FnStrategy(f)
}

/// Whether [`create`] accepts `kind`.
#[must_use]
pub fn is_known_kind(kind: &str) -> bool {
    if let Some(url) = kind.strip_prefix("remote:") {
        return !url.is_empty();
    }
    BUILTIN_STRATEGIES.contains(&kind.to_lowercase().as_str())
}

/// Instantiate a strategy by kind.
///
/// Kinds are the names in [`BUILTIN_STRATEGIES`] (case-insensitive) or
/// `remote:<url>` for a strategy served over HTTP.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownStrategy`] for an unknown kind and
/// [`ConfigError::StrategySpawn`] if a remote client cannot be built.
pub fn create(kind: &str) -> Result<Box<dyn Strategy>, ConfigError> {
    if let Some(url) = kind.strip_prefix("remote:") {
        let remote = RemoteStrategy::new(url).map_err(|e| ConfigError::StrategySpawn {
            name: kind.to_string(),
            reason: e.to_string(),
        })?;
        return Ok(Box::new(remote));
    }

    match kind.to_lowercase().as_str() {
        "harvester" | "pacifist" => Ok(Box::new(Harvester)),
        "aggressive" => Ok(Box::new(Aggressive::new())),
        "farmer" => Ok(Box::new(Farmer)),
        "random" => Ok(Box::new(RandomMoves::new())),
        _ => Err(ConfigError::UnknownStrategy(kind.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_builtin() {
        for kind in BUILTIN_STRATEGIES {
            assert!(create(kind).is_ok(), "{kind}");
        }
        assert!(create("Aggressive").is_ok());
    }

    #[test]
    fn test_create_unknown() {
        assert!(matches!(
            create("nope"),
            Err(ConfigError::UnknownStrategy(kind)) if kind == "nope"
        ));
    }

    #[test]
    fn test_known_kinds() {
        assert!(is_known_kind("FARMER"));
        assert!(is_known_kind("remote:http://localhost:1"));
        assert!(!is_known_kind("remote:"));
        assert!(!is_known_kind("nope"));
    }

    #[test]
    fn test_create_remote() {
        assert!(create("remote:http://127.0.0.1:8000").is_ok());
    }

    #[test]
    fn test_error_display() {
        let err = StrategyError::from(ActionParseError::UnknownKind("fly".to_string()));
        assert_eq!(err.to_string(), "unknown action type fly");
        assert_eq!(
            StrategyError::Panicked("oops".to_string()).to_string(),
            "strategy panicked: oops"
        );
    }
}
