//! Actions a strategy may request, and the outcome of applying one.

use std::fmt;

use thiserror::Error;

use crate::game::{Position, StructureKind};

/// A structure a player may build.
///
/// Land is not buildable, so it has no variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Buildable {
    /// A farm.
    Farm,
    /// A fort.
    Fort,
    /// A castle.
    Castle,
}

impl Buildable {
    /// The structure placed on the tile.
    #[must_use]
    pub const fn structure(self) -> StructureKind {
        match self {
            Self::Farm => StructureKind::Farm,
            Self::Fort => StructureKind::Fort,
            Self::Castle => StructureKind::Castle,
        }
    }
}

impl From<Buildable> for StructureKind {
    fn from(kind: Buildable) -> Self {
        kind.structure()
    }
}

/// One intended action for a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionRequest {
    /// Collect production from every owned tile.
    Harvest,
    /// Build a structure on an owned tile.
    Build(Buildable, Position),
    /// Seize a tile adjacent to the empire.
    Conquer(Position),
}

impl ActionRequest {
    /// The action kind as spelled on the wire.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Harvest => "harvest",
            Self::Conquer(_) => "conquer",
            Self::Build(Buildable::Farm, _) => "farm",
            Self::Build(Buildable::Fort, _) => "fort",
            Self::Build(Buildable::Castle, _) => "castle",
        }
    }

    /// Target position, if the action has one.
    #[must_use]
    pub const fn position(&self) -> Option<Position> {
        match self {
            Self::Harvest => None,
            Self::Build(_, pos) | Self::Conquer(pos) => Some(*pos),
        }
    }

    /// Validate a loosely-typed `(kind, position)` pair.
    ///
    /// # Errors
    ///
    /// Returns [`ActionParseError::UnknownKind`] for a kind outside
    /// `harvest|conquer|farm|fort|castle`, and [`ActionParseError::Malformed`]
    /// when a position is missing or cannot be a grid position.
    pub fn parse(kind: &str, position: Option<[i64; 2]>) -> Result<Self, ActionParseError> {
        let target = || -> Result<Position, ActionParseError> {
            let [x, y] = position
                .ok_or_else(|| ActionParseError::Malformed(format!("{kind} requires a position")))?;
            match (u16::try_from(x), u16::try_from(y)) {
                (Ok(x), Ok(y)) => Ok(Position::new(x, y)),
                _ => Err(ActionParseError::Malformed(format!(
                    "position [{x}, {y}] is not a grid position"
                ))),
            }
        };

        match kind {
            "harvest" => Ok(Self::Harvest),
            "conquer" => Ok(Self::Conquer(target()?)),
            "farm" => Ok(Self::Build(Buildable::Farm, target()?)),
            "fort" => Ok(Self::Build(Buildable::Fort, target()?)),
            "castle" => Ok(Self::Build(Buildable::Castle, target()?)),
            other => Err(ActionParseError::UnknownKind(other.to_string())),
        }
    }
}

impl fmt::Display for ActionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.position() {
            Some(pos) => write!(f, "{} {pos}", self.kind_name()),
            None => f.write_str(self.kind_name()),
        }
    }
}

/// Why a raw action could not become an [`ActionRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionParseError {
    /// The action kind is not one of the known kinds.
    #[error("unknown action type {0}")]
    UnknownKind(String),
    /// The action does not follow the `(kind, position)` shape.
    #[error("malformed action: {0}")]
    Malformed(String),
}

/// Result of one player's turn.
///
/// A failed outcome never changed any state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Whether the action was applied.
    pub success: bool,
    /// Human-readable explanation.
    pub reason: String,
}

impl TurnOutcome {
    /// A successful outcome.
    #[must_use]
    pub fn applied(reason: impl Into<String>) -> Self {
        Self {
            success: true,
            reason: reason.into(),
        }
    }

    /// A rejected outcome.
    #[must_use]
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            success: false,
            reason: reason.into(),
        }
    }
}
