//! JSON wire format for strategies running on another machine.
//!
//! ```text
//! POST /turn
//! {"map_size": [w, h], "resources": n,
//!  "world": {"x,y": ["castle", "mine"], "x,y": ["land", null], ...}}
//!
//! 200 OK
//! {"action": ["conquer", [x, y]]}   or   {"action": ["harvest", null]}
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

use crate::game::{
    ActionParseError, ActionRequest, MINE, PlayerView, Position, StructureKind, ViewOwner,
    ViewTile,
};
use crate::strategy::TurnInput;

/// One tile on the wire: structure and owner (`null`, `"mine"` or a name).
pub type WireTile = (StructureKind, Option<String>);

/// The world on the wire, keyed by `"x,y"`.
pub type WireWorld = BTreeMap<String, WireTile>;

/// Body of `POST /turn`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRequestBody {
    /// `[width, height]`.
    pub map_size: [u16; 2],
    /// Every tile of the grid.
    pub world: WireWorld,
    /// The player's resource balance.
    pub resources: u64,
}

/// Response of `POST /turn`.
///
/// `action` is kept loosely typed so a bad shape is reported as a
/// malformed action rather than a transport failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnResponseBody {
    /// `[kind, [x, y] | null]`.
    pub action: Value,
}

/// A world on the wire that does not describe a full grid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// A key is not of the form `"x,y"`.
    #[error("invalid position key {0:?}")]
    BadKey(String),
    /// A key lies outside `map_size`.
    #[error("position {0} is outside the map")]
    OffMap(Position),
    /// A position of the grid has no tile.
    #[error("missing tile at {0}")]
    MissingTile(Position),
    /// The tile count does not match `map_size`.
    #[error("map of {width}x{height} needs {expected} tiles, got {got}")]
    TileCount {
        /// Declared width.
        width: u16,
        /// Declared height.
        height: u16,
        /// `width * height`.
        expected: usize,
        /// Tiles sent.
        got: usize,
    },
}

/// Format a position as a wire key.
#[must_use]
pub fn position_key(pos: Position) -> String {
    format!("{},{}", pos.x, pos.y)
}

/// Parse a `"x,y"` wire key.
///
/// # Errors
///
/// Returns [`WireError::BadKey`] if the key is not two comma-separated integers.
pub fn parse_position_key(key: &str) -> Result<Position, WireError> {
    let bad = || WireError::BadKey(key.to_string());
    let (x, y) = key.split_once(',').ok_or_else(bad)?;
    let x = x.trim().parse().map_err(|_| bad())?;
    let y = y.trim().parse().map_err(|_| bad())?;
    Ok(Position::new(x, y))
}

/// Serialize a view.
#[must_use]
pub fn view_to_wire(view: &PlayerView) -> WireWorld {
    view.iter()
        .map(|(pos, tile)| {
            let owner = tile.owner.as_ref().map(|o| o.as_str().to_string());
            (position_key(pos), (tile.structure, owner))
        })
        .collect()
}

/// Rebuild a view from the wire.
///
/// # Errors
///
/// Returns a [`WireError`] unless `world` holds exactly one tile for every
/// position of a `map_size` grid.
pub fn view_from_wire(map_size: [u16; 2], world: &WireWorld) -> Result<PlayerView, WireError> {
    let [width, height] = map_size;
    let expected = usize::from(width) * usize::from(height);
    if world.len() != expected {
        return Err(WireError::TileCount {
            width,
            height,
            expected,
            got: world.len(),
        });
    }
    let mut tiles = vec![None; expected];

    for (key, (structure, owner)) in world {
        let pos = parse_position_key(key)?;
        if pos.x >= width || pos.y >= height {
            return Err(WireError::OffMap(pos));
        }
        let owner = owner.as_deref().map(|name| {
            if name == MINE {
                ViewOwner::Mine
            } else {
                ViewOwner::Player(name.into())
            }
        });
        tiles[usize::from(pos.y) * usize::from(width) + usize::from(pos.x)] = Some(ViewTile {
            structure: *structure,
            owner,
        });
    }

    let tiles = tiles
        .into_iter()
        .enumerate()
        .map(|(idx, tile)| {
            tile.ok_or_else(|| {
                #[allow(clippy::cast_possible_truncation)]
                let pos = Position::new(
                    (idx % usize::from(width)) as u16,
                    (idx / usize::from(width)) as u16,
                );
                WireError::MissingTile(pos)
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(PlayerView::from_tiles(width, height, tiles))
}

/// Serialize an action as `[kind, [x, y] | null]`.
#[must_use]
pub fn action_to_wire(action: &ActionRequest) -> Value {
    let position = action.position().map(|pos| json!([pos.x, pos.y]));
    json!([action.kind_name(), position])
}

/// Validate a `[kind, [x, y] | null]` value.
///
/// # Errors
///
/// Returns [`ActionParseError::Malformed`] if the value does not have that
/// shape and [`ActionParseError::UnknownKind`] for an unknown kind.
pub fn action_from_wire(raw: &Value) -> Result<ActionRequest, ActionParseError> {
    let malformed =
        || ActionParseError::Malformed(format!("{raw} does not follow the action format, (action_type, position)"));

    let [kind, position] = raw.as_array().map(Vec::as_slice).ok_or_else(malformed)? else {
        return Err(malformed());
    };
    let kind = kind.as_str().ok_or_else(malformed)?;

    let position = match position {
        Value::Null => None,
        Value::Array(xy) => match xy.as_slice() {
            [x, y] => Some([
                x.as_i64().ok_or_else(malformed)?,
                y.as_i64().ok_or_else(malformed)?,
            ]),
            _ => return Err(malformed()),
        },
        _ => return Err(malformed()),
    };

    ActionRequest::parse(kind, position)
}

impl TurnRequestBody {
    /// Build the request body for a turn.
    #[must_use]
    pub fn from_input(input: &TurnInput) -> Self {
        Self {
            map_size: [input.map_size.0, input.map_size.1],
            world: view_to_wire(&input.view),
            resources: input.resources,
        }
    }

    /// Turn a received body back into strategy input.
    ///
    /// # Errors
    ///
    /// Returns a [`WireError`] if the world is not a full grid.
    pub fn into_input(self) -> Result<TurnInput, WireError> {
        let view = view_from_wire(self.map_size, &self.world)?;
        Ok(TurnInput {
            map_size: (self.map_size[0], self.map_size[1]),
            resources: self.resources,
            view,
        })
    }
}

impl TurnResponseBody {
    /// Wrap an action.
    #[must_use]
    pub fn new(action: &ActionRequest) -> Self {
        Self {
            action: action_to_wire(action),
        }
    }
}
