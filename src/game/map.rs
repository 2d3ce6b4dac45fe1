//! Grid, tile and position types.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::WorldError;
use crate::game::{PlayerId, PlayerView, ViewOwner, ViewTile};

/// A position on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// X coordinate (column).
    pub x: u16,
    /// Y coordinate (row).
    pub y: u16,
}

impl Position {
    /// Create a new position.
    #[must_use]
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }

    /// Get orthogonal neighbors (left, right, up, down), clipped to the grid.
    ///
    /// Returns a fixed-size array and count to avoid heap allocation.
    /// The array contains valid positions in indices 0..count.
    #[must_use]
    #[inline]
    pub fn adjacent(&self, width: u16, height: u16) -> ([Position; 4], u8) {
        let mut result = [Position::new(0, 0); 4];
        let mut count = 0u8;

        if self.x > 0 {
            result[count as usize] = Position::new(self.x - 1, self.y); // left
            count += 1;
        }
        if self.x + 1 < width {
            result[count as usize] = Position::new(self.x + 1, self.y); // right
            count += 1;
        }
        if self.y > 0 {
            result[count as usize] = Position::new(self.x, self.y - 1); // up
            count += 1;
        }
        if self.y + 1 < height {
            result[count as usize] = Position::new(self.x, self.y + 1); // down
            count += 1;
        }

        (result, count)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// What stands on a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructureKind {
    /// Empty land, the default state.
    #[default]
    Land,
    /// Produces resources on harvest.
    Farm,
    /// Defends orthogonal neighbors.
    Fort,
    /// Keeps its owner alive, produces and defends.
    Castle,
}

impl StructureKind {
    /// All kinds, in declaration order.
    pub const ALL: [StructureKind; 4] = [Self::Land, Self::Farm, Self::Fort, Self::Castle];

    /// Whether this structure defends same-owner orthogonal neighbors.
    #[must_use]
    pub const fn is_defender(self) -> bool {
        matches!(self, Self::Fort | Self::Castle)
    }

    /// Lowercase name, as used in reasons and on the wire.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Land => "land",
            Self::Farm => "farm",
            Self::Fort => "fort",
            Self::Castle => "castle",
        }
    }
}

impl fmt::Display for StructureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tile {
    /// What stands on the tile.
    pub structure: StructureKind,
    /// Owner of this tile (None = unowned).
    pub owner: Option<PlayerId>,
}

impl Tile {
    /// Create a tile.
    #[must_use]
    pub const fn new(structure: StructureKind, owner: Option<PlayerId>) -> Self {
        Self { structure, owner }
    }

    /// Unowned land.
    #[must_use]
    pub const fn land() -> Self {
        Self::new(StructureKind::Land, None)
    }

    /// A tile owned by `player`.
    #[must_use]
    pub const fn owned(structure: StructureKind, player: PlayerId) -> Self {
        Self::new(structure, Some(player))
    }
}

/// The authoritative world: a dense grid of tiles.
///
/// Every position on the grid maps to exactly one tile for the whole
/// lifetime of the world. There are no rules here, only storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct World {
    /// Width of the grid in tiles.
    width: u16,
    /// Height of the grid in tiles.
    height: u16,
    /// Tiles stored in row-major order.
    tiles: Vec<Tile>,
}

impl World {
    /// Create a world filled with unowned land.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::EmptyGrid`] if width or height is zero.
    pub fn new(width: u16, height: u16) -> Result<Self, WorldError> {
        if width == 0 || height == 0 {
            return Err(WorldError::EmptyGrid { width, height });
        }

        let size = usize::from(width) * usize::from(height);
        Ok(Self {
            width,
            height,
            tiles: vec![Tile::land(); size],
        })
    }

    /// Width of the grid.
    #[must_use]
    pub const fn width(&self) -> u16 {
        self.width
    }

    /// Height of the grid.
    #[must_use]
    pub const fn height(&self) -> u16 {
        self.height
    }

    /// `(width, height)`.
    #[must_use]
    pub const fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    /// Raw tiles in row-major order.
    #[must_use]
    #[inline]
    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    /// Check if a position is on the grid.
    #[must_use]
    pub const fn in_bounds(&self, pos: Position) -> bool {
        pos.x < self.width && pos.y < self.height
    }

    fn index(&self, pos: Position) -> Result<usize, WorldError> {
        if self.in_bounds(pos) {
            Ok(usize::from(pos.y) * usize::from(self.width) + usize::from(pos.x))
        } else {
            Err(WorldError::OutOfBounds {
                pos,
                width: self.width,
                height: self.height,
            })
        }
    }

    /// Get the tile at a position.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::OutOfBounds`] if the position is off the grid.
    pub fn get(&self, pos: Position) -> Result<Tile, WorldError> {
        self.index(pos).map(|idx| self.tiles[idx])
    }

    /// Replace the tile at a position.
    ///
    /// # Errors
    ///
    /// Returns [`WorldError::OutOfBounds`] if the position is off the grid.
    pub fn set(&mut self, pos: Position, tile: Tile) -> Result<(), WorldError> {
        let idx = self.index(pos)?;
        self.tiles[idx] = tile;
        Ok(())
    }

    /// Orthogonal neighbors of `pos` that lie on the grid.
    pub fn neighbors4(&self, pos: Position) -> impl Iterator<Item = Position> + use<> {
        let (adjacent, count) = pos.adjacent(self.width, self.height);
        adjacent.into_iter().take(usize::from(count))
    }

    /// Iterate over all positions and tiles.
    pub fn iter(&self) -> impl Iterator<Item = (Position, Tile)> + '_ {
        let width = usize::from(self.width);
        self.tiles.iter().enumerate().map(move |(idx, tile)| {
            #[allow(clippy::cast_possible_truncation)]
            let pos = Position::new((idx % width) as u16, (idx / width) as u16);
            (pos, *tile)
        })
    }

    /// All tiles owned by `player`.
    pub fn tiles_owned_by(&self, player: PlayerId) -> impl Iterator<Item = (Position, Tile)> + '_ {
        self.iter().filter(move |(_, tile)| tile.owner == Some(player))
    }

    /// Number of tiles owned by `player`.
    #[must_use]
    pub fn count_tiles(&self, player: PlayerId) -> usize {
        self.tiles.iter().filter(|t| t.owner == Some(player)).count()
    }

    /// Number of castles owned by `player`.
    #[must_use]
    pub fn count_castles(&self, player: PlayerId) -> usize {
        self.tiles
            .iter()
            .filter(|t| t.owner == Some(player) && t.structure == StructureKind::Castle)
            .count()
    }

    /// Build the private view handed to one player's strategy.
    ///
    /// Tiles owned by `viewer` show [`ViewOwner::Mine`]; every other owner is
    /// shown by name via `name_of`.
    pub fn build_view<'a, F>(&self, viewer: PlayerId, name_of: F) -> PlayerView
    where
        F: Fn(PlayerId) -> &'a str,
    {
        let tiles = self
            .tiles
            .iter()
            .map(|tile| ViewTile {
                structure: tile.structure,
                owner: tile.owner.map(|owner| {
                    if owner == viewer {
                        ViewOwner::Mine
                    } else {
                        ViewOwner::Player(name_of(owner).into())
                    }
                }),
            })
            .collect();

        PlayerView::from_tiles(self.width, self.height, tiles)
    }
}
