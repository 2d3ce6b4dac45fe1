//! The per-turn, per-player copy of the world handed to strategies.

use std::sync::Arc;

use crate::game::{Position, StructureKind};

/// Owner sentinel used for the viewer's own tiles.
pub const MINE: &str = "mine";

/// Owner of a tile as seen by one player.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewOwner {
    /// The viewing player.
    Mine,
    /// Another player, by name.
    Player(Arc<str>),
}

impl ViewOwner {
    /// Name as it appears on the wire.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Mine => MINE,
            Self::Player(name) => name,
        }
    }
}

/// A tile as seen by one player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewTile {
    /// What stands on the tile.
    pub structure: StructureKind,
    /// Owner (None = unowned).
    pub owner: Option<ViewOwner>,
}

impl ViewTile {
    /// Whether the viewer owns this tile.
    #[must_use]
    pub fn is_mine(&self) -> bool {
        self.owner == Some(ViewOwner::Mine)
    }

    /// Whether another player owns this tile.
    #[must_use]
    pub fn is_enemy(&self) -> bool {
        matches!(self.owner, Some(ViewOwner::Player(_)))
    }
}

/// A fresh, private copy of the world for one turn.
///
/// Nothing a strategy does to its view reaches the authoritative world.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerView {
    width: u16,
    height: u16,
    tiles: Vec<ViewTile>,
}

impl PlayerView {
    /// Assemble a view from row-major tiles.
    ///
    /// `tiles.len()` must equal `width * height`.
    #[must_use]
    pub(crate) fn from_tiles(width: u16, height: u16, tiles: Vec<ViewTile>) -> Self {
        debug_assert_eq!(tiles.len(), usize::from(width) * usize::from(height));
        Self {
            width,
            height,
            tiles,
        }
    }

    /// `(width, height)`.
    #[must_use]
    pub const fn size(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    /// Tile at `pos`, or `None` off the grid.
    #[must_use]
    pub fn get(&self, pos: Position) -> Option<&ViewTile> {
        if pos.x < self.width && pos.y < self.height {
            self.tiles
                .get(usize::from(pos.y) * usize::from(self.width) + usize::from(pos.x))
        } else {
            None
        }
    }

    /// Iterate over all positions and tiles in row-major order.
    pub fn iter(&self) -> impl Iterator<Item = (Position, &ViewTile)> {
        let width = usize::from(self.width);
        self.tiles.iter().enumerate().map(move |(idx, tile)| {
            #[allow(clippy::cast_possible_truncation)]
            let pos = Position::new((idx % width) as u16, (idx / width) as u16);
            (pos, tile)
        })
    }

    /// Orthogonal neighbors of `pos` on the grid.
    pub fn neighbors4(&self, pos: Position) -> impl Iterator<Item = Position> + use<> {
        let (adjacent, count) = pos.adjacent(self.width, self.height);
        adjacent.into_iter().take(usize::from(count))
    }

    /// Positions owned by the viewer.
    pub fn mine(&self) -> impl Iterator<Item = Position> + '_ {
        self.iter().filter(|(_, t)| t.is_mine()).map(|(pos, _)| pos)
    }

    /// Positions not owned by the viewer that touch the viewer's empire.
    pub fn frontier(&self) -> impl Iterator<Item = (Position, &ViewTile)> {
        self.iter().filter(move |(pos, tile)| {
            !tile.is_mine()
                && self
                    .neighbors4(*pos)
                    .any(|n| self.get(n).is_some_and(ViewTile::is_mine))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PlayerView {
        let mut tiles = vec![
            ViewTile {
                structure: StructureKind::Land,
                owner: None,
            };
            4
        ];
        tiles[0] = ViewTile {
            structure: StructureKind::Castle,
            owner: Some(ViewOwner::Mine),
        };
        tiles[3] = ViewTile {
            structure: StructureKind::Fort,
            owner: Some(ViewOwner::Player("bob".into())),
        };
        PlayerView::from_tiles(2, 2, tiles)
    }

    #[test]
    fn test_view_get_bounds() {
        let view = sample();
        assert!(view.get(Position::new(1, 1)).is_some());
        assert!(view.get(Position::new(2, 0)).is_none());
    }

    #[test]
    fn test_frontier_excludes_diagonals() {
        let view = sample();
        let frontier: Vec<_> = view.frontier().map(|(pos, _)| pos).collect();
        assert_eq!(frontier, vec![Position::new(1, 0), Position::new(0, 1)]);
    }

    #[test]
    fn test_owner_names() {
        assert_eq!(ViewOwner::Mine.as_str(), "mine");
        assert_eq!(ViewOwner::Player("bob".into()).as_str(), "bob");
    }
}
