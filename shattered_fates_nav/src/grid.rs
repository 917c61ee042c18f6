// World grid abstraction and the tile grid that implements it.
//
// `WorldGrid` is everything the pathfinder needs from a world: a cell size,
// bounds, and a walkability test. The search only reads through it, so any
// world representation can be searched without copying it into a nav
// structure first.
//
// `TileGrid` is the game's concrete world: a dense row-major `Vec` of
// `TileKind`s, indexed `col + row * cols`. A tile is walkable unless its
// kind is in the grid's blocked set (`{water}` by default; the game's
// overworld also blocks dens). Out-of-bounds cells are never walkable.
//
// Grids come from the world generator (outside this crate) or from a JSON
// map file via `TileGrid::from_json`:
//
//   { "width": 320, "height": 320, "cell": 32,
//     "default_kind": "grass", "blocked_kinds": ["water"],
//     "tiles": [ { "col": 5, "row": 0, "kind": "water" } ] }
//
// See also: `pathfinding.rs` for the A* search over a `WorldGrid`,
// `follower.rs` for destination picking via `random_center_of_kind`.

use std::collections::BTreeSet;
use std::path::Path;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{Cell, Point};

/// Read-only view of a world, as consumed by the pathfinder.
pub trait WorldGrid {
    /// Side length of a cell, in world units.
    fn cell_size(&self) -> f32;

    fn cols(&self) -> u32;

    fn rows(&self) -> u32;

    /// Whether an entity may stand on `cell`. Must be `false` for any cell
    /// outside the grid.
    fn is_walkable(&self, cell: Cell) -> bool;

    fn in_bounds(&self, cell: Cell) -> bool {
        cell.col >= 0
            && cell.row >= 0
            && (cell.col as u32) < self.cols()
            && (cell.row as u32) < self.rows()
    }

    /// The cell containing a world position (which may be out of bounds).
    fn cell_at(&self, point: Point) -> Option<Cell> {
        Cell::containing(point, self.cell_size())
    }
}

/// Terrain kind of a single tile.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum TileKind {
    #[default]
    Grass,
    Tree,
    Water,
    Marsh,
    Clearing,
    Rock,
    Den,
}

/// Kinds blocked when nothing else is configured.
pub fn default_blocked_kinds() -> BTreeSet<TileKind> {
    BTreeSet::from([TileKind::Water])
}

#[derive(Debug, Error)]
pub enum MapError {
    #[error("failed to read map: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed map: {0}")]
    Json(#[from] serde_json::Error),
    #[error("map cell size must be positive")]
    ZeroCellSize,
    #[error("tile {0} lies outside the map")]
    TileOutOfBounds(Cell),
}

/// Dense 2D tile grid.
#[derive(Clone, Debug)]
pub struct TileGrid {
    /// Row-major: index = col + row * cols.
    tiles: Vec<TileKind>,
    cols: u32,
    rows: u32,
    cell: u32,
    blocked: BTreeSet<TileKind>,
}

impl TileGrid {
    /// A `cols` x `rows` grid filled with `fill`. Dimensions and cell size
    /// are clamped to at least 1.
    pub fn new(cols: u32, rows: u32, cell: u32, fill: TileKind) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        Self {
            tiles: vec![fill; cols as usize * rows as usize],
            cols,
            rows,
            cell: cell.max(1),
            blocked: default_blocked_kinds(),
        }
    }

    /// A grid covering a `width` x `height` pixel area, as many whole cells
    /// as fit (at least one each way).
    pub fn from_pixel_size(width: u32, height: u32, cell: u32, fill: TileKind) -> Self {
        let cell = cell.max(1);
        Self::new(width / cell, height / cell, cell, fill)
    }

    pub fn with_blocked_kinds(mut self, blocked: impl IntoIterator<Item = TileKind>) -> Self {
        self.set_blocked_kinds(blocked);
        self
    }

    pub fn set_blocked_kinds(&mut self, blocked: impl IntoIterator<Item = TileKind>) {
        self.blocked = blocked.into_iter().collect();
    }

    pub fn blocked_kinds(&self) -> &BTreeSet<TileKind> {
        &self.blocked
    }

    pub fn is_blocked_kind(&self, kind: TileKind) -> bool {
        self.blocked.contains(&kind)
    }

    fn index(&self, cell: Cell) -> Option<usize> {
        self.in_bounds(cell)
            .then(|| cell.col as usize + cell.row as usize * self.cols as usize)
    }

    /// Tile kind at `cell`, `None` out of bounds.
    pub fn get(&self, cell: Cell) -> Option<TileKind> {
        self.index(cell).map(|i| self.tiles[i])
    }

    /// Overwrite one tile. No-op out of bounds.
    pub fn set(&mut self, cell: Cell, kind: TileKind) {
        if let Some(i) = self.index(cell) {
            self.tiles[i] = kind;
        }
    }

    /// Tile kind under a world position.
    pub fn kind_at(&self, point: Point) -> Option<TileKind> {
        self.cell_at(point).and_then(|cell| self.get(cell))
    }

    /// Whether an entity may stand at a world position.
    pub fn is_walkable_at(&self, point: Point) -> bool {
        self.cell_at(point).is_some_and(|cell| self.is_walkable(cell))
    }

    /// Every cell, row by row.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        let cols = self.cols as i32;
        (0..self.rows as i32).flat_map(move |row| (0..cols).map(move |col| Cell::new(col, row)))
    }

    /// Centers of every tile of `kind`, row by row.
    pub fn centers_of_kind(&self, kind: TileKind) -> Vec<Point> {
        let size = self.cell_size();
        self.cells()
            .filter(|&cell| self.get(cell) == Some(kind))
            .map(|cell| cell.center(size))
            .collect()
    }

    /// Center of a uniformly chosen tile of `kind`, if there is one.
    pub fn random_center_of_kind<R: Rng + ?Sized>(
        &self,
        kind: TileKind,
        rng: &mut R,
    ) -> Option<Point> {
        self.centers_of_kind(kind).choose(rng).copied()
    }

    pub fn from_json(json: &str) -> Result<Self, MapError> {
        let map: MapFile = serde_json::from_str(json)?;
        if map.cell == 0 {
            return Err(MapError::ZeroCellSize);
        }
        let mut grid = Self::from_pixel_size(map.width, map.height, map.cell, map.default_kind)
            .with_blocked_kinds(map.blocked_kinds);
        for tile in map.tiles {
            let cell = Cell::new(tile.col, tile.row);
            if !grid.in_bounds(cell) {
                return Err(MapError::TileOutOfBounds(cell));
            }
            grid.set(cell, tile.kind);
        }
        Ok(grid)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, MapError> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }
}

impl WorldGrid for TileGrid {
    fn cell_size(&self) -> f32 {
        self.cell as f32
    }

    fn cols(&self) -> u32 {
        self.cols
    }

    fn rows(&self) -> u32 {
        self.rows
    }

    fn is_walkable(&self, cell: Cell) -> bool {
        self.get(cell).is_some_and(|kind| !self.is_blocked_kind(kind))
    }
}

/// On-disk map layout.
#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct MapFile {
    width: u32,
    height: u32,
    #[serde(default = "default_cell")]
    cell: u32,
    #[serde(default)]
    default_kind: TileKind,
    #[serde(default = "default_blocked_kinds")]
    blocked_kinds: BTreeSet<TileKind>,
    #[serde(default)]
    tiles: Vec<MapTile>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct MapTile {
    col: i32,
    row: i32,
    kind: TileKind,
}

fn default_cell() -> u32 {
    32
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn pixel_size_matches_game_world() {
        let grid = TileGrid::from_pixel_size(800, 600, 32, TileKind::Grass);
        assert_eq!((grid.cols(), grid.rows()), (25, 18));
        let tiny = TileGrid::from_pixel_size(10, 10, 32, TileKind::Grass);
        assert_eq!((tiny.cols(), tiny.rows()), (1, 1));
    }

    #[test]
    fn out_of_bounds_is_never_walkable() {
        let grid = TileGrid::new(4, 4, 32, TileKind::Grass);
        assert!(grid.is_walkable(Cell::new(3, 3)));
        assert!(!grid.is_walkable(Cell::new(4, 0)));
        assert!(!grid.is_walkable(Cell::new(0, -1)));
        assert!(!grid.is_walkable_at(Point::new(-1.0, 5.0)));
        assert_eq!(grid.get(Cell::new(-1, 0)), None);
    }

    #[test]
    fn water_blocked_by_default() {
        let mut grid = TileGrid::new(4, 4, 32, TileKind::Grass);
        grid.set(Cell::new(1, 1), TileKind::Water);
        grid.set(Cell::new(2, 2), TileKind::Den);
        assert!(!grid.is_walkable(Cell::new(1, 1)));
        assert!(grid.is_walkable(Cell::new(2, 2)));
        assert!(!grid.is_walkable_at(Point::new(40.0, 63.0)));
    }

    #[test]
    fn blocked_kinds_are_configurable() {
        let mut grid = TileGrid::new(4, 4, 32, TileKind::Grass)
            .with_blocked_kinds([TileKind::Water, TileKind::Den]);
        grid.set(Cell::new(2, 2), TileKind::Den);
        assert!(!grid.is_walkable(Cell::new(2, 2)));
        grid.set_blocked_kinds([]);
        assert!(grid.is_walkable(Cell::new(2, 2)));
    }

    #[test]
    fn set_out_of_bounds_is_noop() {
        let mut grid = TileGrid::new(2, 2, 32, TileKind::Grass);
        grid.set(Cell::new(5, 5), TileKind::Water);
        assert!(grid.cells().all(|c| grid.get(c) == Some(TileKind::Grass)));
    }

    #[test]
    fn kind_at_world_position() {
        let mut grid = TileGrid::new(4, 4, 32, TileKind::Grass);
        grid.set(Cell::new(3, 0), TileKind::Clearing);
        assert_eq!(grid.kind_at(Point::new(100.0, 31.0)), Some(TileKind::Clearing));
        assert_eq!(grid.kind_at(Point::new(200.0, 0.0)), None);
    }

    #[test]
    fn random_center_picks_matching_tile() {
        let mut grid = TileGrid::new(5, 5, 32, TileKind::Grass);
        grid.set(Cell::new(1, 4), TileKind::Clearing);
        grid.set(Cell::new(3, 2), TileKind::Clearing);
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..20 {
            let p = grid.random_center_of_kind(TileKind::Clearing, &mut rng).unwrap();
            assert_eq!(grid.kind_at(p), Some(TileKind::Clearing));
        }
        assert_eq!(grid.random_center_of_kind(TileKind::Rock, &mut rng), None);
    }

    #[test]
    fn centers_of_kind_in_row_order() {
        let mut grid = TileGrid::new(3, 3, 10, TileKind::Grass);
        grid.set(Cell::new(2, 0), TileKind::Tree);
        grid.set(Cell::new(0, 1), TileKind::Tree);
        assert_eq!(
            grid.centers_of_kind(TileKind::Tree),
            vec![Point::new(25.0, 5.0), Point::new(5.0, 15.0)]
        );
    }

    #[test]
    fn map_loads_from_json() {
        let json = r#"{
            "width": 320, "height": 96, "cell": 32,
            "default_kind": "clearing",
            "blocked_kinds": ["water", "den"],
            "tiles": [
                { "col": 5, "row": 0, "kind": "water" },
                { "col": 6, "row": 2, "kind": "den" }
            ]
        }"#;
        let grid = TileGrid::from_json(json).unwrap();
        assert_eq!((grid.cols(), grid.rows()), (10, 3));
        assert_eq!(grid.get(Cell::new(0, 0)), Some(TileKind::Clearing));
        assert!(!grid.is_walkable(Cell::new(5, 0)));
        assert!(!grid.is_walkable(Cell::new(6, 2)));
    }

    #[test]
    fn map_defaults() {
        let grid = TileGrid::from_json(r#"{ "width": 64, "height": 64 }"#).unwrap();
        assert_eq!(grid.cell_size(), 32.0);
        assert_eq!(grid.get(Cell::new(1, 1)), Some(TileKind::Grass));
        assert_eq!(grid.blocked_kinds(), &default_blocked_kinds());
    }

    #[test]
    fn map_rejects_bad_input() {
        assert!(matches!(
            TileGrid::from_json(r#"{ "width": 64, "height": 64, "cell": 0 }"#),
            Err(MapError::ZeroCellSize)
        ));
        assert!(matches!(
            TileGrid::from_json(
                r#"{ "width": 64, "height": 64, "tiles": [{ "col": 2, "row": 0, "kind": "rock" }] }"#
            ),
            Err(MapError::TileOutOfBounds(_))
        ));
        assert!(matches!(
            TileGrid::from_json(r#"{ "width": 64, "height": 64, "default_kind": "lava" }"#),
            Err(MapError::Json(_))
        ));
    }
}
