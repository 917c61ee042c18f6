// Spatial types for grid navigation.
//
// Two coordinate spaces meet here:
// - `Point`: continuous world position (pixels in the game), what entities
//   store and what paths are made of.
// - `Cell`: integer (column, row) on the tile grid, what the search runs
//   over.
//
// A point maps to the cell containing it by floor division with the cell
// size, so every point inside a tile shares one cell. A cell maps back to
// the point at its center.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A continuous world position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A tile grid coordinate. Column grows with x, row grows with y.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Cell {
    pub col: i32,
    pub row: i32,
}

impl Cell {
    pub const fn new(col: i32, row: i32) -> Self {
        Self { col, row }
    }

    /// The cell containing `point`, by floor division with `cell_size`.
    /// `None` for non-finite coordinates or a non-positive cell size.
    pub fn containing(point: Point, cell_size: f32) -> Option<Self> {
        if cell_size.is_nan()
            || cell_size <= 0.0
            || !point.x.is_finite()
            || !point.y.is_finite()
        {
            return None;
        }
        // `as` saturates, so huge coordinates land far out of bounds.
        Some(Self {
            col: (point.x / cell_size).floor() as i32,
            row: (point.y / cell_size).floor() as i32,
        })
    }

    /// Center of this cell in world coordinates.
    pub fn center(self, cell_size: f32) -> Point {
        Point {
            x: self.col as f32 * cell_size + cell_size / 2.0,
            y: self.row as f32 * cell_size + cell_size / 2.0,
        }
    }

    pub fn manhattan_distance(self, other: Self) -> u32 {
        self.col.abs_diff(other.col) + self.row.abs_diff(other.row)
    }

    /// The four edge-adjacent cells, in east, west, south, north order.
    pub fn neighbors(self) -> [Self; 4] {
        [
            Self::new(self.col + 1, self.row),
            Self::new(self.col - 1, self.row),
            Self::new(self.col, self.row + 1),
            Self::new(self.col, self.row - 1),
        ]
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.col, self.row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn containing_floors() {
        assert_eq!(Cell::containing(Point::new(0.0, 0.0), 32.0), Some(Cell::new(0, 0)));
        assert_eq!(Cell::containing(Point::new(31.9, 32.0), 32.0), Some(Cell::new(0, 1)));
        assert_eq!(Cell::containing(Point::new(-0.5, 70.0), 32.0), Some(Cell::new(-1, 2)));
    }

    #[test]
    fn containing_rejects_bad_input() {
        assert_eq!(Cell::containing(Point::new(f32::NAN, 0.0), 32.0), None);
        assert_eq!(Cell::containing(Point::new(0.0, f32::INFINITY), 32.0), None);
        assert_eq!(Cell::containing(Point::new(1.0, 1.0), 0.0), None);
    }

    #[test]
    fn center_is_mid_tile() {
        assert_eq!(Cell::new(0, 0).center(32.0), Point::new(16.0, 16.0));
        assert_eq!(Cell::new(9, 2).center(32.0), Point::new(304.0, 80.0));
    }

    #[test]
    fn center_maps_back_to_cell() {
        let cell = Cell::new(7, 3);
        assert_eq!(Cell::containing(cell.center(24.0), 24.0), Some(cell));
    }

    #[test]
    fn manhattan() {
        assert_eq!(Cell::new(0, 0).manhattan_distance(Cell::new(3, -4)), 7);
    }
}
