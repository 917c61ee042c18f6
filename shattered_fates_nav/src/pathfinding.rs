// A* pathfinding over a tile grid.
//
// Searches the 4-connected cell graph of any `WorldGrid` with uniform step
// cost 1 and a Manhattan-distance heuristic, which is admissible and
// consistent here, so the first time the goal is popped its path is
// optimal. The open set is a `BinaryHeap` turned into a min-heap by
// reversed ordering on `(f_score, sequence)`, the same pattern as
// `EventQueue` keys; `sequence` increments per push, so ties break by
// discovery order. Scores, predecessors and the closed set live in `Vec`s
// indexed by `col + row * cols` (no `HashMap`).
//
// `find_path` is the world-space entry point: positions in, cell-center
// waypoints out, inclusive of both endpoints. "No path" is an empty `Vec`,
// whether the goal is unreachable or an endpoint is blocked or off the
// grid. Callers treat both the same way and do not retry.
//
// See also: `grid.rs` for `WorldGrid` and `TileGrid`, `follower.rs` which
// calls `find_path` on its repath interval.
//
// The search only borrows the grid immutably and owns all of its scratch
// state, so independent searches can run on many threads at once.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::grid::WorldGrid;
use crate::types::{Cell, Point};

/// Entry in the A* open set (min-heap via reversed ordering).
struct OpenEntry {
    f_score: u32,
    sequence: u64,
    cell: Cell,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.f_score == other.f_score && self.sequence == other.sequence
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: smallest (f_score, sequence) is "greatest".
        other
            .f_score
            .cmp(&self.f_score)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

/// Shortest walkable route between two world positions, as the centers of
/// every cell along it (start and goal included). Empty when either
/// endpoint is out of bounds or blocked, or when no route exists.
pub fn find_path<G: WorldGrid + ?Sized>(grid: &G, start: Point, goal: Point) -> Vec<Point> {
    let (Some(start_cell), Some(goal_cell)) = (grid.cell_at(start), grid.cell_at(goal)) else {
        return Vec::new();
    };
    let size = grid.cell_size();
    find_cell_path(grid, start_cell, goal_cell)
        .map(|cells| cells.into_iter().map(|cell| cell.center(size)).collect())
        .unwrap_or_default()
}

/// Shortest 4-connected cell path from `start` to `goal`, inclusive.
/// `None` if either endpoint is not walkable or the goal is unreachable.
pub fn find_cell_path<G: WorldGrid + ?Sized>(
    grid: &G,
    start: Cell,
    goal: Cell,
) -> Option<Vec<Cell>> {
    if !walkable(grid, start) || !walkable(grid, goal) {
        return None;
    }
    if start == goal {
        return Some(vec![start]);
    }

    let cols = grid.cols() as usize;
    let n = cols * grid.rows() as usize;
    let index = |cell: Cell| cell.col as usize + cell.row as usize * cols;

    // g_score[i] = steps on the cheapest known path from start.
    let mut g_score = vec![u32::MAX; n];
    let mut came_from: Vec<Option<Cell>> = vec![None; n];
    let mut closed = vec![false; n];
    let mut sequence = 0u64;

    g_score[index(start)] = 0;
    let mut open = BinaryHeap::new();
    open.push(OpenEntry {
        f_score: start.manhattan_distance(goal),
        sequence,
        cell: start,
    });

    while let Some(OpenEntry { cell: current, .. }) = open.pop() {
        if current == goal {
            return Some(reconstruct_path(&came_from, index, goal));
        }

        let ci = index(current);
        if closed[ci] {
            continue;
        }
        closed[ci] = true;

        let tentative_g = g_score[ci] + 1;
        for neighbor in current.neighbors() {
            if !walkable(grid, neighbor) {
                continue;
            }
            let ni = index(neighbor);
            if closed[ni] || tentative_g >= g_score[ni] {
                continue;
            }
            g_score[ni] = tentative_g;
            came_from[ni] = Some(current);
            sequence += 1;
            open.push(OpenEntry {
                f_score: tentative_g + neighbor.manhattan_distance(goal),
                sequence,
                cell: neighbor,
            });
        }
    }

    None
}

/// Bounds check first so `is_walkable` implementations never see a cell
/// that would index outside our scratch vectors.
fn walkable<G: WorldGrid + ?Sized>(grid: &G, cell: Cell) -> bool {
    grid.in_bounds(cell) && grid.is_walkable(cell)
}

fn reconstruct_path(
    came_from: &[Option<Cell>],
    index: impl Fn(Cell) -> usize,
    goal: Cell,
) -> Vec<Cell> {
    let mut cells = vec![goal];
    let mut current = goal;
    while let Some(prev) = came_from[index(current)] {
        cells.push(prev);
        current = prev;
    }
    cells.reverse();
    cells
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{TileGrid, TileKind};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use std::collections::VecDeque;

    fn open_grid(cols: u32, rows: u32) -> TileGrid {
        TileGrid::new(cols, rows, 32, TileKind::Grass)
    }

    /// 10x10 grid with water down column 5 on rows 0..=8; row 9 is the gap.
    fn walled_grid() -> TileGrid {
        let mut grid = open_grid(10, 10);
        for row in 0..9 {
            grid.set(Cell::new(5, row), TileKind::Water);
        }
        grid
    }

    fn center(col: i32, row: i32) -> Point {
        Cell::new(col, row).center(32.0)
    }

    fn assert_contiguous(grid: &TileGrid, cells: &[Cell]) {
        for pair in cells.windows(2) {
            assert_eq!(pair[0].manhattan_distance(pair[1]), 1, "jump {} -> {}", pair[0], pair[1]);
        }
        for &cell in cells {
            assert!(grid.is_walkable(cell), "path crosses blocked {cell}");
        }
    }

    /// Plain BFS step count, for checking optimality.
    fn bfs_steps(grid: &TileGrid, start: Cell, goal: Cell) -> Option<u32> {
        if !grid.is_walkable(start) || !grid.is_walkable(goal) {
            return None;
        }
        let cols = grid.cols() as usize;
        let mut dist = vec![None; cols * grid.rows() as usize];
        let index = |c: Cell| c.col as usize + c.row as usize * cols;
        dist[index(start)] = Some(0u32);
        let mut queue = VecDeque::from([start]);
        while let Some(cell) = queue.pop_front() {
            let d = dist[index(cell)]?;
            if cell == goal {
                return Some(d);
            }
            for next in cell.neighbors() {
                if grid.is_walkable(next) && dist[index(next)].is_none() {
                    dist[index(next)] = Some(d + 1);
                    queue.push_back(next);
                }
            }
        }
        None
    }

    #[test]
    fn same_cell_is_single_waypoint() {
        let grid = open_grid(5, 5);
        let path = find_path(&grid, Point::new(40.0, 40.0), Point::new(60.0, 50.0));
        assert_eq!(path, vec![center(1, 1)]);
    }

    #[test]
    fn straight_line() {
        let grid = open_grid(10, 10);
        let path = find_path(&grid, center(0, 3), center(6, 3));
        assert_eq!(path.len(), 7);
        assert!(path.iter().all(|p| p.y == center(0, 3).y));
        assert_eq!(path.last(), Some(&center(6, 3)));
    }

    #[test]
    fn positions_snap_to_cell_centers() {
        let grid = open_grid(10, 10);
        let path = find_path(&grid, Point::new(1.0, 2.0), Point::new(95.0, 0.5));
        assert_eq!(path.first(), Some(&center(0, 0)));
        assert_eq!(path.last(), Some(&center(2, 0)));
        assert_eq!(path.len(), 3);
    }

    #[test]
    fn detours_around_wall() {
        let grid = walled_grid();
        let path = find_path(&grid, center(0, 0), center(9, 0));
        assert_eq!(path.len(), 28);
        assert_eq!(path.first(), Some(&Point::new(16.0, 16.0)));
        assert_eq!(path.last(), Some(&Point::new(304.0, 16.0)));
        assert!(path.contains(&center(5, 9)));

        let cells = find_cell_path(&grid, Cell::new(0, 0), Cell::new(9, 0)).unwrap();
        assert_contiguous(&grid, &cells);
    }

    #[test]
    fn blocked_endpoints_give_empty_path() {
        let grid = walled_grid();
        assert!(find_path(&grid, center(5, 0), center(9, 0)).is_empty());
        assert!(find_path(&grid, center(0, 0), center(5, 4)).is_empty());
    }

    #[test]
    fn out_of_bounds_endpoints_give_empty_path() {
        let grid = open_grid(4, 4);
        assert!(find_path(&grid, Point::new(-5.0, 10.0), center(1, 1)).is_empty());
        assert!(find_path(&grid, center(1, 1), Point::new(10.0, 500.0)).is_empty());
        assert!(find_path(&grid, center(1, 1), Point::new(f32::NAN, 0.0)).is_empty());
    }

    #[test]
    fn enclosed_goal_gives_empty_path() {
        let mut grid = open_grid(7, 7);
        for cell in Cell::new(4, 4).neighbors() {
            grid.set(cell, TileKind::Water);
        }
        assert!(find_path(&grid, center(0, 0), center(4, 4)).is_empty());
    }

    #[test]
    fn custom_blocked_kinds_respected() {
        let mut grid = open_grid(3, 1).with_blocked_kinds([TileKind::Rock]);
        grid.set(Cell::new(1, 0), TileKind::Rock);
        assert!(find_path(&grid, center(0, 0), center(2, 0)).is_empty());
        grid.set_blocked_kinds([TileKind::Water]);
        assert_eq!(find_path(&grid, center(0, 0), center(2, 0)).len(), 3);
    }

    #[test]
    fn search_leaves_grid_untouched() {
        let grid = walled_grid();
        let before: Vec<_> = grid.cells().map(|c| grid.get(c)).collect();
        find_path(&grid, center(0, 0), center(9, 0));
        let after: Vec<_> = grid.cells().map(|c| grid.get(c)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn repeated_search_is_identical() {
        let grid = walled_grid();
        let a = find_path(&grid, center(0, 0), center(9, 3));
        let b = find_path(&grid, center(0, 0), center(9, 3));
        assert_eq!(a, b);
    }

    #[test]
    fn matches_bfs_on_random_grids() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..200 {
            let cols = rng.gen_range(1..=16);
            let rows = rng.gen_range(1..=16);
            let mut grid = open_grid(cols, rows);
            for cell in grid.cells().collect::<Vec<_>>() {
                if rng.gen_bool(0.3) {
                    grid.set(cell, TileKind::Water);
                }
            }
            let start = Cell::new(rng.gen_range(0..cols as i32), rng.gen_range(0..rows as i32));
            let goal = Cell::new(rng.gen_range(0..cols as i32), rng.gen_range(0..rows as i32));

            let expected = bfs_steps(&grid, start, goal);
            let found = find_cell_path(&grid, start, goal);
            match (expected, found) {
                (None, None) => {}
                (Some(steps), Some(cells)) => {
                    assert_eq!(cells.len() as u32, steps + 1);
                    assert_eq!(cells.first(), Some(&start));
                    assert_eq!(cells.last(), Some(&goal));
                    assert_contiguous(&grid, &cells);
                }
                (expected, found) => {
                    panic!("{start} -> {goal}: bfs {expected:?}, astar {found:?}")
                }
            }
        }
    }

    #[test]
    fn concurrent_searches_share_grid() {
        let grid = walled_grid();
        let lengths: Vec<usize> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(|| find_path(&grid, center(0, 0), center(9, 0)).len()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });
        assert_eq!(lengths, vec![28; 4]);
    }

    /// A 5x1 corridor cut in half at column 2, reached only through the
    /// trait.
    struct SplitCorridor;

    impl WorldGrid for SplitCorridor {
        fn cell_size(&self) -> f32 {
            1.0
        }
        fn cols(&self) -> u32 {
            5
        }
        fn rows(&self) -> u32 {
            1
        }
        fn is_walkable(&self, cell: Cell) -> bool {
            self.in_bounds(cell) && cell.col != 2
        }
    }

    #[test]
    fn works_through_trait_object() {
        let grid: &dyn WorldGrid = &SplitCorridor;
        assert!(find_path(grid, Point::new(0.5, 0.5), Point::new(4.5, 0.5)).is_empty());
        assert_eq!(
            find_path(grid, Point::new(0.5, 0.5), Point::new(1.5, 0.5)),
            vec![Point::new(0.5, 0.5), Point::new(1.5, 0.5)]
        );
    }
}
