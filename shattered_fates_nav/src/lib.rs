// shattered_fates_nav: tile grid navigation for NPCs.
//
// Pure, synchronous, and free of networking. The game loop owns the world
// and the NPCs; this crate answers "how do I get from here to there" and
// steps NPCs along the answer.
//
// Module overview:
// - `types.rs`:        `Point` (world position) and `Cell` (grid coordinate),
//                      with the floor-division mapping between them.
// - `grid.rs`:         `WorldGrid` trait consumed by the search, `TileGrid`
//                      implementation with tile kinds and JSON map loading.
// - `pathfinding.rs`:  A* over any `WorldGrid`; `find_path` returns
//                      cell-center waypoints or an empty `Vec`.
// - `follower.rs`:     `PathFollower`, the per-NPC wander/repath loop.
// - `config.rs`:       `NavConfig`, the JSON-loadable tunables.
//
// Searches borrow the grid immutably and keep no shared state, so
// independent NPCs can be pathed from several threads at once as long as
// nothing mutates the grid meanwhile.

pub mod config;
pub mod follower;
pub mod grid;
pub mod pathfinding;
pub mod types;

pub use config::NavConfig;
pub use follower::PathFollower;
pub use grid::{MapError, TileGrid, TileKind, WorldGrid};
pub use pathfinding::{find_cell_path, find_path};
pub use types::{Cell, Point};
