// Per-NPC wandering: pick a destination, path to it, step along the path.
//
// A `PathFollower` holds one NPC's remaining waypoints and a repath
// cooldown. Each frame the game calls `update` with the frame time and the
// NPC's current position (its center):
//
// 1. The cooldown ticks down by `dt`. When it reaches zero it resets to
//    the configured interval, and if the NPC has no waypoints left a new
//    destination is chosen: the center of a random tile of the first
//    destination kind that exists on the grid. The path from the NPC to
//    it is stored minus its first waypoint, which is where the NPC already
//    stands. A path of one waypoint or none leaves the NPC idle until the
//    next cooldown.
// 2. The next waypoint, if any, is popped and returned. The caller moves
//    the NPC there.
//
// A non-finite `dt` still pops a waypoint but leaves the cooldown alone.
//
// The RNG is passed in so callers choose between a seeded generator (tests,
// replays) and `thread_rng`.
//
// See also: `pathfinding.rs` for `find_path`, `config.rs` for the
// interval and destination kinds.

use std::collections::VecDeque;

use log::{debug, trace};
use rand::Rng;

use crate::config::NavConfig;
use crate::grid::{TileGrid, TileKind};
use crate::pathfinding::find_path;
use crate::types::Point;

#[derive(Clone, Debug)]
pub struct PathFollower {
    repath_interval: f32,
    destination_kinds: Vec<TileKind>,
    /// Seconds until the next destination check. Starts at zero so a new
    /// NPC picks a destination on its first update.
    cooldown: f32,
    path: VecDeque<Point>,
}

impl PathFollower {
    pub fn new(config: &NavConfig) -> Self {
        Self {
            repath_interval: config.repath_interval_secs.max(0.0),
            destination_kinds: config.destination_kinds.clone(),
            cooldown: 0.0,
            path: VecDeque::new(),
        }
    }

    /// Advance by `dt` seconds and return the waypoint to move to this
    /// frame, if any.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        dt: f32,
        grid: &TileGrid,
        position: Point,
        rng: &mut R,
    ) -> Option<Point> {
        // A NaN cooldown would never reach zero again.
        if dt.is_finite() {
            self.cooldown -= dt;
        }
        if self.cooldown <= 0.0 {
            self.cooldown = self.repath_interval;
            if self.path.is_empty() {
                self.repath(grid, position, rng);
            }
        }
        self.path.pop_front()
    }

    fn repath<R: Rng + ?Sized>(&mut self, grid: &TileGrid, position: Point, rng: &mut R) {
        let Some(destination) = self.choose_destination(grid, rng) else {
            trace!("no destination tiles for {:?}", self.destination_kinds);
            return;
        };
        let path = find_path(grid, position, destination);
        if path.len() > 1 {
            debug!("wandering {position} -> {destination} ({} steps)", path.len() - 1);
            self.path = path.into_iter().skip(1).collect();
        } else {
            trace!("no route {position} -> {destination}");
        }
    }

    /// Center of a random tile of the first destination kind present on
    /// `grid`.
    pub fn choose_destination<R: Rng + ?Sized>(
        &self,
        grid: &TileGrid,
        rng: &mut R,
    ) -> Option<Point> {
        self.destination_kinds
            .iter()
            .find_map(|&kind| grid.random_center_of_kind(kind, rng))
    }

    /// Replace the remaining waypoints.
    pub fn set_path(&mut self, waypoints: impl IntoIterator<Item = Point>) {
        self.path = waypoints.into_iter().collect();
    }

    pub fn clear(&mut self) {
        self.path.clear();
    }

    pub fn is_idle(&self) -> bool {
        self.path.is_empty()
    }

    pub fn remaining(&self) -> impl ExactSizeIterator<Item = &Point> {
        self.path.iter()
    }

    pub fn cooldown(&self) -> f32 {
        self.cooldown
    }
}
