// NPC navigation tunables, loaded from JSON.
//
// Missing keys fall back to the values the game ships with, so a config
// file only needs to name what it changes:
//
//   { "blocked_kinds": ["water", "den"], "repath_interval_secs": 2.0 }
//
// See also: `follower.rs` for the repath and destination settings;
// `NavConfig::apply_to` installs the blocked kinds on a `TileGrid`.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::grid::{TileGrid, TileKind, default_blocked_kinds};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NavConfig {
    /// Tile kinds NPCs cannot enter. Installed on a grid by `apply_to`.
    pub blocked_kinds: BTreeSet<TileKind>,
    /// Seconds between destination checks for an NPC.
    pub repath_interval_secs: f32,
    /// Destination kinds in preference order. The first kind that has any
    /// tile on the grid wins.
    pub destination_kinds: Vec<TileKind>,
}

impl Default for NavConfig {
    fn default() -> Self {
        Self {
            blocked_kinds: default_blocked_kinds(),
            repath_interval_secs: 3.0,
            destination_kinds: vec![TileKind::Clearing, TileKind::Grass],
        }
    }
}

impl NavConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Make `grid` block exactly this config's kinds.
    pub fn apply_to(&self, grid: &mut TileGrid) {
        grid.set_blocked_kinds(self.blocked_kinds.iter().copied());
    }
}
