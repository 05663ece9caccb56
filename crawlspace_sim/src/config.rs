// Data-driven tuning for the world core.
//
// All tunable query and navigation parameters live here in `CoreConfig`,
// loadable from JSON. The core reads these instead of scattering magic
// numbers: the sweep inset, the water-surface level agents may swim on, the
// flood-fill budget, and the PathMap tiling. `Default` reproduces the values
// the game shipped with.
//
// Parameters are grouped into nested sub-structs: `CollisionParams`,
// `NavParams` (which holds the `FloodBudget`), and `PathMapParams`.
//
// Storage-format constants (`chunk::FLOOR_Y`, `chunk::SECTION_SIZE`) are
// deliberately not here: they are part of the on-disk and renderer contract
// and changing them would silently break saved worlds.
//
// See also: `world.rs` (reads `CollisionParams`), `pathfinding.rs` (reads
// `NavParams`), `path_map.rs` (reads `PathMapParams`).

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Parameters for `WorldIndex::sweep_box`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollisionParams {
    /// Inset subtracted from each side of the box's cross-section so boxes
    /// resting flush against a wall don't catch on it while sliding.
    pub sweep_epsilon: f32,
    /// An axis counts as blocked when the resolved coordinate is further
    /// than this from the unobstructed target.
    pub blocked_threshold: f32,
}

/// Work limit for a single flood fill.
///
/// Either limit may be `None`. Hitting a limit stops the fill early and keeps
/// the partial distance field.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FloodBudget {
    /// Maximum number of voxels dequeued and expanded.
    pub max_expansions: Option<u64>,
    /// Maximum wall-clock time in milliseconds.
    pub max_millis: Option<u64>,
}

impl FloodBudget {
    /// No limits at all. Only sensible for tests and tiny ranges.
    pub const UNLIMITED: Self = Self {
        max_expansions: None,
        max_millis: None,
    };

    pub fn max_duration(&self) -> Option<Duration> {
        self.max_millis.map(Duration::from_millis)
    }
}

impl Default for FloodBudget {
    fn default() -> Self {
        Self {
            max_expansions: Some(4_000_000),
            max_millis: Some(10_000),
        }
    }
}

/// Parameters for the pathfinder's traversal rule and flood fill.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NavParams {
    /// Y level of the water surface. Agents may occupy any empty voxel at
    /// exactly this level (swimming) and nothing below it.
    pub water_level: i32,
    pub flood_budget: FloodBudget,
}

/// Parameters for `PathMap` tiling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathMapParams {
    /// Distance in voxels between adjacent node destinations on X and Z.
    pub spacing: i32,
    /// The node-height probe starts this many voxels above the reference Y...
    pub probe_above: i32,
    /// ...and walks down to this many voxels below it.
    pub probe_below: i32,
}

/// Complete core configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CoreConfig {
    pub collision: CollisionParams,
    pub navigation: NavParams,
    pub path_map: PathMapParams,
}

impl CoreConfig {
    /// Parse a config from a JSON string.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            collision: CollisionParams {
                sweep_epsilon: 0.01,
                blocked_threshold: 0.001,
            },
            navigation: NavParams {
                water_level: -1,
                flood_budget: FloodBudget::default(),
            },
            path_map: PathMapParams {
                spacing: 20,
                probe_above: 21,
                probe_below: 20,
            },
        }
    }
}
