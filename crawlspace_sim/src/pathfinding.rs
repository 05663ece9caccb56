// Bounded flood-fill pathfinding toward a single destination voxel.
//
// A `Pathfinder` owns one destination and a range. Setting the destination
// runs a breadth-first flood over the 26-connected voxel grid, recording the
// hop count from every reachable voxel back to the destination. Agents then
// ask `next_pos()` for the neighbor that moves them one hop closer, so any
// number of agents can share one flood.
//
// Which voxels an agent can occupy is the climb rule in `is_climbable()`:
// the voxel must be empty, and either sit on the water surface (swimming), or
// touch a solid block below it or beside it on X/Z (walking and climbing
// walls; ceilings alone don't count). Nothing below the water surface is
// traversable. A diagonal move is legal only if at least one of the
// single-axis intermediate voxels is empty, which stops agents from
// squeezing between two blocks that meet at an edge; three-axis moves are
// never legal. See `can_move_between()`.
//
// The field is keyed by offset from the destination in an `FxHashMap`. The
// map is only ever probed by key, never iterated, so hash order cannot leak
// into results. Floods are bounded by `range` (every axis strictly within
// `range` of the destination), an optional `NavBounds` box, and a
// `FloodBudget`. Running out of budget logs a warning and keeps the partial
// field, which is still correct for every voxel it contains.
//
// Lifecycle: Idle → Computing → Ready. `set_destination()` floods to
// completion in one call. `begin_destination()` + `advance()` spread the
// same flood over several calls for callers that can't block a whole tick.
// Floods never react to terrain edits; call `recompute()`.
//
// See also: `world.rs` for `WorldIndex::is_obstructed`, `path_map.rs` for
// the tiled long-range fallback built from many pathfinders.
//
// **Critical constraint: determinism.** With the expansion budget only, a
// flood is a pure function of the world, destination, range and bounds.
// Neighbor order is fixed (`NEIGHBORS`) and ties in `next_pos()` break on
// distance to the destination, then on that fixed order. The wall-clock
// budget is the one nondeterministic input and only matters when it trips.

use crate::config::NavParams;
use crate::types::{Vec3, VoxelCoord};
use crate::world::WorldIndex;
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// The 26 neighbor offsets, x fastest, then y, then z.
const NEIGHBORS: [VoxelCoord; 26] = {
    let mut out = [VoxelCoord::ZERO; 26];
    let mut i = 0;
    let mut n = 0;
    while n < 27 {
        if n != 13 {
            out[i] = VoxelCoord::new(n % 3 - 1, (n / 3) % 3 - 1, n / 9 - 1);
            i += 1;
        }
        n += 1;
    }
    out
};

/// How often the flood checks the wall clock, in expansions.
const CLOCK_CHECK_INTERVAL: u64 = 256;

/// Where a pathfinder is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FloodStatus {
    /// No destination set yet.
    Idle,
    /// A flood has started but the queue isn't drained.
    Computing,
    /// The field is final. `truncated` means the budget ran out first.
    Ready { truncated: bool },
}

/// Half-open box a pathfinder may not leave. Use `i32::MAX` for an open
/// upper edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NavBounds {
    pub min: VoxelCoord,
    pub max: VoxelCoord,
}

impl NavBounds {
    pub fn contains(&self, coord: VoxelCoord) -> bool {
        coord.x >= self.min.x
            && coord.y >= self.min.y
            && coord.z >= self.min.z
            && coord.x < self.max.x
            && coord.y < self.max.y
            && coord.z < self.max.z
    }
}

// ---------------------------------------------------------------------------
// Traversal rules
// ---------------------------------------------------------------------------

/// Whether an agent can occupy `coord`, ignoring range and bounds.
pub fn is_climbable(world: &WorldIndex, coord: VoxelCoord, water_level: i32) -> bool {
    if world.is_obstructed(coord) {
        return false;
    }
    if coord.y == water_level {
        return true;
    }
    if coord.y < water_level {
        return false;
    }
    world.is_obstructed(coord.offset(-1, 0, 0))
        || world.is_obstructed(coord.offset(1, 0, 0))
        || world.is_obstructed(coord.offset(0, -1, 0))
        || world.is_obstructed(coord.offset(0, 0, -1))
        || world.is_obstructed(coord.offset(0, 0, 1))
}

/// Whether a single step from `a` to the adjacent voxel `b` is legal,
/// assuming both are traversable.
///
/// One differing axis is always legal. Two differing axes need at least one
/// of the single-axis intermediates to be empty. Three is never legal.
pub fn can_move_between(world: &WorldIndex, a: VoxelCoord, b: VoxelCoord) -> bool {
    match a.differing_axes(b) {
        1 => true,
        2 => {
            (a.x != b.x && !world.is_obstructed(VoxelCoord::new(b.x, a.y, a.z)))
                || (a.y != b.y && !world.is_obstructed(VoxelCoord::new(a.x, b.y, a.z)))
                || (a.z != b.z && !world.is_obstructed(VoxelCoord::new(a.x, a.y, b.z)))
        }
        _ => false,
    }
}

/// Nudge a point onto a traversable voxel: the voxel containing `pos` if it
/// qualifies, otherwise the first qualifying horizontal neighbor. Returns the
/// shifted point, or `None` if nothing nearby is traversable.
pub fn snap_to_traversable(world: &WorldIndex, pos: Vec3, water_level: i32) -> Option<Vec3> {
    let voxel = VoxelCoord::containing(pos);
    if is_climbable(world, voxel, water_level) {
        return Some(pos);
    }
    for dz in -1..=1 {
        for dx in -1..=1 {
            if is_climbable(world, voxel.offset(dx, 0, dz), water_level) {
                return Some([pos[0] + dx as f32, pos[1], pos[2] + dz as f32]);
            }
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Pathfinder
// ---------------------------------------------------------------------------

/// Distance field from every reachable voxel to one destination.
#[derive(Clone, Debug)]
pub struct Pathfinder {
    range: u32,
    bounds: Option<NavBounds>,
    params: NavParams,
    destination: Option<VoxelCoord>,
    /// Hop count, keyed by offset from `destination`.
    cells: FxHashMap<VoxelCoord, u32>,
    /// Absolute coordinates waiting to be expanded.
    queue: VecDeque<VoxelCoord>,
    status: FloodStatus,
    /// The destination still needs its traversability check and seeding.
    needs_seed: bool,
    expansions: u64,
    elapsed: Duration,
}

impl Pathfinder {
    pub fn new(range: u32, params: NavParams) -> Self {
        Self {
            range,
            bounds: None,
            params,
            destination: None,
            cells: FxHashMap::default(),
            queue: VecDeque::new(),
            status: FloodStatus::Idle,
            needs_seed: false,
            expansions: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Restrict floods to `bounds`. Applies from the next flood on.
    pub fn with_bounds(mut self, bounds: NavBounds) -> Self {
        self.bounds = Some(bounds);
        self
    }

    pub fn range(&self) -> u32 {
        self.range
    }

    pub fn bounds(&self) -> Option<NavBounds> {
        self.bounds
    }

    pub fn destination(&self) -> Option<VoxelCoord> {
        self.destination
    }

    pub fn status(&self) -> FloodStatus {
        self.status
    }

    /// Voxels expanded by the current flood so far.
    pub fn expansions(&self) -> u64 {
        self.expansions
    }

    /// Number of voxels with a known distance.
    pub fn reached(&self) -> usize {
        self.cells.len()
    }

    /// Set the destination and flood to completion (or until the budget runs
    /// out). A position that floors to the current destination does not
    /// restart the flood.
    pub fn set_destination(&mut self, world: &WorldIndex, pos: Vec3) -> FloodStatus {
        self.begin_destination(pos);
        self.advance(world, u64::MAX)
    }

    /// Set the destination without flooding yet. Returns `false` (and keeps
    /// the current field) if `pos` floors to the current destination.
    pub fn begin_destination(&mut self, pos: Vec3) -> bool {
        let dest = VoxelCoord::containing(pos);
        if self.destination == Some(dest) {
            return false;
        }
        self.restart(dest);
        true
    }

    /// Discard the field and flood again for the current destination, e.g.
    /// after terrain edits.
    pub fn recompute(&mut self, world: &WorldIndex) -> FloodStatus {
        if let Some(dest) = self.destination {
            self.restart(dest);
        }
        self.advance(world, u64::MAX)
    }

    fn restart(&mut self, dest: VoxelCoord) {
        self.destination = Some(dest);
        self.cells.clear();
        self.queue.clear();
        self.status = FloodStatus::Computing;
        self.needs_seed = true;
        self.expansions = 0;
        self.elapsed = Duration::ZERO;
    }

    /// Expand up to `max_expansions` more voxels of a pending flood.
    ///
    /// Does nothing unless the status is `Computing`. The configured
    /// `FloodBudget` applies across all calls for one flood.
    pub fn advance(&mut self, world: &WorldIndex, max_expansions: u64) -> FloodStatus {
        if self.status != FloodStatus::Computing {
            return self.status;
        }
        let Some(dest) = self.destination else {
            self.status = FloodStatus::Idle;
            return self.status;
        };

        if self.needs_seed {
            self.needs_seed = false;
            if !self.is_traversable(world, dest) {
                log::debug!("destination {dest} is not traversable; empty field");
                self.status = FloodStatus::Ready { truncated: false };
                return self.status;
            }
            self.cells.insert(VoxelCoord::ZERO, 0);
            self.queue.push_back(dest);
        }

        let budget = &self.params.flood_budget;
        let max_total = budget.max_expansions.unwrap_or(u64::MAX);
        let max_time = budget.max_duration();
        let started = Instant::now();

        let mut done = 0;
        while done < max_expansions {
            let over_count = self.expansions >= max_total;
            let over_time = max_time.is_some_and(|limit| {
                self.expansions % CLOCK_CHECK_INTERVAL == 0
                    && self.elapsed + started.elapsed() > limit
            });
            if (over_count || over_time) && !self.queue.is_empty() {
                log::warn!(
                    "flood to {dest} stopped after {} expansions ({} voxels reached, {} queued)",
                    self.expansions,
                    self.cells.len(),
                    self.queue.len()
                );
                self.queue.clear();
                self.status = FloodStatus::Ready { truncated: true };
                break;
            }

            let Some(pos) = self.queue.pop_front() else {
                break;
            };
            self.expand(world, dest, pos);
            self.expansions += 1;
            done += 1;
        }

        self.elapsed += started.elapsed();
        if self.status == FloodStatus::Computing && self.queue.is_empty() {
            self.status = FloodStatus::Ready { truncated: false };
            log::debug!(
                "flood to {dest} complete: {} voxels reached in {} expansions",
                self.cells.len(),
                self.expansions
            );
        }
        self.status
    }

    fn expand(&mut self, world: &WorldIndex, dest: VoxelCoord, pos: VoxelCoord) {
        let Some(&parent) = self.cells.get(&(pos - dest)) else {
            return;
        };
        for offset in NEIGHBORS {
            let next = pos + offset;
            let key = next - dest;
            if self.cells.contains_key(&key)
                || !self.is_traversable(world, next)
                || !can_move_between(world, pos, next)
            {
                continue;
            }
            self.cells.insert(key, parent + 1);
            self.queue.push_back(next);
        }
    }

    /// Whether `coord` is inside this pathfinder's range and bounds and
    /// passes the climb rule.
    pub fn is_traversable(&self, world: &WorldIndex, coord: VoxelCoord) -> bool {
        let Some(dest) = self.destination else {
            return false;
        };
        let off = coord - dest;
        if off.x.unsigned_abs() >= self.range
            || off.y.unsigned_abs() >= self.range
            || off.z.unsigned_abs() >= self.range
        {
            return false;
        }
        if self.bounds.is_some_and(|b| !b.contains(coord)) {
            return false;
        }
        is_climbable(world, coord, self.params.water_level)
    }

    /// Hop count from `coord` to the destination, if known.
    pub fn cell(&self, coord: VoxelCoord) -> Option<u32> {
        let dest = self.destination?;
        self.cells.get(&(coord - dest)).copied()
    }

    /// The neighbor to step to from `coord` to get closer to the destination.
    ///
    /// Only neighbors with a known distance strictly below `coord`'s own (or
    /// any known distance, if `coord` itself is off the field) and a legal
    /// move qualify. The smallest distance wins; ties go to the neighbor
    /// nearest the destination. `None` at the destination or when no
    /// neighbor improves.
    pub fn next_pos(&self, world: &WorldIndex, coord: VoxelCoord) -> Option<VoxelCoord> {
        let dest = self.destination?;
        let here = self.cell(coord);
        if here == Some(0) {
            return None;
        }

        let mut best: Option<(u32, i64, VoxelCoord)> = None;
        for offset in NEIGHBORS {
            let next = coord + offset;
            let Some(dist) = self.cell(next) else {
                continue;
            };
            if here.is_some_and(|h| dist >= h) {
                continue;
            }
            let to_dest = next.distance_squared(dest);
            if best.is_some_and(|(d, s, _)| (dist, to_dest) >= (d, s)) {
                continue;
            }
            if !can_move_between(world, coord, next) {
                continue;
            }
            best = Some((dist, to_dest, next));
        }
        best.map(|(_, _, next)| next)
    }
}
