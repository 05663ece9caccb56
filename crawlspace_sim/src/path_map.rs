// Tiled long-range navigation fallback.
//
// A single `Pathfinder` only knows distances within its range, so an agent
// far from its goal gets `None` from `next_pos()`. `PathMap` covers a square
// region `[center - radius, center + radius)` on X/Z with a grid of
// pathfinders spaced `PathMapParams::spacing` apart, each with a range large
// enough to span the whole region. When the agent's own pathfinder has
// nothing to say, the map hands it to the node whose tile covers that
// pathfinder's destination, which walks it into range.
//
// Node heights: a reachability flood from the map center (range
// `ceil(radius·√2)`) marks which voxels are connected to the center. Each
// node's destination is the highest reachable voxel in a vertical probe
// window around the center height at the node's X/Z, or the center height
// if none is.
//
// Node floods are independent and only read the world, so construction runs
// them on rayon's pool behind a shared `&WorldIndex` borrow.
//
// Nodes go stale when terrain changes; nothing here listens for edits. Call
// `rebuild()` after edits that matter for navigation.
//
// See also: `pathfinding.rs` for the per-node flood.

use crate::config::{CoreConfig, NavParams, PathMapParams};
use crate::pathfinding::{NavBounds, Pathfinder};
use crate::types::VoxelCoord;
use crate::world::WorldIndex;
use rayon::prelude::*;
use std::f64::consts::SQRT_2;
use std::time::Instant;

/// Grid of pathfinders tiling a square region.
#[derive(Clone, Debug)]
pub struct PathMap {
    center: VoxelCoord,
    radius: u32,
    params: PathMapParams,
    nav: NavParams,
    /// Number of tiles along each of X and Z.
    stride: usize,
    /// Indexed `tile_x + tile_z * stride`.
    nodes: Vec<Pathfinder>,
}

impl PathMap {
    /// Lay out and flood every node. This is the expensive call: one flood
    /// per tile plus the reachability flood.
    pub fn new(world: &WorldIndex, center: VoxelCoord, radius: u32, config: &CoreConfig) -> Self {
        let mut params = config.path_map.clone();
        params.spacing = params.spacing.max(1);
        let span = 2 * radius as usize;
        let spacing = params.spacing as usize;
        let mut map = Self {
            center,
            radius,
            params,
            nav: config.navigation.clone(),
            stride: span.div_ceil(spacing),
            nodes: Vec::new(),
        };
        map.rebuild(world);
        map
    }

    /// Re-probe node heights and re-flood every node against the current
    /// world.
    pub fn rebuild(&mut self, world: &WorldIndex) {
        let started = Instant::now();

        let reach_range = (f64::from(self.radius) * SQRT_2).ceil() as u32;
        let mut reachability = Pathfinder::new(reach_range, self.nav.clone());
        reachability.set_destination(world, self.center.to_world());

        let mut destinations = Vec::with_capacity(self.stride * self.stride);
        for tz in 0..self.stride {
            for tx in 0..self.stride {
                let x = self.min_x() + tx as i32 * self.params.spacing;
                let z = self.min_z() + tz as i32 * self.params.spacing;
                destinations.push(VoxelCoord::new(x, self.probe_height(&reachability, x, z), z));
            }
        }

        let node_range = (f64::from(self.radius) * 2.0 * SQRT_2).ceil() as u32;
        let bounds = NavBounds {
            min: VoxelCoord::new(self.min_x(), self.nav.water_level, self.min_z()),
            max: VoxelCoord::new(self.max_x(), i32::MAX, self.max_z()),
        };
        let nav = &self.nav;
        self.nodes = destinations
            .into_par_iter()
            .map(|dest| {
                let mut node = Pathfinder::new(node_range, nav.clone()).with_bounds(bounds);
                node.set_destination(world, dest.to_world());
                node
            })
            .collect();

        log::info!(
            "path map around {} (radius {}): {} nodes flooded in {:?}",
            self.center,
            self.radius,
            self.nodes.len(),
            started.elapsed()
        );
    }

    /// Highest reachable Y in the probe window at (x, z), else the center Y.
    fn probe_height(&self, reachability: &Pathfinder, x: i32, z: i32) -> i32 {
        let top = self.center.y + self.params.probe_above;
        let bottom = self.center.y - self.params.probe_below;
        (bottom..=top)
            .rev()
            .find(|&y| reachability.cell(VoxelCoord::new(x, y, z)).is_some())
            .unwrap_or(self.center.y)
    }

    pub fn center(&self) -> VoxelCoord {
        self.center
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    /// Number of tiles along each of X and Z.
    pub fn stride(&self) -> usize {
        self.stride
    }

    fn min_x(&self) -> i32 {
        self.center.x - self.radius as i32
    }

    fn max_x(&self) -> i32 {
        self.center.x + self.radius as i32
    }

    fn min_z(&self) -> i32 {
        self.center.z - self.radius as i32
    }

    fn max_z(&self) -> i32 {
        self.center.z + self.radius as i32
    }

    /// Tile index along one axis: nearest node, clamped onto the grid.
    fn tile(&self, value: i32, min: i32) -> usize {
        let t = (f64::from(value - min) / f64::from(self.params.spacing)).round();
        t.clamp(0.0, (self.stride - 1) as f64) as usize
    }

    /// The node responsible for `coord`. Coordinates outside the region map
    /// to the nearest edge tile.
    pub fn node_for(&self, coord: VoxelCoord) -> Option<&Pathfinder> {
        if self.stride == 0 {
            return None;
        }
        let tx = self.tile(coord.x, self.min_x());
        let tz = self.tile(coord.z, self.min_z());
        self.nodes.get(tx + tz * self.stride)
    }

    pub fn nodes(&self) -> &[Pathfinder] {
        &self.nodes
    }

    /// A uniformly random node, e.g. a wander target.
    pub fn random_node(&self, rng: &mut fastrand::Rng) -> Option<&Pathfinder> {
        if self.nodes.is_empty() {
            return None;
        }
        self.nodes.get(rng.usize(..self.nodes.len()))
    }

    /// Whether the node covering `coord` has a distance for it.
    pub fn is_mapped(&self, coord: VoxelCoord) -> bool {
        self.node_for(coord)
            .is_some_and(|node| node.cell(coord).is_some())
    }

    /// Next step from `coord` toward `active`'s destination.
    ///
    /// Uses `active` when it knows a way; otherwise falls back to the node
    /// whose tile covers `active`'s destination.
    pub fn next_pos(
        &self,
        world: &WorldIndex,
        coord: VoxelCoord,
        active: &Pathfinder,
    ) -> Option<VoxelCoord> {
        if let Some(next) = active.next_pos(world, coord) {
            return Some(next);
        }
        let dest = active.destination()?;
        self.node_for(dest)?.next_pos(world, coord)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FloodBudget;
    use crate::types::{BlockType, ChunkId};

    fn c(x: i32, y: i32, z: i32) -> VoxelCoord {
        VoxelCoord::new(x, y, z)
    }

    /// Brick floor at y = 0 over x, z in -30..=30.
    fn big_floor() -> (WorldIndex, ChunkId) {
        let mut world = WorldIndex::default();
        let id = world.add_chunk();
        for z in -30..=30 {
            for x in -30..=30 {
                world.set_block(id, c(x, 0, z), BlockType::BRICKS);
            }
        }
        (world, id)
    }

    #[test]
    fn layout_tiles_region() {
        let (world, _) = big_floor();
        let map = PathMap::new(&world, c(0, 1, 0), 30, &CoreConfig::default());
        assert_eq!(map.stride(), 3);
        assert_eq!(map.nodes().len(), 9);
        let dests: Vec<_> = map.nodes().iter().filter_map(|n| n.destination()).collect();
        assert_eq!(dests[0], c(-30, 1, -30));
        assert_eq!(dests[1], c(-10, 1, -30));
        assert_eq!(dests[3], c(-30, 1, -10));
        assert_eq!(dests[8], c(10, 1, 10));
    }

    #[test]
    fn unreachable_probe_falls_back_to_center_height() {
        let world = WorldIndex::default();
        // Center floats in the air, so the reachability flood is empty.
        let map = PathMap::new(&world, c(0, 7, 0), 10, &CoreConfig::default());
        assert!(!map.nodes().is_empty());
        for node in map.nodes() {
            assert_eq!(node.destination().map(|d| d.y), Some(7));
        }
    }

    #[test]
    fn node_for_clamps_outside_region() {
        let (world, _) = big_floor();
        let map = PathMap::new(&world, c(0, 1, 0), 30, &CoreConfig::default());
        let corner = map.node_for(c(500, 1, 500)).unwrap();
        assert_eq!(corner.destination(), Some(c(10, 1, 10)));
        let other = map.node_for(c(-500, 1, -500)).unwrap();
        assert_eq!(other.destination(), Some(c(-30, 1, -30)));
    }

    #[test]
    fn mapped_cells() {
        let (world, _) = big_floor();
        let map = PathMap::new(&world, c(0, 1, 0), 30, &CoreConfig::default());
        assert!(map.is_mapped(c(0, 1, 0)));
        assert!(map.is_mapped(c(-25, 1, 20)));
        assert!(!map.is_mapped(c(0, 5, 0)));
        // Outside the region's bounds.
        assert!(!map.is_mapped(c(100, 1, 100)));
    }

    #[test]
    fn falls_back_to_node_when_out_of_range() {
        let (world, _) = big_floor();
        let config = CoreConfig::default();
        let map = PathMap::new(&world, c(0, 1, 0), 30, &config);

        let mut active = Pathfinder::new(8, config.navigation.clone());
        active.set_destination(&world, [25.5, 1.5, 25.5]);
        let start = c(-25, 1, -25);
        assert_eq!(active.next_pos(&world, start), None);

        let next = map.next_pos(&world, start, &active).unwrap();
        assert_eq!(next, c(-24, 1, -24));
    }

    #[test]
    fn uses_active_pathfinder_in_range() {
        let (world, _) = big_floor();
        let config = CoreConfig::default();
        let map = PathMap::new(&world, c(0, 1, 0), 30, &config);

        let mut active = Pathfinder::new(8, config.navigation.clone());
        active.set_destination(&world, [0.5, 1.5, 0.5]);
        let start = c(3, 1, 0);
        assert_eq!(
            map.next_pos(&world, start, &active),
            active.next_pos(&world, start)
        );
        assert_eq!(map.next_pos(&world, start, &active), Some(c(2, 1, 0)));
    }

    #[test]
    fn rebuild_sees_new_terrain() {
        let (mut world, id) = big_floor();
        let mut map = PathMap::new(&world, c(0, 1, 0), 30, &CoreConfig::default());
        assert!(!map.is_mapped(c(5, 2, 5)));

        world.set_block(id, c(5, 1, 5), BlockType::ROCK);
        assert!(!map.is_mapped(c(5, 2, 5)));
        map.rebuild(&world);
        assert!(map.is_mapped(c(5, 2, 5)));
    }

    #[test]
    fn random_node_is_seeded() {
        let (world, _) = big_floor();
        let map = PathMap::new(&world, c(0, 1, 0), 30, &CoreConfig::default());
        let pick = |seed| {
            let mut rng = fastrand::Rng::with_seed(seed);
            map.random_node(&mut rng).and_then(|n| n.destination())
        };
        assert!(pick(7).is_some());
        assert_eq!(pick(7), pick(7));
    }

    #[test]
    fn zero_radius_map_is_empty() {
        let (world, _) = big_floor();
        let mut config = CoreConfig::default();
        config.navigation.flood_budget = FloodBudget::UNLIMITED;
        let map = PathMap::new(&world, c(0, 1, 0), 0, &config);
        assert_eq!(map.stride(), 0);
        assert!(map.nodes().is_empty());
        assert!(map.node_for(c(0, 1, 0)).is_none());
        assert!(!map.is_mapped(c(0, 1, 0)));
        let mut rng = fastrand::Rng::with_seed(1);
        assert!(map.random_node(&mut rng).is_none());
    }
}
