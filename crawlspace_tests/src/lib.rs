// Test-only level builders and agent drivers for the integration tests.
//
// `TestLevel` wraps a real `WorldIndex` with a few builders for the shapes
// the scenarios need (flat floors, walls, pillars). The walk helpers drive
// an agent one voxel at a time through the real `Pathfinder::next_pos` and
// `PathMap::next_pos`, checking every step against the same traversal and
// corner-cutting rules the flood used. Nothing here reimplements core
// logic; it only loops over it.
//
// See also: `tests/navigation_pipeline.rs` for the scenarios.

use crawlspace_sim::config::CoreConfig;
use crawlspace_sim::path_map::PathMap;
use crawlspace_sim::pathfinding::{Pathfinder, can_move_between};
use crawlspace_sim::types::{BlockType, ChunkId, VoxelCoord};
use crawlspace_sim::world::WorldIndex;

/// Install `env_logger` once for the test binary. Safe to call from every
/// test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A world with one ground chunk and helpers to shape it.
pub struct TestLevel {
    pub world: WorldIndex,
    pub ground: ChunkId,
    pub config: CoreConfig,
}

impl TestLevel {
    /// A brick floor at y = 0 covering x, z in `-half..=half`.
    pub fn flat(half: i32) -> Self {
        Self::flat_with_config(half, CoreConfig::default())
    }

    pub fn flat_with_config(half: i32, config: CoreConfig) -> Self {
        let mut world = WorldIndex::from_config(&config);
        let ground = world.add_chunk();
        for z in -half..=half {
            for x in -half..=half {
                world.set_block(ground, VoxelCoord::new(x, 0, z), BlockType::BRICKS);
            }
        }
        Self {
            world,
            ground,
            config,
        }
    }

    /// A wall along Z at `x`, from y = 1 up to and including `top`.
    pub fn wall_x(&mut self, x: i32, z_from: i32, z_to: i32, top: i32) {
        for z in z_from..=z_to {
            for y in 1..=top {
                self.world
                    .set_block(self.ground, VoxelCoord::new(x, y, z), BlockType::ROCK);
            }
        }
    }

    /// A one-voxel column at (x, z) from y = 1 to `top`.
    pub fn pillar(&mut self, x: i32, z: i32, top: i32) {
        for y in 1..=top {
            self.world
                .set_block(self.ground, VoxelCoord::new(x, y, z), BlockType::WOOD_BEAM);
        }
    }

    pub fn pathfinder(&self, range: u32) -> Pathfinder {
        Pathfinder::new(range, self.config.navigation.clone())
    }
}

/// Panic unless the step from `from` to `to` is one legal move.
fn check_step(world: &WorldIndex, from: VoxelCoord, to: VoxelCoord) {
    assert_eq!(
        from.chebyshev_distance(to),
        1,
        "step {from} -> {to} is not to a neighbor"
    );
    assert!(
        can_move_between(world, from, to),
        "step {from} -> {to} cuts a corner"
    );
    assert!(!world.is_obstructed(to), "step {from} -> {to} enters a block");
}

/// Follow `pathfinder` from `start` until it stops offering steps or
/// `max_steps` runs out. Returns every visited voxel, `start` included.
pub fn walk(
    world: &WorldIndex,
    pathfinder: &Pathfinder,
    start: VoxelCoord,
    max_steps: usize,
) -> Vec<VoxelCoord> {
    let mut path = vec![start];
    let mut pos = start;
    for _ in 0..max_steps {
        let Some(next) = pathfinder.next_pos(world, pos) else {
            break;
        };
        check_step(world, pos, next);
        pos = next;
        path.push(pos);
    }
    path
}

/// Like `walk`, but through `PathMap::next_pos` with `active` as the agent's
/// own pathfinder. Stops on arriving at `active`'s destination.
pub fn walk_with_map(
    world: &WorldIndex,
    map: &PathMap,
    active: &Pathfinder,
    start: VoxelCoord,
    max_steps: usize,
) -> Vec<VoxelCoord> {
    let mut path = vec![start];
    let mut pos = start;
    for _ in 0..max_steps {
        if Some(pos) == active.destination() {
            break;
        }
        let Some(next) = map.next_pos(world, pos, active) else {
            break;
        };
        check_step(world, pos, next);
        pos = next;
        path.push(pos);
    }
    path
}
