// End-to-end scenarios across the whole core.
//
// Each test builds a real world through the public API, runs the same
// queries gameplay code would (ray picks, box sweeps, floods, PathMap
// fallback, save/load), and checks the observable results. Agents are
// walked one voxel at a time through `crawlspace_tests::walk*`, which
// asserts every step is a legal move.

use crawlspace_sim::chunk::{CodecError, SectionCoord};
use crawlspace_sim::config::CoreConfig;
use crawlspace_sim::path_map::PathMap;
use crawlspace_sim::pathfinding::{FloodStatus, Pathfinder};
use crawlspace_sim::types::{BlockType, VoxelCoord};
use crawlspace_sim::world::WorldIndex;
use crawlspace_tests::{TestLevel, init_logging, walk, walk_with_map};

fn c(x: i32, y: i32, z: i32) -> VoxelCoord {
    VoxelCoord::new(x, y, z)
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

#[test]
fn agent_reaches_destination_over_a_wall() {
    init_logging();
    let mut level = TestLevel::flat(12);
    level.wall_x(3, -12, 12, 3);

    let mut pf = level.pathfinder(30);
    let status = pf.set_destination(&level.world, [8.5, 1.5, 0.5]);
    assert_eq!(status, FloodStatus::Ready { truncated: false });

    let start = c(-5, 1, 0);
    let start_dist = pf.cell(start).unwrap();
    let path = walk(&level.world, &pf, start, 200);

    assert_eq!(path.last(), Some(&c(8, 1, 0)));
    assert_eq!(path.len() - 1, start_dist as usize);
    for pair in path.windows(2) {
        assert_eq!(pf.cell(pair[1]).unwrap() + 1, pf.cell(pair[0]).unwrap());
    }
    // The wall spans the whole floor, so the agent climbed it.
    assert!(path.iter().any(|p| p.x == 3 && p.y > 3));
}

#[test]
fn agent_swims_across_a_trench() {
    init_logging();
    let mut level = TestLevel::flat(10);
    for z in -10..=10 {
        for x in 2..=4 {
            level
                .world
                .set_block(level.ground, c(x, 0, z), BlockType::AIR);
        }
    }

    let mut pf = level.pathfinder(20);
    pf.set_destination(&level.world, [7.5, 1.5, 0.5]);
    let path = walk(&level.world, &pf, c(-2, 1, 0), 100);

    assert_eq!(path.last(), Some(&c(7, 1, 0)));
    let water = level.config.navigation.water_level;
    assert!(path.iter().any(|p| p.y == water));
    assert!(path.iter().all(|p| p.y >= water));
}

#[test]
fn path_map_guides_agent_from_far_away() {
    init_logging();
    let level = TestLevel::flat(30);
    let map = PathMap::new(&level.world, c(0, 1, 0), 30, &level.config);

    let mut active = level.pathfinder(16);
    active.set_destination(&level.world, [15.5, 1.5, 15.5]);
    let start = c(-25, 1, -25);
    assert_eq!(active.next_pos(&level.world, start), None);
    assert!(map.is_mapped(start));

    let path = walk_with_map(&level.world, &map, &active, start, 200);
    assert_eq!(path.last(), Some(&c(15, 1, 15)));
    // Diagonal moves on open ground: never longer than the Chebyshev bound
    // plus the detour through the fallback node.
    assert!(path.len() < 80, "path took {} steps", path.len());
}

#[test]
fn wander_targets_follow_the_seed() {
    init_logging();
    let level = TestLevel::flat(20);
    let map = PathMap::new(&level.world, c(0, 1, 0), 20, &level.config);

    let targets = |seed| {
        let mut rng = fastrand::Rng::with_seed(seed);
        (0..8)
            .map(|_| map.random_node(&mut rng).and_then(|n| n.destination()))
            .collect::<Vec<_>>()
    };
    let first = targets(99);
    assert_eq!(first, targets(99));
    assert!(first.iter().all(Option::is_some));
}

#[test]
fn water_level_comes_from_config() {
    init_logging();
    let mut json = serde_json::to_value(CoreConfig::default()).unwrap();
    json["navigation"]["water_level"] = 0.into();
    let config = CoreConfig::from_json(&json.to_string()).unwrap();
    let world = WorldIndex::from_config(&config);

    let mut pf = Pathfinder::new(6, config.navigation.clone());
    pf.set_destination(&world, [0.5, 0.5, 0.5]);
    assert_eq!(pf.cell(c(3, 0, -3)), Some(3));
    assert_eq!(pf.cell(c(0, -1, 0)), None);

    // Under the default config the same spot is open air.
    let mut dry = Pathfinder::new(6, CoreConfig::default().navigation);
    dry.set_destination(&world, [0.5, 0.5, 0.5]);
    assert_eq!(dry.reached(), 0);
}

// ---------------------------------------------------------------------------
// Physics and editing
// ---------------------------------------------------------------------------

#[test]
fn falling_crate_lands_on_pillar() {
    init_logging();
    let mut level = TestLevel::flat(8);
    level.pillar(2, 2, 3);

    let size = [0.8, 0.8, 0.8];
    let mut pos = [2.5, 10.0, 2.5];
    let mut grounded = false;
    for _ in 0..30 {
        let result = level.world.sweep_box(pos, size, [0.0, -0.7, 0.0]);
        pos = result.position;
        grounded = result.grounded();
    }
    assert!(grounded);
    assert!((pos[1] - 4.4).abs() < 1e-4, "crate rests at {pos:?}");
    assert_eq!([pos[0], pos[2]], [2.5, 2.5]);
}

#[test]
fn pick_place_and_dig_marks_sections_dirty() {
    init_logging();
    let mut level = TestLevel::flat(8);
    level.pillar(2, 2, 3);
    let ground = level.ground;
    if let Some(chunk) = level.world.chunk_mut(ground) {
        chunk.clear_dirty();
    }

    let hit = level
        .world
        .cast_all([2.5, 20.0, 2.5], [0.0, -1.0, 0.0])
        .unwrap();
    assert_eq!(hit.chunk, ground);
    assert_eq!(hit.hit.voxel, c(2, 3, 2));
    assert_eq!(hit.hit.normal, c(0, 1, 0));

    // Place on the hit face.
    let placed = hit.hit.adjacent_voxel();
    assert!(level.world.set_block(ground, placed, BlockType::TILES));
    assert_eq!(level.world.block(c(2, 4, 2)), BlockType::TILES);

    // Dig it back out and check what the renderer would see.
    assert!(level.world.set_block(ground, placed, BlockType::AIR));
    let chunk = level.world.chunk_mut(ground).unwrap();
    let dirty = chunk.take_dirty();
    assert!(dirty.contains(&SectionCoord::containing(placed)));
    assert_eq!(chunk.dirty_sections().count(), 0);

    let snapshot = chunk.section_snapshot(SectionCoord::containing(c(2, 3, 2)));
    assert!(snapshot.face_exposed(c(2, 3, 2), c(0, 1, 0)));
    assert!(!snapshot.face_exposed(c(2, 2, 2), c(0, 1, 0)));
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[test]
fn level_survives_save_and_load() {
    init_logging();
    let mut level = TestLevel::flat(6);
    let props = level.world.add_chunk();
    level
        .world
        .apply_brush(props, c(0, 4, 0), 2.5, BlockType::GRAVEL);
    level.world.apply_brush(props, c(0, 4, 0), 1.0, BlockType::AIR);
    level.pillar(-4, -4, 6);

    let bytes = level.world.serialize_all().unwrap();
    let mut restored = WorldIndex::default();
    let ids = restored.deserialize_all(&bytes).unwrap();
    assert_eq!(ids.len(), 2);

    let (lo, hi) = level.world.bounds().unwrap();
    assert_eq!(restored.bounds(), Some((lo, hi)));
    for z in lo.z..hi.z {
        for y in lo.y..hi.y {
            for x in lo.x..hi.x {
                let v = c(x, y, z);
                assert_eq!(restored.block(v), level.world.block(v), "at {v}");
            }
        }
    }
    // Freshly loaded chunks need every section meshed.
    for (_, chunk) in restored.chunks() {
        assert!(chunk.sections().all(|s| chunk.is_dirty(s)));
    }
}

#[test]
fn bad_streams_leave_world_intact() {
    init_logging();
    let level = TestLevel::flat(3);
    let mut bytes = level.world.serialize_all().unwrap();

    let mut world = WorldIndex::default();
    let keep = world.add_chunk();
    world.set_block(keep, c(9, 9, 9), BlockType::SAND);

    bytes.truncate(bytes.len() - 3);
    assert!(matches!(
        world.deserialize_all(&bytes),
        Err(CodecError::Truncated { .. })
    ));
    assert_eq!(
        world.deserialize_all(&[0x1f, 0x8b, 0x08, 0]),
        Err(CodecError::Compressed)
    );
    assert_eq!(world.len(), 1);
    assert_eq!(world.block(c(9, 9, 9)), BlockType::SAND);
}
