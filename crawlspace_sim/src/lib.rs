// crawlspace_sim — voxel world core.
//
// This crate holds the spatial side of the game: sparse growable block
// chunks, the geometric queries built on them (ray casts, swept-box
// collision, nearest-surface lookups), and the flood-fill pathfinding AI
// agents use to move through the same blocks. It has no rendering, audio or
// input dependencies; the renderer only reads dirty sections and block data
// back out.
//
// Module overview:
// - `types.rs`:       VoxelCoord, BlockType, Axis, ChunkId.
// - `config.rs`:      CoreConfig — tunable collision, navigation and PathMap parameters (JSON).
// - `chunk.rs`:       Chunk — sparse growable grid, dirty sections, section snapshots, binary codec.
// - `geometry.rs`:    Per-chunk queries: slab test, DDA ray cast, rectangle sweeps, closest point.
// - `world.rs`:       WorldIndex — owns chunks, multi-chunk queries, brush edits, stream codec.
// - `pathfinding.rs`: Pathfinder — bounded BFS distance field, climb and corner-cutting rules.
// - `path_map.rs`:    PathMap — grid of pathfinders for long-range fallback, flooded with rayon.
//
// Dependency order, leaves first: chunk → geometry → world → pathfinding →
// path_map.
//
// The library logs through the `log` facade and never installs a logger.

pub mod chunk;
pub mod config;
pub mod geometry;
pub mod path_map;
pub mod pathfinding;
pub mod types;
pub mod world;
