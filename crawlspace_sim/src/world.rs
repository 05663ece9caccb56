// The world index: every loaded chunk, and the queries that span them.
//
// `WorldIndex` owns chunks in a `BTreeMap<ChunkId, Chunk>` so iteration is
// always in id order. Chunks may overlap; a voxel is solid if any chunk holds
// a solid block there. Every multi-chunk query fans out to the per-chunk
// version in `geometry.rs` and reduces:
//
// - `cast_all()`: nearest ray hit across chunks, tagged with its chunk.
// - `sweep_box()`: axis-separated swept-AABB collision. Axes resolve in the
//   order Y, X, Z, each against every chunk, keeping the most restrictive
//   stop. Resolving Y first lets a falling box land before it slides.
// - `closest_surface_point()`: nearest solid point, optionally also
//   considering an infinite horizontal plane (the water surface). Each chunk
//   is searched with the current best distance as its radius.
// - `snap_to_ground()` / `snap_to_surface()`: placement helpers built on the
//   two queries above.
//
// Mutation goes through `&mut self` (`set_block`, `apply_brush`,
// `deserialize_all`), queries through `&self`, so the borrow checker rules
// out edits racing with reads. The world is always passed explicitly; there
// is no global chunk list.
//
// Stream format: chunks encoded back to back (see `chunk.rs`). A stream that
// fails to decode and starts with the gzip header is reported as compressed;
// `1f 8b` alone is also a legal chunk width, so the header is only consulted
// after decoding fails.
//
// See also: `chunk.rs` for storage and the per-chunk codec, `geometry.rs`
// for the per-chunk queries, `pathfinding.rs` for the main consumer of
// `is_obstructed`.

use crate::chunk::{Chunk, CodecError};
use crate::config::{CollisionParams, CoreConfig};
use crate::geometry::{RayHit, Rect, distance};
use crate::types::{Axis, BlockType, ChunkId, Vec3, VoxelCoord};
use std::collections::BTreeMap;

/// gzip magic plus the deflate method byte.
const GZIP_MAGIC: [u8; 3] = [0x1f, 0x8b, 0x08];

/// A ray hit, tagged with the chunk it came from.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct WorldHit {
    pub chunk: ChunkId,
    pub hit: RayHit,
}

/// Outcome of `WorldIndex::sweep_box`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SweepResult {
    /// Center of the box after collision.
    pub position: Vec3,
    /// Per-axis collision normal: `-sign(delta)` on each blocked axis, 0
    /// elsewhere.
    pub normal: VoxelCoord,
}

impl SweepResult {
    /// The box was stopped while moving down.
    pub fn grounded(&self) -> bool {
        self.normal.y > 0
    }

    /// The box was stopped on X or Z.
    pub fn against_wall(&self) -> bool {
        self.normal.x != 0 || self.normal.z != 0
    }
}

/// What `WorldIndex::apply_brush` did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BrushOutcome {
    /// Number of voxels whose block changed.
    pub changed: usize,
    /// The erase left the chunk empty and it was removed from the index.
    pub chunk_removed: bool,
}

/// All loaded chunks plus the collision parameters used by `sweep_box`.
#[derive(Clone, Debug)]
pub struct WorldIndex {
    chunks: BTreeMap<ChunkId, Chunk>,
    next_id: u32,
    collision: CollisionParams,
}

impl Default for WorldIndex {
    fn default() -> Self {
        Self::from_config(&CoreConfig::default())
    }
}

impl WorldIndex {
    pub fn new(collision: CollisionParams) -> Self {
        Self {
            chunks: BTreeMap::new(),
            next_id: 0,
            collision,
        }
    }

    pub fn from_config(config: &CoreConfig) -> Self {
        Self::new(config.collision.clone())
    }

    pub fn collision_params(&self) -> &CollisionParams {
        &self.collision
    }

    // -----------------------------------------------------------------------
    // Chunk ownership
    // -----------------------------------------------------------------------

    /// Add a new empty chunk and return its id.
    pub fn add_chunk(&mut self) -> ChunkId {
        self.insert_chunk(Chunk::new())
    }

    /// Take ownership of an existing chunk.
    pub fn insert_chunk(&mut self, chunk: Chunk) -> ChunkId {
        let id = ChunkId(self.next_id);
        self.next_id += 1;
        self.chunks.insert(id, chunk);
        id
    }

    /// Unload a chunk, handing it back to the caller.
    pub fn remove_chunk(&mut self, id: ChunkId) -> Option<Chunk> {
        let removed = self.chunks.remove(&id);
        if removed.is_some() {
            log::debug!("removed chunk {id}");
        }
        removed
    }

    pub fn chunk(&self, id: ChunkId) -> Option<&Chunk> {
        self.chunks.get(&id)
    }

    pub fn chunk_mut(&mut self, id: ChunkId) -> Option<&mut Chunk> {
        self.chunks.get_mut(&id)
    }

    /// All chunks in id order.
    pub fn chunks(&self) -> impl Iterator<Item = (ChunkId, &Chunk)> {
        self.chunks.iter().map(|(&id, chunk)| (id, chunk))
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    // -----------------------------------------------------------------------
    // Point queries and edits
    // -----------------------------------------------------------------------

    /// The first solid block any chunk holds at `coord`, or air.
    pub fn block(&self, coord: VoxelCoord) -> BlockType {
        self.chunks
            .values()
            .map(|chunk| chunk.get(coord))
            .find(|b| b.is_solid())
            .unwrap_or(BlockType::AIR)
    }

    /// Whether any chunk holds a solid block at `coord`.
    pub fn is_obstructed(&self, coord: VoxelCoord) -> bool {
        self.chunks.values().any(|chunk| chunk.get(coord).is_solid())
    }

    /// Set a block in one chunk. Returns `false` if the chunk doesn't exist or
    /// the block was unchanged.
    pub fn set_block(&mut self, id: ChunkId, coord: VoxelCoord, block: BlockType) -> bool {
        self.chunks
            .get_mut(&id)
            .is_some_and(|chunk| chunk.set(coord, block))
    }

    /// Set every voxel within Euclidean `radius` of `center` in one chunk.
    ///
    /// Placing a solid block never overwrites an existing solid block.
    /// Erasing (`BlockType::AIR`) that leaves the chunk empty removes the
    /// chunk from the index.
    pub fn apply_brush(
        &mut self,
        id: ChunkId,
        center: VoxelCoord,
        radius: f32,
        block: BlockType,
    ) -> BrushOutcome {
        let mut outcome = BrushOutcome::default();
        let Some(chunk) = self.chunks.get_mut(&id) else {
            return outcome;
        };
        if radius.is_nan() || radius < 0.0 || radius.is_infinite() {
            return outcome;
        }

        let reach = radius.floor() as i32;
        let radius_sq = f64::from(radius) * f64::from(radius);
        for dz in -reach..=reach {
            for dy in -reach..=reach {
                for dx in -reach..=reach {
                    let d_sq = f64::from(dx * dx + dy * dy + dz * dz);
                    if d_sq > radius_sq {
                        continue;
                    }
                    let coord = center.offset(dx, dy, dz);
                    if block.is_solid() && chunk.get(coord).is_solid() {
                        continue;
                    }
                    if chunk.set(coord, block) {
                        outcome.changed += 1;
                    }
                }
            }
        }

        if block.is_air() && chunk.is_empty() {
            self.remove_chunk(id);
            outcome.chunk_removed = true;
        }
        outcome
    }

    /// Union of every chunk's backing box as `(min, max)` with `max`
    /// exclusive. `None` if no chunk has any extent.
    pub fn bounds(&self) -> Option<(VoxelCoord, VoxelCoord)> {
        self.chunks
            .values()
            .filter(|chunk| chunk.volume() > 0)
            .map(|chunk| (chunk.min(), chunk.max()))
            .reduce(|(lo, hi), (min, max)| {
                (
                    VoxelCoord::new(lo.x.min(min.x), lo.y.min(min.y), lo.z.min(min.z)),
                    VoxelCoord::new(hi.x.max(max.x), hi.y.max(max.y), hi.z.max(max.z)),
                )
            })
    }

    // -----------------------------------------------------------------------
    // Geometric queries
    // -----------------------------------------------------------------------

    /// Nearest ray hit over all chunks. Ties go to the lowest chunk id.
    pub fn cast_all(&self, origin: Vec3, direction: Vec3) -> Option<WorldHit> {
        let mut best: Option<WorldHit> = None;
        for (&id, chunk) in &self.chunks {
            let Some(hit) = chunk.cast(origin, direction) else {
                continue;
            };
            if best.is_none_or(|b| hit.distance < b.hit.distance) {
                best = Some(WorldHit { chunk: id, hit });
            }
        }
        best
    }

    /// Move an axis-aligned box centered at `pos` with full extents `size` by
    /// `delta`, stopping at solid voxels.
    ///
    /// Axes are resolved in the order Y, X, Z; each later axis sweeps from
    /// the position the earlier ones resolved to. Within an axis, the box
    /// cross-section is inset by `sweep_epsilon` so a box flush against a
    /// wall can still slide along it.
    pub fn sweep_box(&self, pos: Vec3, size: Vec3, delta: Vec3) -> SweepResult {
        let half = [size[0] * 0.5, size[1] * 0.5, size[2] * 0.5];
        let mut position = pos;
        let mut normal = VoxelCoord::ZERO;
        for axis in [Axis::Y, Axis::X, Axis::Z] {
            let n = self.sweep_axis(axis, &mut position, half, delta[axis.index()]);
            normal = normal.with(axis, n);
        }
        SweepResult { position, normal }
    }

    /// Resolve one axis of a sweep. Updates `position` and returns the
    /// normal component (0 if unblocked).
    fn sweep_axis(&self, axis: Axis, position: &mut Vec3, half: Vec3, delta: f32) -> i32 {
        if delta == 0.0 || !delta.is_finite() {
            return 0;
        }
        let i = axis.index();
        let sign = delta.signum();
        let target = position[i] + delta;
        let face = position[i] + sign * half[i];
        let target_face = target + sign * half[i];

        let (a, b) = axis.others();
        let (a, b) = (a.index(), b.index());
        let inset = self.collision.sweep_epsilon;
        let rect = Rect {
            min_a: position[a] - half[a] + inset,
            max_a: position[a] + half[a] - inset,
            min_b: position[b] - half[b] + inset,
            max_b: position[b] + half[b] - inset,
        };

        let mut stop = target_face;
        for chunk in self.chunks.values() {
            let s = chunk.cast_rect(axis, face, target_face, rect);
            if (s - stop) * sign < 0.0 {
                stop = s;
            }
        }

        let resolved = stop - sign * half[i];
        position[i] = resolved;
        if (target - resolved).abs() > self.collision.blocked_threshold {
            -(sign as i32)
        } else {
            0
        }
    }

    /// The closest point on any solid voxel (or on the horizontal plane at
    /// `floor_level`, if given) strictly within `radius` of `pos`.
    pub fn closest_surface_point(
        &self,
        pos: Vec3,
        radius: f32,
        floor_level: Option<f32>,
    ) -> Option<Vec3> {
        let mut best = None;
        let mut best_dist = radius;

        if let Some(floor) = floor_level {
            let floor_dist = (pos[1] - floor).abs();
            if floor_dist < best_dist {
                best = Some([pos[0], floor, pos[2]]);
                best_dist = floor_dist;
            }
        }

        for chunk in self.chunks.values() {
            if let Some(p) = chunk.closest_point(pos, best_dist) {
                let d = distance(p, pos);
                if d < best_dist {
                    best = Some(p);
                    best_dist = d;
                }
            }
        }
        best
    }

    /// Drop a `footprint_x` × `footprint_z` rectangle centered under `pos`
    /// straight down from `pos.y` and return the height of the first surface
    /// it meets, or `floor_level` if it meets nothing first.
    pub fn snap_to_ground(
        &self,
        pos: Vec3,
        footprint_x: f32,
        footprint_z: f32,
        floor_level: f32,
    ) -> f32 {
        if pos[1] <= floor_level {
            return floor_level;
        }
        let x = (pos[0] - footprint_x * 0.5, pos[0] + footprint_x * 0.5);
        let z = (pos[2] - footprint_z * 0.5, pos[2] + footprint_z * 0.5);
        self.chunks
            .values()
            .fold(floor_level, |ground, chunk| chunk.cast_rect_y(pos[1], ground, x, z))
    }

    /// Move `pos` to sit `height` away from the nearest surface within
    /// `radius`, along the direction from that surface point to `pos`.
    ///
    /// Returns `pos` unchanged if no surface is near, or if `pos` is exactly
    /// on the surface (the direction is undefined).
    pub fn snap_to_surface(
        &self,
        pos: Vec3,
        radius: f32,
        height: f32,
        floor_level: Option<f32>,
    ) -> Vec3 {
        let Some(ground) = self.closest_surface_point(pos, radius, floor_level) else {
            return pos;
        };
        let away = [pos[0] - ground[0], pos[1] - ground[1], pos[2] - ground[2]];
        let len = distance(pos, ground);
        if len <= 0.0 || !len.is_finite() {
            return pos;
        }
        [
            ground[0] + away[0] / len * height,
            ground[1] + away[1] / len * height,
            ground[2] + away[2] / len * height,
        ]
    }

    // -----------------------------------------------------------------------
    // Stream codec
    // -----------------------------------------------------------------------

    /// Encode every chunk, in id order, back to back.
    pub fn serialize_all(&self) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        for chunk in self.chunks.values() {
            chunk.write_to(&mut out)?;
        }
        Ok(out)
    }

    /// Replace every loaded chunk with the chunks decoded from `bytes`.
    ///
    /// Decoding is all-or-nothing: on error the index is left untouched.
    /// Returns the ids of the new chunks in stream order.
    pub fn deserialize_all(&mut self, bytes: &[u8]) -> Result<Vec<ChunkId>, CodecError> {
        let mut decoded = Vec::new();
        let mut offset = 0;
        while offset < bytes.len() {
            let (chunk, used) = match Chunk::deserialize(&bytes[offset..]) {
                Ok(ok) => ok,
                Err(_) if offset == 0 && bytes.starts_with(&GZIP_MAGIC) => {
                    log::warn!("rejecting gzip-compressed chunk stream ({} bytes)", bytes.len());
                    return Err(CodecError::Compressed);
                }
                Err(e) => {
                    log::warn!("chunk stream decode failed at byte {offset}: {e}");
                    return Err(e);
                }
            };
            decoded.push(chunk);
            offset += used;
        }

        self.chunks.clear();
        let ids: Vec<ChunkId> = decoded.into_iter().map(|c| self.insert_chunk(c)).collect();
        log::debug!("loaded {} chunks from {} bytes", ids.len(), bytes.len());
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(x: i32, y: i32, z: i32) -> VoxelCoord {
        VoxelCoord::new(x, y, z)
    }

    /// A flat 11×11 floor at y = 0 spanning x, z in -5..=5.
    fn floor_world() -> (WorldIndex, ChunkId) {
        let mut world = WorldIndex::default();
        let id = world.add_chunk();
        for x in -5..=5 {
            for z in -5..=5 {
                world.set_block(id, c(x, 0, z), BlockType::BRICKS);
            }
        }
        (world, id)
    }

    #[test]
    fn block_reads_across_overlapping_chunks() {
        let mut world = WorldIndex::default();
        let a = world.add_chunk();
        let b = world.add_chunk();
        world.set_block(a, c(0, 0, 0), BlockType::DIRT);
        world.set_block(b, c(1, 0, 0), BlockType::ROCK);
        assert_eq!(world.block(c(0, 0, 0)), BlockType::DIRT);
        assert_eq!(world.block(c(1, 0, 0)), BlockType::ROCK);
        assert!(world.is_obstructed(c(1, 0, 0)));
        assert!(!world.is_obstructed(c(2, 0, 0)));
    }

    #[test]
    fn set_block_on_missing_chunk_is_noop() {
        let mut world = WorldIndex::default();
        assert!(!world.set_block(ChunkId(7), c(0, 0, 0), BlockType::ROCK));
        assert!(!world.is_obstructed(c(0, 0, 0)));
    }

    #[test]
    fn chunk_ids_are_not_reused() {
        let mut world = WorldIndex::default();
        let a = world.add_chunk();
        world.remove_chunk(a);
        let b = world.add_chunk();
        assert_ne!(a, b);
        assert_eq!(world.len(), 1);
    }

    #[test]
    fn cast_all_picks_nearest_chunk() {
        let mut world = WorldIndex::default();
        let far = world.add_chunk();
        let near = world.add_chunk();
        world.set_block(far, c(0, 0, 0), BlockType::ROCK);
        world.set_block(near, c(0, 3, 0), BlockType::ROCK);
        let hit = world.cast_all([0.5, 10.0, 0.5], [0.0, -1.0, 0.0]).unwrap();
        assert_eq!(hit.chunk, near);
        assert_eq!(hit.hit.voxel, c(0, 3, 0));
        assert_eq!(hit.hit.point[1], 4.0);
    }

    #[test]
    fn cast_all_on_empty_world_misses() {
        let world = WorldIndex::default();
        assert!(world.cast_all([0.0, 0.0, 0.0], [1.0, 0.0, 0.0]).is_none());
    }

    #[test]
    fn falling_box_lands_on_floor() {
        let (world, _) = floor_world();
        let result = world.sweep_box([0.5, 5.0, 0.5], [0.5, 1.0, 0.5], [0.0, -20.0, 0.0]);
        assert_eq!(result.position[1], 1.5);
        assert!(result.grounded());
        assert!(!result.against_wall());
        assert_eq!(result.normal, c(0, 1, 0));
    }

    #[test]
    fn box_resting_on_floor_slides_freely() {
        let (world, _) = floor_world();
        let result = world.sweep_box([0.5, 1.5, 0.5], [1.0, 1.0, 1.0], [2.0, 0.0, -1.0]);
        assert_eq!(result.position, [2.5, 1.5, -0.5]);
        assert_eq!(result.normal, VoxelCoord::ZERO);
    }

    #[test]
    fn wall_blocks_one_axis_only() {
        let (mut world, id) = floor_world();
        for z in -5..=5 {
            world.set_block(id, c(3, 1, z), BlockType::ROCK);
        }
        let result = world.sweep_box([0.5, 1.5, 0.5], [1.0, 1.0, 1.0], [10.0, 0.0, 1.0]);
        assert_eq!(result.position[0], 2.5);
        assert_eq!(result.position[2], 1.5);
        assert_eq!(result.normal, c(-1, 0, 0));
        assert!(result.against_wall());
    }

    #[test]
    fn sweep_takes_most_restrictive_chunk() {
        let mut world = WorldIndex::default();
        let a = world.add_chunk();
        let b = world.add_chunk();
        world.set_block(a, c(8, 0, 0), BlockType::ROCK);
        world.set_block(b, c(4, 0, 0), BlockType::ROCK);
        let result = world.sweep_box([0.5, 0.5, 0.5], [0.2, 0.2, 0.2], [100.0, 0.0, 0.0]);
        assert!((result.position[0] - 3.9).abs() < 1e-5);
        assert_eq!(result.normal.x, -1);
    }

    #[test]
    fn closest_surface_prefers_nearer_floor_plane() {
        let (world, _) = floor_world();
        // Far from the bricks horizontally, so only the plane is in reach.
        let p = world
            .closest_surface_point([40.5, -0.5, 40.5], 2.0, Some(-1.0))
            .unwrap();
        assert_eq!(p, [40.5, -1.0, 40.5]);
        // Above the bricks, the top face wins.
        let p = world
            .closest_surface_point([0.5, 1.5, 0.5], 2.0, Some(-1.0))
            .unwrap();
        assert_eq!(p, [0.5, 1.0, 0.5]);
        assert!(world.closest_surface_point([40.5, 10.0, 40.5], 2.0, None).is_none());
    }

    #[test]
    fn snap_to_ground_finds_highest_surface_below() {
        let (mut world, id) = floor_world();
        world.set_block(id, c(2, 1, 2), BlockType::ROCK);
        assert_eq!(world.snap_to_ground([0.5, 10.0, 0.5], 0.5, 0.5, -1.0), 1.0);
        assert_eq!(world.snap_to_ground([2.5, 10.0, 2.5], 0.5, 0.5, -1.0), 2.0);
        assert_eq!(world.snap_to_ground([30.5, 10.0, 30.5], 0.5, 0.5, -1.0), -1.0);
        assert_eq!(world.snap_to_ground([30.5, -3.0, 30.5], 0.5, 0.5, -1.0), -1.0);
    }

    #[test]
    fn snap_to_surface_hovers_at_height() {
        let (world, _) = floor_world();
        let p = world.snap_to_surface([0.5, 1.5, 0.5], 2.0, 0.25, None);
        assert!((p[1] - 1.25).abs() < 1e-6);
        // Nothing in range: unchanged.
        let far = [40.0, 40.0, 40.0];
        assert_eq!(world.snap_to_surface(far, 2.0, 0.25, None), far);
        // Exactly on the surface: unchanged.
        let on = [0.5, 1.0, 0.5];
        assert_eq!(world.snap_to_surface(on, 2.0, 0.25, None), on);
    }

    #[test]
    fn bounds_unions_chunks() {
        let mut world = WorldIndex::default();
        assert_eq!(world.bounds(), None);
        let a = world.add_chunk();
        let b = world.add_chunk();
        world.set_block(a, c(-2, 0, 0), BlockType::ROCK);
        world.set_block(b, c(4, 3, 1), BlockType::ROCK);
        assert_eq!(world.bounds(), Some((c(-2, 0, 0), c(5, 4, 2))));
    }

    #[test]
    fn brush_places_sphere_without_overwriting() {
        let mut world = WorldIndex::default();
        let id = world.add_chunk();
        world.set_block(id, c(0, 0, 0), BlockType::GRASS);
        let outcome = world.apply_brush(id, c(0, 0, 0), 1.0, BlockType::ROCK);
        // Six face neighbors; the center keeps its grass.
        assert_eq!(outcome.changed, 6);
        assert_eq!(world.block(c(0, 0, 0)), BlockType::GRASS);
        assert_eq!(world.block(c(1, 0, 0)), BlockType::ROCK);
        assert!(!world.is_obstructed(c(1, 1, 0)));
    }

    #[test]
    fn brush_erase_removes_emptied_chunk() {
        let mut world = WorldIndex::default();
        let id = world.add_chunk();
        world.set_block(id, c(0, 0, 0), BlockType::ROCK);
        world.set_block(id, c(1, 0, 0), BlockType::ROCK);
        let outcome = world.apply_brush(id, c(0, 0, 0), 1.5, BlockType::AIR);
        assert_eq!(outcome.changed, 2);
        assert!(outcome.chunk_removed);
        assert!(world.chunk(id).is_none());
    }

    #[test]
    fn brush_erase_keeps_nonempty_chunk() {
        let mut world = WorldIndex::default();
        let id = world.add_chunk();
        world.set_block(id, c(0, 0, 0), BlockType::ROCK);
        world.set_block(id, c(5, 0, 0), BlockType::ROCK);
        let outcome = world.apply_brush(id, c(0, 0, 0), 0.0, BlockType::AIR);
        assert_eq!(outcome.changed, 1);
        assert!(!outcome.chunk_removed);
        assert!(world.chunk(id).is_some());
    }

    #[test]
    fn stream_round_trip_replaces_chunks() {
        let mut world = WorldIndex::default();
        let a = world.add_chunk();
        let b = world.add_chunk();
        world.set_block(a, c(0, 0, 0), BlockType::ROCK);
        world.set_block(b, c(-3, 2, 7), BlockType::SAND);
        world.add_chunk();
        let bytes = world.serialize_all().unwrap();

        let mut restored = WorldIndex::default();
        restored.add_chunk();
        let ids = restored.deserialize_all(&bytes).unwrap();
        assert_eq!(ids.len(), 3);
        assert_eq!(restored.len(), 3);
        assert_eq!(restored.block(c(0, 0, 0)), BlockType::ROCK);
        assert_eq!(restored.block(c(-3, 2, 7)), BlockType::SAND);
    }

    #[test]
    fn gzip_stream_is_rejected() {
        let mut world = WorldIndex::default();
        let err = world.deserialize_all(&[0x1f, 0x8b, 0x08, 0x00]).unwrap_err();
        assert_eq!(err, CodecError::Compressed);
    }

    #[test]
    fn chunk_width_matching_gzip_magic_round_trips() {
        // Width 0x8b1f encodes as `1f 8b`; height 8 adds the `08` byte.
        let mut world = WorldIndex::default();
        let id = world.add_chunk();
        world.set_block(id, c(0, 0, 0), BlockType::ROCK);
        world.set_block(id, c(0x8b1f - 1, 7, 0), BlockType::SAND);
        let bytes = world.serialize_all().unwrap();
        assert!(bytes.starts_with(&GZIP_MAGIC));

        let mut restored = WorldIndex::default();
        let ids = restored.deserialize_all(&bytes).unwrap();
        assert_eq!(ids.len(), 1);
        assert_eq!(restored.block(c(0, 0, 0)), BlockType::ROCK);
        assert_eq!(restored.block(c(0x8b1f - 1, 7, 0)), BlockType::SAND);
        assert_eq!(restored.bounds(), world.bounds());
    }

    #[test]
    fn truncated_stream_leaves_index_untouched() {
        let mut world = WorldIndex::default();
        let id = world.add_chunk();
        world.set_block(id, c(1, 1, 1), BlockType::ROCK);
        let mut bytes = world.serialize_all().unwrap();
        bytes.pop();

        let mut other = WorldIndex::default();
        let keep = other.add_chunk();
        other.set_block(keep, c(9, 9, 9), BlockType::DIRT);
        assert!(matches!(
            other.deserialize_all(&bytes),
            Err(CodecError::Truncated { .. })
        ));
        assert_eq!(other.len(), 1);
        assert!(other.is_obstructed(c(9, 9, 9)));
    }
}
