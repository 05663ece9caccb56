// Sparse, growable voxel chunk.
//
// A `Chunk` is a dense `Vec<BlockType>` covering an axis-aligned box that
// starts at `origin` and spans `size` voxels, indexed
// `x + y * size_x + z * size_x * size_y` (x fastest, then y, then z). Reads
// outside the box return air, so callers never bounds-check; the box is an
// implementation detail, not a world boundary.
//
// Writing a solid block outside the box grows it to the union of the old box
// and the new cell, copying the existing rows into their new offsets. The box
// never shrinks, even when blocks are cleared back to air. Writes below
// `FLOOR_Y` are dropped: that is the hard world floor.
//
// Dirty tracking: the chunk is partitioned into `SECTION_SIZE`³ sections.
// Every changed block marks the sections of all 27 cells in its 3×3×3
// neighborhood dirty, because a block's face culling and corner shading
// depend on its neighbors. The renderer drains the set with `take_dirty()`
// (or `dirty_sections()` + `clear_dirty()`) and pulls block data through
// `section_snapshot()`, which copies the section plus a one-voxel halo.
//
// Binary format (little-endian, no padding):
//
//   u16 size_x, size_y, size_z
//   i16 origin_x, origin_y, origin_z
//   u8  blocks[size_x * size_y * size_z]   (storage order)
//
// Chunks concatenate back to back with no separator; `deserialize` returns
// how many bytes it consumed so the caller can continue at that offset.
// Compression is the caller's concern.
//
// See also: `geometry.rs` for ray/sweep queries on a single chunk,
// `world.rs` for the multi-chunk index and stream codec.

use crate::types::{BlockType, VoxelCoord};
use smallvec::SmallVec;
use std::collections::BTreeSet;
use std::fmt;

/// Lowest world Y that can hold a block. Writes below it are no-ops.
pub const FLOOR_Y: i32 = -5;

/// Edge length of a dirty-tracking section, in voxels.
pub const SECTION_SIZE: i32 = 16;

/// Serialized header length: three `u16` sizes and three `i16` origin
/// components.
pub const HEADER_LEN: usize = 12;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

/// Coordinate of a `SECTION_SIZE`³ section, in section units.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SectionCoord(pub VoxelCoord);

impl SectionCoord {
    /// The section containing a voxel. Floors toward negative infinity, so
    /// voxel -1 is in section -1.
    pub fn containing(voxel: VoxelCoord) -> Self {
        Self(VoxelCoord::new(
            voxel.x.div_euclid(SECTION_SIZE),
            voxel.y.div_euclid(SECTION_SIZE),
            voxel.z.div_euclid(SECTION_SIZE),
        ))
    }

    /// First voxel of the section.
    pub fn min_voxel(self) -> VoxelCoord {
        VoxelCoord::new(
            self.0.x * SECTION_SIZE,
            self.0.y * SECTION_SIZE,
            self.0.z * SECTION_SIZE,
        )
    }

    /// One past the last voxel of the section on every axis.
    pub fn max_voxel(self) -> VoxelCoord {
        self.min_voxel()
            .offset(SECTION_SIZE, SECTION_SIZE, SECTION_SIZE)
    }
}

// ---------------------------------------------------------------------------
// Codec errors
// ---------------------------------------------------------------------------

/// Failure to encode or decode chunk data.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CodecError {
    /// The buffer ended before the header or block array was complete.
    Truncated { needed: usize, available: usize },
    /// A chunk dimension does not fit the header's `u16` size field.
    ExtentTooLarge { axis: usize, size: u32 },
    /// An origin component does not fit the header's `i16` origin field.
    OriginOutOfRange { axis: usize, origin: i32 },
    /// The stream starts with the gzip magic bytes; it must be decompressed
    /// before decoding.
    Compressed,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::Truncated { needed, available } => write!(
                f,
                "chunk data truncated: need {needed} bytes, have {available}"
            ),
            CodecError::ExtentTooLarge { axis, size } => write!(
                f,
                "chunk extent {size} on axis {axis} exceeds {} voxels",
                u16::MAX
            ),
            CodecError::OriginOutOfRange { axis, origin } => write!(
                f,
                "chunk origin {origin} on axis {axis} outside {}..={}",
                i16::MIN,
                i16::MAX
            ),
            CodecError::Compressed => write!(f, "stream is gzip-compressed; decompress first"),
        }
    }
}

impl std::error::Error for CodecError {}

// ---------------------------------------------------------------------------
// Chunk
// ---------------------------------------------------------------------------

/// A sparse, growable block grid. See the module header for layout.
#[derive(Clone, Debug, Default)]
pub struct Chunk {
    origin: VoxelCoord,
    size: [u32; 3],
    /// Flat storage: index = x + y * size_x + z * size_x * size_y.
    blocks: Vec<BlockType>,
    dirty: BTreeSet<SectionCoord>,
}

impl Chunk {
    /// Create an empty, zero-sized chunk.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn origin(&self) -> VoxelCoord {
        self.origin
    }

    pub fn size(&self) -> [u32; 3] {
        self.size
    }

    /// Minimum corner of the backing box (inclusive).
    pub fn min(&self) -> VoxelCoord {
        self.origin
    }

    /// Maximum corner of the backing box (exclusive).
    pub fn max(&self) -> VoxelCoord {
        self.origin
            .offset(self.size[0] as i32, self.size[1] as i32, self.size[2] as i32)
    }

    /// Number of cells in the backing array.
    pub fn volume(&self) -> usize {
        self.blocks.len()
    }

    /// Whether `coord` lies inside the backing box.
    pub fn contains(&self, coord: VoxelCoord) -> bool {
        self.index(coord).is_some()
    }

    /// Convert a world coordinate to a flat index. Returns `None` outside the
    /// backing box.
    fn index(&self, coord: VoxelCoord) -> Option<usize> {
        let lx = i64::from(coord.x) - i64::from(self.origin.x);
        let ly = i64::from(coord.y) - i64::from(self.origin.y);
        let lz = i64::from(coord.z) - i64::from(self.origin.z);
        let [sx, sy, sz] = self.size.map(i64::from);
        if lx < 0 || ly < 0 || lz < 0 || lx >= sx || ly >= sy || lz >= sz {
            return None;
        }
        Some((lx + (ly + lz * sy) * sx) as usize)
    }

    /// Read a block. Returns `AIR` outside the backing box.
    pub fn get(&self, coord: VoxelCoord) -> BlockType {
        self.index(coord)
            .map(|i| self.blocks[i])
            .unwrap_or(BlockType::AIR)
    }

    /// Write a block, growing the chunk if needed.
    ///
    /// Returns `true` if the stored value changed (and sections were marked
    /// dirty). Writes below `FLOOR_Y`, air written outside the backing box,
    /// and cells the box cannot reach (x, y or z at `i32::MAX`, since the
    /// exclusive max corner must fit in an `i32`) change nothing.
    pub fn set(&mut self, coord: VoxelCoord, block: BlockType) -> bool {
        if coord.y < FLOOR_Y {
            return false;
        }
        if self.index(coord).is_none() {
            if block.is_air() || !self.grow_to_include(coord) {
                return false;
            }
        }
        let Some(i) = self.index(coord) else {
            return false;
        };
        if self.blocks[i] == block {
            return false;
        }
        self.blocks[i] = block;
        self.mark_neighborhood_dirty(coord);
        true
    }

    /// Returns `true` if no cell holds a solid block.
    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|b| b.is_air())
    }

    /// Reallocate to the union of the current box and `coord`, preserving
    /// every existing cell at its world coordinate. A zero-volume chunk
    /// grows to exactly the one cell. Returns `false`, leaving the chunk
    /// untouched, if the grown box is not representable.
    fn grow_to_include(&mut self, coord: VoxelCoord) -> bool {
        let Some(end) = coord
            .x
            .checked_add(1)
            .zip(coord.y.checked_add(1))
            .zip(coord.z.checked_add(1))
            .map(|((x, y), z)| VoxelCoord::new(x, y, z))
        else {
            return false;
        };
        let (new_min, new_max) = if self.blocks.is_empty() {
            (coord, end)
        } else {
            let min = self.min();
            let max = self.max();
            (
                VoxelCoord::new(min.x.min(coord.x), min.y.min(coord.y), min.z.min(coord.z)),
                VoxelCoord::new(max.x.max(end.x), max.y.max(end.y), max.z.max(end.z)),
            )
        };
        let span = |lo: i32, hi: i32| u32::try_from(i64::from(hi) - i64::from(lo)).ok();
        let (Some(sx), Some(sy), Some(sz)) = (
            span(new_min.x, new_max.x),
            span(new_min.y, new_max.y),
            span(new_min.z, new_max.z),
        ) else {
            return false;
        };
        let new_size = [sx, sy, sz];
        let [nx, ny, nz] = new_size.map(|s| s as usize);
        let Some(volume) = nx.checked_mul(ny).and_then(|v| v.checked_mul(nz)) else {
            return false;
        };
        let mut new_blocks = vec![BlockType::AIR; volume];

        if !self.blocks.is_empty() {
            let [sx, sy, sz] = self.size.map(|s| s as usize);
            let shift = |from: i32, to: i32| (i64::from(from) - i64::from(to)) as usize;
            let ox = shift(self.origin.x, new_min.x);
            let oy = shift(self.origin.y, new_min.y);
            let oz = shift(self.origin.z, new_min.z);
            for z in 0..sz {
                for y in 0..sy {
                    let src = (y + z * sy) * sx;
                    let dst = ox + (oy + y) * nx + (oz + z) * nx * ny;
                    new_blocks[dst..dst + sx].copy_from_slice(&self.blocks[src..src + sx]);
                }
            }
        }

        log::debug!(
            "chunk grew from {:?} at {} to {:?} at {}",
            self.size,
            self.origin,
            new_size,
            new_min
        );
        self.origin = new_min;
        self.size = new_size;
        self.blocks = new_blocks;
        true
    }

    // -----------------------------------------------------------------------
    // Dirty sections
    // -----------------------------------------------------------------------

    /// Mark the sections of every cell in the 3×3×3 neighborhood of `coord`.
    fn mark_neighborhood_dirty(&mut self, coord: VoxelCoord) {
        let mut touched: SmallVec<[SectionCoord; 8]> = SmallVec::new();
        for dz in -1..=1 {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    let section = SectionCoord::containing(VoxelCoord::new(
                        coord.x.saturating_add(dx),
                        coord.y.saturating_add(dy),
                        coord.z.saturating_add(dz),
                    ));
                    if !touched.contains(&section) {
                        touched.push(section);
                    }
                }
            }
        }
        self.dirty.extend(touched);
    }

    /// Sections whose geometry must be rebuilt, in ascending order.
    pub fn dirty_sections(&self) -> impl Iterator<Item = SectionCoord> + '_ {
        self.dirty.iter().copied()
    }

    pub fn is_dirty(&self, section: SectionCoord) -> bool {
        self.dirty.contains(&section)
    }

    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    /// Drain the dirty set.
    pub fn take_dirty(&mut self) -> BTreeSet<SectionCoord> {
        std::mem::take(&mut self.dirty)
    }

    /// Mark every section overlapping the backing box dirty. Used after
    /// loading, when nothing has been rendered yet.
    pub fn mark_all_dirty(&mut self) {
        let sections: Vec<SectionCoord> = self.sections().collect();
        self.dirty.extend(sections);
    }

    /// Every section overlapping the backing box.
    pub fn sections(&self) -> impl Iterator<Item = SectionCoord> + use<> {
        let (lo, hi) = if self.blocks.is_empty() {
            (VoxelCoord::ZERO, VoxelCoord::new(-1, -1, -1))
        } else {
            let max = self.max();
            (
                SectionCoord::containing(self.min()).0,
                SectionCoord::containing(max.offset(-1, -1, -1)).0,
            )
        };
        (lo.z..=hi.z).flat_map(move |z| {
            (lo.y..=hi.y).flat_map(move |y| {
                (lo.x..=hi.x).map(move |x| SectionCoord(VoxelCoord::new(x, y, z)))
            })
        })
    }

    /// World-space voxel range `[min, max)` of a section.
    pub fn section_bounds(&self, section: SectionCoord) -> (VoxelCoord, VoxelCoord) {
        (section.min_voxel(), section.max_voxel())
    }

    /// Copy a section's blocks plus a one-voxel halo for meshing.
    pub fn section_snapshot(&self, section: SectionCoord) -> SectionSnapshot {
        let min = section.min_voxel().offset(-1, -1, -1);
        let edge = SNAPSHOT_EDGE;
        let mut blocks = Vec::with_capacity(edge * edge * edge);
        for z in 0..edge as i32 {
            for y in 0..edge as i32 {
                for x in 0..edge as i32 {
                    blocks.push(self.get(min.offset(x, y, z)));
                }
            }
        }
        SectionSnapshot {
            section,
            min,
            blocks,
        }
    }

    // -----------------------------------------------------------------------
    // Binary codec
    // -----------------------------------------------------------------------

    /// Encode this chunk into a fresh buffer.
    pub fn serialize(&self) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.blocks.len());
        self.write_to(&mut out)?;
        Ok(out)
    }

    /// Append this chunk's encoding to `out`. On error nothing is written.
    pub fn write_to(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        let mut sizes = [0u16; 3];
        let mut origin = [0i16; 3];
        let origin_components = [self.origin.x, self.origin.y, self.origin.z];
        for axis in 0..3 {
            sizes[axis] = u16::try_from(self.size[axis]).map_err(|_| CodecError::ExtentTooLarge {
                axis,
                size: self.size[axis],
            })?;
            origin[axis] = i16::try_from(origin_components[axis]).map_err(|_| {
                CodecError::OriginOutOfRange {
                    axis,
                    origin: origin_components[axis],
                }
            })?;
        }

        out.reserve(HEADER_LEN + self.blocks.len());
        for s in sizes {
            out.extend_from_slice(&s.to_le_bytes());
        }
        for o in origin {
            out.extend_from_slice(&o.to_le_bytes());
        }
        out.extend(self.blocks.iter().map(|b| b.0));
        Ok(())
    }

    /// Decode one chunk from the start of `bytes`.
    ///
    /// Returns the chunk and the number of bytes consumed. Trailing bytes are
    /// left for the caller (the next chunk in a stream). The decoded chunk has
    /// every section marked dirty.
    pub fn deserialize(bytes: &[u8]) -> Result<(Chunk, usize), CodecError> {
        if bytes.len() < HEADER_LEN {
            return Err(CodecError::Truncated {
                needed: HEADER_LEN,
                available: bytes.len(),
            });
        }
        let read_u16 = |at: usize| u16::from_le_bytes([bytes[at], bytes[at + 1]]);
        let read_i16 = |at: usize| i16::from_le_bytes([bytes[at], bytes[at + 1]]);

        let size = [
            u32::from(read_u16(0)),
            u32::from(read_u16(2)),
            u32::from(read_u16(4)),
        ];
        let origin = VoxelCoord::new(
            i32::from(read_i16(6)),
            i32::from(read_i16(8)),
            i32::from(read_i16(10)),
        );

        // At most 65535³ cells, which fits in u64.
        let count = u64::from(size[0]) * u64::from(size[1]) * u64::from(size[2]);
        let needed = usize::try_from(count)
            .ok()
            .and_then(|c| c.checked_add(HEADER_LEN))
            .unwrap_or(usize::MAX);
        if bytes.len() < needed {
            return Err(CodecError::Truncated {
                needed,
                available: bytes.len(),
            });
        }

        let blocks = bytes[HEADER_LEN..needed]
            .iter()
            .map(|&b| BlockType(b))
            .collect();
        let mut chunk = Chunk {
            origin,
            size,
            blocks,
            dirty: BTreeSet::new(),
        };
        chunk.mark_all_dirty();
        Ok((chunk, needed))
    }
}

// ---------------------------------------------------------------------------
// Section snapshots
// ---------------------------------------------------------------------------

/// Snapshot edge: the section plus one halo voxel on each side.
const SNAPSHOT_EDGE: usize = SECTION_SIZE as usize + 2;

/// Dense copy of one section plus a one-voxel halo, handed to the renderer.
///
/// Reads outside the halo return air. The snapshot is detached from the
/// chunk, so meshing can run on another thread while the chunk keeps
/// changing.
#[derive(Clone, Debug)]
pub struct SectionSnapshot {
    section: SectionCoord,
    /// World coordinate of the halo's minimum corner.
    min: VoxelCoord,
    blocks: Vec<BlockType>,
}

impl SectionSnapshot {
    pub fn section(&self) -> SectionCoord {
        self.section
    }

    /// Read a block by world coordinate.
    pub fn get(&self, coord: VoxelCoord) -> BlockType {
        let edge = SNAPSHOT_EDGE as i32;
        let l = coord - self.min;
        if l.x < 0 || l.y < 0 || l.z < 0 || l.x >= edge || l.y >= edge || l.z >= edge {
            return BlockType::AIR;
        }
        self.blocks[(l.x + (l.y + l.z * edge) * edge) as usize]
    }

    /// Solid voxels inside the section proper (halo excluded), with their
    /// block types.
    pub fn solid_voxels(&self) -> impl Iterator<Item = (VoxelCoord, BlockType)> + '_ {
        let lo = self.section.min_voxel();
        (0..SECTION_SIZE).flat_map(move |z| {
            (0..SECTION_SIZE).flat_map(move |y| {
                (0..SECTION_SIZE).filter_map(move |x| {
                    let c = lo.offset(x, y, z);
                    let b = self.get(c);
                    b.is_solid().then_some((c, b))
                })
            })
        })
    }

    /// Whether the face of solid voxel `coord` pointing along the unit
    /// `normal` should be drawn: the neighbor across it is air. Bottom faces
    /// of the floor layer are never drawn.
    pub fn face_exposed(&self, coord: VoxelCoord, normal: VoxelCoord) -> bool {
        if self.get(coord).is_air() {
            return false;
        }
        if coord.y == FLOOR_Y && normal == VoxelCoord::new(0, -1, 0) {
            return false;
        }
        self.get(coord + normal).is_air()
    }

    /// Ambient-occlusion term for one corner of a face.
    ///
    /// `tangent` and `bitangent` are the signed unit vectors from the face
    /// center toward the corner. The corner is shaded if either edge
    /// neighbor or the diagonal neighbor in front of the face is solid.
    pub fn corner_shaded(
        &self,
        coord: VoxelCoord,
        normal: VoxelCoord,
        tangent: VoxelCoord,
        bitangent: VoxelCoord,
    ) -> bool {
        let front = coord + normal;
        self.get(front + tangent).is_solid()
            || self.get(front + bitangent).is_solid()
            || self.get(front + tangent + bitangent).is_solid()
    }
}
