// Core types shared across the crawlspace core.
//
// Defines integer voxel coordinates (`VoxelCoord`), block identifiers
// (`BlockType`), the `Axis` enum used by the per-axis sweep routines, and
// the `ChunkId` handle the world index hands out. Plain-data types derive
// `Serialize`/`Deserialize` so they can appear in config files and debug
// dumps.
//
// World-space float positions are plain `[f32; 3]` arrays (`Vec3`), the same
// representation the DDA code in `geometry.rs` works in. There is no vector
// math crate in this workspace; the handful of operations the queries need
// live next to the code that needs them.
//
// See also: `chunk.rs` for `SectionCoord` and the storage constants,
// `world.rs` for where `ChunkId`s are issued.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Sub};

/// A world-space position or direction.
pub type Vec3 = [f32; 3];

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// A position in the 3D voxel grid. Each component is in voxel units; the
/// voxel `(x, y, z)` covers the unit cube `[x, x+1) × [y, y+1) × [z, z+1)`.
///
/// Y is up. The world floor and the water surface are expressed as Y levels
/// (see `chunk::FLOOR_Y` and `NavParams::water_level`).
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct VoxelCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl VoxelCoord {
    pub const ZERO: Self = Self::new(0, 0, 0);

    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The voxel containing a world-space point (component-wise floor).
    pub fn containing(p: Vec3) -> Self {
        Self::new(p[0].floor() as i32, p[1].floor() as i32, p[2].floor() as i32)
    }

    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    pub fn get(self, axis: Axis) -> i32 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }

    /// Copy of `self` with one component replaced.
    pub fn with(self, axis: Axis, value: i32) -> Self {
        let mut out = self;
        match axis {
            Axis::X => out.x = value,
            Axis::Y => out.y = value,
            Axis::Z => out.z = value,
        }
        out
    }

    /// Manhattan distance between two coordinates.
    pub fn manhattan_distance(self, other: Self) -> u32 {
        ((self.x - other.x).unsigned_abs())
            + ((self.y - other.y).unsigned_abs())
            + ((self.z - other.z).unsigned_abs())
    }

    /// Largest per-axis difference (the 26-connected step count with no
    /// obstacles).
    pub fn chebyshev_distance(self, other: Self) -> u32 {
        (self.x - other.x)
            .unsigned_abs()
            .max((self.y - other.y).unsigned_abs())
            .max((self.z - other.z).unsigned_abs())
    }

    /// Squared Euclidean distance, widened so it cannot overflow.
    pub fn distance_squared(self, other: Self) -> i64 {
        let dx = i64::from(self.x - other.x);
        let dy = i64::from(self.y - other.y);
        let dz = i64::from(self.z - other.z);
        dx * dx + dy * dy + dz * dz
    }

    /// Number of axes on which the two coordinates differ (0–3).
    pub fn differing_axes(self, other: Self) -> u32 {
        u32::from(self.x != other.x) + u32::from(self.y != other.y) + u32::from(self.z != other.z)
    }

    /// Minimum corner of this voxel in world space.
    pub fn to_world(self) -> Vec3 {
        [self.x as f32, self.y as f32, self.z as f32]
    }
}

impl Add for VoxelCoord {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.x + rhs.x, self.y + rhs.y, self.z + rhs.z)
    }
}

impl Sub for VoxelCoord {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.x - rhs.x, self.y - rhs.y, self.z - rhs.z)
    }
}

impl fmt::Display for VoxelCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

/// One of the three world axes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Index into a `Vec3` / `[_; 3]`.
    pub const fn index(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// The two axes perpendicular to this one, in X→Y→Z order.
    pub const fn others(self) -> (Axis, Axis) {
        match self {
            Axis::X => (Axis::Y, Axis::Z),
            Axis::Y => (Axis::X, Axis::Z),
            Axis::Z => (Axis::X, Axis::Y),
        }
    }
}

// ---------------------------------------------------------------------------
// Block types
// ---------------------------------------------------------------------------

/// The material of a single voxel. `0` is air; every nonzero value is solid.
///
/// The core only distinguishes empty from solid. The named constants cover
/// the stock palette; gameplay code may store any other nonzero id.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BlockType(pub u8);

impl BlockType {
    pub const AIR: Self = Self(0);
    pub const BRICKS: Self = Self(1);
    pub const DIRT: Self = Self(2);
    pub const GRASS: Self = Self(3);
    pub const TILES: Self = Self(4);
    pub const WOOD_BEAM: Self = Self(5);
    pub const PAINTED_WOOD: Self = Self(6);
    pub const ROCK: Self = Self(7);
    pub const SAND: Self = Self(8);
    pub const GRAVEL: Self = Self(9);

    pub const fn is_solid(self) -> bool {
        self.0 != 0
    }

    pub const fn is_air(self) -> bool {
        self.0 == 0
    }
}

// ---------------------------------------------------------------------------
// Handles
// ---------------------------------------------------------------------------

/// Handle for a chunk owned by a `WorldIndex`. Issued sequentially and never
/// reused within one index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkId(pub u32);

impl fmt::Display for ChunkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkId({})", self.0)
    }
}
