// Geometric queries against a single chunk.
//
// Everything here is built on `Chunk::get` and the chunk's bounding box:
//
// - `ray_aabb()`: slab test of a ray against an axis-aligned box.
// - `Chunk::cast()`: 3D DDA (Amanatides & Woo) voxel traversal returning the
//   first solid voxel, the exact hit point, and the face normal.
// - `Chunk::cast_rect()`: sweeps a box cross-section along one axis, one
//   voxel row at a time, and returns where the leading face must stop.
//   Because every intervening row is tested, a large step cannot tunnel
//   through thin geometry.
// - `Chunk::any_solid()` / `Chunk::closest_point()`: brute-force region
//   scans. Both are O(r³) and are only meant for the small radii used by
//   collision and ground snapping.
//
// Degenerate rays (zero-length, NaN or infinite components) are rejected up
// front and never reach the DDA loop.
//
// See also: `chunk.rs` for storage, `world.rs` for the multi-chunk versions
// of these queries (`cast_all`, `sweep_box`, `closest_surface_point`).

use crate::chunk::Chunk;
use crate::types::{Axis, Vec3, VoxelCoord};

/// Distance the DDA starts in front of the box entry point, so the first
/// step crosses the entry face and records its normal.
const ENTRY_BACKOFF: f32 = 0.01;

/// The first solid voxel along a ray.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
    /// The solid voxel that was hit.
    pub voxel: VoxelCoord,
    /// World-space point where the ray meets the voxel's face.
    pub point: Vec3,
    /// Unit normal of the face that was hit (points back toward the ray).
    pub normal: VoxelCoord,
    /// Distance from the ray origin to `point`.
    pub distance: f32,
}

impl RayHit {
    /// The empty voxel in front of the hit face, where a placed block goes.
    pub fn adjacent_voxel(&self) -> VoxelCoord {
        self.voxel + self.normal
    }
}

/// Cross-section of a box on the two axes perpendicular to a sweep, in
/// world units. `a` and `b` follow `Axis::others()` order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub min_a: f32,
    pub max_a: f32,
    pub min_b: f32,
    pub max_b: f32,
}

fn length(v: Vec3) -> f32 {
    (v[0] * v[0] + v[1] * v[1] + v[2] * v[2]).sqrt()
}

/// Normalize a direction, rejecting anything that would make the traversal
/// misbehave.
fn usable_direction(dir: Vec3) -> Option<Vec3> {
    if dir.iter().any(|c| !c.is_finite()) {
        return None;
    }
    let len = length(dir);
    if !len.is_finite() || len <= 0.0 {
        return None;
    }
    Some([dir[0] / len, dir[1] / len, dir[2] / len])
}

/// Slab test: the ray parameter at which `origin + dir * t` first enters the
/// box `[min, max]`, or `None` if it never does.
///
/// Returns `Some(0.0)` when the origin is already inside (boundary
/// inclusive). Axes with a zero direction component only pass if the origin
/// lies within that slab. Non-finite intermediate results are rejected.
pub fn ray_aabb(origin: Vec3, dir: Vec3, min: Vec3, max: Vec3) -> Option<f32> {
    if (0..3).all(|i| origin[i] >= min[i] && origin[i] <= max[i]) {
        return Some(0.0);
    }

    let mut t_near = f32::NEG_INFINITY;
    let mut t_far = f32::INFINITY;
    for i in 0..3 {
        if dir[i] == 0.0 {
            if origin[i] < min[i] || origin[i] > max[i] {
                return None;
            }
            continue;
        }
        let t1 = (min[i] - origin[i]) / dir[i];
        let t2 = (max[i] - origin[i]) / dir[i];
        if !t1.is_finite() || !t2.is_finite() {
            return None;
        }
        t_near = t_near.max(t1.min(t2));
        t_far = t_far.min(t1.max(t2));
    }

    if t_near > t_far || t_far < 0.0 || !t_near.is_finite() {
        return None;
    }
    Some(t_near.max(0.0))
}

/// The point of the unit cube at `voxel` closest to `p` (per-axis clamp).
pub fn closest_point_on_voxel(voxel: VoxelCoord, p: Vec3) -> Vec3 {
    let lo = voxel.to_world();
    [
        p[0].clamp(lo[0], lo[0] + 1.0),
        p[1].clamp(lo[1], lo[1] + 1.0),
        p[2].clamp(lo[2], lo[2] + 1.0),
    ]
}

pub(crate) fn distance(a: Vec3, b: Vec3) -> f32 {
    length([a[0] - b[0], a[1] - b[1], a[2] - b[2]])
}

impl Chunk {
    /// Cast a ray against this chunk's solid voxels.
    ///
    /// Returns `None` if the ray misses the chunk's box, leaves it without
    /// touching a solid voxel, or has a degenerate direction. The voxel
    /// containing the ray origin is never reported: a ray starting inside a
    /// block looks out of it.
    pub fn cast(&self, origin: Vec3, direction: Vec3) -> Option<RayHit> {
        if self.volume() == 0 || origin.iter().any(|c| !c.is_finite()) {
            return None;
        }
        let dir = usable_direction(direction)?;
        let lo = self.min();
        let hi = self.max();
        let t_enter = ray_aabb(origin, dir, lo.to_world(), hi.to_world())?;

        let t_start = if t_enter > 0.0 {
            t_enter - ENTRY_BACKOFF
        } else {
            0.0
        };
        let start = [
            origin[0] + dir[0] * t_start,
            origin[1] + dir[1] * t_start,
            origin[2] + dir[2] * t_start,
        ];

        let lo = [lo.x, lo.y, lo.z];
        let hi = [hi.x, hi.y, hi.z];
        let mut voxel = [
            start[0].floor() as i32,
            start[1].floor() as i32,
            start[2].floor() as i32,
        ];

        // Step direction (+1 or -1) and tMax/tDelta for each axis.
        let mut step = [0i32; 3];
        let mut t_max = [f32::INFINITY; 3];
        let mut t_delta = [f32::INFINITY; 3];
        for axis in 0..3 {
            if dir[axis] > 0.0 {
                step[axis] = 1;
                t_delta[axis] = 1.0 / dir[axis];
                t_max[axis] = ((voxel[axis] as f32 + 1.0) - start[axis]) / dir[axis];
            } else if dir[axis] < 0.0 {
                step[axis] = -1;
                t_delta[axis] = 1.0 / (-dir[axis]);
                t_max[axis] = (start[axis] - voxel[axis] as f32) / (-dir[axis]);
            } else if voxel[axis] < lo[axis] || voxel[axis] >= hi[axis] {
                // Parallel to this axis and outside the box's slab.
                return None;
            }
        }

        loop {
            // Advance along the axis with the smallest t_max.
            let axis = if t_max[0] <= t_max[1] && t_max[0] <= t_max[2] {
                0
            } else if t_max[1] <= t_max[2] {
                1
            } else {
                2
            };
            if !t_max[axis].is_finite() {
                return None;
            }

            voxel[axis] += step[axis];
            if (step[axis] > 0 && voxel[axis] >= hi[axis])
                || (step[axis] < 0 && voxel[axis] < lo[axis])
            {
                return None;
            }
            let t = t_max[axis];
            t_max[axis] += t_delta[axis];

            let coord = VoxelCoord::new(voxel[0], voxel[1], voxel[2]);
            if self.get(coord).is_air() {
                continue;
            }

            let t_total = t_start + t;
            let mut point = [
                origin[0] + dir[0] * t_total,
                origin[1] + dir[1] * t_total,
                origin[2] + dir[2] * t_total,
            ];
            // Put the hit exactly on the face plane along the stepped axis.
            point[axis] = if step[axis] > 0 {
                voxel[axis] as f32
            } else {
                voxel[axis] as f32 + 1.0
            };
            let mut normal = [0i32; 3];
            normal[axis] = -step[axis];
            return Some(RayHit {
                voxel: coord,
                point,
                normal: VoxelCoord::new(normal[0], normal[1], normal[2]),
                distance: distance(origin, point),
            });
        }
    }

    /// Sweep a rectangle along `axis`, moving its leading face from `pos` to
    /// `target`.
    ///
    /// Tests each voxel row the face enters, in order of travel. On the first
    /// row containing a solid voxel inside the rectangle's footprint, returns
    /// that row's boundary facing the motion. Returns `target` unchanged if
    /// nothing is in the way. The result is never behind `pos`, so a box that
    /// already overlaps geometry is held in place rather than pushed back.
    pub fn cast_rect(&self, axis: Axis, pos: f32, target: f32, rect: Rect) -> f32 {
        let travel = target - pos;
        if travel == 0.0 || !travel.is_finite() || self.volume() == 0 {
            return target;
        }

        // Footprint rows on the perpendicular axes, clipped to the chunk.
        let (a, b) = axis.others();
        let min = self.min();
        let max = self.max();
        let a_lo = (rect.min_a.floor() as i32).max(min.get(a));
        let a_hi = (rect.max_a.floor() as i32).saturating_add(1).min(max.get(a));
        let b_lo = (rect.min_b.floor() as i32).max(min.get(b));
        let b_hi = (rect.max_b.floor() as i32).saturating_add(1).min(max.get(b));
        if a_lo >= a_hi || b_lo >= b_hi {
            return target;
        }

        let row_solid = |row: i32| {
            let lo = VoxelCoord::ZERO.with(a, a_lo).with(b, b_lo).with(axis, row);
            let hi = VoxelCoord::ZERO.with(a, a_hi).with(b, b_hi).with(axis, row + 1);
            self.any_solid(lo, hi)
        };

        let axis_lo = min.get(axis);
        let axis_hi = max.get(axis);
        if travel > 0.0 {
            let mut row = (pos.floor() as i32).max(axis_lo);
            while row < axis_hi && (row as f32) < target {
                if row_solid(row) {
                    return (row as f32).max(pos);
                }
                row += 1;
            }
        } else {
            let mut row = (pos.ceil() as i32).saturating_sub(1).min(axis_hi - 1);
            while row >= axis_lo && (row as f32 + 1.0) > target {
                if row_solid(row) {
                    return (row as f32 + 1.0).min(pos);
                }
                row -= 1;
            }
        }
        target
    }

    /// `cast_rect` along X; the rectangle spans Y (`a`) and Z (`b`).
    pub fn cast_rect_x(&self, x: f32, target_x: f32, y: (f32, f32), z: (f32, f32)) -> f32 {
        self.cast_rect(Axis::X, x, target_x, rect_from(y, z))
    }

    /// `cast_rect` along Y; the rectangle spans X (`a`) and Z (`b`).
    pub fn cast_rect_y(&self, y: f32, target_y: f32, x: (f32, f32), z: (f32, f32)) -> f32 {
        self.cast_rect(Axis::Y, y, target_y, rect_from(x, z))
    }

    /// `cast_rect` along Z; the rectangle spans X (`a`) and Y (`b`).
    pub fn cast_rect_z(&self, z: f32, target_z: f32, x: (f32, f32), y: (f32, f32)) -> f32 {
        self.cast_rect(Axis::Z, z, target_z, rect_from(x, y))
    }

    /// Whether any voxel in the half-open region `[min, max)` is solid.
    pub fn any_solid(&self, min: VoxelCoord, max: VoxelCoord) -> bool {
        // Cells outside the backing box are air; only scan the overlap.
        let lo = self.min();
        let hi = self.max();
        let (x0, x1) = (min.x.max(lo.x), max.x.min(hi.x));
        let (y0, y1) = (min.y.max(lo.y), max.y.min(hi.y));
        let (z0, z1) = (min.z.max(lo.z), max.z.min(hi.z));
        for z in z0..z1 {
            for y in y0..y1 {
                for x in x0..x1 {
                    if self.get(VoxelCoord::new(x, y, z)).is_solid() {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// The closest point on any solid voxel strictly within `radius` of
    /// `query`, or `None`.
    pub fn closest_point(&self, query: Vec3, radius: f32) -> Option<Vec3> {
        if !radius.is_finite() || radius <= 0.0 || query.iter().any(|c| !c.is_finite()) {
            return None;
        }
        let lo = self.min();
        let hi = self.max();
        let x0 = ((query[0] - radius).floor() as i32).max(lo.x);
        let y0 = ((query[1] - radius).floor() as i32).max(lo.y);
        let z0 = ((query[2] - radius).floor() as i32).max(lo.z);
        let x1 = ((query[0] + radius).floor() as i32).saturating_add(1).min(hi.x);
        let y1 = ((query[1] + radius).floor() as i32).saturating_add(1).min(hi.y);
        let z1 = ((query[2] + radius).floor() as i32).saturating_add(1).min(hi.z);

        let mut best = None;
        let mut best_dist = radius;
        for z in z0..z1 {
            for y in y0..y1 {
                for x in x0..x1 {
                    let voxel = VoxelCoord::new(x, y, z);
                    if self.get(voxel).is_air() {
                        continue;
                    }
                    let p = closest_point_on_voxel(voxel, query);
                    let d = distance(p, query);
                    if d < best_dist {
                        best = Some(p);
                        best_dist = d;
                    }
                }
            }
        }
        best
    }
}

fn rect_from(a: (f32, f32), b: (f32, f32)) -> Rect {
    Rect {
        min_a: a.0,
        max_a: a.1,
        min_b: b.0,
        max_b: b.1,
    }
}
