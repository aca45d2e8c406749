//! Per-voxel normal estimation from brick occupancy.
//!
//! The estimator runs once per brick at build time. For each occupied voxel
//! it central-differences the six face neighbors' occupancy and negates the
//! gradient, so a voxel whose only empty neighbor is +Z gets normal
//! (0, 0, 1). Degenerate gradients fall back to the occupied-neighbor
//! centroid of the full 26-neighborhood, then to the configured fallback.

use glam::{IVec3, Vec3};

use crate::brick::{voxel_index, BRICK_SIDE, BRICK_VOXELS};

/// How per-voxel normals are produced during a build.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum NormalMode {
  /// Use the sample's authored normal when present; estimate otherwise.
  UseSupplied,

  /// Always estimate from occupancy, ignoring authored normals.
  #[default]
  Geometric,

  /// Estimate from occupancy, but let an authored normal resolve voxels
  /// where the estimate is degenerate (isolated or fully interior voxels).
  GeometricOrSupplied,
}

/// Occupancy lookup within one brick; coordinates outside [0, 8) are empty.
#[inline]
fn occupied(occupancy: &[u64; 8], p: IVec3) -> bool {
  if p.min_element() < 0 || p.max_element() >= BRICK_SIDE as i32 {
    return false;
  }
  let idx = voxel_index(p.x as u32, p.y as u32, p.z as u32);
  occupancy[idx / 64] & (1 << (idx % 64)) != 0
}

/// Six-neighbor occupancy gradient, negated to point out of the solid.
fn gradient_normal(occupancy: &[u64; 8], p: IVec3) -> Option<Vec3> {
  let sample = |offset: IVec3| occupied(occupancy, p + offset) as i32 as f32;
  let gradient = Vec3::new(
    sample(IVec3::X) - sample(IVec3::NEG_X),
    sample(IVec3::Y) - sample(IVec3::NEG_Y),
    sample(IVec3::Z) - sample(IVec3::NEG_Z),
  );
  let len_sq = gradient.length_squared();
  if len_sq < 1e-8 {
    return None;
  }
  Some(-gradient / len_sq.sqrt())
}

/// Centroid of occupied 26-neighborhood offsets, negated. Resolves voxels
/// whose face neighbors are symmetric (thin diagonal features).
fn dominant_neighbor_normal(occupancy: &[u64; 8], p: IVec3) -> Option<Vec3> {
  let mut centroid = Vec3::ZERO;
  for dz in -1..=1 {
    for dy in -1..=1 {
      for dx in -1..=1 {
        let offset = IVec3::new(dx, dy, dz);
        if offset == IVec3::ZERO {
          continue;
        }
        if occupied(occupancy, p + offset) {
          centroid += offset.as_vec3();
        }
      }
    }
  }
  if centroid.length_squared() < 1e-8 {
    return None;
  }
  Some(-centroid.normalize())
}

/// Estimate normals for every occupied voxel of one brick.
///
/// `supplied` carries authored normals by linear voxel index; `out` receives
/// a unit normal for each occupied voxel (unoccupied slots are left as-is).
pub fn estimate_brick_normals(
  occupancy: &[u64; 8],
  supplied: &[Option<Vec3>; BRICK_VOXELS],
  mode: NormalMode,
  out: &mut [Vec3; BRICK_VOXELS],
) {
  for z in 0..BRICK_SIDE as i32 {
    for y in 0..BRICK_SIDE as i32 {
      for x in 0..BRICK_SIDE as i32 {
        let p = IVec3::new(x, y, z);
        if !occupied(occupancy, p) {
          continue;
        }
        let idx = voxel_index(x as u32, y as u32, z as u32);
        let authored = supplied[idx].and_then(|n| n.try_normalize());

        out[idx] = match mode {
          NormalMode::UseSupplied => {
            authored.or_else(|| estimate_voxel(occupancy, p)).unwrap_or(Vec3::Y)
          }
          NormalMode::Geometric => estimate_voxel(occupancy, p).unwrap_or(Vec3::Y),
          NormalMode::GeometricOrSupplied => estimate_voxel(occupancy, p)
            .or(authored)
            .unwrap_or(Vec3::Y),
        };
      }
    }
  }
}

#[inline]
fn estimate_voxel(occupancy: &[u64; 8], p: IVec3) -> Option<Vec3> {
  gradient_normal(occupancy, p).or_else(|| dominant_neighbor_normal(occupancy, p))
}

#[cfg(test)]
#[path = "normals_test.rs"]
mod normals_test;
