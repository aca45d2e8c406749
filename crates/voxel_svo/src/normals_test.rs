use glam::{IVec3, Vec3};

use super::*;
use crate::brick::BRICK_VOXELS;

fn occupancy_from(predicate: impl Fn(IVec3) -> bool) -> [u64; 8] {
  let mut occupancy = [0u64; 8];
  for z in 0..BRICK_SIDE {
    for y in 0..BRICK_SIDE {
      for x in 0..BRICK_SIDE {
        if predicate(IVec3::new(x as i32, y as i32, z as i32)) {
          let idx = voxel_index(x, y, z);
          occupancy[idx / 64] |= 1 << (idx % 64);
        }
      }
    }
  }
  occupancy
}

fn estimate(occupancy: &[u64; 8], mode: NormalMode) -> Box<[Vec3; BRICK_VOXELS]> {
  let supplied = [None; BRICK_VOXELS];
  let mut out = Box::new([Vec3::ZERO; BRICK_VOXELS]);
  estimate_brick_normals(occupancy, &supplied, mode, &mut out);
  out
}

/// A solid slab filling z < 4: voxels on its top face point straight up
/// (+Z), the only empty face neighbor.
#[test]
fn test_slab_top_face_points_up() {
  let occupancy = occupancy_from(|p| p.z < 4);
  let normals = estimate(&occupancy, NormalMode::Geometric);
  // Interior of the top layer; brick-edge voxels also see lateral gradients.
  let idx = voxel_index(3, 3, 3);
  assert_eq!(normals[idx], Vec3::Z);
}

/// A solid slab filling x < 4: the exposed face points along +X.
#[test]
fn test_slab_side_face_points_out() {
  let occupancy = occupancy_from(|p| p.x < 4);
  let normals = estimate(&occupancy, NormalMode::Geometric);
  let idx = voxel_index(3, 3, 3);
  assert_eq!(normals[idx], Vec3::X);
}

/// An isolated voxel has no gradient and no neighbors; the estimator falls
/// back to +Y.
#[test]
fn test_isolated_voxel_falls_back_to_up() {
  let occupancy = occupancy_from(|p| p == IVec3::splat(4));
  let normals = estimate(&occupancy, NormalMode::Geometric);
  assert_eq!(normals[voxel_index(4, 4, 4)], Vec3::Y);
}

/// A voxel whose face neighbors are symmetric resolves through the
/// 26-neighborhood centroid: a single diagonal neighbor pushes the normal
/// the opposite way.
#[test]
fn test_diagonal_neighbor_resolves_degenerate_gradient() {
  let occupancy = occupancy_from(|p| p == IVec3::ZERO || p == IVec3::ONE);
  let normals = estimate(&occupancy, NormalMode::Geometric);
  let n = normals[voxel_index(0, 0, 0)];
  let expected = -Vec3::ONE.normalize();
  assert!(
    n.distance(expected) < 1e-6,
    "corner voxel normal {n} should face away from its diagonal neighbor"
  );
}

/// UseSupplied trusts the authored normal even where a gradient exists.
#[test]
fn test_use_supplied_overrides_gradient() {
  let occupancy = occupancy_from(|p| p.z < 4);
  let mut supplied = [None; BRICK_VOXELS];
  let idx = voxel_index(3, 3, 3);
  supplied[idx] = Some(Vec3::NEG_X);
  let mut out = [Vec3::ZERO; BRICK_VOXELS];
  estimate_brick_normals(&occupancy, &supplied, NormalMode::UseSupplied, &mut out);
  assert_eq!(out[idx], Vec3::NEG_X);
}

/// GeometricOrSupplied only consults the authored normal when the estimate
/// is degenerate.
#[test]
fn test_geometric_or_supplied_fallback_order() {
  // Slab voxel: gradient wins over the authored normal.
  let slab = occupancy_from(|p| p.z < 4);
  let mut supplied = [None; BRICK_VOXELS];
  let slab_idx = voxel_index(3, 3, 3);
  supplied[slab_idx] = Some(Vec3::NEG_X);
  let mut out = [Vec3::ZERO; BRICK_VOXELS];
  estimate_brick_normals(&slab, &supplied, NormalMode::GeometricOrSupplied, &mut out);
  assert_eq!(out[slab_idx], Vec3::Z);

  // Isolated voxel: the authored normal replaces the +Y fallback.
  let isolated = occupancy_from(|p| p == IVec3::splat(4));
  let mut supplied = [None; BRICK_VOXELS];
  let iso_idx = voxel_index(4, 4, 4);
  supplied[iso_idx] = Some(Vec3::NEG_Z);
  let mut out = [Vec3::ZERO; BRICK_VOXELS];
  estimate_brick_normals(&isolated, &supplied, NormalMode::GeometricOrSupplied, &mut out);
  assert_eq!(out[iso_idx], Vec3::NEG_Z);
}

/// Authored normals are normalized before use.
#[test]
fn test_supplied_normals_are_normalized() {
  let occupancy = occupancy_from(|p| p == IVec3::splat(4));
  let mut supplied = [None; BRICK_VOXELS];
  let idx = voxel_index(4, 4, 4);
  supplied[idx] = Some(Vec3::new(0.0, 0.0, 10.0));
  let mut out = [Vec3::ZERO; BRICK_VOXELS];
  estimate_brick_normals(&occupancy, &supplied, NormalMode::UseSupplied, &mut out);
  assert_eq!(out[idx], Vec3::Z);
}

/// Unoccupied slots are never written.
#[test]
fn test_unoccupied_slots_untouched() {
  let occupancy = occupancy_from(|p| p == IVec3::ZERO);
  let normals = estimate(&occupancy, NormalMode::Geometric);
  assert_eq!(normals[voxel_index(7, 7, 7)], Vec3::ZERO);
}
