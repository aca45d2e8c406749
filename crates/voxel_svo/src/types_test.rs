use glam::{UVec3, Vec3};

use super::*;
use crate::error::BuildError;
use crate::morton::MortonKey;

/// Default parameters resolve to a 128^3 grid with unit voxels.
#[test]
fn test_default_params_resolution() {
  let params = BuildParams::default();
  assert_eq!(params.total_depth(), 7);
  assert_eq!(params.resolution(), 128);
  assert_eq!(params.voxel_size(), 1.0);
  assert!(params.validate().is_ok());
}

/// The deepest accepted configuration saturates the 21-bit key budget.
#[test]
fn test_depth_limit() {
  let ok = BuildParams::default().with_brick_parent_depth(17);
  assert_eq!(ok.total_depth(), 21);
  assert!(ok.validate().is_ok());

  let too_deep = BuildParams::default().with_brick_parent_depth(18);
  assert!(matches!(
    too_deep.validate(),
    Err(BuildError::InvalidBrickParentDepth { depth: 18, max: 17 })
  ));
}

/// Degenerate world extents are rejected before any build starts.
#[test]
fn test_world_size_validation() {
  for size in [0.0, -1.0, f32::NAN, f32::INFINITY] {
    let params = BuildParams::default().with_world_bounds(Vec3::ZERO, size);
    assert!(
      matches!(params.validate(), Err(BuildError::InvalidWorldSize { .. })),
      "size {size} must be rejected"
    );
  }
}

/// Occupancy is strictly positive density.
#[test]
fn test_sample_occupancy_predicate() {
  let key = MortonKey::encode(UVec3::ZERO).unwrap();
  assert!(VoxelSample::new(key, 1.0, [0; 3]).is_occupied());
  assert!(VoxelSample::new(key, f32::MIN_POSITIVE, [0; 3]).is_occupied());
  assert!(!VoxelSample::new(key, 0.0, [0; 3]).is_occupied());
  assert!(!VoxelSample::new(key, -1.0, [0; 3]).is_occupied());
}

/// Builder-style setters compose.
#[test]
fn test_params_builders() {
  let params = BuildParams::new()
    .with_brick_parent_depth(2)
    .with_world_bounds(Vec3::splat(-32.0), 64.0);
  assert_eq!(params.brick_parent_depth, 2);
  assert_eq!(params.resolution(), 64);
  assert_eq!(params.voxel_size(), 1.0);
}
