use glam::{UVec3, Vec3};

use super::*;
use crate::brick::BrickVoxel;
use crate::error::BuildError;
use crate::morton::MortonKey;
use crate::normals::NormalMode;
use crate::octree::node::{brick_child_offset, internal_child_offset};
use crate::types::{BuildParams, VoxelSample};

fn sample(x: u32, y: u32, z: u32, color: [u8; 3]) -> VoxelSample {
  let key = MortonKey::encode(UVec3::new(x, y, z)).expect("test coordinate in range");
  VoxelSample::new(key, 1.0, color)
}

fn small_params() -> BuildParams {
  // 32^3 grid: two octree levels above the bricks.
  BuildParams::default()
    .with_brick_parent_depth(1)
    .with_world_bounds(Vec3::ZERO, 32.0)
}

/// Walk the index from the root to a voxel using only Morton octants and
/// mask compaction, mirroring how a ray resolves brick identity.
fn find_voxel(index: &SvoIndex, position: UVec3) -> Option<BrickVoxel> {
  let total = index.params().total_depth();
  let parent_depth = index.params().brick_parent_depth;
  let mut node = index.nodes()[0];
  for depth in 0..=parent_depth {
    let level = total - 1 - depth;
    let octant = (((position.x >> level) & 1)
      | (((position.y >> level) & 1) << 1)
      | (((position.z >> level) & 1) << 2)) as u8;
    if depth == parent_depth {
      let offset = brick_child_offset(node.valid_mask, node.leaf_mask, octant)?;
      return index
        .bricks()
        .sample_voxel(node.brick_ptr + offset, position & UVec3::splat(7));
    }
    let offset = internal_child_offset(node.valid_mask, node.leaf_mask, octant)?;
    node = index.nodes()[(node.child_ptr + offset) as usize];
  }
  None
}

/// No samples: a childless root that validates and owns no bricks.
#[test]
fn test_empty_build() {
  let index = OctreeBuilder::new(small_params())
    .unwrap()
    .build(Vec::new())
    .unwrap();
  assert_eq!(index.node_count(), 1);
  assert_eq!(index.brick_count(), 0);
  assert!(index.validate());
}

/// Every inserted voxel is reachable through the compacted index, and
/// nothing else is (containment and emptiness).
#[test]
fn test_containment_and_emptiness() {
  let inserted = [
    (0u32, 0u32, 0u32),
    (1, 0, 0),
    (7, 7, 7),
    (8, 0, 0),
    (15, 31, 2),
    (31, 31, 31),
    (16, 16, 16),
  ];
  let samples: Vec<_> = inserted
    .iter()
    .map(|&(x, y, z)| sample(x, y, z, [255, 0, 0]))
    .collect();
  let index = OctreeBuilder::new(small_params())
    .unwrap()
    .build(samples)
    .unwrap();
  assert!(index.validate());

  for &(x, y, z) in &inserted {
    assert!(
      find_voxel(&index, UVec3::new(x, y, z)).is_some(),
      "inserted voxel ({x},{y},{z}) must be reachable"
    );
  }
  for (x, y, z) in [(2u32, 0u32, 0u32), (0, 0, 1), (30, 31, 31), (9, 9, 9)] {
    assert!(
      find_voxel(&index, UVec3::new(x, y, z)).is_none(),
      "absent voxel ({x},{y},{z}) must stay absent"
    );
  }
}

/// The minimal configuration (brick parent at the root) builds and resolves.
#[test]
fn test_depth_zero_root_is_brick_parent() {
  let params = BuildParams::default()
    .with_brick_parent_depth(0)
    .with_world_bounds(Vec3::ZERO, 16.0);
  let index = OctreeBuilder::new(params)
    .unwrap()
    .build(vec![sample(3, 5, 7, [0, 255, 0])])
    .unwrap();
  assert_eq!(index.node_count(), 1, "root carries the bricks directly");
  assert!(index.validate());
  let voxel = find_voxel(&index, UVec3::new(3, 5, 7)).expect("voxel reachable");
  assert_eq!(voxel.color, [0, 255, 0]);
}

/// Input order does not matter: shuffled and sorted batches produce
/// byte-identical indices.
#[test]
fn test_build_is_deterministic_in_input_order() {
  let mut samples = Vec::new();
  for i in 0..24u32 {
    samples.push(sample(i, (i * 7) % 32, (i * 13) % 32, [i as u8, 0, 0]));
  }
  let mut reversed = samples.clone();
  reversed.reverse();

  let builder = OctreeBuilder::new(small_params()).unwrap();
  let a = builder.build(samples).unwrap();
  let b = builder.build(reversed).unwrap();

  assert_eq!(a.nodes(), b.nodes());
  assert_eq!(a.bricks().as_bytes(), b.bricks().as_bytes());
}

/// Duplicate keys resolve to the last sample in input order.
#[test]
fn test_duplicate_keys_last_write_wins() {
  let first = sample(4, 4, 4, [255, 0, 0]);
  let second = sample(4, 4, 4, [0, 0, 255]);
  let index = OctreeBuilder::new(small_params())
    .unwrap()
    .build(vec![first, second])
    .unwrap();
  let voxel = find_voxel(&index, UVec3::new(4, 4, 4)).expect("voxel present");
  assert_eq!(voxel.color, [0, 0, 255], "later sample must win");
}

/// A trailing non-positive-density sample erases the voxel.
#[test]
fn test_duplicate_key_erasure() {
  let solid = sample(4, 4, 4, [255, 0, 0]);
  let mut erase = sample(4, 4, 4, [0, 0, 0]);
  erase.density = 0.0;
  let index = OctreeBuilder::new(small_params())
    .unwrap()
    .build(vec![solid, erase])
    .unwrap();
  assert!(find_voxel(&index, UVec3::new(4, 4, 4)).is_none());
  assert_eq!(index.brick_count(), 0);
}

/// Keys encoding coordinates beyond the configured grid fail the build.
#[test]
fn test_out_of_grid_coordinate_fails() {
  let result = OctreeBuilder::new(small_params())
    .unwrap()
    .build(vec![sample(32, 0, 0, [1, 1, 1])]);
  assert!(matches!(
    result,
    Err(BuildError::CoordinateOutOfRange { .. })
  ));
}

/// Invalid parameters are rejected at builder construction.
#[test]
fn test_invalid_params_rejected() {
  let too_deep = BuildParams::default().with_brick_parent_depth(18);
  assert!(OctreeBuilder::new(too_deep).is_err());
}

/// Samples spread over several root octants exercise the parallel subtree
/// path and its brick-handle fixup.
#[test]
fn test_parallel_subtrees_merge_correctly() {
  let mut samples = Vec::new();
  let mut expected = Vec::new();
  for (octant, &(x, y, z)) in [
    (0u32, 0u32, 0u32),
    (31, 0, 0),
    (0, 31, 0),
    (31, 31, 0),
    (0, 0, 31),
    (31, 0, 31),
    (0, 31, 31),
    (31, 31, 31),
  ]
  .iter()
  .enumerate()
  {
    let color = [octant as u8 * 30, 0, 255];
    samples.push(sample(x, y, z, color));
    expected.push((UVec3::new(x, y, z), color));
  }

  let index = OctreeBuilder::new(small_params())
    .unwrap()
    .build(samples)
    .unwrap();
  assert!(index.validate());
  assert_eq!(index.brick_count(), 8, "one brick per corner");

  for (position, _) in expected {
    assert!(
      find_voxel(&index, position).is_some(),
      "corner voxel {position} must resolve after merge"
    );
  }
}

/// Uniform input color propagates through brick and node averages.
#[test]
fn test_root_attr_averages() {
  let samples: Vec<_> = (0..8u32)
    .map(|i| sample(i % 2, (i / 2) % 2, i / 4, [0, 255, 0]))
    .collect();
  let index = OctreeBuilder::new(small_params())
    .unwrap()
    .build(samples)
    .unwrap();
  assert_eq!(index.attrs()[0].color, [0, 255, 0]);
}

/// Authored normals take effect when the mode requests them.
#[test]
fn test_normal_mode_use_supplied() {
  let key = MortonKey::encode(UVec3::new(9, 9, 9)).unwrap();
  let voxel = VoxelSample::new(key, 1.0, [1, 2, 3]).with_normal(Vec3::NEG_X);
  let params = small_params().with_normal_mode(NormalMode::UseSupplied);
  let index = OctreeBuilder::new(params).unwrap().build(vec![voxel]).unwrap();
  let found = find_voxel(&index, UVec3::new(9, 9, 9)).expect("voxel present");
  assert_eq!(found.normal, Vec3::NEG_X);
}
