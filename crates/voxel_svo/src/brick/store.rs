//! Flat brick storage with stable `u32` handles.
//!
//! Bricks are allocated append-only during a build and never move, so a
//! handle baked into a node descriptor stays valid for the lifetime of the
//! index. All records share one fixed layout and the store can be viewed as
//! a single byte range for upload.

use bytemuck::{Pod, Zeroable};
use glam::{UVec3, Vec3};

use super::codec::{decode_normal, encode_normal, ColorBlock, BLOCK_VOXELS};
use super::{voxel_index, BRICK_VOXELS};
use crate::error::BuildError;
use crate::types::MaterialId;

/// Hard cap on bricks per store; handles are `u32`.
pub const MAX_BRICKS: usize = u32::MAX as usize;

/// One dense 8^3 brick: exact occupancy bits plus compressed attributes and
/// precomputed whole-brick averages for coarse hits.
#[repr(C)]
#[derive(Clone, Copy, Debug, Pod, Zeroable)]
pub struct BrickRecord {
  /// One bit per voxel, word `i` covers linear indices `64i..64i+64`.
  pub occupancy: [u64; 8],

  /// Octahedral-encoded normals, one per voxel.
  pub normals: [u16; BRICK_VOXELS],

  /// Compressed colors, one block per occupancy word.
  pub colors: [ColorBlock; 8],

  /// Material ids, one per voxel.
  pub materials: [u8; BRICK_VOXELS],

  /// Mean color of the occupied voxels.
  pub avg_color: [u8; 3],

  /// Most frequent material among the occupied voxels.
  pub avg_material: MaterialId,

  /// Octahedral-encoded mean normal of the occupied voxels.
  pub avg_normal: u16,

  /// Number of occupied voxels; zero marks an empty brick.
  pub occupied_count: u16,
}

impl BrickRecord {
  #[inline]
  pub fn is_occupied(&self, local: UVec3) -> bool {
    let idx = voxel_index(local.x, local.y, local.z);
    self.occupancy[idx / 64] & (1 << (idx % 64)) != 0
  }
}

/// Attributes of one occupied voxel, decoded from a record.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BrickVoxel {
  pub color: [u8; 3],
  pub normal: Vec3,
  pub material: MaterialId,
}

/// Append-only collection of brick records.
#[derive(Clone, Debug, Default)]
pub struct BrickStore {
  records: Vec<BrickRecord>,
}

impl BrickStore {
  pub fn new() -> Self {
    Self::default()
  }

  /// Reserve a brick slot holding only its occupancy mask; attributes are
  /// filled by [`BrickStore::fill`]. Returns the stable handle.
  pub fn allocate(&mut self, occupancy: [u64; 8]) -> Result<u32, BuildError> {
    if self.records.len() >= MAX_BRICKS {
      return Err(BuildError::BrickStoreFull {
        count: self.records.len(),
        capacity: MAX_BRICKS,
      });
    }
    let mut record = BrickRecord::zeroed();
    record.occupancy = occupancy;
    record.occupied_count = occupancy.iter().map(|w| w.count_ones() as u16).sum();
    let handle = self.records.len() as u32;
    self.records.push(record);
    Ok(handle)
  }

  /// Compress and store per-voxel attributes for a previously allocated
  /// brick, and precompute its whole-brick averages.
  pub fn fill(
    &mut self,
    brick: u32,
    colors: &[[u8; 3]; BRICK_VOXELS],
    materials: &[MaterialId; BRICK_VOXELS],
    normals: &[Vec3; BRICK_VOXELS],
  ) {
    let record = &mut self.records[brick as usize];

    for (block, word) in record.occupancy.iter().enumerate() {
      let mut block_colors = [[0u8; 3]; BLOCK_VOXELS];
      block_colors.copy_from_slice(&colors[block * BLOCK_VOXELS..(block + 1) * BLOCK_VOXELS]);
      record.colors[block] = ColorBlock::compress(&block_colors, *word);
    }

    let mut color_sum = [0u64; 3];
    let mut normal_sum = Vec3::ZERO;
    let mut material_counts = [0u32; 256];
    let mut occupied = 0u64;
    for i in 0..BRICK_VOXELS {
      record.materials[i] = materials[i];
      record.normals[i] = encode_normal(normals[i]);
      if record.occupancy[i / 64] & (1 << (i % 64)) != 0 {
        occupied += 1;
        color_sum[0] += colors[i][0] as u64;
        color_sum[1] += colors[i][1] as u64;
        color_sum[2] += colors[i][2] as u64;
        normal_sum += normals[i];
        material_counts[materials[i] as usize] += 1;
      }
    }

    if occupied > 0 {
      record.avg_color = [
        (color_sum[0] / occupied) as u8,
        (color_sum[1] / occupied) as u8,
        (color_sum[2] / occupied) as u8,
      ];
      record.avg_material = material_counts
        .iter()
        .enumerate()
        .max_by_key(|(_, count)| **count)
        .map(|(id, _)| id as MaterialId)
        .unwrap_or(0);
      record.avg_normal = encode_normal(normal_sum.normalize_or(Vec3::Y));
    }
  }

  /// Exact emptiness check, O(1) from the stored count. An occupied result
  /// is still only a hint that marching may find a surface; the ray can
  /// pass through the brick without touching a set voxel.
  #[inline]
  pub fn is_empty(&self, brick: u32) -> bool {
    self.records[brick as usize].occupied_count == 0
  }

  #[inline]
  pub fn is_occupied(&self, brick: u32, local: UVec3) -> bool {
    self.records[brick as usize].is_occupied(local)
  }

  /// Decode the attributes of one voxel; `None` when it is unoccupied.
  pub fn sample_voxel(&self, brick: u32, local: UVec3) -> Option<BrickVoxel> {
    let record = &self.records[brick as usize];
    let idx = voxel_index(local.x, local.y, local.z);
    if record.occupancy[idx / 64] & (1 << (idx % 64)) == 0 {
      return None;
    }
    Some(BrickVoxel {
      color: record.colors[idx / BLOCK_VOXELS].decode(idx % BLOCK_VOXELS),
      normal: decode_normal(record.normals[idx]),
      material: record.materials[idx],
    })
  }

  #[inline]
  pub fn record(&self, brick: u32) -> &BrickRecord {
    &self.records[brick as usize]
  }

  #[inline]
  pub fn brick_count(&self) -> usize {
    self.records.len()
  }

  #[inline]
  pub fn records(&self) -> &[BrickRecord] {
    &self.records
  }

  /// Whole store as one contiguous byte range.
  pub fn as_bytes(&self) -> &[u8] {
    bytemuck::cast_slice(&self.records)
  }

  /// Append another store, returning the handle offset its bricks moved by.
  pub(crate) fn merge(&mut self, other: BrickStore) -> Result<u32, BuildError> {
    if self.records.len() + other.records.len() > MAX_BRICKS {
      return Err(BuildError::BrickStoreFull {
        count: self.records.len() + other.records.len(),
        capacity: MAX_BRICKS,
      });
    }
    let offset = self.records.len() as u32;
    self.records.extend(other.records);
    Ok(offset)
  }
}

#[cfg(test)]
#[path = "store_test.rs"]
mod store_test;
