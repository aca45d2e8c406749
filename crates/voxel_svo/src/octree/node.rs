//! Node descriptors and mask compaction.
//!
//! A node stores two child masks and two base pointers. Children exist only
//! where `valid_mask` has a bit set; a set `leaf_mask` bit marks that child
//! as a brick. Children of each kind pack contiguously in octant order, so
//! a child's slot is its base pointer plus a popcount of the lower mask
//! bits. Offsets are derived from masks alone, never from a position.

use bytemuck::{Pod, Zeroable};

use crate::brick::{decode_normal, encode_normal, BrickRecord};
use crate::types::MaterialId;
use glam::Vec3;

/// One octree node, 12 bytes, GPU-uploadable.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct NodeDescriptor {
  /// Base slot of this node's internal children in the node array.
  pub child_ptr: u32,

  /// Base slot of this node's brick children in the brick store.
  pub brick_ptr: u32,

  /// One bit per octant: a child exists.
  pub valid_mask: u8,

  /// One bit per octant: the child is a brick. Subset of `valid_mask`.
  pub leaf_mask: u8,

  pub pad: u16,
}

impl NodeDescriptor {
  pub fn new(child_ptr: u32, brick_ptr: u32, valid_mask: u8, leaf_mask: u8) -> Self {
    debug_assert_eq!(leaf_mask & !valid_mask, 0, "leaf bit without valid bit");
    Self {
      child_ptr,
      brick_ptr,
      valid_mask,
      leaf_mask,
      pad: 0,
    }
  }

  #[inline]
  pub fn has_child(&self, octant: u8) -> bool {
    self.valid_mask & (1 << octant) != 0
  }

  #[inline]
  pub fn child_is_leaf(&self, octant: u8) -> bool {
    self.leaf_mask & (1 << octant) != 0
  }

  /// Number of internal (non-brick) children.
  #[inline]
  pub fn internal_count(&self) -> u32 {
    (self.valid_mask & !self.leaf_mask).count_ones()
  }

  /// Number of brick children.
  #[inline]
  pub fn leaf_count(&self) -> u32 {
    (self.valid_mask & self.leaf_mask).count_ones()
  }
}

/// Slot offset of an internal child among its packed siblings, or `None`
/// when no internal child exists at `octant`.
#[inline]
pub fn internal_child_offset(valid_mask: u8, leaf_mask: u8, octant: u8) -> Option<u32> {
  let internal = valid_mask & !leaf_mask;
  if internal & (1 << octant) == 0 {
    return None;
  }
  Some((internal & ((1u8 << octant) - 1)).count_ones())
}

/// Slot offset of a brick child among its packed siblings, or `None` when
/// no brick child exists at `octant`.
#[inline]
pub fn brick_child_offset(valid_mask: u8, leaf_mask: u8, octant: u8) -> Option<u32> {
  let bricks = valid_mask & leaf_mask;
  if bricks & (1 << octant) == 0 {
    return None;
  }
  Some((bricks & ((1u8 << octant) - 1)).count_ones())
}

/// Averaged attributes of a node's subtree, used when LOD terminates a ray
/// above full resolution. 8 bytes, GPU-uploadable.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable, Default)]
pub struct NodeAttr {
  /// Mean subtree color.
  pub color: [u8; 3],

  /// Most frequent subtree material.
  pub material: MaterialId,

  /// Octahedral-encoded mean subtree normal.
  pub normal: u16,

  pub pad: u16,
}

impl NodeAttr {
  pub fn new(color: [u8; 3], material: MaterialId, normal: Vec3) -> Self {
    Self {
      color,
      material,
      normal: encode_normal(normal),
      pad: 0,
    }
  }

  /// Attributes of a whole brick, from its precomputed averages.
  pub fn from_brick(record: &BrickRecord) -> Self {
    Self {
      color: record.avg_color,
      material: record.avg_material,
      normal: record.avg_normal,
      pad: 0,
    }
  }

  #[inline]
  pub fn decoded_normal(&self) -> Vec3 {
    decode_normal(self.normal)
  }
}

#[cfg(test)]
#[path = "node_test.rs"]
mod node_test;
