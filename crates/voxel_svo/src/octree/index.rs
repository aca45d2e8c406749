//! The published, immutable spatial index.

use glam::Vec3;

use super::node::{NodeAttr, NodeDescriptor};
use crate::brick::BrickStore;
use crate::types::{BuildParams, CastResult, Ray};

/// An immutable sparse voxel octree: contiguous node and attribute arrays
/// plus the brick store. Produced by [`crate::octree::OctreeBuilder`],
/// queried concurrently without locks.
#[derive(Clone, Debug)]
pub struct SvoIndex {
  params: BuildParams,
  nodes: Vec<NodeDescriptor>,
  attrs: Vec<NodeAttr>,
  bricks: BrickStore,
}

impl SvoIndex {
  pub(crate) fn from_parts(
    params: BuildParams,
    nodes: Vec<NodeDescriptor>,
    attrs: Vec<NodeAttr>,
    bricks: BrickStore,
  ) -> Self {
    Self {
      params,
      nodes,
      attrs,
      bricks,
    }
  }

  /// An index with no geometry: a childless root. Every ray misses.
  pub fn empty(params: BuildParams) -> Self {
    Self {
      params,
      nodes: vec![NodeDescriptor::new(0, 0, 0, 0)],
      attrs: vec![NodeAttr::default()],
      bricks: BrickStore::new(),
    }
  }

  /// Cast one ray. See [`crate::traverse::cast_ray`].
  pub fn cast_ray(&self, ray: Ray, lod: &crate::lod::LodParameters) -> CastResult {
    crate::traverse::cast_ray(self, ray, lod)
  }

  #[inline]
  pub fn params(&self) -> &BuildParams {
    &self.params
  }

  #[inline]
  pub fn nodes(&self) -> &[NodeDescriptor] {
    &self.nodes
  }

  #[inline]
  pub fn attrs(&self) -> &[NodeAttr] {
    &self.attrs
  }

  #[inline]
  pub fn bricks(&self) -> &BrickStore {
    &self.bricks
  }

  #[inline]
  pub fn world_min(&self) -> Vec3 {
    self.params.world_min
  }

  #[inline]
  pub fn world_max(&self) -> Vec3 {
    self.params.world_min + Vec3::splat(self.params.world_size)
  }

  pub fn node_count(&self) -> usize {
    self.nodes.len()
  }

  pub fn brick_count(&self) -> usize {
    self.bricks.brick_count()
  }

  /// Node array as one contiguous byte range for upload.
  pub fn node_bytes(&self) -> &[u8] {
    bytemuck::cast_slice(&self.nodes)
  }

  /// Attribute array as one contiguous byte range for upload.
  pub fn attr_bytes(&self) -> &[u8] {
    bytemuck::cast_slice(&self.attrs)
  }

  /// Total payload bytes (nodes, attributes, bricks).
  pub fn memory_bytes(&self) -> usize {
    self.nodes.len() * std::mem::size_of::<NodeDescriptor>()
      + self.attrs.len() * std::mem::size_of::<NodeAttr>()
      + self.bricks.as_bytes().len()
  }

  /// Structural invariants: every leaf bit has a valid bit, every pointer
  /// range stays inside its array, and attributes parallel the nodes.
  ///
  /// Builds check this before publishing; it is cheap enough to assert in
  /// tests against hand-built trees too.
  pub fn validate(&self) -> bool {
    if self.nodes.is_empty() || self.nodes.len() != self.attrs.len() {
      return false;
    }
    for node in &self.nodes {
      if node.leaf_mask & !node.valid_mask != 0 {
        return false;
      }
      let internal = node.internal_count() as usize;
      if internal > 0 && node.child_ptr as usize + internal > self.nodes.len() {
        return false;
      }
      let leaves = node.leaf_count() as usize;
      if leaves > 0 && node.brick_ptr as usize + leaves > self.bricks.brick_count() {
        return false;
      }
    }
    true
  }
}

#[cfg(test)]
#[path = "index_test.rs"]
mod index_test;
