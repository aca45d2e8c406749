//! Octree construction from Morton-keyed voxel samples.
//!
//! The builder sorts samples into Z-order, so every octree cell is a
//! contiguous run of the sorted slice and the tree falls out of a recursive
//! eight-way partition. Bricks materialize at `brick_parent_depth + 1`;
//! subtree attributes average bottom-up on the way back out. The eight root
//! subtrees are independent and build in parallel.

use glam::{UVec3, Vec3};
use rayon::prelude::*;
use smallvec::SmallVec;

use super::index::SvoIndex;
use super::node::{NodeAttr, NodeDescriptor};
use crate::brick::{voxel_index, BrickStore, BRICK_VOXELS};
use crate::error::BuildError;
use crate::normals::estimate_brick_normals;
use crate::types::{BuildParams, VoxelSample};

/// Builds immutable [`SvoIndex`] values from sample batches.
pub struct OctreeBuilder {
  params: BuildParams,
}

/// In-progress node before flattening. Internal children keep their own
/// subtrees; brick children only need the contiguous handle range starting
/// at `brick_base`.
struct ProtoNode {
  valid_mask: u8,
  leaf_mask: u8,
  brick_base: u32,
  children: Vec<ProtoNode>,
  attr: NodeAttr,
}

impl OctreeBuilder {
  pub fn new(params: BuildParams) -> Result<Self, BuildError> {
    params.validate()?;
    Ok(Self { params })
  }

  pub fn params(&self) -> &BuildParams {
    &self.params
  }

  /// Build an index from one batch of samples.
  ///
  /// Input order is free: samples are sorted internally, and when several
  /// samples share a key the last one in input order wins. Samples with
  /// non-positive density erase rather than contribute.
  #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, name = "svo::build"))]
  pub fn build(&self, mut samples: Vec<VoxelSample>) -> Result<SvoIndex, BuildError> {
    let resolution = self.params.resolution();
    for sample in &samples {
      let position = sample.key.decode();
      if position.max_element() >= resolution {
        return Err(BuildError::CoordinateOutOfRange {
          position,
          bits: self.params.total_depth(),
        });
      }
    }

    {
      #[cfg(feature = "tracing")]
      let _span = tracing::info_span!("sort_dedup").entered();
      samples.sort_by_key(|sample| sample.key);
      dedup_keep_last(&mut samples);
      samples.retain(|sample| sample.is_occupied());
    }

    if samples.is_empty() {
      return Ok(SvoIndex::empty(self.params.clone()));
    }

    let (root, bricks) = if self.params.brick_parent_depth == 0 {
      // The root itself is the brick parent; nothing to parallelize over.
      let mut store = BrickStore::new();
      let root = self.build_node(&samples, 0, &mut store)?;
      (root, store)
    } else {
      self.build_root_parallel(&samples)?
    };

    let (nodes, attrs) = {
      #[cfg(feature = "tracing")]
      let _span = tracing::info_span!("flatten").entered();
      let mut nodes = Vec::new();
      let mut attrs = Vec::new();
      nodes.push(NodeDescriptor::new(0, 0, 0, 0));
      attrs.push(NodeAttr::default());
      emit(&root, 0, &mut nodes, &mut attrs);
      (nodes, attrs)
    };

    let index = SvoIndex::from_parts(self.params.clone(), nodes, attrs, bricks);
    debug_assert!(index.validate());
    #[cfg(feature = "tracing")]
    tracing::debug!(
      nodes = index.node_count(),
      bricks = index.brick_count(),
      bytes = index.memory_bytes(),
      "octree built"
    );
    Ok(index)
  }

  /// Build the eight root subtrees in parallel, then merge their brick
  /// stores and stitch the subtree protos under a fresh root.
  fn build_root_parallel(
    &self,
    samples: &[VoxelSample],
  ) -> Result<(ProtoNode, BrickStore), BuildError> {
    let level = self.params.total_depth() - 1;
    let parts = octant_runs(samples, level);

    let shards: Vec<Result<Option<(ProtoNode, BrickStore)>, BuildError>> = {
      #[cfg(feature = "tracing")]
      let _span = tracing::info_span!("build_subtrees").entered();
      parts
        .par_iter()
        .map(|part| {
          if part.is_empty() {
            return Ok(None);
          }
          let mut store = BrickStore::new();
          let proto = self.build_node(part, 1, &mut store)?;
          Ok(Some((proto, store)))
        })
        .collect()
    };

    let mut bricks = BrickStore::new();
    let mut valid_mask = 0u8;
    let mut children = Vec::new();
    let mut child_attrs: SmallVec<[NodeAttr; 8]> = SmallVec::new();
    for (octant, shard) in shards.into_iter().enumerate() {
      let Some((mut proto, store)) = shard? else {
        continue;
      };
      let offset = bricks.merge(store)?;
      if offset > 0 {
        offset_brick_handles(&mut proto, offset);
      }
      valid_mask |= 1 << octant;
      child_attrs.push(proto.attr);
      children.push(proto);
    }

    let root = ProtoNode {
      valid_mask,
      leaf_mask: 0,
      brick_base: 0,
      attr: average_attrs(&child_attrs),
      children,
    };
    Ok((root, bricks))
  }

  /// Build the node at `depth` covering the given sorted run. At the brick
  /// parent depth, children materialize as bricks instead of recursing.
  fn build_node(
    &self,
    samples: &[VoxelSample],
    depth: u32,
    store: &mut BrickStore,
  ) -> Result<ProtoNode, BuildError> {
    debug_assert!(!samples.is_empty());
    let level = self.params.total_depth() - 1 - depth;
    let parts = octant_runs(samples, level);

    let mut valid_mask = 0u8;
    let mut leaf_mask = 0u8;
    let mut brick_base = 0u32;
    let mut children = Vec::new();
    let mut child_attrs: SmallVec<[NodeAttr; 8]> = SmallVec::new();

    for (octant, part) in parts.iter().enumerate() {
      if part.is_empty() {
        continue;
      }
      valid_mask |= 1 << octant;
      if depth == self.params.brick_parent_depth {
        let handle = self.build_brick(part, store)?;
        if leaf_mask == 0 {
          brick_base = handle;
        }
        leaf_mask |= 1 << octant;
        child_attrs.push(NodeAttr::from_brick(store.record(handle)));
      } else {
        let child = self.build_node(part, depth + 1, store)?;
        child_attrs.push(child.attr);
        children.push(child);
      }
    }

    Ok(ProtoNode {
      valid_mask,
      leaf_mask,
      brick_base,
      attr: average_attrs(&child_attrs),
      children,
    })
  }

  /// Materialize one brick from the samples of one 8^3 cell.
  fn build_brick(&self, samples: &[VoxelSample], store: &mut BrickStore) -> Result<u32, BuildError> {
    let mut occupancy = [0u64; 8];
    let mut colors = [[0u8; 3]; BRICK_VOXELS];
    let mut materials = [0u8; BRICK_VOXELS];
    let mut supplied = [None; BRICK_VOXELS];

    for sample in samples {
      let position = sample.key.decode();
      let local = position & UVec3::splat(7);
      let idx = voxel_index(local.x, local.y, local.z);
      occupancy[idx / 64] |= 1 << (idx % 64);
      colors[idx] = sample.color;
      materials[idx] = sample.material;
      supplied[idx] = sample.normal;
    }

    let mut normals = [Vec3::Y; BRICK_VOXELS];
    estimate_brick_normals(&occupancy, &supplied, self.params.normal_mode, &mut normals);

    let handle = store.allocate(occupancy)?;
    store.fill(handle, &colors, &materials, &normals);
    Ok(handle)
  }
}

/// Split a sorted run into its eight child runs. `level` is the axis bit
/// distinguishing the children; within the run, octants appear in
/// nondecreasing order, so each is one contiguous subslice.
fn octant_runs<'a>(samples: &'a [VoxelSample], level: u32) -> [&'a [VoxelSample]; 8] {
  let mut parts: [&[VoxelSample]; 8] = [&[]; 8];
  let mut start = 0;
  for octant in 0..8u8 {
    let end = start
      + samples[start..]
        .iter()
        .take_while(|sample| sample.key.octant_at(level) == octant)
        .count();
    parts[octant as usize] = &samples[start..end];
    start = end;
  }
  debug_assert_eq!(start, samples.len());
  parts
}

/// Keep the last sample of every equal-key run. Requires sorted input;
/// stable sort preserves input order within a run.
fn dedup_keep_last(samples: &mut Vec<VoxelSample>) {
  let mut write = 0;
  for read in 0..samples.len() {
    if read + 1 == samples.len() || samples[read].key != samples[read + 1].key {
      samples[write] = samples[read];
      write += 1;
    }
  }
  samples.truncate(write);
}

/// Shift every brick handle in a subtree after its store merged at `offset`.
fn offset_brick_handles(proto: &mut ProtoNode, offset: u32) {
  if proto.leaf_mask != 0 {
    proto.brick_base += offset;
  }
  for child in &mut proto.children {
    offset_brick_handles(child, offset);
  }
}

/// Mean color and normal, most frequent material.
fn average_attrs(attrs: &[NodeAttr]) -> NodeAttr {
  if attrs.is_empty() {
    return NodeAttr::default();
  }
  let mut color_sum = [0u32; 3];
  let mut normal_sum = Vec3::ZERO;
  for attr in attrs {
    color_sum[0] += attr.color[0] as u32;
    color_sum[1] += attr.color[1] as u32;
    color_sum[2] += attr.color[2] as u32;
    normal_sum += attr.decoded_normal();
  }
  let n = attrs.len() as u32;
  let material = attrs
    .iter()
    .map(|attr| attr.material)
    .max_by_key(|&id| attrs.iter().filter(|a| a.material == id).count())
    .unwrap_or(0);
  NodeAttr::new(
    [
      (color_sum[0] / n) as u8,
      (color_sum[1] / n) as u8,
      (color_sum[2] / n) as u8,
    ],
    material,
    normal_sum.normalize_or(Vec3::Y),
  )
}

/// Write a proto subtree into the flat arrays. Each node's internal
/// children are reserved as one contiguous block, so `child_ptr` plus a
/// mask popcount addresses any of them.
fn emit(proto: &ProtoNode, slot: usize, nodes: &mut Vec<NodeDescriptor>, attrs: &mut Vec<NodeAttr>) {
  let child_base = nodes.len() as u32;
  for _ in &proto.children {
    nodes.push(NodeDescriptor::new(0, 0, 0, 0));
    attrs.push(NodeAttr::default());
  }
  nodes[slot] = NodeDescriptor::new(
    child_base,
    proto.brick_base,
    proto.valid_mask,
    proto.leaf_mask,
  );
  attrs[slot] = proto.attr;
  for (i, child) in proto.children.iter().enumerate() {
    emit(child, child_base as usize + i, nodes, attrs);
  }
}

#[cfg(test)]
#[path = "builder_test.rs"]
mod builder_test;
