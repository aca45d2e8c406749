//! Core data types for octree construction and ray queries.

use glam::Vec3;

use crate::error::BuildError;
use crate::morton::{MortonKey, COORD_BITS};
use crate::normals::NormalMode;

/// Material identifier stored per voxel.
pub type MaterialId = u8;

/// Levels of subdivision inside one brick (8^3 voxels).
pub const BRICK_DEPTH: u32 = 3;

/// One input voxel, addressed by its Morton key on the finest grid.
///
/// A sample is *occupied* when its density is strictly positive; only
/// occupied samples contribute geometry.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VoxelSample {
  /// Position on the finest voxel grid.
  pub key: MortonKey,

  /// Occupancy density. Strictly positive = solid.
  pub density: f32,

  /// RGB albedo.
  pub color: [u8; 3],

  /// Material identifier.
  pub material: MaterialId,

  /// Optional authored normal. Consulted depending on [`NormalMode`].
  pub normal: Option<Vec3>,
}

impl VoxelSample {
  pub fn new(key: MortonKey, density: f32, color: [u8; 3]) -> Self {
    Self {
      key,
      density,
      color,
      material: 0,
      normal: None,
    }
  }

  pub fn with_material(mut self, material: MaterialId) -> Self {
    self.material = material;
    self
  }

  pub fn with_normal(mut self, normal: Vec3) -> Self {
    self.normal = Some(normal);
    self
  }

  /// Occupancy predicate: density strictly above zero.
  #[inline]
  pub fn is_occupied(&self) -> bool {
    self.density > 0.0
  }
}

/// World-space ray. Direction is normalized at cast time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Ray {
  pub origin: Vec3,
  pub dir: Vec3,
}

impl Ray {
  pub fn new(origin: Vec3, dir: Vec3) -> Self {
    Self { origin, dir }
  }
}

/// Surface intersection report.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RayHit {
  /// Distance from the ray origin along the normalized direction.
  pub t: f32,

  /// World-space hit point.
  pub position: Vec3,

  /// Unit surface normal (estimated at build time, or an averaged normal
  /// when the hit resolved at a coarse level).
  pub normal: Vec3,

  /// RGB albedo at the hit.
  pub color: [u8; 3],

  /// Material at the hit.
  pub material: MaterialId,

  /// Tree depth the hit resolved at. Full voxel resolution reports
  /// `brick_parent_depth + 1 + BRICK_DEPTH`; coarser values indicate an
  /// LOD-synthesized hit.
  pub depth: u32,
}

/// Outcome of a single ray cast.
#[derive(Clone, Copy, Debug, PartialEq, Default)]
pub struct CastResult {
  pub hit: Option<RayHit>,

  /// Traversal loop iterations consumed.
  pub iterations: u32,

  /// True when the iteration cap fired before the ray resolved. The result
  /// is reported as a miss in that case.
  pub cap_exceeded: bool,
}

impl CastResult {
  pub(crate) fn miss(iterations: u32) -> Self {
    Self {
      hit: None,
      iterations,
      cap_exceeded: false,
    }
  }

  pub fn is_hit(&self) -> bool {
    self.hit.is_some()
  }
}

/// Configuration for one octree build.
#[derive(Clone, Debug)]
pub struct BuildParams {
  /// Depth of brick-parent nodes. Bricks hang one level below, so the voxel
  /// grid resolution is `2^(brick_parent_depth + 1 + BRICK_DEPTH)` per axis.
  pub brick_parent_depth: u32,

  /// World-space position of the grid origin corner.
  pub world_min: Vec3,

  /// World-space edge length of the cubic domain.
  pub world_size: f32,

  /// How per-voxel normals are produced.
  pub normal_mode: NormalMode,
}

impl Default for BuildParams {
  fn default() -> Self {
    Self {
      brick_parent_depth: 3,
      world_min: Vec3::ZERO,
      world_size: 128.0,
      normal_mode: NormalMode::default(),
    }
  }
}

impl BuildParams {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with_brick_parent_depth(mut self, depth: u32) -> Self {
    self.brick_parent_depth = depth;
    self
  }

  pub fn with_world_bounds(mut self, world_min: Vec3, world_size: f32) -> Self {
    self.world_min = world_min;
    self.world_size = world_size;
    self
  }

  pub fn with_normal_mode(mut self, mode: NormalMode) -> Self {
    self.normal_mode = mode;
    self
  }

  /// Total grid depth: octree levels down to the brick-parent, one level of
  /// bricks, and `BRICK_DEPTH` levels inside each brick.
  #[inline]
  pub fn total_depth(&self) -> u32 {
    self.brick_parent_depth + 1 + BRICK_DEPTH
  }

  /// Voxels per axis on the finest grid.
  #[inline]
  pub fn resolution(&self) -> u32 {
    1 << self.total_depth()
  }

  /// World-space edge length of one voxel.
  #[inline]
  pub fn voxel_size(&self) -> f32 {
    self.world_size / self.resolution() as f32
  }

  /// Reject configurations the key codec or the grid cannot represent.
  pub fn validate(&self) -> Result<(), BuildError> {
    if self.total_depth() > COORD_BITS {
      return Err(BuildError::InvalidBrickParentDepth {
        depth: self.brick_parent_depth,
        max: COORD_BITS - 1 - BRICK_DEPTH,
      });
    }
    if !(self.world_size.is_finite() && self.world_size > 0.0) {
      return Err(BuildError::InvalidWorldSize {
        size: self.world_size,
      });
    }
    if !self.world_min.is_finite() {
      return Err(BuildError::InvalidWorldSize {
        size: f32::NAN,
      });
    }
    Ok(())
  }
}

#[cfg(test)]
#[path = "types_test.rs"]
mod types_test;
