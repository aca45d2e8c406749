//! Ray-cone LOD termination (Laine & Karras 2010, section 4.4).
//!
//! A ray carries a cone: diameter `ray_orig_size` at the origin, growing by
//! `ray_dir_size` per unit distance. Traversal stops refining once the cone
//! footprint at the node's distance covers the node, and the hit is
//! synthesized from the node's averaged attributes.

/// Per-ray cone parameters plus the termination threshold.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LodParameters {
  /// Cone diameter at the ray origin (0 for a pinhole camera).
  pub ray_orig_size: f32,

  /// Cone diameter growth per unit distance (tan of the pixel angle).
  pub ray_dir_size: f32,

  /// Threshold multiplier on the projected size. 1.0 terminates when a
  /// voxel shrinks below one footprint; larger values terminate earlier
  /// (coarser), smaller values later (finer).
  pub error_threshold: f32,
}

impl Default for LodParameters {
  fn default() -> Self {
    Self::disabled()
  }
}

impl LodParameters {
  /// No LOD termination: rays always resolve to full voxel resolution.
  pub fn disabled() -> Self {
    Self {
      ray_orig_size: 0.0,
      ray_dir_size: 0.0,
      error_threshold: 1.0,
    }
  }

  pub fn new(ray_orig_size: f32, ray_dir_size: f32) -> Self {
    Self {
      ray_orig_size,
      ray_dir_size,
      error_threshold: 1.0,
    }
  }

  /// Cone for a pinhole camera: one pixel's angular size.
  pub fn from_camera(fov_y: f32, screen_height: u32) -> Self {
    let pixel_angle = fov_y / screen_height as f32;
    Self::new(0.0, 2.0 * (pixel_angle * 0.5).tan())
  }

  /// Cone for a camera with a finite near plane: the cone already has one
  /// pixel's width where rays start.
  pub fn from_camera_with_near_plane(fov_y: f32, screen_height: u32, near_plane: f32) -> Self {
    let pixel_angle = fov_y / screen_height as f32;
    let dir_size = 2.0 * (pixel_angle * 0.5).tan();
    Self::new(near_plane * dir_size, dir_size)
  }

  pub fn with_error_threshold(mut self, threshold: f32) -> Self {
    self.error_threshold = threshold;
    self
  }

  /// Widen or narrow the cone by `2^bias`. Positive bias = coarser.
  pub fn with_bias(mut self, bias: f32) -> Self {
    let multiplier = bias.exp2();
    self.ray_orig_size *= multiplier;
    self.ray_dir_size *= multiplier;
    self
  }

  #[inline]
  pub fn is_enabled(&self) -> bool {
    self.ray_dir_size > 0.0 || self.ray_orig_size > 0.0
  }

  /// Cone diameter at `distance` from the origin.
  #[inline]
  pub fn projected_size(&self, distance: f32) -> f32 {
    distance * self.ray_dir_size + self.ray_orig_size
  }

  /// True when a voxel of `voxel_size` at `distance` is covered by the cone
  /// footprint and refinement should stop.
  ///
  /// Monotonic along a ray: distance never decreases during traversal and
  /// descending halves `voxel_size`, so once this holds for a node it holds
  /// for every node visited after it.
  #[inline]
  pub fn should_terminate(&self, distance: f32, voxel_size: f32) -> bool {
    self.is_enabled() && self.projected_size(distance) * self.error_threshold >= voxel_size
  }
}

#[cfg(test)]
#[path = "lod_test.rs"]
mod lod_test;
