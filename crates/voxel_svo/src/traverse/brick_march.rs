//! Amanatides & Woo DDA marching through one 8^3 brick.
//!
//! Runs in grid units (one voxel = one unit), where every brick is an
//! axis-aligned cube of side 8 at a multiple-of-8 corner. The caller
//! converts the resulting parameter back to world units.

use glam::{IVec3, UVec3, Vec3};

use crate::brick::{BrickStore, BRICK_SIDE};

const AXIS_EPSILON: f32 = 1e-8;

/// First occupied voxel along the ray, in brick-local coordinates, plus the
/// entry parameter into that voxel (grid units).
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct BrickHit {
  pub local: UVec3,
  pub t: f32,
}

/// March `brick` from where the ray enters it. `origin`/`dir` are the ray
/// in grid units; `t_clamp` floors the entry parameter (the traversal's
/// current position along the ray), so marching never reports a hit behind
/// the ray start.
pub(crate) fn march_brick(
  store: &BrickStore,
  brick: u32,
  brick_min: Vec3,
  origin: Vec3,
  dir: Vec3,
  t_clamp: f32,
) -> Option<BrickHit> {
  let side = BRICK_SIDE as f32;
  let brick_max = brick_min + Vec3::splat(side);

  // Slab intersection against the brick cube.
  let mut inv_dir = Vec3::ZERO;
  for axis in 0..3 {
    inv_dir[axis] = if dir[axis].abs() < AXIS_EPSILON {
      if origin[axis] < brick_min[axis] || origin[axis] > brick_max[axis] {
        return None;
      }
      if dir[axis] >= 0.0 {
        1e30
      } else {
        -1e30
      }
    } else {
      1.0 / dir[axis]
    };
  }
  let t0 = (brick_min - origin) * inv_dir;
  let t1 = (brick_max - origin) * inv_dir;
  let near = t0.min(t1);
  let far = t0.max(t1);
  let t_enter = near.max_element().max(t_clamp).max(0.0);
  let t_exit = far.min_element();
  if t_enter > t_exit {
    return None;
  }

  // Entry voxel.
  let entry = origin + dir * t_enter;
  let local_entry = entry - brick_min;
  let mut voxel = IVec3::new(
    local_entry.x.floor() as i32,
    local_entry.y.floor() as i32,
    local_entry.z.floor() as i32,
  )
  .clamp(IVec3::ZERO, IVec3::splat(BRICK_SIDE as i32 - 1));

  // DDA state: parameter of the next boundary crossing per axis, and the
  // per-voxel parameter increment.
  let mut step = IVec3::ZERO;
  let mut t_delta = Vec3::splat(f32::MAX);
  let mut t_next = Vec3::splat(f32::MAX);
  for axis in 0..3 {
    if dir[axis].abs() < AXIS_EPSILON {
      continue;
    }
    step[axis] = if dir[axis] > 0.0 { 1 } else { -1 };
    t_delta[axis] = 1.0 / dir[axis].abs();
    let boundary = if dir[axis] > 0.0 {
      brick_min[axis] + (voxel[axis] + 1) as f32
    } else {
      brick_min[axis] + voxel[axis] as f32
    };
    t_next[axis] = t_enter + (boundary - entry[axis]).abs() / dir[axis].abs();
  }

  let max_steps = BRICK_SIDE as i32 * 3;
  for _ in 0..max_steps {
    if voxel.min_element() < 0 || voxel.max_element() >= BRICK_SIDE as i32 {
      return None;
    }
    let local = voxel.as_uvec3();

    if store.is_occupied(brick, local) {
      // Entry parameter into the voxel cube.
      let voxel_min = brick_min + voxel.as_vec3();
      let voxel_max = voxel_min + Vec3::ONE;
      let v0 = (voxel_min - origin) * inv_dir;
      let v1 = (voxel_max - origin) * inv_dir;
      let t = v0.min(v1).max_element().max(t_enter);
      return Some(BrickHit { local, t });
    }

    // Step the axis whose boundary is nearest.
    let axis = if t_next.x < t_next.y && t_next.x < t_next.z {
      0
    } else if t_next.y < t_next.z {
      1
    } else {
      2
    };
    if t_next[axis] > t_exit {
      return None;
    }
    voxel[axis] += step[axis];
    t_next[axis] += t_delta[axis];
  }

  None
}

#[cfg(test)]
#[path = "brick_march_test.rs"]
mod brick_march_test;
