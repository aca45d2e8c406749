//! ESVO ray traversal (Laine & Karras 2010).
//!
//! The octree is traversed in normalized [1,2]^3 space with octant
//! mirroring: axes along which the ray moves in the positive direction are
//! reflected so the traversal always steps toward decreasing coordinates.
//! Descent, sibling advance, and ascent are the classic PUSH / ADVANCE /
//! POP phases over an explicit per-scale stack; `octant_mask` records which
//! axes were left unmirrored (bit set = not mirrored). Brick children are
//! resolved by mask compaction and marched with the DDA in grid units.

use glam::Vec3;

use super::brick_march::march_brick;
use crate::lod::LodParameters;
use crate::octree::node::{brick_child_offset, internal_child_offset, NodeAttr};
use crate::octree::SvoIndex;
use crate::types::{CastResult, Ray, RayHit};

/// Traversal loop cap; a ray that is still unresolved reports a miss with
/// `cap_exceeded` set.
pub const MAX_ITERATIONS: u32 = 2048;

/// Position quantization bits; a cube at scale `s` has side `2^(s - S_MAX)`.
const S_MAX: i32 = 23;

/// Scale at which the root's children are processed.
const ROOT_SCALE: i32 = 22;

/// Below this magnitude an axis is treated as perpendicular to the ray.
const DIR_EPSILON: f32 = 1e-5;

/// Corner parameters beyond this come from the epsilon-inflated coefficient
/// of a perpendicular axis and are excluded from exit selection.
const CORNER_LIMIT: f32 = 1000.0;

/// Entry parameters below this use position-based initial octant selection.
const BOUNDARY_EPSILON: f32 = 0.01;

/// Parametric ray form in mirrored space: the parameter at plane `x = p` is
/// `p * coef - bias`, with `coef = 1 / -|scaled dir|` so parameters grow
/// along the ray on every axis. The direction is scaled so `t = 1` lands on
/// the cube exit.
struct RayCoef {
  /// Unit world-space direction, for axis classification only.
  dir: Vec3,
  coef: Vec3,
  bias: Vec3,
  /// Bit set = axis not mirrored.
  octant_mask: u8,
  norm_origin: Vec3,
}

#[derive(Clone, Copy)]
struct StackEntry {
  node: u32,
  t_max: f32,
}

/// Cast one world-space ray against the index.
pub fn cast_ray(index: &SvoIndex, ray: Ray, lod: &LodParameters) -> CastResult {
  cast_ray_capped(index, ray, lod, MAX_ITERATIONS)
}

/// [`cast_ray`] with an explicit iteration budget.
pub(crate) fn cast_ray_capped(
  index: &SvoIndex,
  ray: Ray,
  lod: &LodParameters,
  max_iterations: u32,
) -> CastResult {
  if !ray.origin.is_finite() || !ray.dir.is_finite() {
    return CastResult::miss(0);
  }
  let dir_len = ray.dir.length();
  if dir_len < 1e-6 {
    return CastResult::miss(0);
  }
  let dir = ray.dir / dir_len;
  let origin = ray.origin;

  let world_min = index.world_min();
  let world_max = index.world_max();
  let world_size = index.params().world_size;

  let inside = origin.cmpge(world_min).all() && origin.cmple(world_max).all();
  let Some((t_entry, t_exit)) = intersect_aabb(origin, dir, world_min, world_max) else {
    return CastResult::miss(0);
  };
  if t_exit < 0.0 {
    return CastResult::miss(0);
  }

  // Traversal runs from the entry point, with the parametric direction
  // scaled so t = 1 lands on the cube exit. The in-cube segment can be up
  // to sqrt(3) world sizes long, so world distance is `span * t`, never
  // `world_size * t`.
  let ray_start = if inside { 0.0 } else { t_entry.max(0.0) };
  let span = (t_exit - ray_start).max(world_size * 1e-6);
  let entry_point = origin + dir * ray_start;
  let norm_origin = (entry_point - world_min) / world_size + Vec3::ONE;
  let coef = ray_coefficients(dir, span / world_size, norm_origin);

  // In mirrored space the ray moves toward decreasing coordinates, so it
  // enters the cube through the planes at 2 and leaves through those at 1.
  let mut t_min = if inside {
    0.0
  } else {
    corner_params(Vec3::splat(2.0), &coef).max_element().max(0.0)
  };
  let mut t_max = corner_params(Vec3::ONE, &coef).min_element().min(1.0);
  let mut h = t_max;

  let mut stack = [StackEntry { node: 0, t_max }; (ROOT_SCALE + 1) as usize];

  let mut parent = 0u32;
  let mut idx = 0u8;
  let mut pos = Vec3::ONE;
  let mut scale = ROOT_SCALE;
  let mut scale_exp2 = 0.5f32;
  select_initial_octant(&mut pos, &mut idx, &coef, t_min);

  let min_scale = ROOT_SCALE - index.params().brick_parent_depth as i32;
  let voxel_size = index.params().voxel_size();

  let mut iterations = 0u32;
  loop {
    if iterations == max_iterations {
      return CastResult {
        hit: None,
        iterations,
        cap_exceeded: true,
      };
    }
    iterations += 1;

    let node = index.nodes()[parent as usize];
    let mirrored_valid = mirror_mask(node.valid_mask, coef.octant_mask);
    let mirrored_leaf = mirror_mask(node.leaf_mask, coef.octant_mask);

    let corner = corner_params(pos, &coef);
    let tc_max = corrected_tc_max(corner, coef.dir, t_max);
    let tv_max = t_max.min(tc_max);

    let child_valid = mirrored_valid & (1 << idx) != 0;
    let child_is_brick = mirrored_leaf & (1 << idx) != 0;

    if child_valid && t_min <= tv_max {
      let distance = ray_start + t_min * span;
      if lod.should_terminate(distance, scale_exp2 * world_size) {
        let local_octant = mirrored_to_local(idx, coef.octant_mask);
        let Some(attr) = child_attr(index, &node, local_octant, child_is_brick) else {
          break;
        };
        let depth = (ROOT_SCALE - scale + 1) as u32;
        return CastResult {
          hit: Some(RayHit {
            t: distance,
            position: origin + dir * distance,
            normal: attr.decoded_normal(),
            color: attr.color,
            material: attr.material,
            depth,
          }),
          iterations,
          cap_exceeded: false,
        };
      }

      if child_is_brick {
        let local_octant = mirrored_to_local(idx, coef.octant_mask);
        let Some(offset) = brick_child_offset(node.valid_mask, node.leaf_mask, local_octant)
        else {
          break;
        };
        let brick = node.brick_ptr + offset;

        if !index.bricks().is_empty(brick) {
          // Un-mirror the child corner and place the brick on the grid.
          let mut corner_local = pos;
          for axis in 0..3 {
            if coef.octant_mask & (1 << axis) == 0 {
              corner_local[axis] = 3.0 - scale_exp2 - pos[axis];
            }
          }
          let resolution = index.params().resolution() as f32;
          let brick_min = ((corner_local - Vec3::ONE) * resolution).round();
          let origin_grid = (origin - world_min) / voxel_size;

          if let Some(hit) = march_brick(
            index.bricks(),
            brick,
            brick_min,
            origin_grid,
            dir,
            ray_start / voxel_size,
          ) {
            let Some(voxel) = index.bricks().sample_voxel(brick, hit.local) else {
              break;
            };
            let t_world = hit.t * voxel_size;
            return CastResult {
              hit: Some(RayHit {
                t: t_world,
                position: origin + dir * t_world,
                normal: voxel.normal,
                color: voxel.color,
                material: voxel.material,
                depth: index.params().total_depth(),
              }),
              iterations,
              cap_exceeded: false,
            };
          }
        }

        // Empty brick, or the ray crossed it without touching a set voxel:
        // consume the child interval and advance past it.
        t_min = tv_max;
      } else {
        // PUSH.
        let tc_plain = corner.min_element();
        if tc_plain < h {
          stack[scale as usize] = StackEntry {
            node: parent,
            t_max,
          };
        }
        h = tc_plain;

        let local_octant = mirrored_to_local(idx, coef.octant_mask);
        let Some(offset) = internal_child_offset(node.valid_mask, node.leaf_mask, local_octant)
        else {
          break;
        };
        let child_index = node.child_ptr + offset;
        if child_index as usize >= index.nodes().len() {
          break;
        }
        parent = child_index;

        let t_center = corner + coef.coef * (scale_exp2 * 0.5);
        idx = 0;
        scale -= 1;
        scale_exp2 *= 0.5;
        for axis in 0..3 {
          if t_center[axis] > t_min {
            idx ^= 1 << axis;
            pos[axis] += scale_exp2;
          }
        }
        t_max = tv_max;
        continue;
      }
    }

    // ADVANCE: step out of the current child along every axis whose exit
    // plane is the nearest one.
    let exit_param = tc_max;
    let mut step_mask = 0u8;
    for axis in 0..3 {
      if coef.dir[axis].abs() >= DIR_EPSILON && corner[axis] <= exit_param {
        step_mask |= 1 << axis;
        pos[axis] -= scale_exp2;
      }
    }
    t_min = t_min.max(exit_param);
    idx ^= step_mask;

    if idx & step_mask != 0 {
      // POP: the step crossed the parent boundary. The target scale is the
      // highest bit at which the quantized positions before and after the
      // step differ; the ancestor there is restored from the stack.
      let mut differing = 0u32;
      for axis in 0..3 {
        if step_mask & (1 << axis) != 0 {
          let before = quantize(pos[axis] + scale_exp2);
          let after = quantize(pos[axis]);
          differing |= (before ^ after) as u32;
        }
      }
      if differing == 0 {
        break;
      }
      let new_scale = 31 - differing.leading_zeros() as i32;
      if new_scale < min_scale || new_scale >= S_MAX {
        break;
      }
      scale = new_scale;
      scale_exp2 = ((scale - S_MAX) as f32).exp2();

      let entry = stack[scale as usize];
      parent = entry.node;
      t_max = entry.t_max;

      // Snap the position to the child grid of the restored scale.
      let grid_mask = !((1u32 << scale) - 1);
      idx = 0;
      for axis in 0..3 {
        let q = (quantize(pos[axis]).max(0) as u32) & grid_mask;
        pos[axis] = 1.0 + q as f32 / (1u32 << S_MAX) as f32;
        idx |= (((q >> scale) & 1) as u8) << axis;
      }
      h = 0.0;
    }
  }

  CastResult::miss(iterations)
}

/// Averaged attributes of the child at `local_octant`, for LOD-synthesized
/// hits: brick averages for brick children, the node attribute otherwise.
fn child_attr(
  index: &SvoIndex,
  node: &crate::octree::NodeDescriptor,
  local_octant: u8,
  is_brick: bool,
) -> Option<NodeAttr> {
  if is_brick {
    let offset = brick_child_offset(node.valid_mask, node.leaf_mask, local_octant)?;
    Some(NodeAttr::from_brick(index.bricks().record(node.brick_ptr + offset)))
  } else {
    let offset = internal_child_offset(node.valid_mask, node.leaf_mask, local_octant)?;
    index.attrs().get((node.child_ptr + offset) as usize).copied()
  }
}

/// Parameter at the lower corner planes of the cube anchored at `pos`.
#[inline]
fn corner_params(pos: Vec3, coef: &RayCoef) -> Vec3 {
  pos * coef.coef - coef.bias
}

/// Quantized mirrored-space coordinate: `[1,2)` maps to `[0, 2^23)`.
/// Cube corners at every scale land exactly on this grid.
#[inline]
fn quantize(p: f32) -> i32 {
  ((p - 1.0) * (1u32 << S_MAX) as f32) as i32
}

fn ray_coefficients(dir: Vec3, scale: f32, norm_origin: Vec3) -> RayCoef {
  // Inflate perpendicular axes so their coefficients stay finite; the
  // corresponding corner parameters are excluded later instead.
  let mut safe = dir * scale;
  for axis in 0..3 {
    if dir[axis].abs() < DIR_EPSILON {
      safe[axis] = DIR_EPSILON.copysign(dir[axis]);
    }
  }

  let coef = Vec3::new(
    1.0 / -safe.x.abs(),
    1.0 / -safe.y.abs(),
    1.0 / -safe.z.abs(),
  );
  let mut bias = coef * norm_origin;

  let mut octant_mask = 7u8;
  for axis in 0..3 {
    // Sub-epsilon components stay unmirrored, so a ray on an octant
    // boundary resolves the tie exactly like its axis-parallel limit.
    if dir[axis] >= DIR_EPSILON {
      octant_mask ^= 1 << axis;
      bias[axis] = 3.0 * coef[axis] - bias[axis];
    }
  }

  RayCoef {
    dir,
    coef,
    bias,
    octant_mask,
    norm_origin,
  }
}

/// Pick the root child the traversal starts in. Near the cube boundary (or
/// on perpendicular axes) the parametric comparison is unstable, so the
/// octant comes from the mirrored entry position instead.
fn select_initial_octant(pos: &mut Vec3, idx: &mut u8, coef: &RayCoef, t_min: f32) {
  let position_based = t_min < BOUNDARY_EPSILON;
  for axis in 0..3 {
    let mirrored_origin = if coef.octant_mask & (1 << axis) != 0 {
      coef.norm_origin[axis]
    } else {
      3.0 - coef.norm_origin[axis]
    };
    if coef.dir[axis].abs() < DIR_EPSILON || position_based {
      if mirrored_origin >= 1.5 {
        *idx |= 1 << axis;
        pos[axis] = 1.5;
      }
    } else if 1.5 * coef.coef[axis] - coef.bias[axis] > t_min {
      *idx ^= 1 << axis;
      pos[axis] = 1.5;
    }
  }
}

/// Exit parameter of the current cube, ignoring axes the ray cannot step
/// along and corner values blown up by their inflated coefficients.
fn corrected_tc_max(corner: Vec3, dir: Vec3, t_max: f32) -> f32 {
  let mut tc = f32::MAX;
  for axis in 0..3 {
    let usable = dir[axis].abs() >= DIR_EPSILON && corner[axis].abs() < CORNER_LIMIT;
    tc = tc.min(if usable { corner[axis] } else { t_max });
  }
  tc
}

/// Permute a child mask into mirrored octant numbering.
#[inline]
fn mirror_mask(mask: u8, octant_mask: u8) -> u8 {
  let flip = !octant_mask & 7;
  if flip == 0 {
    return mask;
  }
  let mut mirrored = 0u8;
  for octant in 0..8u8 {
    if mask & (1 << octant) != 0 {
      mirrored |= 1 << (octant ^ flip);
    }
  }
  mirrored
}

/// Mirrored child index back to storage (local) octant numbering.
#[inline]
fn mirrored_to_local(idx: u8, octant_mask: u8) -> u8 {
  idx ^ (!octant_mask & 7)
}

/// Slab intersection with the world cube; `None` when the ray misses.
fn intersect_aabb(origin: Vec3, dir: Vec3, box_min: Vec3, box_max: Vec3) -> Option<(f32, f32)> {
  const EPSILON: f32 = 1e-8;
  let mut inv = Vec3::ZERO;
  for axis in 0..3 {
    inv[axis] = if dir[axis].abs() < EPSILON {
      if origin[axis] < box_min[axis] || origin[axis] > box_max[axis] {
        return None;
      }
      if dir[axis] >= 0.0 {
        1e20
      } else {
        -1e20
      }
    } else {
      1.0 / dir[axis]
    };
  }
  let t0 = (box_min - origin) * inv;
  let t1 = (box_max - origin) * inv;
  let t_entry = t0.min(t1).max_element();
  let t_exit = t0.max(t1).min_element();
  (t_entry <= t_exit && t_exit >= 0.0).then_some((t_entry, t_exit))
}

#[cfg(test)]
#[path = "cast_test.rs"]
mod cast_test;
