//! Ray traversal: octree descent in mirrored parametric space, plus DDA
//! marching inside bricks.

mod brick_march;
mod cast;

pub use cast::{cast_ray, MAX_ITERATIONS};
