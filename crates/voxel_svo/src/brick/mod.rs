//! Dense 8x8x8 voxel bricks: leaf payload of the octree.
//!
//! Occupancy is stored exactly (one bit per voxel); colors and normals go
//! through fixed-ratio lossy codecs so every brick has the same footprint
//! and the whole store stays GPU-uploadable as one flat byte range.

pub mod codec;
pub mod store;

pub use codec::{decode_normal, encode_normal, ColorBlock};
pub use store::{BrickRecord, BrickStore, BrickVoxel};

/// Voxels per brick edge.
pub const BRICK_SIDE: u32 = 8;

/// Voxels per brick (8^3).
pub const BRICK_VOXELS: usize = 512;

/// Linear index of a voxel inside a brick, x fastest.
#[inline]
pub fn voxel_index(x: u32, y: u32, z: u32) -> usize {
  debug_assert!(x < BRICK_SIDE && y < BRICK_SIDE && z < BRICK_SIDE);
  (x + y * BRICK_SIDE + z * BRICK_SIDE * BRICK_SIDE) as usize
}
