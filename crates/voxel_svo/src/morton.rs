//! 64-bit Morton (Z-order) spatial keys.
//!
//! Each axis contributes 21 bits, interleaved x-lowest, so keys sort in
//! Z-order and all voxels of one octree cell are contiguous in a sorted run.

use glam::UVec3;

use crate::error::BuildError;

/// Bits available per axis in a 64-bit key.
pub const COORD_BITS: u32 = 21;

const COORD_MASK: u32 = (1 << COORD_BITS) - 1;

/// Z-order key of one voxel on the finest grid.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Default)]
pub struct MortonKey(u64);

impl MortonKey {
  /// Interleave a grid coordinate into a key.
  ///
  /// Fails explicitly when any component exceeds the 21-bit budget; keys are
  /// never silently truncated.
  pub fn encode(pos: UVec3) -> Result<Self, BuildError> {
    if pos.x > COORD_MASK || pos.y > COORD_MASK || pos.z > COORD_MASK {
      return Err(BuildError::CoordinateOutOfRange {
        position: pos,
        bits: COORD_BITS,
      });
    }
    Ok(Self(
      spread(pos.x) | (spread(pos.y) << 1) | (spread(pos.z) << 2),
    ))
  }

  /// Recover the grid coordinate.
  pub fn decode(self) -> UVec3 {
    UVec3::new(
      compact(self.0),
      compact(self.0 >> 1),
      compact(self.0 >> 2),
    )
  }

  /// Child octant selector `level` subdivisions above the unit voxel.
  ///
  /// Bit 0 = X, bit 1 = Y, bit 2 = Z. `octant_at(0)` is the voxel's octant
  /// within its 2^3 cell.
  #[inline]
  pub fn octant_at(self, level: u32) -> u8 {
    ((self.0 >> (3 * level)) & 7) as u8
  }

  #[inline]
  pub fn raw(self) -> u64 {
    self.0
  }
}

/// Space bits of a 21-bit value two apart (standard 3D Morton twiddle).
#[inline]
fn spread(v: u32) -> u64 {
  let mut x = (v & COORD_MASK) as u64;
  x = (x | (x << 32)) & 0x001f_0000_0000_ffff;
  x = (x | (x << 16)) & 0x001f_0000_ff00_00ff;
  x = (x | (x << 8)) & 0x100f_00f0_0f00_f00f;
  x = (x | (x << 4)) & 0x10c3_0c30_c30c_30c3;
  x = (x | (x << 2)) & 0x1249_2492_4924_9249;
  x
}

/// Inverse of [`spread`].
#[inline]
fn compact(x: u64) -> u32 {
  let mut x = x & 0x1249_2492_4924_9249;
  x = (x ^ (x >> 2)) & 0x10c3_0c30_c30c_30c3;
  x = (x ^ (x >> 4)) & 0x100f_00f0_0f00_f00f;
  x = (x ^ (x >> 8)) & 0x001f_0000_ff00_00ff;
  x = (x ^ (x >> 16)) & 0x001f_0000_0000_ffff;
  x = (x ^ (x >> 32)) & COORD_MASK as u64;
  x as u32
}

#[cfg(test)]
#[path = "morton_test.rs"]
mod morton_test;
