//! Build-time error taxonomy. Query paths never allocate or fail; all
//! fallible validation happens before an index is published.

use glam::UVec3;

/// Errors reported by [`crate::octree::OctreeBuilder`] and the brick store.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BuildError {
  /// Requested brick-parent depth would overflow the Morton bit budget.
  #[error("brick-parent depth {depth} exceeds the key budget (max {max})")]
  InvalidBrickParentDepth { depth: u32, max: u32 },

  /// World extent must be positive and finite.
  #[error("world size must be positive and finite, got {size}")]
  InvalidWorldSize { size: f32 },

  /// A sample coordinate does not fit the key codec or the configured grid.
  #[error("coordinate {position} exceeds the {bits}-bit-per-axis grid")]
  CoordinateOutOfRange { position: UVec3, bits: u32 },

  /// The brick store ran out of addressable slots.
  #[error("brick store full: {count} bricks allocated (capacity {capacity})")]
  BrickStoreFull { count: usize, capacity: usize },
}
