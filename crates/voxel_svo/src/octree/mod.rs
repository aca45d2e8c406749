//! Sparse octree: node descriptors, construction, and the published index.

pub mod builder;
pub mod index;
pub mod node;

pub use builder::OctreeBuilder;
pub use index::SvoIndex;
pub use node::{brick_child_offset, internal_child_offset, NodeAttr, NodeDescriptor};
