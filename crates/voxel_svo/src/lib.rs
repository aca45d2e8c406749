//! Sparse voxel octree spatial index with ESVO ray traversal.
//!
//! Voxels live on a power-of-two grid addressed by Morton keys. A build
//! turns a batch of [`VoxelSample`]s into an immutable [`SvoIndex`]: a
//! compacted octree whose leaves are dense 8^3 bricks with exact occupancy
//! and fixed-ratio compressed attributes. Rays traverse the octree with the
//! Laine-Karras parametric algorithm, march bricks with a DDA, and can
//! terminate early at a coarser level under ray-cone LOD.
//!
//! ```
//! use glam::{UVec3, Vec3};
//! use voxel_svo::{BuildParams, LodParameters, MortonKey, OctreeBuilder, Ray, VoxelSample};
//!
//! let params = BuildParams::default();
//! let key = MortonKey::encode(UVec3::new(64, 10, 64)).unwrap();
//! let samples = vec![VoxelSample::new(key, 1.0, [255, 255, 255])];
//! let index = OctreeBuilder::new(params).unwrap().build(samples).unwrap();
//!
//! let ray = Ray::new(Vec3::new(64.5, 64.0, 64.5), Vec3::NEG_Y);
//! let result = index.cast_ray(ray, &LodParameters::disabled());
//! assert!(result.is_hit());
//! ```

pub mod brick;
pub mod error;
pub mod lod;
pub mod morton;
pub mod normals;
pub mod octree;
pub mod traverse;
pub mod types;
pub mod world;

pub use brick::{BrickStore, BrickVoxel};
pub use error::BuildError;
pub use lod::LodParameters;
pub use morton::MortonKey;
pub use normals::NormalMode;
pub use octree::{NodeAttr, NodeDescriptor, OctreeBuilder, SvoIndex};
pub use traverse::{cast_ray, MAX_ITERATIONS};
pub use types::{BuildParams, CastResult, MaterialId, Ray, RayHit, VoxelSample};
pub use world::SvoWorld;
