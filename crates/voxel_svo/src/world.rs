//! Shared world handle: one atomically swappable published index.
//!
//! Builds happen off to the side; queries clone the current `Arc` once and
//! traverse without holding any lock, so an in-flight batch keeps seeing
//! the snapshot it started with even if a rebuild publishes mid-batch.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use crate::lod::LodParameters;
use crate::octree::SvoIndex;
use crate::types::{BuildParams, CastResult, Ray};

static NEXT_WORLD_ID: AtomicU64 = AtomicU64::new(1);

/// A voxel world whose index can be rebuilt and republished while queries
/// are running.
pub struct SvoWorld {
  id: u64,
  current: RwLock<Arc<SvoIndex>>,
}

impl SvoWorld {
  /// A world that starts empty: every ray misses until a build publishes.
  pub fn new(params: BuildParams) -> Self {
    Self::from_index(SvoIndex::empty(params))
  }

  pub fn from_index(index: SvoIndex) -> Self {
    Self {
      id: NEXT_WORLD_ID.fetch_add(1, Ordering::Relaxed),
      current: RwLock::new(Arc::new(index)),
    }
  }

  /// Unique id of this world within the process.
  pub fn id(&self) -> u64 {
    self.id
  }

  /// Swap in a freshly built index. Readers holding the previous snapshot
  /// are unaffected; new snapshots see the new index.
  pub fn publish(&self, index: Arc<SvoIndex>) {
    let mut current = self
      .current
      .write()
      .unwrap_or_else(PoisonError::into_inner);
    *current = index;
  }

  /// The currently published index. Cheap; clones one `Arc`.
  pub fn snapshot(&self) -> Arc<SvoIndex> {
    self
      .current
      .read()
      .unwrap_or_else(PoisonError::into_inner)
      .clone()
  }

  /// Cast one ray against the current snapshot.
  pub fn cast_ray(&self, ray: Ray, lod: &LodParameters) -> CastResult {
    self.snapshot().cast_ray(ray, lod)
  }
}

#[cfg(test)]
#[path = "world_test.rs"]
mod world_test;
