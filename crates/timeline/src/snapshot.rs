use crate::error::TimelineError;
use gridworld_kernel::{ObjectMap, World};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

/// An immutable copy of every world object at one recorded instant.
///
/// The digest is a SHA-256 over the canonical JSON form of the objects, so a
/// snapshot can be checked against accidental mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Store revision at capture time.
    pub revision: u64,
    /// Simulation clock at capture time.
    pub captured_at: Duration,
    objects: Arc<ObjectMap>,
    /// Hex-encoded content digest.
    pub digest: String,
}

impl Snapshot {
    /// Take a snapshot of the current store.
    ///
    /// Shares the store's map; the store copies before its next write, so the
    /// snapshot never observes later mutations.
    pub fn capture(world: &World, captured_at: Duration) -> Result<Self, TimelineError> {
        let objects = world.shared();
        let digest = digest(&objects)?;
        Ok(Self {
            revision: world.revision(),
            captured_at,
            objects,
            digest,
        })
    }

    pub fn objects(&self) -> &ObjectMap {
        &self.objects
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    /// Recompute the digest and compare.
    pub fn verify(&self) -> bool {
        digest(&self.objects).is_ok_and(|d| d == self.digest)
    }

    /// Overwrite the world's store with this snapshot's objects.
    pub fn restore_into(&self, world: &mut World) {
        world.restore(Arc::clone(&self.objects));
    }
}

fn digest(objects: &ObjectMap) -> Result<String, TimelineError> {
    let bytes = serde_json::to_vec(objects)?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}
