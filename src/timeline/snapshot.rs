//! Snapshot - a frozen world at one turn

use serde::{Deserialize, Serialize};

use crate::core::types::Turn;
use crate::nation::World;

/// Immutable capture of a world
///
/// There is no way to get a mutable reference to the world inside; committed
/// snapshots are shared as `Arc<Snapshot>` across timelines and threads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    world: World,
}

impl Snapshot {
    pub fn capture(world: World) -> Self {
        Self { world }
    }

    pub fn turn(&self) -> Turn {
        self.world.turn
    }

    pub fn year(&self) -> i32 {
        self.world.year()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Owned copy of the world, for resuming play from this point
    pub fn to_world(&self) -> World {
        self.world.clone()
    }

    /// blake3 over the canonical JSON form of the world, hex encoded
    ///
    /// Nations are held in a `BTreeMap`, so equal worlds always hash equal.
    pub fn content_hash(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        if let Err(err) = serde_json::to_writer(&mut hasher, &self.world) {
            // World keys are strings; serialization cannot fail in practice
            tracing::error!(%err, turn = self.turn(), "Failed to serialize world for hashing");
        }
        hasher.finalize().to_hex().to_string()
    }
}

#[cfg(test)]
mod tests {
    use crate::core::types::NationId;
    use crate::nation::{EconomicDelta, NationSeed, Registry};

    fn registry() -> Registry {
        let mut registry = Registry::new(1980);
        registry
            .create(NationId::from("a"), NationSeed::new("Alpha", 100.0, 1_000_000))
            .unwrap();
        registry
            .create(NationId::from("b"), NationSeed::new("Beta", 50.0, 2_000_000))
            .unwrap();
        registry
    }

    #[test]
    fn test_hash_is_stable() {
        let a = registry().snapshot();
        let b = registry().snapshot();
        assert_eq!(a.content_hash(), b.content_hash());
        assert_eq!(a.content_hash().len(), 64);
    }

    #[test]
    fn test_hash_tracks_content() {
        let mut registry = registry();
        let before = registry.snapshot();
        registry
            .apply_economic_delta(&NationId::from("b"), EconomicDelta::new(0.5, 0.0, 0))
            .unwrap();
        assert_ne!(before.content_hash(), registry.snapshot().content_hash());
    }

    #[test]
    fn test_turn_and_year() {
        let snapshot = registry().snapshot();
        assert_eq!(snapshot.turn(), 0);
        assert_eq!(snapshot.year(), 1980);
    }
}
