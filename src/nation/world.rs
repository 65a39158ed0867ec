//! World - every nation at one turn

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::error::{NacioError, Result};
use crate::core::types::{NationId, Turn};
use crate::nation::state::NationState;

/// The world state for one turn
///
/// Nations are kept in a `BTreeMap` so iteration, serialization and hashing
/// are identical on every run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct World {
    pub turn: Turn,
    /// Calendar year of turn 0
    pub start_year: i32,
    pub nations: BTreeMap<NationId, NationState>,
}

impl World {
    pub fn new(start_year: i32) -> Self {
        Self {
            turn: 0,
            start_year,
            nations: BTreeMap::new(),
        }
    }

    /// Calendar year of the current turn
    pub fn year(&self) -> i32 {
        self.start_year + self.turn as i32
    }

    pub fn nation(&self, id: &NationId) -> Result<&NationState> {
        self.nations
            .get(id)
            .ok_or_else(|| NacioError::not_found(format!("nation {}", id)))
    }

    pub fn contains(&self, id: &NationId) -> bool {
        self.nations.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.nations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_follows_turn() {
        let mut world = World::new(1980);
        assert_eq!(world.year(), 1980);
        world.turn = 7;
        assert_eq!(world.year(), 1987);
    }

    #[test]
    fn test_missing_nation_is_not_found() {
        let world = World::new(1980);
        assert!(matches!(
            world.nation(&NationId::from("xyz")),
            Err(NacioError::NotFound(_))
        ));
    }
}
