//! Combat resolution between nations
//!
//! Every engagement of a turn is resolved against the same pre-combat world,
//! then the results are applied in directive order. Resolution is pure, so
//! large turns fan out over rayon without changing the outcome.

pub mod constants;
pub mod resolution;

pub use resolution::{
    derive_seed, effective_strength, resolve, CombatResult, Outcome,
};

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::types::NationId;
use crate::nation::World;

/// Forces committed by one nation against another for one turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Engagement {
    pub attacker: NationId,
    pub defender: NationId,
    pub force: f64,
}

impl Engagement {
    fn resolve_in(&self, world: &World) -> Result<CombatResult> {
        let attacker = world.nation(&self.attacker)?;
        let defender = world.nation(&self.defender)?;
        let seed = derive_seed(world.turn, &self.attacker, &self.defender);
        resolve(attacker, defender, self.force, seed)
    }
}

/// Resolve every engagement against `world`, one result per engagement
///
/// Results come back in the order of `engagements` regardless of how the work
/// was scheduled; a failing engagement does not stop the others.
pub fn resolve_each(
    engagements: &[Engagement],
    world: &World,
    parallel_threshold: usize,
) -> Vec<Result<CombatResult>> {
    if engagements.len() >= parallel_threshold.max(1) {
        engagements
            .par_iter()
            .map(|engagement| engagement.resolve_in(world))
            .collect()
    } else {
        engagements
            .iter()
            .map(|engagement| engagement.resolve_in(world))
            .collect()
    }
}

/// Resolve all engagements, failing on the first error
pub fn resolve_all(
    engagements: &[Engagement],
    world: &World,
    parallel_threshold: usize,
) -> Result<Vec<CombatResult>> {
    resolve_each(engagements, world, parallel_threshold)
        .into_iter()
        .collect()
}
