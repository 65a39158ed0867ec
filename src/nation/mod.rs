//! Nation registry
//!
//! Canonical per-nation state for one world at one turn, and the validated
//! operations that change it.

pub mod directive;
pub mod registry;
pub mod scenario;
pub mod state;
pub mod world;

pub use directive::Directive;
pub use registry::{AppliedCombat, DeltaOutcome, DirectiveEffect, Registry};
pub use scenario::Scenario;
pub use state::{EconomicDelta, NationSeed, NationState};
pub use world::World;
