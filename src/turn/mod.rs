//! Turn orchestration
//!
//! One turn is one atomic transition of the world: directives are collected,
//! then combat, progression, era changes and rankings are computed on a
//! working copy and committed to the active timeline as a single snapshot.

pub mod orchestrator;
pub mod phase;
pub mod progression;
pub mod result;

pub use orchestrator::{Orchestrator, ResumeReport};
pub use phase::{Rejection, Submission, Ticket, TurnPhase};
pub use progression::NationEvent;
pub use result::{NationReport, TurnResult};
