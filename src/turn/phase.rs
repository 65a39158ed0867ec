//! Turn phases and directive intake types

use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::core::types::NationId;
use crate::nation::Directive;

/// Where the orchestrator is in the turn cycle
///
/// `Idle -> AwaitingDirectives -> Resolving -> Committed -> Idle`. A failed
/// resolve drops back to `Idle` with nothing committed.
///
/// `Committed` is settled and behaves exactly like `Idle`; it only records
/// that the last `end_turn` landed. `open_turn` moves on from either one,
/// while `cancel_turn`, `resume` and `branch_here` always end in `Idle`.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnPhase {
    Idle,
    AwaitingDirectives(Vec<Submission>),
    Resolving,
    Committed,
}

impl TurnPhase {
    pub fn name(&self) -> &'static str {
        match self {
            TurnPhase::Idle => "idle",
            TurnPhase::AwaitingDirectives(_) => "awaiting directives",
            TurnPhase::Resolving => "resolving",
            TurnPhase::Committed => "committed",
        }
    }

    /// Between turns: nothing queued, nothing in flight
    pub fn is_settled(&self) -> bool {
        matches!(self, TurnPhase::Idle | TurnPhase::Committed)
    }
}

/// Receipt for an accepted directive; tickets count up within a turn
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[display(fmt = "#{}", _0)]
pub struct Ticket(pub u32);

/// A directive accepted into the current turn's queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub ticket: Ticket,
    pub nation: NationId,
    pub directive: Directive,
}

/// Why a directive was refused
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub nation: NationId,
    pub directive: Directive,
    /// Set when the directive had been accepted before the turn failed
    pub ticket: Option<Ticket>,
    pub reason: String,
}

impl Rejection {
    pub fn new(nation: NationId, directive: Directive, reason: impl ToString) -> Self {
        Self {
            nation,
            directive,
            ticket: None,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn of(submission: &Submission, reason: impl ToString) -> Self {
        Self {
            nation: submission.nation.clone(),
            directive: submission.directive.clone(),
            ticket: Some(submission.ticket),
            reason: reason.to_string(),
        }
    }
}

impl std::fmt::Display for Rejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.ticket {
            Some(ticket) => write!(
                f,
                "{} {} ({}): {}",
                self.nation,
                self.directive.kind(),
                ticket,
                self.reason
            ),
            None => write!(f, "{} {}: {}", self.nation, self.directive.kind(), self.reason),
        }
    }
}
