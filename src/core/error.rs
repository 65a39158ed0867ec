use thiserror::Error;

use crate::core::types::{NationId, TimelineId, Turn};

#[derive(Error, Debug)]
pub enum NacioError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Invariant violated: {field} would become {value}")]
    InvariantViolation { field: &'static str, value: f64 },

    #[error("Invalid committed force: {0}")]
    InvalidForce(f64),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Nation already registered: {0}")]
    DuplicateId(NationId),

    #[error("Timeline {timeline} has no snapshot at turn {turn}")]
    InvalidBranchPoint { timeline: TimelineId, turn: Turn },

    #[error("Out-of-order append on timeline {timeline}: expected turn {expected}, got {got}")]
    OutOfOrder {
        timeline: TimelineId,
        expected: Turn,
        got: Turn,
    },

    #[error(
        "Unsupported snapshot schema version {found} (supported up to {supported}); \
         revert to the last known-good snapshot"
    )]
    SchemaVersion { found: String, supported: u32 },

    #[error("Illegal turn transition: cannot {action} while {phase}")]
    IllegalTransition {
        phase: &'static str,
        action: &'static str,
    },

    #[error("Turn rejected: {} directive(s) failed validation", .0.len())]
    TurnRejected(Vec<crate::turn::Rejection>),

    #[error("Narrative error: {0}")]
    Narrative(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    TomlError(#[from] toml::de::Error),
}

impl NacioError {
    pub fn not_found(what: impl std::fmt::Display) -> Self {
        NacioError::NotFound(what.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NacioError>;
