//! Narrative boundary
//!
//! The engine never depends on narrative text. A committed `TurnResult` is
//! handed to a `NarrativeService`; whatever it returns (or fails to return in
//! time) is flavor only.

pub mod client;

pub use client::LlmClient;

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::turn::TurnResult;

/// Shown when no narrative could be produced
pub const PLACEHOLDER_TEXT: &str =
    "[Cabinet unavailable] No briefing was filed this year. The figures stand on their own.";

/// Something that can turn a committed turn into prose
pub trait NarrativeService: Send + Sync {
    fn describe(&self, result: &TurnResult) -> impl Future<Output = Result<String>> + Send;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Narrative {
    Text(String),
    Placeholder { reason: String },
}

impl Narrative {
    pub fn text(&self) -> &str {
        match self {
            Narrative::Text(text) => text,
            Narrative::Placeholder { .. } => PLACEHOLDER_TEXT,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, Narrative::Placeholder { .. })
    }
}

/// Ask `service` for a briefing, bounded by `timeout`
///
/// Never fails: errors, empty answers and timeouts all become a placeholder.
pub async fn narrate<S: NarrativeService>(
    service: &S,
    result: &TurnResult,
    timeout: Duration,
) -> Narrative {
    let reason = match tokio::time::timeout(timeout, service.describe(result)).await {
        Ok(Ok(text)) if !text.trim().is_empty() => return Narrative::Text(text),
        Ok(Ok(_)) => "empty response".to_string(),
        Ok(Err(err)) => err.to_string(),
        Err(_) => format!("no response within {}ms", timeout.as_millis()),
    };
    tracing::warn!(turn = result.turn, %reason, "Narrative unavailable, using placeholder");
    Narrative::Placeholder { reason }
}

/// Offline service that returns the engine's own digest
#[derive(Debug, Clone, Copy, Default)]
pub struct SummaryNarrator;

impl NarrativeService for SummaryNarrator {
    async fn describe(&self, result: &TurnResult) -> Result<String> {
        Ok(result.summary())
    }
}
