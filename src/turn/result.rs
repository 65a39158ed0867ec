//! TurnResult - everything a committed turn produced

use std::collections::BTreeMap;
use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

use crate::core::types::{Era, NationId, TimelineId, Turn};
use crate::era::EraTransition;
use crate::nation::{AppliedCombat, NationState};
use crate::ranking::Leaderboards;
use crate::turn::progression::NationEvent;

/// Change in one nation across a turn
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NationReport {
    pub name: String,
    pub era: Era,
    /// Set when the era moved this turn
    pub era_transition: Option<EraTransition>,
    pub gdp_delta: f64,
    pub treasury_delta: f64,
    pub population_delta: i64,
    pub stability_delta: f64,
    pub approval_delta: f64,
    pub military_delta: f64,
    pub territory_delta: i64,
    pub events: Vec<NationEvent>,
}

impl NationReport {
    pub fn between(
        before: &NationState,
        after: &NationState,
        era_transition: Option<EraTransition>,
        events: Vec<NationEvent>,
    ) -> Self {
        Self {
            name: after.name.clone(),
            era: after.era,
            era_transition,
            gdp_delta: after.gdp - before.gdp,
            treasury_delta: after.treasury - before.treasury,
            population_delta: after.population as i64 - before.population as i64,
            stability_delta: after.stability - before.stability,
            approval_delta: after.approval - before.approval,
            military_delta: after.military_strength - before.military_strength,
            territory_delta: after.territory as i64 - before.territory as i64,
            events,
        }
    }
}

/// Output of one committed turn
///
/// This is what the narrative service and any UI consume. It serializes to
/// plain JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnResult {
    pub timeline: TimelineId,
    /// The newly committed turn
    pub turn: Turn,
    pub year: i32,
    pub directives_applied: usize,
    pub nations: BTreeMap<NationId, NationReport>,
    /// In submission order
    pub engagements: Vec<AppliedCombat>,
    pub leaderboards: Leaderboards,
    pub snapshot_hash: String,
}

impl TurnResult {
    pub fn era_changes(&self) -> impl Iterator<Item = (&NationId, &EraTransition)> {
        self.nations
            .iter()
            .filter_map(|(id, report)| report.era_transition.as_ref().map(|t| (id, t)))
    }

    /// Short multi-line digest for terminals and logs
    pub fn summary(&self) -> String {
        let mut out = format!(
            "Turn {} ({}) committed, {} directive(s), {} engagement(s)\n",
            self.turn,
            self.year,
            self.directives_applied,
            self.engagements.len()
        );

        for applied in &self.engagements {
            let r = &applied.result;
            let _ = writeln!(
                out,
                "  {} vs {}: {:?}, ratio {:.2}, {} province(s) changed hands",
                r.attacker, r.defender, r.outcome, r.ratio, r.territory_delta
            );
        }
        for (id, step) in self.era_changes() {
            let _ = writeln!(out, "  {} enters the {} era (from {})", id, step.to, step.from);
        }
        for (id, report) in &self.nations {
            for event in &report.events {
                let _ = writeln!(out, "  {}: {:?}", id, event);
            }
        }
        if let Some(top) = self.leaderboards.economies.first() {
            let _ = writeln!(out, "  Largest economy: {} ({:.0}B)", top.name, top.value);
        }
        out
    }
}
