//! Per-turn economic progression
//!
//! Runs once per nation after combat, in nation-id order:
//! 1. Approval events: unrest below the threshold, a boom above it
//! 2. Population and GDP growth, GDP scaled by stability
//! 3. Taxes in, military upkeep out; an overdraft is a bankruptcy

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::core::config::EconomyConfig;
use crate::core::error::Result;
use crate::core::types::NationId;
use crate::nation::{EconomicDelta, Registry};

/// Something that happened to a nation during progression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NationEvent {
    /// Approval under the unrest threshold
    CivilUnrest { stability_loss: f64 },
    /// Approval over the boom threshold
    EconomicBoom { gdp_gain: f64 },
    /// Upkeep exceeded the treasury
    Bankruptcy { shortfall: f64 },
}

/// GDP growth rate for a given stability
pub fn gdp_growth_rate(stability: f64, config: &EconomyConfig) -> f64 {
    config.gdp_growth + (stability - 50.0) / config.stability_growth_divisor
}

/// Advance one nation by one turn
pub fn progress(
    registry: &mut Registry,
    id: &NationId,
    config: &EconomyConfig,
) -> Result<Vec<NationEvent>> {
    let mut events = Vec::new();

    let approval = registry.get(id)?.approval;
    if approval < config.unrest_threshold {
        let applied = registry.adjust_stability(id, -config.unrest_stability_penalty)?;
        events.push(NationEvent::CivilUnrest {
            stability_loss: -applied,
        });
    }
    let boom = approval > config.boom_threshold;

    let nation = registry.get(id)?;
    let mut gdp_delta = nation.gdp * gdp_growth_rate(nation.stability, config);
    if boom {
        let gain = nation.gdp * config.boom_gdp_bonus;
        gdp_delta += gain;
        events.push(NationEvent::EconomicBoom { gdp_gain: gain });
    }
    let population_delta = (nation.population as f64 * config.population_growth).round() as i64;
    let taxes = (nation.gdp + gdp_delta) * config.tax_rate;
    let upkeep = nation.military_strength * config.military_upkeep;

    let outcome = registry.apply_economic_delta(
        id,
        EconomicDelta::new(gdp_delta, taxes - upkeep, population_delta),
    )?;

    if outcome.bankrupt() {
        registry.adjust_stability(id, -config.bankruptcy_stability_penalty)?;
        registry.adjust_approval(id, -config.bankruptcy_approval_penalty)?;
        events.push(NationEvent::Bankruptcy {
            shortfall: outcome.shortfall,
        });
    }

    if !events.is_empty() {
        tracing::debug!(nation = %id, ?events, "Progression events");
    }
    Ok(events)
}

/// Advance every nation, returning the events per nation
pub fn progress_all(
    registry: &mut Registry,
    config: &EconomyConfig,
) -> Result<BTreeMap<NationId, Vec<NationEvent>>> {
    let mut events = BTreeMap::new();
    for id in registry.ids() {
        let happened = progress(registry, &id, config)?;
        events.insert(id, happened);
    }
    Ok(events)
}
