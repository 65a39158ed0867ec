//! Registry - the only mutation path for nation state
//!
//! Field policy on every mutation:
//! - tech / industry outside [1, 5]: rejected
//! - GDP or population below zero: rejected
//! - stability / approval: clamped to [0, 100]
//! - military strength: floored at 0
//! - treasury: floored at 0, reported as a bankruptcy
//!
//! Every operation validates before touching state, so a rejected call leaves
//! the registry exactly as it was.

use serde::{Deserialize, Serialize};

use crate::combat::{CombatResult, Engagement};
use crate::core::config::DirectiveConfig;
use crate::core::error::{NacioError, Result};
use crate::core::types::NationId;
use crate::era::{self, EraTransition};
use crate::nation::directive::Directive;
use crate::nation::state::{
    EconomicDelta, NationSeed, NationState, DEFAULT_APPROVAL, DEFAULT_TREASURY_SHARE, MAX_LEVEL,
    MIN_LEVEL,
};
use crate::nation::world::World;
use crate::timeline::Snapshot;

/// Result of an economic delta
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DeltaOutcome {
    /// Treasury overdraft that was absorbed by flooring at zero
    pub shortfall: f64,
}

impl DeltaOutcome {
    pub fn bankrupt(&self) -> bool {
        self.shortfall > 0.0
    }
}

/// What applying a directive produced
#[derive(Clone, Debug, PartialEq)]
pub enum DirectiveEffect {
    /// State changed in place; `cost` was taken from the treasury
    Applied { cost: f64 },
    /// Forces committed; resolved later in the turn
    Engagement(Engagement),
}

/// A combat result as it landed on the registry
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppliedCombat {
    pub result: CombatResult,
    /// GDP (billions) that moved from defender to attacker
    pub gdp_transfer: f64,
    pub population_transfer: u64,
}

#[derive(Clone, Debug)]
pub struct Registry {
    world: World,
}

impl Registry {
    pub fn new(start_year: i32) -> Self {
        Self {
            world: World::new(start_year),
        }
    }

    /// Resume from a committed world
    pub fn from_world(world: World) -> Self {
        Self { world }
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn into_world(self) -> World {
        self.world
    }

    pub fn get(&self, id: &NationId) -> Result<&NationState> {
        self.world.nation(id)
    }

    pub fn ids(&self) -> Vec<NationId> {
        self.world.nations.keys().cloned().collect()
    }

    /// Register a new nation
    ///
    /// The era comes straight from the starting metrics. Neighbour links are
    /// made symmetric with nations already present.
    pub fn create(&mut self, id: NationId, seed: NationSeed) -> Result<&NationState> {
        if self.world.contains(&id) {
            return Err(NacioError::DuplicateId(id));
        }
        if id.as_str().trim().is_empty() {
            return Err(NacioError::Validation("nation id must not be empty".into()));
        }
        check_level("tech_level", seed.tech_level)?;
        check_level("industry_level", seed.industry_level)?;
        if !seed.gdp.is_finite() || seed.gdp < 0.0 {
            return Err(NacioError::InvariantViolation {
                field: "gdp",
                value: seed.gdp,
            });
        }
        let treasury = seed.treasury.unwrap_or(seed.gdp * DEFAULT_TREASURY_SHARE);
        if !treasury.is_finite() || treasury < 0.0 {
            return Err(NacioError::InvariantViolation {
                field: "treasury",
                value: treasury,
            });
        }
        for (field, value) in [
            ("stability", seed.stability),
            ("military_strength", seed.military_strength),
        ] {
            if !value.is_finite() {
                return Err(NacioError::InvariantViolation { field, value });
            }
        }

        let mut neighbors: std::collections::BTreeSet<NationId> =
            seed.neighbors.into_iter().filter(|n| *n != id).collect();
        // Nations that already listed this one
        for other in self.world.nations.values() {
            if other.neighbors.contains(&id) {
                neighbors.insert(other.id.clone());
            }
        }

        let mut state = NationState {
            id: id.clone(),
            name: seed.name,
            era: crate::core::types::Era::Stone,
            tech_level: seed.tech_level,
            industry_level: seed.industry_level,
            gdp: seed.gdp,
            population: seed.population,
            treasury,
            stability: clamp_pct(seed.stability),
            approval: clamp_pct(seed.approval.unwrap_or(DEFAULT_APPROVAL)),
            military_strength: seed.military_strength.max(0.0),
            territory: seed.territory,
            neighbors,
        };
        state.era = era::classify(state.gdp_per_capita(), state.tech_level, state.industry_level);

        for neighbor in state.neighbors.iter() {
            if let Some(other) = self.world.nations.get_mut(neighbor) {
                other.neighbors.insert(id.clone());
            }
        }

        tracing::debug!(nation = %id, era = %state.era, "Nation registered");
        self.world.nations.insert(id.clone(), state);
        self.world.nation(&id)
    }

    /// Add to GDP, treasury and population
    pub fn apply_economic_delta(&mut self, id: &NationId, delta: EconomicDelta) -> Result<DeltaOutcome> {
        if !delta.gdp.is_finite() || !delta.treasury.is_finite() {
            return Err(NacioError::Validation(format!(
                "non-finite economic delta for {}",
                id
            )));
        }
        let nation = self.nation_mut(id)?;

        let gdp = nation.gdp + delta.gdp;
        if gdp < 0.0 {
            return Err(NacioError::InvariantViolation { field: "gdp", value: gdp });
        }
        let population = nation.population as i64 + delta.population;
        if population < 0 {
            return Err(NacioError::InvariantViolation {
                field: "population",
                value: population as f64,
            });
        }

        let treasury = nation.treasury + delta.treasury;
        let outcome = DeltaOutcome {
            shortfall: if treasury < 0.0 { -treasury } else { 0.0 },
        };

        nation.gdp = gdp;
        nation.population = population as u64;
        nation.treasury = treasury.max(0.0);

        if outcome.bankrupt() {
            tracing::warn!(nation = %id, shortfall = outcome.shortfall, "Treasury overdrawn");
        }
        Ok(outcome)
    }

    /// Shift stability, clamped to [0, 100]; returns the applied change
    pub fn adjust_stability(&mut self, id: &NationId, delta: f64) -> Result<f64> {
        let nation = self.nation_mut(id)?;
        let before = nation.stability;
        nation.stability = clamp_pct(before + delta);
        Ok(nation.stability - before)
    }

    /// Shift approval, clamped to [0, 100]; returns the applied change
    pub fn adjust_approval(&mut self, id: &NationId, delta: f64) -> Result<f64> {
        let nation = self.nation_mut(id)?;
        let before = nation.approval;
        nation.approval = clamp_pct(before + delta);
        Ok(nation.approval - before)
    }

    /// Shift military strength, floored at zero; returns the applied change
    pub fn adjust_military(&mut self, id: &NationId, delta: f64) -> Result<f64> {
        let nation = self.nation_mut(id)?;
        let before = nation.military_strength;
        nation.military_strength = (before + delta).max(0.0);
        Ok(nation.military_strength - before)
    }

    /// Check a directive against current state without applying it
    pub fn validate_directive(
        &self,
        id: &NationId,
        directive: &Directive,
        costs: &DirectiveConfig,
    ) -> Result<()> {
        let nation = self
            .world
            .nations
            .get(id)
            .ok_or_else(|| NacioError::Validation(format!("Unknown nation: {}", id)))?;

        match directive {
            Directive::RaiseTech => {
                check_raise("tech_level", nation.tech_level)?;
                check_affordable(nation, level_cost(nation, nation.tech_level, costs.tech_cost))
            }
            Directive::RaiseIndustry => {
                check_raise("industry_level", nation.industry_level)?;
                check_affordable(
                    nation,
                    level_cost(nation, nation.industry_level, costs.industry_cost),
                )
            }
            Directive::Invest { amount } | Directive::Mobilize { amount } => {
                check_spend(nation, *amount)
            }
            Directive::Stabilize { amount } => {
                check_spend(nation, *amount)?;
                if nation.gdp <= 0.0 {
                    return Err(NacioError::Validation(format!(
                        "{} has no economy to stabilize",
                        id
                    )));
                }
                Ok(())
            }
            Directive::Attack { target, force } => {
                if target == id {
                    return Err(NacioError::Validation(format!("{} cannot attack itself", id)));
                }
                if !self.world.contains(target) {
                    return Err(NacioError::Validation(format!("Unknown target: {}", target)));
                }
                if !force.is_finite() || *force <= 0.0 {
                    return Err(NacioError::InvalidForce(*force));
                }
                if *force > nation.military_strength {
                    return Err(NacioError::Validation(format!(
                        "{} commits {:.1} but has only {:.1} strength",
                        id, force, nation.military_strength
                    )));
                }
                Ok(())
            }
        }
    }

    /// Validate, then apply a directive
    pub fn apply_directive(
        &mut self,
        id: &NationId,
        directive: &Directive,
        costs: &DirectiveConfig,
    ) -> Result<DirectiveEffect> {
        self.validate_directive(id, directive, costs)?;

        let nation = self.nation_mut(id)?;
        let effect = match directive {
            Directive::RaiseTech => {
                let cost = level_cost(nation, nation.tech_level, costs.tech_cost);
                nation.treasury -= cost;
                nation.tech_level += 1;
                DirectiveEffect::Applied { cost }
            }
            Directive::RaiseIndustry => {
                let cost = level_cost(nation, nation.industry_level, costs.industry_cost);
                nation.treasury -= cost;
                nation.industry_level += 1;
                DirectiveEffect::Applied { cost }
            }
            Directive::Invest { amount } => {
                nation.treasury -= amount;
                nation.gdp += amount * costs.invest_yield;
                DirectiveEffect::Applied { cost: *amount }
            }
            Directive::Mobilize { amount } => {
                nation.treasury -= amount;
                nation.military_strength += amount * costs.mobilize_yield;
                DirectiveEffect::Applied { cost: *amount }
            }
            Directive::Stabilize { amount } => {
                let points = amount / nation.gdp * 100.0 * costs.stabilize_yield;
                nation.treasury -= amount;
                nation.stability = clamp_pct(nation.stability + points);
                nation.approval = clamp_pct(nation.approval + points);
                DirectiveEffect::Applied { cost: *amount }
            }
            Directive::Attack { target, force } => DirectiveEffect::Engagement(Engagement {
                attacker: id.clone(),
                defender: target.clone(),
                force: *force,
            }),
        };
        // Subtraction of a validated cost can leave -0.0 or rounding dust
        nation.treasury = nation.treasury.max(0.0);
        Ok(effect)
    }

    /// Land a resolved engagement on both nations
    ///
    /// The territory transfer is capped so the defender keeps one province;
    /// GDP and population follow the same share. Whatever leaves the defender
    /// arrives at the attacker unchanged.
    pub fn apply_combat(&mut self, result: &CombatResult) -> Result<AppliedCombat> {
        let defender = self.get(&result.defender)?;
        self.get(&result.attacker)?;

        let transferable = defender.territory.saturating_sub(1);
        let territory = result.territory_delta.min(transferable);
        let share = if defender.territory == 0 {
            0.0
        } else {
            territory as f64 / defender.territory as f64
        };
        let gdp_transfer = defender.gdp * share;
        let population_transfer =
            ((defender.population as f64 * share).round() as u64).min(defender.population);

        let defender = self.nation_mut(&result.defender)?;
        defender.territory -= territory;
        defender.gdp = (defender.gdp - gdp_transfer).max(0.0);
        defender.population -= population_transfer;
        defender.military_strength = (defender.military_strength - result.defender_casualties).max(0.0);
        defender.stability = clamp_pct(defender.stability + result.defender_stability_shift);

        let attacker = self.nation_mut(&result.attacker)?;
        attacker.territory += territory;
        attacker.gdp += gdp_transfer;
        attacker.population += population_transfer;
        attacker.military_strength = (attacker.military_strength - result.attacker_casualties).max(0.0);
        attacker.stability = clamp_pct(attacker.stability + result.attacker_stability_shift);

        let mut landed = result.clone();
        landed.territory_delta = territory;
        Ok(AppliedCombat {
            result: landed,
            gdp_transfer,
            population_transfer,
        })
    }

    /// Re-derive a nation's era under the one-step cap
    pub fn reclassify_era(&mut self, id: &NationId) -> Result<Option<EraTransition>> {
        let nation = self.nation_mut(id)?;
        let step = era::advance(
            nation.era,
            nation.gdp_per_capita(),
            nation.tech_level,
            nation.industry_level,
        );
        if let Some(step) = step {
            nation.era = step.to;
        }
        Ok(step)
    }

    /// Immutable copy of the current world
    pub fn snapshot(&self) -> Snapshot {
        Snapshot::capture(self.world.clone())
    }

    pub(crate) fn advance_turn(&mut self) {
        self.world.turn += 1;
    }

    fn nation_mut(&mut self, id: &NationId) -> Result<&mut NationState> {
        self.world
            .nations
            .get_mut(id)
            .ok_or_else(|| NacioError::not_found(format!("nation {}", id)))
    }
}

fn clamp_pct(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 100.0)
}

fn check_level(field: &'static str, level: u8) -> Result<()> {
    if (MIN_LEVEL..=MAX_LEVEL).contains(&level) {
        Ok(())
    } else {
        Err(NacioError::InvariantViolation {
            field,
            value: level as f64,
        })
    }
}

fn check_raise(field: &'static str, level: u8) -> Result<()> {
    check_level(field, level.saturating_add(1))
}

fn level_cost(nation: &NationState, level: u8, share: f64) -> f64 {
    nation.gdp * share * level as f64
}

fn check_affordable(nation: &NationState, cost: f64) -> Result<()> {
    if cost > nation.treasury {
        return Err(NacioError::Validation(format!(
            "{} needs {:.1}B but treasury holds {:.1}B",
            nation.id, cost, nation.treasury
        )));
    }
    Ok(())
}

fn check_spend(nation: &NationState, amount: f64) -> Result<()> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(NacioError::Validation(format!(
            "spending amount must be positive, got {}",
            amount
        )));
    }
    check_affordable(nation, amount)
}
