//! NationState - the canonical per-nation record

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::core::types::{Era, NationId};

/// Lowest and highest tech/industry level
pub const MIN_LEVEL: u8 = 1;
pub const MAX_LEVEL: u8 = 5;

/// Default treasury share of GDP for nations created without one
pub const DEFAULT_TREASURY_SHARE: f64 = 0.20;

/// Public approval of a freshly created nation
pub const DEFAULT_APPROVAL: f64 = 50.0;

/// A nation at a given turn
///
/// Owned by the `World` that contains it; mutated only through `Registry`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NationState {
    pub id: NationId,
    pub name: String,
    pub era: Era,
    pub tech_level: u8,
    pub industry_level: u8,
    /// Billions of USD
    pub gdp: f64,
    pub population: u64,
    /// Billions of USD, never negative
    pub treasury: f64,
    /// 0-100
    pub stability: f64,
    /// 0-100
    pub approval: f64,
    pub military_strength: f64,
    /// Provinces held
    pub territory: u32,
    pub neighbors: BTreeSet<NationId>,
}

impl NationState {
    /// GDP per capita in USD
    pub fn gdp_per_capita(&self) -> f64 {
        if self.population == 0 {
            return 0.0;
        }
        self.gdp * 1e9 / self.population as f64
    }

    pub fn is_neighbor(&self, other: &NationId) -> bool {
        self.neighbors.contains(other)
    }
}

/// Starting metrics for a new nation
///
/// The era is derived, never supplied.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NationSeed {
    pub name: String,
    pub tech_level: u8,
    pub industry_level: u8,
    pub gdp: f64,
    pub population: u64,
    #[serde(default)]
    pub treasury: Option<f64>,
    pub stability: f64,
    #[serde(default)]
    pub approval: Option<f64>,
    pub military_strength: f64,
    #[serde(default = "default_territory")]
    pub territory: u32,
    #[serde(default)]
    pub neighbors: Vec<NationId>,
}

fn default_territory() -> u32 {
    10
}

impl NationSeed {
    /// Minimal seed used by tests and demos
    pub fn new(name: impl Into<String>, gdp: f64, population: u64) -> Self {
        Self {
            name: name.into(),
            tech_level: 1,
            industry_level: 1,
            gdp,
            population,
            treasury: None,
            stability: 50.0,
            approval: None,
            military_strength: 100.0,
            territory: default_territory(),
            neighbors: Vec::new(),
        }
    }

    pub fn with_levels(mut self, tech: u8, industry: u8) -> Self {
        self.tech_level = tech;
        self.industry_level = industry;
        self
    }

    pub fn with_military(mut self, strength: f64) -> Self {
        self.military_strength = strength;
        self
    }

    pub fn with_stability(mut self, stability: f64) -> Self {
        self.stability = stability;
        self
    }

    pub fn with_treasury(mut self, treasury: f64) -> Self {
        self.treasury = Some(treasury);
        self
    }

    pub fn with_neighbors(mut self, neighbors: &[&str]) -> Self {
        self.neighbors = neighbors.iter().map(|n| NationId::from(*n)).collect();
        self
    }
}

/// Additive change to a nation's economy
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EconomicDelta {
    pub gdp: f64,
    pub treasury: f64,
    pub population: i64,
}

impl EconomicDelta {
    pub fn new(gdp: f64, treasury: f64, population: i64) -> Self {
        Self {
            gdp,
            treasury,
            population,
        }
    }
}
