//! Engine configuration with documented constants
//!
//! Every tunable rate of the turn pipeline lives here. Combat scaling tables
//! are fixed and live in `combat::constants` instead.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::{NacioError, Result};

/// Configuration for the turn pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub economy: EconomyConfig,
    pub directives: DirectiveConfig,

    /// Number of entries kept on the global leaderboards
    pub leaderboard_size: usize,

    /// Upper bound on a single narrative-service call, in milliseconds
    ///
    /// The turn is already committed when the narrative is requested, so
    /// hitting this bound only costs the flavor text.
    pub narrative_timeout_ms: u64,

    /// Minimum engagement count before combat is resolved on the rayon pool
    ///
    /// Below this, thread overhead exceeds the work.
    pub parallel_threshold: usize,
}

/// Per-turn economic progression rates
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomyConfig {
    /// Base annual population growth (1.0%)
    pub population_growth: f64,

    /// Base annual GDP growth (2.5%)
    ///
    /// Adjusted by `(stability - 50) / stability_growth_divisor`, so a fully
    /// stable nation grows 5 points faster than a collapsed one.
    pub gdp_growth: f64,

    pub stability_growth_divisor: f64,

    /// Share of GDP collected into the treasury each turn
    pub tax_rate: f64,

    /// Treasury cost (billions) per point of military strength per turn
    pub military_upkeep: f64,

    /// Approval below this triggers civil unrest
    pub unrest_threshold: f64,
    pub unrest_stability_penalty: f64,

    /// Approval above this triggers an economic boom
    pub boom_threshold: f64,
    pub boom_gdp_bonus: f64,

    /// Applied when upkeep overdraws the treasury
    pub bankruptcy_stability_penalty: f64,
    pub bankruptcy_approval_penalty: f64,
}

/// Treasury costs and yields of player directives
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectiveConfig {
    /// Share of GDP per current level needed to raise tech one level
    pub tech_cost: f64,

    /// Share of GDP per current level needed to raise industry one level
    pub industry_cost: f64,

    /// GDP (billions) gained per billion invested
    pub invest_yield: f64,

    /// Military strength gained per billion spent
    pub mobilize_yield: f64,

    /// Stability points gained per 1% of GDP spent
    pub stabilize_yield: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            economy: EconomyConfig::default(),
            directives: DirectiveConfig::default(),
            leaderboard_size: 10,
            narrative_timeout_ms: 15_000,
            parallel_threshold: 8,
        }
    }
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            population_growth: 0.010,
            gdp_growth: 0.025,
            stability_growth_divisor: 1000.0,
            tax_rate: 0.15,
            military_upkeep: 0.05,
            unrest_threshold: 30.0,
            unrest_stability_penalty: 5.0,
            boom_threshold: 80.0,
            boom_gdp_bonus: 0.01,
            bankruptcy_stability_penalty: 10.0,
            bankruptcy_approval_penalty: 10.0,
        }
    }
}

impl Default for DirectiveConfig {
    fn default() -> Self {
        Self {
            tech_cost: 0.05,
            industry_cost: 0.04,
            invest_yield: 0.5,
            mobilize_yield: 0.5,
            stabilize_yield: 2.0,
        }
    }
}

impl EngineConfig {
    /// Create a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a config from a TOML file; missing keys keep their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration for internal consistency
    pub fn validate(&self) -> Result<()> {
        let eco = &self.economy;

        if !(0.0..=1.0).contains(&eco.tax_rate) {
            return Err(NacioError::Config(format!(
                "tax_rate ({}) must be within [0, 1]",
                eco.tax_rate
            )));
        }

        if eco.stability_growth_divisor <= 0.0 {
            return Err(NacioError::Config(
                "stability_growth_divisor must be positive".into(),
            ));
        }

        if eco.unrest_threshold >= eco.boom_threshold {
            return Err(NacioError::Config(format!(
                "unrest_threshold ({}) should be < boom_threshold ({})",
                eco.unrest_threshold, eco.boom_threshold
            )));
        }

        let d = &self.directives;
        if d.tech_cost <= 0.0 || d.industry_cost <= 0.0 {
            return Err(NacioError::Config("Level-up costs must be positive".into()));
        }

        if self.leaderboard_size == 0 {
            return Err(NacioError::Config("leaderboard_size must be at least 1".into()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(EngineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = EngineConfig::from_toml(
            r#"
            leaderboard_size = 5

            [economy]
            tax_rate = 0.2
            "#,
        )
        .unwrap();
        assert_eq!(config.leaderboard_size, 5);
        assert_eq!(config.economy.tax_rate, 0.2);
        assert_eq!(config.economy.gdp_growth, 0.025);
        assert_eq!(config.directives.invest_yield, 0.5);
    }

    #[test]
    fn test_invalid_thresholds_rejected() {
        let mut config = EngineConfig::default();
        config.economy.unrest_threshold = 90.0;
        assert!(matches!(config.validate(), Err(NacioError::Config(_))));
    }

    #[test]
    fn test_bad_toml_is_error() {
        let result = EngineConfig::from_toml("leaderboard_size = \"ten\"");
        assert!(matches!(result, Err(NacioError::TomlError(_))));
    }
}
