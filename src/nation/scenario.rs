//! Load starting worlds from TOML files

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::error::Result;
use crate::core::types::NationId;
use crate::nation::registry::Registry;
use crate::nation::state::NationSeed;

/// Built-in Cold War opening
const DEFAULT_SCENARIO: &str = include_str!("../../data/scenarios/1980.toml");

/// A starting world: calendar year plus the nations present at turn 0
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub start_year: i32,
    pub nations: Vec<ScenarioNation>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScenarioNation {
    pub id: NationId,
    #[serde(flatten)]
    pub seed: NationSeed,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// The scenario shipped with the crate
    pub fn builtin() -> Result<Self> {
        Self::from_toml(DEFAULT_SCENARIO)
    }

    /// Register every nation, failing on the first invalid one
    pub fn build(&self) -> Result<Registry> {
        let mut registry = Registry::new(self.start_year);
        for nation in &self.nations {
            registry.create(nation.id.clone(), nation.seed.clone())?;
        }
        tracing::info!(
            scenario = %self.name,
            nations = registry.world().len(),
            year = self.start_year,
            "Scenario loaded"
        );
        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::NacioError;

    #[test]
    fn test_builtin_scenario_builds() {
        let scenario = Scenario::builtin().unwrap();
        let registry = scenario.build().unwrap();
        assert_eq!(registry.world().year(), 1980);
        assert_eq!(registry.world().len(), 10);

        let usa = registry.get(&NationId::from("usa")).unwrap();
        assert!(usa.is_neighbor(&NationId::from("can")));
        // Treasury defaults to a fifth of GDP
        assert!((usa.treasury - 2859.0 * 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let content = r#"
            name = "Twins"
            start_year = 100

            [[nations]]
            id = "rom"
            name = "Rome"
            tech_level = 1
            industry_level = 1
            gdp = 5.0
            population = 1000000
            stability = 50.0
            military_strength = 20.0

            [[nations]]
            id = "rom"
            name = "Rome Again"
            tech_level = 1
            industry_level = 1
            gdp = 5.0
            population = 1000000
            stability = 50.0
            military_strength = 20.0
        "#;
        let scenario = Scenario::from_toml(content).unwrap();
        assert!(matches!(scenario.build(), Err(NacioError::DuplicateId(_))));
    }
}
