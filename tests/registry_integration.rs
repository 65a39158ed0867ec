//! Nation registry integration tests
//!
//! Drives the registry through the same calls the orchestrator makes and
//! checks the field policy holds across them.

use nacio::core::config::DirectiveConfig;
use nacio::core::error::NacioError;
use nacio::core::types::{Era, NationId};
use nacio::nation::{Directive, EconomicDelta, NationSeed, Registry, Scenario};

fn nation_a() -> (Registry, NationId) {
    let mut registry = Registry::new(1980);
    let id = NationId::from("a");
    // 8,000 per capita
    registry
        .create(
            id.clone(),
            NationSeed::new("Alpha", 400.0, 50_000_000)
                .with_levels(3, 2)
                .with_treasury(5_000.0),
        )
        .unwrap();
    (registry, id)
}

/// Tech 3, industry 2 at 8,000 per capita is Industrial. Jumping to tech 5
/// and 30,000 per capita moves one era, not four.
#[test]
fn test_era_example_moves_one_step() {
    let (mut registry, id) = nation_a();
    assert_eq!(registry.get(&id).unwrap().era, Era::Industrial);

    let costs = DirectiveConfig::default();
    registry.apply_directive(&id, &Directive::RaiseTech, &costs).unwrap();
    registry.apply_directive(&id, &Directive::RaiseTech, &costs).unwrap();
    // 400B -> 1,500B over 50M people is 30,000 per capita
    registry
        .apply_economic_delta(&id, EconomicDelta::new(1_100.0, 0.0, 0))
        .unwrap();

    let step = registry.reclassify_era(&id).unwrap().unwrap();
    assert_eq!(step.from, Era::Industrial);
    assert_eq!(step.to, Era::Modern);
    assert!(step.candidate > Era::Modern);
    assert_eq!(registry.get(&id).unwrap().era, Era::Modern);

    // The next reclassification continues the climb
    let next = registry.reclassify_era(&id).unwrap().unwrap();
    assert_eq!(next.to, Era::Information);
}

#[test]
fn test_rejected_directive_changes_nothing() {
    let (mut registry, id) = nation_a();
    let before = registry.world().clone();
    let costs = DirectiveConfig::default();

    for directive in [
        Directive::Invest { amount: 1e9 },
        Directive::Mobilize { amount: 0.0 },
        Directive::Attack {
            target: NationId::from("nobody"),
            force: 1.0,
        },
        Directive::Attack {
            target: id.clone(),
            force: 1.0,
        },
    ] {
        assert!(registry.apply_directive(&id, &directive, &costs).is_err());
    }
    assert_eq!(registry.world(), &before);
}

#[test]
fn test_level_ceiling_is_hard() {
    let (mut registry, id) = nation_a();
    let costs = DirectiveConfig::default();
    registry.apply_directive(&id, &Directive::RaiseTech, &costs).unwrap();
    registry.apply_directive(&id, &Directive::RaiseTech, &costs).unwrap();
    let err = registry
        .apply_directive(&id, &Directive::RaiseTech, &costs)
        .unwrap_err();
    assert!(matches!(err, NacioError::InvariantViolation { field: "tech_level", .. }));
    assert_eq!(registry.get(&id).unwrap().tech_level, 5);
}

#[test]
fn test_spending_directives_move_treasury() {
    let (mut registry, id) = nation_a();
    let costs = DirectiveConfig::default();
    let before = registry.get(&id).unwrap().clone();

    registry
        .apply_directive(&id, &Directive::Invest { amount: 100.0 }, &costs)
        .unwrap();
    registry
        .apply_directive(&id, &Directive::Mobilize { amount: 100.0 }, &costs)
        .unwrap();
    registry
        .apply_directive(&id, &Directive::Stabilize { amount: 40.0 }, &costs)
        .unwrap();

    let after = registry.get(&id).unwrap();
    assert!((before.treasury - after.treasury - 240.0).abs() < 1e-9);
    assert!((after.gdp - before.gdp - 50.0).abs() < 1e-9);
    assert!((after.military_strength - before.military_strength - 50.0).abs() < 1e-9);
    assert!(after.stability > before.stability);
    assert!(after.approval > before.approval);
}

#[test]
fn test_stability_and_approval_clamp() {
    let (mut registry, id) = nation_a();
    let applied = registry.adjust_stability(&id, 500.0).unwrap();
    assert_eq!(registry.get(&id).unwrap().stability, 100.0);
    assert_eq!(applied, 50.0);

    registry.adjust_approval(&id, -500.0).unwrap();
    assert_eq!(registry.get(&id).unwrap().approval, 0.0);

    registry.adjust_military(&id, -1e6).unwrap();
    assert_eq!(registry.get(&id).unwrap().military_strength, 0.0);
}

#[test]
fn test_builtin_scenario_neighbors_symmetric() {
    let registry = Scenario::builtin().unwrap().build().unwrap();
    let world = registry.world();
    for nation in world.nations.values() {
        for neighbor in &nation.neighbors {
            let other = world.nation(neighbor).unwrap();
            assert!(other.is_neighbor(&nation.id), "{} -> {}", nation.id, neighbor);
        }
        assert!((1..=5).contains(&nation.tech_level));
        assert!((0.0..=100.0).contains(&nation.stability));
    }
}
