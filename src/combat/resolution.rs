//! Engagement resolution
//!
//! Resolution is a pure function of the two nations, the committed force and
//! a seed. The seed comes from the turn number and the two identities, never
//! from the clock, so replaying a turn on any branch gives the same result.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::combat::constants::*;
use crate::core::error::{NacioError, Result};
use crate::core::types::{NationId, Turn};
use crate::nation::NationState;

/// How an engagement ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Outcome {
    AttackerDecisive,
    AttackerNarrow,
    Stalemate,
    DefenderNarrow,
    DefenderDecisive,
}

impl Outcome {
    /// Classify an attacker/defender effective-strength ratio
    pub fn from_ratio(ratio: f64) -> Outcome {
        if ratio >= DECISIVE_RATIO {
            Outcome::AttackerDecisive
        } else if ratio <= 1.0 / DECISIVE_RATIO {
            Outcome::DefenderDecisive
        } else if ratio <= 1.0 + STALEMATE_BAND && ratio >= 1.0 / (1.0 + STALEMATE_BAND) {
            Outcome::Stalemate
        } else if ratio > 1.0 {
            Outcome::AttackerNarrow
        } else {
            Outcome::DefenderNarrow
        }
    }

    pub fn attacker_won(self) -> bool {
        matches!(self, Outcome::AttackerDecisive | Outcome::AttackerNarrow)
    }

    pub fn defender_won(self) -> bool {
        matches!(self, Outcome::DefenderDecisive | Outcome::DefenderNarrow)
    }

    pub fn decisive(self) -> bool {
        matches!(self, Outcome::AttackerDecisive | Outcome::DefenderDecisive)
    }
}

/// Result of one engagement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatResult {
    pub attacker: NationId,
    pub defender: NationId,
    pub seed: u64,
    pub committed_force: f64,
    pub attacker_effective: f64,
    pub defender_effective: f64,
    /// attacker_effective / defender_effective, capped at `MAX_RATIO`
    pub ratio: f64,
    pub outcome: Outcome,
    pub attacker_casualties: f64,
    pub defender_casualties: f64,
    /// Provinces the attacker gains and the defender loses
    pub territory_delta: u32,
    pub attacker_stability_shift: f64,
    pub defender_stability_shift: f64,
}

impl CombatResult {
    pub fn winner(&self) -> Option<&NationId> {
        if self.outcome.attacker_won() {
            Some(&self.attacker)
        } else if self.outcome.defender_won() {
            Some(&self.defender)
        } else {
            None
        }
    }
}

/// Deterministic seed for an engagement
pub fn derive_seed(turn: Turn, attacker: &NationId, defender: &NationId) -> u64 {
    let mut hasher = blake3::Hasher::new();
    hasher.update(b"nacio:combat");
    hasher.update(&turn.to_le_bytes());
    hasher.update(attacker.as_str().as_bytes());
    // Separator so ("ab", "c") and ("a", "bc") differ
    hasher.update(&[0]);
    hasher.update(defender.as_str().as_bytes());
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest.as_bytes()[..8]);
    u64::from_le_bytes(bytes)
}

pub fn tech_factor(level: u8) -> f64 {
    TECH_SCALING[(level.clamp(1, 5) - 1) as usize]
}

pub fn industry_factor(level: u8) -> f64 {
    INDUSTRY_SCALING[(level.clamp(1, 5) - 1) as usize]
}

pub fn stability_factor(stability: f64) -> f64 {
    STABILITY_SCALING
        .iter()
        .rev()
        .find(|(floor, _)| stability >= *floor)
        .map(|(_, factor)| *factor)
        .unwrap_or(STABILITY_SCALING[0].1)
}

/// force × f(tech) × g(industry) × h(stability)
pub fn effective_strength(force: f64, nation: &NationState) -> f64 {
    force
        * tech_factor(nation.tech_level)
        * industry_factor(nation.industry_level)
        * stability_factor(nation.stability)
}

/// Resolve one engagement
///
/// The defender fights with its whole military strength. A defender below the
/// collapse threshold loses `REBELLION_PENALTY` of its effective strength
/// before the ratio is taken.
pub fn resolve(
    attacker: &NationState,
    defender: &NationState,
    committed_force: f64,
    seed: u64,
) -> Result<CombatResult> {
    if !committed_force.is_finite() || committed_force <= 0.0 {
        return Err(NacioError::InvalidForce(committed_force));
    }
    if committed_force > attacker.military_strength {
        return Err(NacioError::Validation(format!(
            "{} commits {:.1} but has only {:.1} strength",
            attacker.id, committed_force, attacker.military_strength
        )));
    }

    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let attacker_fortune = fortune(&mut rng);
    let defender_fortune = fortune(&mut rng);

    let defending_force = defender.military_strength;
    let attacker_effective = effective_strength(committed_force, attacker) * attacker_fortune;
    let mut defender_effective = effective_strength(defending_force, defender) * defender_fortune;
    if defender.stability < COLLAPSE_THRESHOLD {
        defender_effective *= 1.0 - REBELLION_PENALTY;
    }

    let ratio = if defender_effective <= 0.0 {
        MAX_RATIO
    } else {
        (attacker_effective / defender_effective).min(MAX_RATIO)
    };
    let outcome = Outcome::from_ratio(ratio);

    let engaged = committed_force.min(defending_force);
    let dominance = ratio.max(1.0 / ratio);
    let (attacker_casualties, defender_casualties) = match outcome {
        Outcome::Stalemate => {
            let base = engaged * STALEMATE_CASUALTY_RATE;
            (base * jitter(&mut rng), base * jitter(&mut rng))
        }
        _ => {
            let intensity = if outcome.decisive() { 1.0 } else { NARROW_INTENSITY };
            let loser = engaged * CASUALTY_RATE * intensity;
            let winner = loser / dominance;
            if outcome.attacker_won() {
                (winner, loser)
            } else {
                (loser, winner)
            }
        }
    };

    let territory_delta = match outcome {
        Outcome::AttackerDecisive => share_of(defender.territory, DECISIVE_TERRITORY_SHARE),
        Outcome::AttackerNarrow => share_of(defender.territory, NARROW_TERRITORY_SHARE),
        _ => 0,
    };

    let (attacker_stability_shift, defender_stability_shift) = match outcome {
        Outcome::AttackerDecisive => (DECISIVE_WIN_STABILITY, DECISIVE_LOSS_STABILITY),
        Outcome::AttackerNarrow => (NARROW_WIN_STABILITY, NARROW_LOSS_STABILITY),
        Outcome::Stalemate => (STALEMATE_STABILITY, STALEMATE_STABILITY),
        Outcome::DefenderNarrow => (NARROW_LOSS_STABILITY, NARROW_WIN_STABILITY),
        Outcome::DefenderDecisive => (DECISIVE_LOSS_STABILITY, DECISIVE_WIN_STABILITY),
    };

    Ok(CombatResult {
        attacker: attacker.id.clone(),
        defender: defender.id.clone(),
        seed,
        committed_force,
        attacker_effective,
        defender_effective,
        ratio,
        outcome,
        attacker_casualties: attacker_casualties.min(committed_force),
        defender_casualties: defender_casualties.min(defending_force),
        territory_delta,
        attacker_stability_shift,
        defender_stability_shift,
    })
}

fn fortune(rng: &mut ChaCha8Rng) -> f64 {
    let roll: f64 = rng.gen();
    1.0 + FORTUNE_SPREAD * (roll * 2.0 - 1.0)
}

fn jitter(rng: &mut ChaCha8Rng) -> f64 {
    let roll: f64 = rng.gen();
    1.0 + STALEMATE_JITTER * (roll * 2.0 - 1.0)
}

fn share_of(territory: u32, share: f64) -> u32 {
    ((territory as f64 * share).ceil() as u32).min(territory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::Era;
    use std::collections::BTreeSet;

    fn nation(id: &str, tech: u8, industry: u8, stability: f64, military: f64) -> NationState {
        NationState {
            id: NationId::from(id),
            name: id.to_uppercase(),
            era: Era::Industrial,
            tech_level: tech,
            industry_level: industry,
            gdp: 500.0,
            population: 50_000_000,
            treasury: 100.0,
            stability,
            approval: 50.0,
            military_strength: military,
            territory: 20,
            neighbors: BTreeSet::new(),
        }
    }

    #[test]
    fn test_zero_force_rejected() {
        let a = nation("a", 3, 3, 50.0, 100.0);
        let b = nation("b", 3, 3, 50.0, 100.0);
        assert!(matches!(
            resolve(&a, &b, 0.0, 7),
            Err(NacioError::InvalidForce(f)) if f == 0.0
        ));
        assert!(matches!(resolve(&a, &b, -5.0, 7), Err(NacioError::InvalidForce(_))));
        assert!(matches!(resolve(&a, &b, f64::NAN, 7), Err(NacioError::InvalidForce(_))));
    }

    #[test]
    fn test_overcommit_rejected() {
        let a = nation("a", 3, 3, 50.0, 100.0);
        let b = nation("b", 3, 3, 50.0, 100.0);
        assert!(matches!(resolve(&a, &b, 150.0, 7), Err(NacioError::Validation(_))));
    }

    #[test]
    fn test_tech_gap_is_decisive() {
        let strong = nation("a", 5, 3, 50.0, 100.0);
        let weak = nation("b", 1, 3, 50.0, 100.0);
        let result = resolve(&strong, &weak, 100.0, 1).unwrap();
        assert_eq!(result.outcome, Outcome::AttackerDecisive);
        assert_eq!(result.winner(), Some(&NationId::from("a")));
        assert!(result.defender_casualties > result.attacker_casualties);
        assert_eq!(result.territory_delta, 2);
    }

    #[test]
    fn test_outmatched_attacker_repelled() {
        let weak = nation("a", 1, 1, 50.0, 100.0);
        let strong = nation("b", 4, 4, 50.0, 100.0);
        let result = resolve(&weak, &strong, 100.0, 3).unwrap();
        assert_eq!(result.outcome, Outcome::DefenderDecisive);
        assert_eq!(result.territory_delta, 0);
        assert!(result.attacker_casualties > result.defender_casualties);
        assert!(result.attacker_stability_shift < 0.0);
    }

    #[test]
    fn test_parity_band_is_stalemate() {
        assert_eq!(Outcome::from_ratio(1.0), Outcome::Stalemate);
        assert_eq!(Outcome::from_ratio(1.05), Outcome::Stalemate);
        assert_eq!(Outcome::from_ratio(0.95), Outcome::Stalemate);
        assert_eq!(Outcome::from_ratio(1.2), Outcome::AttackerNarrow);
        assert_eq!(Outcome::from_ratio(0.8), Outcome::DefenderNarrow);
        assert_eq!(Outcome::from_ratio(1.5), Outcome::AttackerDecisive);
        assert_eq!(Outcome::from_ratio(0.5), Outcome::DefenderDecisive);
    }

    #[test]
    fn test_stalemate_is_roughly_symmetric() {
        // Identical nations: fortune alone separates them, at most ±10% each way
        let a = nation("a", 3, 3, 50.0, 100.0);
        let b = nation("b", 3, 3, 50.0, 100.0);
        for seed in 0..64 {
            let result = resolve(&a, &b, 100.0, seed).unwrap();
            if result.outcome == Outcome::Stalemate {
                assert_eq!(result.territory_delta, 0);
                let ratio = result.attacker_casualties / result.defender_casualties;
                assert!(ratio > 0.85 && ratio < 1.15);
            }
        }
    }

    #[test]
    fn test_rebellion_penalty_weakens_collapsing_defender() {
        let attacker = nation("a", 3, 3, 50.0, 100.0);
        let steady = nation("b", 3, 3, 20.0, 100.0);
        let collapsing = nation("b", 3, 3, 19.9, 100.0);
        let vs_steady = resolve(&attacker, &steady, 100.0, 11).unwrap();
        let vs_collapsing = resolve(&attacker, &collapsing, 100.0, 11).unwrap();
        // Same seed, same fortune roll for the defender
        let fortune = vs_steady.defender_effective / effective_strength(100.0, &steady);
        let expected =
            effective_strength(100.0, &collapsing) * fortune * (1.0 - REBELLION_PENALTY);
        assert!((vs_collapsing.defender_effective - expected).abs() < 1e-9);
    }

    #[test]
    fn test_undefended_nation_falls() {
        let attacker = nation("a", 1, 1, 50.0, 10.0);
        let empty = nation("b", 1, 1, 50.0, 0.0);
        let result = resolve(&attacker, &empty, 10.0, 5).unwrap();
        assert_eq!(result.ratio, MAX_RATIO);
        assert_eq!(result.outcome, Outcome::AttackerDecisive);
        assert_eq!(result.defender_casualties, 0.0);
        assert!(result.ratio.is_finite());
    }

    #[test]
    fn test_seed_depends_on_all_inputs() {
        let a = NationId::from("a");
        let b = NationId::from("b");
        let base = derive_seed(4, &a, &b);
        assert_eq!(base, derive_seed(4, &a, &b));
        assert_ne!(base, derive_seed(5, &a, &b));
        assert_ne!(base, derive_seed(4, &b, &a));
        assert_ne!(
            derive_seed(1, &NationId::from("ab"), &NationId::from("c")),
            derive_seed(1, &NationId::from("a"), &NationId::from("bc"))
        );
    }

    #[test]
    fn test_stability_factor_bands() {
        assert_eq!(stability_factor(0.0), 0.6);
        assert_eq!(stability_factor(19.9), 0.6);
        assert_eq!(stability_factor(50.0), 1.0);
        assert_eq!(stability_factor(100.0), 1.3);
        assert_eq!(stability_factor(-3.0), 0.6);
    }
}
