//! Combat constants - all tunable values in one place
//!
//! The scaling tables are convex: each level is worth more than the last, so
//! a level-5 nation outmatches a level-1 nation far beyond the level gap.

/// f(tech): indexed by tech level - 1
pub const TECH_SCALING: [f64; 5] = [1.0, 1.35, 1.9, 2.8, 4.2];

/// g(industry): indexed by industry level - 1
pub const INDUSTRY_SCALING: [f64; 5] = [1.0, 1.2, 1.5, 1.95, 2.6];

/// h(stability): (lower bound, multiplier), ascending
pub const STABILITY_SCALING: [(f64, f64); 5] = [
    (0.0, 0.6),
    (20.0, 0.8),
    (40.0, 1.0),
    (60.0, 1.15),
    (80.0, 1.3),
];

// Outcome bands
pub const DECISIVE_RATIO: f64 = 1.5;
/// Ratios within 1 ± this of parity are a stalemate
pub const STALEMATE_BAND: f64 = 0.1;
/// Reported ratio ceiling (an undefended nation would otherwise be infinite)
pub const MAX_RATIO: f64 = 100.0;

// Rebellion
pub const COLLAPSE_THRESHOLD: f64 = 20.0;
pub const REBELLION_PENALTY: f64 = 0.25;

/// Seeded fortune moves each side's effective strength by up to ± this share
pub const FORTUNE_SPREAD: f64 = 0.1;

// Casualties, as shares of the engaged force
pub const CASUALTY_RATE: f64 = 0.2;
pub const NARROW_INTENSITY: f64 = 0.6;
pub const STALEMATE_CASUALTY_RATE: f64 = 0.1;
pub const STALEMATE_JITTER: f64 = 0.05;

// Territory taken by a victorious attacker, as shares of the defender's
pub const DECISIVE_TERRITORY_SHARE: f64 = 0.10;
pub const NARROW_TERRITORY_SHARE: f64 = 0.04;

// Stability shifts (ADDITIVE)
pub const DECISIVE_WIN_STABILITY: f64 = 3.0;
pub const NARROW_WIN_STABILITY: f64 = 1.0;
pub const DECISIVE_LOSS_STABILITY: f64 = -8.0;
pub const NARROW_LOSS_STABILITY: f64 = -4.0;
pub const STALEMATE_STABILITY: f64 = -2.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scaling_tables_increase() {
        for table in [TECH_SCALING, INDUSTRY_SCALING] {
            for pair in table.windows(2) {
                assert!(pair[1] > pair[0]);
            }
        }
        for pair in STABILITY_SCALING.windows(2) {
            assert!(pair[1].0 > pair[0].0);
            assert!(pair[1].1 > pair[0].1);
        }
    }

    #[test]
    fn test_tech_scaling_is_convex() {
        let steps: Vec<f64> = TECH_SCALING.windows(2).map(|w| w[1] - w[0]).collect();
        for pair in steps.windows(2) {
            assert!(pair[1] > pair[0]);
        }
    }

    #[test]
    fn test_bands_are_ordered() {
        assert!(1.0 + STALEMATE_BAND < DECISIVE_RATIO);
        assert!(NARROW_TERRITORY_SHARE < DECISIVE_TERRITORY_SHARE);
        assert!(REBELLION_PENALTY > 0.0 && REBELLION_PENALTY < 1.0);
    }
}
