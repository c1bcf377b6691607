//! Simulation configuration and the named preset catalog.
//!
//! A [`SimConfig`] is validated once at construction and never mutated
//! mid-run. Tuning happens through the closed [`Preset`] catalog or by
//! deserializing an explicit document; scoring code reads fields, it never
//! branches on preset names.
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::challenge::{CHALLENGE_ORDER, ChallengeKind};

/// Tolerance for the challenge-distribution sum check.
pub const DISTRIBUTION_TOLERANCE: f64 = 0.01;

/// Tunable parameters for one season simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    /// Challenge category -> probability weight; must sum to 1.0.
    #[serde(default = "SimConfig::default_challenge_distribution")]
    pub challenge_distribution: HashMap<ChallengeKind, f64>,
    /// How much challenge ability matters in vote targeting.
    #[serde(default = "SimConfig::default_challenge_threat_weight")]
    pub challenge_threat_weight: f64,
    /// How much strategic ability matters in vote targeting.
    #[serde(default = "SimConfig::default_strategic_threat_weight")]
    pub strategic_threat_weight: f64,
    /// How much the social composite matters in vote targeting.
    #[serde(default = "SimConfig::default_social_threat_weight")]
    pub social_threat_weight: f64,
    /// Hidden idols seeded into the season.
    #[serde(default = "SimConfig::default_total_idols")]
    pub total_idols: u32,
    /// Base chance that a non-strategist searches on a given episode.
    #[serde(default = "SimConfig::default_idol_search_probability")]
    pub idol_search_probability: f64,
    /// 0.0 = outcomes track skill, 1.0 = pure noise.
    #[serde(default = "SimConfig::default_chaos_factor")]
    pub chaos_factor: f64,
    /// Magnitude of alliance vote protection.
    #[serde(default = "SimConfig::default_alliance_loyalty")]
    pub alliance_loyalty: f64,
    /// Season structure thresholds.
    #[serde(default)]
    pub format: SeasonFormat,
}

impl SimConfig {
    #[must_use]
    pub fn default_challenge_distribution() -> HashMap<ChallengeKind, f64> {
        HashMap::from([
            (ChallengeKind::Physical, 0.25),
            (ChallengeKind::Endurance, 0.20),
            (ChallengeKind::Precision, 0.15),
            (ChallengeKind::Puzzle, 0.25),
            (ChallengeKind::Mental, 0.05),
            (ChallengeKind::Water, 0.10),
        ])
    }

    #[must_use]
    pub const fn default_challenge_threat_weight() -> f64 {
        16.0
    }

    #[must_use]
    pub const fn default_strategic_threat_weight() -> f64 {
        16.0
    }

    #[must_use]
    pub const fn default_social_threat_weight() -> f64 {
        12.0
    }

    #[must_use]
    pub const fn default_total_idols() -> u32 {
        8
    }

    #[must_use]
    pub const fn default_idol_search_probability() -> f64 {
        0.3
    }

    #[must_use]
    pub const fn default_chaos_factor() -> f64 {
        0.5
    }

    #[must_use]
    pub const fn default_alliance_loyalty() -> f64 {
        35.0
    }

    /// Validate configuration invariants.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when any field violates the documented bounds.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut sum = 0.0;
        for kind in CHALLENGE_ORDER {
            let value = self.challenge_distribution.get(&kind).copied().unwrap_or(0.0);
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::DistributionWeight { kind, value });
            }
            sum += value;
        }
        if (sum - 1.0).abs() > DISTRIBUTION_TOLERANCE {
            return Err(ConfigError::DistributionSum { sum });
        }
        for (field, value) in [
            ("challenge_threat_weight", self.challenge_threat_weight),
            ("strategic_threat_weight", self.strategic_threat_weight),
            ("social_threat_weight", self.social_threat_weight),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::MinViolation {
                    field,
                    min: 0.0,
                    value,
                });
            }
        }
        if self.total_idols > 30 {
            return Err(ConfigError::RangeViolation {
                field: "total_idols",
                min: 0.0,
                max: 30.0,
                value: f64::from(self.total_idols),
            });
        }
        check_range("idol_search_probability", self.idol_search_probability, 0.0, 1.0)?;
        check_range("chaos_factor", self.chaos_factor, 0.0, 1.0)?;
        check_range("alliance_loyalty", self.alliance_loyalty, 0.0, 100.0)?;
        self.format.validate()
    }
}

fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || !(min..=max).contains(&value) {
        return Err(ConfigError::RangeViolation {
            field,
            min,
            max,
            value,
        });
    }
    Ok(())
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            challenge_distribution: Self::default_challenge_distribution(),
            challenge_threat_weight: Self::default_challenge_threat_weight(),
            strategic_threat_weight: Self::default_strategic_threat_weight(),
            social_threat_weight: Self::default_social_threat_weight(),
            total_idols: Self::default_total_idols(),
            idol_search_probability: Self::default_idol_search_probability(),
            chaos_factor: Self::default_chaos_factor(),
            alliance_loyalty: Self::default_alliance_loyalty(),
            format: SeasonFormat::default(),
        }
    }
}

/// Season structure: tribe count and phase-transition thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonFormat {
    /// Starting tribe count.
    #[serde(default = "SeasonFormat::default_tribes")]
    pub tribes: u8,
    /// Live count at (or below) which tribes merge.
    #[serde(default = "SeasonFormat::default_merge_at")]
    pub merge_at: u8,
    /// Live count at which the final stage (fire-making) begins.
    #[serde(default = "SeasonFormat::default_final_stage_at")]
    pub final_stage_at: u8,
    /// Players facing the jury at final tribal council.
    #[serde(default = "SeasonFormat::default_finalists")]
    pub finalists: u8,
    /// Live counts at which a tribe swap may fire, largest first.
    #[serde(default = "SeasonFormat::default_swap_timings")]
    pub swap_timings: Vec<u8>,
}

impl SeasonFormat {
    #[must_use]
    pub const fn default_tribes() -> u8 {
        3
    }

    #[must_use]
    pub const fn default_merge_at() -> u8 {
        13
    }

    #[must_use]
    pub const fn default_final_stage_at() -> u8 {
        4
    }

    #[must_use]
    pub const fn default_finalists() -> u8 {
        3
    }

    #[must_use]
    pub fn default_swap_timings() -> Vec<u8> {
        vec![18, 14]
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !(2..=4).contains(&self.tribes) {
            return Err(ConfigError::TribeCount { tribes: self.tribes });
        }
        if self.finalists < 2
            || self.final_stage_at <= self.finalists
            || self.merge_at < self.final_stage_at
        {
            return Err(ConfigError::PhaseOrder {
                merge_at: self.merge_at,
                final_stage_at: self.final_stage_at,
                finalists: self.finalists,
            });
        }
        for &timing in &self.swap_timings {
            if timing <= self.merge_at {
                return Err(ConfigError::SwapTiming {
                    timing,
                    merge_at: self.merge_at,
                });
            }
        }
        Ok(())
    }
}

impl Default for SeasonFormat {
    fn default() -> Self {
        Self {
            tribes: Self::default_tribes(),
            merge_at: Self::default_merge_at(),
            final_stage_at: Self::default_final_stage_at(),
            finalists: Self::default_finalists(),
            swap_timings: Self::default_swap_timings(),
        }
    }
}

/// Errors raised when configuration invariants are violated.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("challenge distribution must sum to 1.0 +/- {DISTRIBUTION_TOLERANCE} (got {sum:.3})")]
    DistributionSum { sum: f64 },
    #[error("challenge distribution weight for {kind} must be finite and non-negative (got {value})")]
    DistributionWeight { kind: ChallengeKind, value: f64 },
    #[error("{field} must be at least {min:.2} (got {value:.2})")]
    MinViolation {
        field: &'static str,
        min: f64,
        value: f64,
    },
    #[error("{field} must be between {min:.2} and {max:.2} (got {value:.2})")]
    RangeViolation {
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
    #[error("tribe count must be between 2 and 4 (got {tribes})")]
    TribeCount { tribes: u8 },
    #[error("phase thresholds out of order (merge at {merge_at}, final stage at {final_stage_at}, finalists {finalists})")]
    PhaseOrder {
        merge_at: u8,
        final_stage_at: u8,
        finalists: u8,
    },
    #[error("swap timing {timing} must exceed the merge threshold {merge_at}")]
    SwapTiming { timing: u8, merge_at: u8 },
}

/// The closed catalog of named configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Default,
    PhysicalSeason,
    PuzzleHeavy,
    TargetAthletes,
    TargetStrategists,
    SocialGame,
    IdolFest,
    NoAdvantages,
    MaximumChaos,
    Predictable,
    Cutthroat,
    LoyalAlliances,
}

impl Preset {
    /// Every preset, in catalog order.
    pub const ALL: [Self; 12] = [
        Self::Default,
        Self::PhysicalSeason,
        Self::PuzzleHeavy,
        Self::TargetAthletes,
        Self::TargetStrategists,
        Self::SocialGame,
        Self::IdolFest,
        Self::NoAdvantages,
        Self::MaximumChaos,
        Self::Predictable,
        Self::Cutthroat,
        Self::LoyalAlliances,
    ];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::PhysicalSeason => "physical_season",
            Self::PuzzleHeavy => "puzzle_heavy",
            Self::TargetAthletes => "target_athletes",
            Self::TargetStrategists => "target_strategists",
            Self::SocialGame => "social_game",
            Self::IdolFest => "idol_fest",
            Self::NoAdvantages => "no_advantages",
            Self::MaximumChaos => "maximum_chaos",
            Self::Predictable => "predictable",
            Self::Cutthroat => "cutthroat",
            Self::LoyalAlliances => "loyal_alliances",
        }
    }

    /// Build the configuration this preset names.
    #[must_use]
    pub fn config(self) -> SimConfig {
        let mut cfg = SimConfig::default();
        match self {
            Self::Default => {}
            Self::PhysicalSeason => {
                cfg.challenge_distribution = distribution(&[
                    (ChallengeKind::Physical, 0.45),
                    (ChallengeKind::Endurance, 0.25),
                    (ChallengeKind::Precision, 0.15),
                    (ChallengeKind::Puzzle, 0.10),
                    (ChallengeKind::Mental, 0.03),
                    (ChallengeKind::Water, 0.02),
                ]);
            }
            Self::PuzzleHeavy => {
                cfg.challenge_distribution = distribution(&[
                    (ChallengeKind::Physical, 0.10),
                    (ChallengeKind::Endurance, 0.15),
                    (ChallengeKind::Precision, 0.10),
                    (ChallengeKind::Puzzle, 0.50),
                    (ChallengeKind::Mental, 0.10),
                    (ChallengeKind::Water, 0.05),
                ]);
            }
            Self::TargetAthletes => {
                cfg.challenge_threat_weight = 28.0;
                cfg.strategic_threat_weight = 8.0;
                cfg.social_threat_weight = 6.0;
            }
            Self::TargetStrategists => {
                cfg.challenge_threat_weight = 8.0;
                cfg.strategic_threat_weight = 28.0;
                cfg.social_threat_weight = 6.0;
            }
            Self::SocialGame => {
                cfg.challenge_threat_weight = 6.0;
                cfg.strategic_threat_weight = 8.0;
                cfg.social_threat_weight = 28.0;
            }
            Self::IdolFest => {
                cfg.total_idols = 20;
                cfg.idol_search_probability = 0.5;
            }
            Self::NoAdvantages => {
                cfg.total_idols = 2;
                cfg.idol_search_probability = 0.1;
            }
            Self::MaximumChaos => {
                cfg.chaos_factor = 1.0;
            }
            Self::Predictable => {
                cfg.chaos_factor = 0.1;
            }
            Self::Cutthroat => {
                cfg.alliance_loyalty = 15.0;
            }
            Self::LoyalAlliances => {
                cfg.alliance_loyalty = 55.0;
            }
        }
        cfg
    }
}

impl std::fmt::Display for Preset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

fn distribution(entries: &[(ChallengeKind, f64)]) -> HashMap<ChallengeKind, f64> {
    entries.iter().copied().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        SimConfig::default().validate().expect("default config valid");
    }

    #[test]
    fn every_preset_is_valid() {
        for preset in Preset::ALL {
            preset
                .config()
                .validate()
                .unwrap_or_else(|e| panic!("preset {preset} invalid: {e}"));
        }
    }

    #[test]
    fn distribution_sum_is_enforced() {
        let mut cfg = SimConfig::default();
        cfg.challenge_distribution
            .insert(ChallengeKind::Puzzle, 0.5);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::DistributionSum { .. })
        ));
    }

    #[test]
    fn distribution_sum_tolerance_allows_rounding() {
        let mut cfg = SimConfig::default();
        cfg.challenge_distribution
            .insert(ChallengeKind::Water, 0.105);
        cfg.validate().expect("0.005 drift inside tolerance");
    }

    #[test]
    fn negative_distribution_weight_is_rejected() {
        let mut cfg = SimConfig::default();
        cfg.challenge_distribution
            .insert(ChallengeKind::Mental, -0.05);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::DistributionWeight {
                kind: ChallengeKind::Mental,
                ..
            })
        ));
    }

    #[test]
    fn chaos_factor_range_is_enforced() {
        let cfg = SimConfig {
            chaos_factor: 1.2,
            ..SimConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::RangeViolation { field: "chaos_factor", .. })
        ));
    }

    #[test]
    fn negative_threat_weight_is_rejected() {
        let cfg = SimConfig {
            strategic_threat_weight: -1.0,
            ..SimConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::MinViolation { field: "strategic_threat_weight", .. })
        ));
    }

    #[test]
    fn format_thresholds_must_be_ordered() {
        let cfg = SimConfig {
            format: SeasonFormat {
                merge_at: 3,
                ..SeasonFormat::default()
            },
            ..SimConfig::default()
        };
        assert!(matches!(cfg.validate(), Err(ConfigError::PhaseOrder { .. })));
    }

    #[test]
    fn swap_timing_inside_merge_is_rejected() {
        let cfg = SimConfig {
            format: SeasonFormat {
                swap_timings: vec![12],
                ..SeasonFormat::default()
            },
            ..SimConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::SwapTiming { timing: 12, merge_at: 13 })
        ));
    }

    #[test]
    fn empty_document_deserializes_to_defaults() {
        let cfg: SimConfig = serde_json::from_str("{}").expect("deserialize");
        assert_eq!(cfg, SimConfig::default());
        cfg.validate().expect("defaults are valid");
    }

    #[test]
    fn preset_names_roundtrip_through_serde() {
        for preset in Preset::ALL {
            let json = serde_json::to_string(&preset).expect("serialize");
            assert_eq!(json, format!("\"{}\"", preset.name()));
            let parsed: Preset = serde_json::from_str(&json).expect("deserialize");
            assert_eq!(parsed, preset);
        }
    }
}
