//! Challenge resolution: category sampling, immunity winners, fire-making.
use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::HashMap;

use crate::profile::{Cast, PlayerId};
use crate::state::TribeId;

/// Challenge categories a season can draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeKind {
    Physical,
    Endurance,
    Precision,
    Puzzle,
    Mental,
    Water,
}

impl std::fmt::Display for ChallengeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Physical => write!(f, "physical"),
            Self::Endurance => write!(f, "endurance"),
            Self::Precision => write!(f, "precision"),
            Self::Puzzle => write!(f, "puzzle"),
            Self::Mental => write!(f, "mental"),
            Self::Water => write!(f, "water"),
        }
    }
}

/// Fixed iteration order so map-backed weights sample deterministically.
pub const CHALLENGE_ORDER: [ChallengeKind; 6] = [
    ChallengeKind::Physical,
    ChallengeKind::Endurance,
    ChallengeKind::Precision,
    ChallengeKind::Puzzle,
    ChallengeKind::Mental,
    ChallengeKind::Water,
];

/// Winners of a multi-slot reward challenge.
pub type RewardWinners = SmallVec<[PlayerId; 4]>;

/// Draw a challenge category from the configured weight distribution.
pub fn sample_category(
    distribution: &HashMap<ChallengeKind, f64>,
    rng: &mut impl Rng,
) -> ChallengeKind {
    let total: f64 = CHALLENGE_ORDER
        .iter()
        .map(|kind| distribution.get(kind).copied().unwrap_or(0.0))
        .sum();
    if total <= 0.0 {
        let idx = rng.gen_range(0..CHALLENGE_ORDER.len());
        return CHALLENGE_ORDER[idx];
    }
    let mut roll = rng.gen_range(0.0..total);
    for kind in CHALLENGE_ORDER {
        let weight = distribution.get(&kind).copied().unwrap_or(0.0);
        if roll < weight {
            return kind;
        }
        roll -= weight;
    }
    // Float edge when roll lands exactly on the upper bound.
    CHALLENGE_ORDER[CHALLENGE_ORDER.len() - 1]
}

/// A player's skill for one category, falling back to the overall rate.
#[must_use]
pub fn category_skill(cast: &Cast, player: PlayerId, category: ChallengeKind) -> f64 {
    let profile = cast.player(player);
    profile
        .category_scores
        .get(&category)
        .copied()
        .unwrap_or(profile.challenge_win_prob)
}

/// Blend a skill value with uniform noise according to the chaos factor.
fn chaos_strength(skill: f64, chaos: f64, rng: &mut impl Rng) -> f64 {
    (1.0 - chaos) * skill + chaos * rng.gen_range(0.0..1.0)
}

/// Weighted draw over `weights`, falling back to a uniform draw when the
/// total weight is zero. The fallback is the load-bearing guard: an
/// all-zero field must select uniformly instead of dividing by zero.
fn weighted_pick(weights: &[f64], rng: &mut impl Rng) -> Option<usize> {
    if weights.is_empty() {
        return None;
    }
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Some(rng.gen_range(0..weights.len()));
    }
    let mut roll = rng.gen_range(0.0..total);
    for (idx, weight) in weights.iter().enumerate() {
        if roll < *weight {
            return Some(idx);
        }
        roll -= weight;
    }
    Some(weights.len() - 1)
}

/// Resolve an individual immunity (or reward) challenge to a single winner.
pub fn resolve_individual(
    cast: &Cast,
    competitors: &[PlayerId],
    category: ChallengeKind,
    chaos: f64,
    rng: &mut impl Rng,
) -> Option<PlayerId> {
    let strengths: Vec<f64> = competitors
        .iter()
        .map(|&p| chaos_strength(category_skill(cast, p, category), chaos, rng))
        .collect();
    weighted_pick(&strengths, rng).map(|idx| competitors[idx])
}

/// Resolve a tribal immunity challenge to a winning tribe.
///
/// Tribe strength is the mean member skill for the drawn category, blended
/// with chaos the same way individual strengths are.
pub fn resolve_tribal(
    cast: &Cast,
    tribes: &[(TribeId, Vec<PlayerId>)],
    category: ChallengeKind,
    chaos: f64,
    rng: &mut impl Rng,
) -> Option<TribeId> {
    let strengths: Vec<f64> = tribes
        .iter()
        .map(|(_, members)| {
            let skill = if members.is_empty() {
                0.0
            } else {
                let sum: f64 = members
                    .iter()
                    .map(|&p| category_skill(cast, p, category))
                    .sum();
                sum / crate::numbers::usize_to_f64(members.len())
            };
            chaos_strength(skill, chaos, rng)
        })
        .collect();
    weighted_pick(&strengths, rng).map(|idx| tribes[idx].0)
}

/// Fill `slots` reward places by weighted draw without replacement.
pub fn resolve_reward(
    cast: &Cast,
    competitors: &[PlayerId],
    category: ChallengeKind,
    chaos: f64,
    slots: usize,
    rng: &mut impl Rng,
) -> RewardWinners {
    let mut pool: Vec<PlayerId> = competitors.to_vec();
    let mut strengths: Vec<f64> = pool
        .iter()
        .map(|&p| chaos_strength(category_skill(cast, p, category), chaos, rng))
        .collect();
    let mut winners = RewardWinners::new();
    while winners.len() < slots && !pool.is_empty() {
        let Some(idx) = weighted_pick(&strengths, rng) else {
            break;
        };
        winners.push(pool.swap_remove(idx));
        strengths.swap_remove(idx);
    }
    winners
}

/// Resolve a fire-making duel, returning `(winner, loser)`.
///
/// Fire is mostly raw challenge skill with a wide noise band.
pub fn resolve_fire_duel(
    cast: &Cast,
    first: PlayerId,
    second: PlayerId,
    rng: &mut impl Rng,
) -> (PlayerId, PlayerId) {
    let contestants = [first, second];
    let strengths: Vec<f64> = contestants
        .iter()
        .map(|&p| cast.player(p).challenge_win_prob * rng.gen_range(0.7..1.3))
        .collect();
    let winner_idx = weighted_pick(&strengths, rng).unwrap_or(0);
    (contestants[winner_idx], contestants[1 - winner_idx])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::PlayerProfile;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn flat_cast(n: usize, challenge: f64) -> Cast {
        let players: Vec<PlayerProfile> = (0..n)
            .map(|i| PlayerProfile {
                name: format!("player-{i}"),
                challenge_win_prob: challenge,
                category_scores: HashMap::new(),
                strategic: 0.5,
                jury_tendency: 0.5,
                vote_accuracy: 0.5,
                influence: 0.5,
                idol_aptitude: 0.05,
                prior_winner: false,
            })
            .collect();
        let compatibility = vec![vec![0.5; n]; n];
        Cast::new(players, compatibility).expect("valid cast")
    }

    #[test]
    fn zero_strength_field_selects_uniformly() {
        let cast = flat_cast(6, 0.0);
        let competitors: Vec<PlayerId> = cast.ids().collect();
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let mut counts = [0u32; 6];
        let trials = 12_000;
        for _ in 0..trials {
            let winner = resolve_individual(&cast, &competitors, ChallengeKind::Puzzle, 0.0, &mut rng)
                .expect("non-empty field");
            counts[winner.0] += 1;
        }
        // Chi-square against uniform with 5 dof; 16.75 ~ p = 0.005.
        let expected = f64::from(trials) / 6.0;
        let chi2: f64 = counts
            .iter()
            .map(|&c| {
                let diff = f64::from(c) - expected;
                diff * diff / expected
            })
            .sum();
        assert!(chi2 < 16.75, "winner distribution too far from uniform: {chi2:.2}");
    }

    #[test]
    fn zero_strength_tribes_select_uniformly() {
        let cast = flat_cast(6, 0.0);
        let ids: Vec<PlayerId> = cast.ids().collect();
        let tribes = vec![
            (TribeId(0), ids[0..3].to_vec()),
            (TribeId(1), ids[3..6].to_vec()),
        ];
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let mut wins = [0u32; 2];
        for _ in 0..4_000 {
            let tribe = resolve_tribal(&cast, &tribes, ChallengeKind::Water, 0.0, &mut rng)
                .expect("two tribes");
            wins[tribe.0 as usize] += 1;
        }
        assert!(wins[0] > 1_700 && wins[1] > 1_700, "tribal fallback skewed: {wins:?}");
    }

    #[test]
    fn category_skill_prefers_sub_scores() {
        let mut cast = flat_cast(1, 0.4);
        let players = vec![PlayerProfile {
            category_scores: HashMap::from([(ChallengeKind::Puzzle, 0.9)]),
            ..cast.player(PlayerId(0)).clone()
        }];
        cast = Cast::new(players, vec![vec![0.5]]).expect("valid cast");
        assert!((category_skill(&cast, PlayerId(0), ChallengeKind::Puzzle) - 0.9).abs() < 1e-12);
        assert!((category_skill(&cast, PlayerId(0), ChallengeKind::Water) - 0.4).abs() < 1e-12);
    }

    #[test]
    fn reward_slots_are_distinct() {
        let cast = flat_cast(8, 0.5);
        let competitors: Vec<PlayerId> = cast.ids().collect();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let winners = resolve_reward(&cast, &competitors, ChallengeKind::Physical, 0.5, 3, &mut rng);
        assert_eq!(winners.len(), 3);
        let mut unique = winners.to_vec();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), 3);
    }

    #[test]
    fn reward_slots_cap_at_field_size() {
        let cast = flat_cast(2, 0.5);
        let competitors: Vec<PlayerId> = cast.ids().collect();
        let mut rng = ChaCha8Rng::seed_from_u64(4);
        let winners = resolve_reward(&cast, &competitors, ChallengeKind::Mental, 0.5, 5, &mut rng);
        assert_eq!(winners.len(), 2);
    }

    #[test]
    fn category_sampling_follows_weights() {
        let distribution = HashMap::from([
            (ChallengeKind::Puzzle, 1.0),
            (ChallengeKind::Water, 0.0),
        ]);
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for _ in 0..64 {
            assert_eq!(sample_category(&distribution, &mut rng), ChallengeKind::Puzzle);
        }
    }

    #[test]
    fn fire_duel_favors_the_stronger_maker() {
        let players = vec![
            PlayerProfile {
                name: "strong".into(),
                challenge_win_prob: 0.9,
                category_scores: HashMap::new(),
                strategic: 0.5,
                jury_tendency: 0.5,
                vote_accuracy: 0.5,
                influence: 0.5,
                idol_aptitude: 0.05,
                prior_winner: false,
            },
            PlayerProfile {
                name: "weak".into(),
                challenge_win_prob: 0.1,
                category_scores: HashMap::new(),
                strategic: 0.5,
                jury_tendency: 0.5,
                vote_accuracy: 0.5,
                influence: 0.5,
                idol_aptitude: 0.05,
                prior_winner: false,
            },
        ];
        let cast = Cast::new(players, vec![vec![0.5; 2]; 2]).expect("valid cast");
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let mut strong_wins = 0u32;
        for _ in 0..2_000 {
            let (winner, _) = resolve_fire_duel(&cast, PlayerId(0), PlayerId(1), &mut rng);
            if winner == PlayerId(0) {
                strong_wins += 1;
            }
        }
        assert!(strong_wins > 1_500, "strong maker won only {strong_wins}/2000");
    }
}
