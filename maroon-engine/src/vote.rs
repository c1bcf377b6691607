//! Tribal-council voting: threat scoring, ballots, idols and revotes.
//!
//! Lower score = safer; the ballot draw is weighted, so a towering threat
//! is likely, not certain, to take the votes. Every draw comes from the
//! council stream, which keeps councils reproducible under a fixed seed.
use log::{debug, trace};
use rand::Rng;
use smallvec::SmallVec;

use crate::advantage;
use crate::alliance::AllianceBook;
use crate::config::SimConfig;
use crate::profile::{Cast, PlayerId, PlayerProfile};
use crate::rng::RngBundle;

/// Flat penalty for prior champions; larger than any single threat-weight
/// term so former winners are priority targets in every configuration.
pub const WINNER_PENALTY: f64 = 25.0;

/// Composite-threat cutoff above which a candidate draws extra heat.
const HIGH_THREAT_CUTOFF: f64 = 0.65;
const HIGH_THREAT_BONUS: f64 = 8.0;
/// Below this, a candidate reads as a beatable finalist and gets dragged.
const GOAT_CUTOFF: f64 = 0.35;
const GOAT_DISCOUNT: f64 = 4.0;
/// Extra protection per point of the target's historical vote accuracy.
const ACCURACY_PROTECTION: f64 = 15.0;
/// Chaos-scaled symmetric ballot noise.
const NOISE_SPAN: f64 = 30.0;
/// Chance of an extra wild swing on a ballot.
const WILD_CHANCE: f64 = 0.15;
const WILD_SPAN: f64 = 25.0;
/// Scores never reach zero, so the ballot draw always has mass.
const SCORE_FLOOR: f64 = 0.1;

/// Everything a council needs to score candidates.
#[derive(Debug, Clone, Copy)]
pub struct CouncilContext<'a> {
    pub cast: &'a Cast,
    pub cfg: &'a SimConfig,
    pub alliances: &'a AllianceBook,
    /// Players casting ballots tonight.
    pub voters: &'a [PlayerId],
    /// Non-immune players who can take votes.
    pub candidates: &'a [PlayerId],
    pub pre_merge: bool,
    /// Live count before the boot, for idol-play judgement.
    pub players_remaining: usize,
}

/// One resolved tribal council.
#[derive(Debug, Clone, PartialEq)]
pub struct CouncilOutcome {
    /// First-round ballots, voter -> target.
    pub ballots: Vec<(PlayerId, PlayerId)>,
    /// Tally the decision was read from, in candidate order.
    pub tally: Vec<(PlayerId, u32)>,
    pub idol_played: Option<PlayerId>,
    pub revote: bool,
    pub eliminated: PlayerId,
}

/// Weighted composite of the threat dimensions, used for the heat bonus,
/// the goat discount and idol-play judgement.
#[must_use]
pub fn composite_threat(profile: &PlayerProfile) -> f64 {
    profile.challenge_win_prob * 0.25
        + profile.strategic * 0.30
        + profile.jury_tendency * 0.25
        + profile.influence * 0.20
}

/// Social threat as a composite signal.
///
/// Historical jury success alone scores socially dominant players who never
/// reached the end as zero threat; blending accuracy, influence and voter
/// compatibility keeps the signal non-degenerate for the whole cast.
#[must_use]
pub fn social_component(cast: &Cast, target: PlayerId, voters: &[PlayerId]) -> f64 {
    let profile = cast.player(target);
    let others: SmallVec<[PlayerId; 8]> = voters
        .iter()
        .copied()
        .filter(|&v| v != target)
        .collect();
    let voter_compat = if others.is_empty() {
        0.5
    } else {
        let sum: f64 = others
            .iter()
            .map(|&v| cast.compatibility(target, v))
            .sum();
        sum / crate::numbers::usize_to_f64(others.len())
    };
    profile.jury_tendency * 0.10
        + profile.vote_accuracy * 0.30
        + profile.influence * 0.40
        + voter_compat * 0.20
}

/// Score one candidate from one voter's seat. Higher = more likely target.
fn vote_score(
    ctx: &CouncilContext<'_>,
    voter: PlayerId,
    target: PlayerId,
    rng: &mut impl Rng,
) -> f64 {
    let profile = ctx.cast.player(target);
    let mut score = 0.0;

    let threat = composite_threat(profile);
    if !ctx.pre_merge {
        if threat > HIGH_THREAT_CUTOFF {
            score += (threat - HIGH_THREAT_CUTOFF) * HIGH_THREAT_BONUS;
        } else if threat < GOAT_CUTOFF {
            score -= (GOAT_CUTOFF - threat) * GOAT_DISCOUNT;
        }
    }

    if profile.prior_winner {
        score += WINNER_PENALTY;
    }

    if ctx.alliances.shared(voter, target) {
        let loyalty = ctx.cfg.alliance_loyalty;
        let base = if loyalty > 0.0 {
            rng.gen_range(loyalty * 0.7..loyalty * 1.3)
        } else {
            0.0
        };
        score -= base + profile.vote_accuracy * ACCURACY_PROTECTION;
    }

    // Pre-merge a challenge beast shields the tribe; post-merge the same
    // resume is an immunity-run scare.
    let challenge_term = profile.challenge_win_prob * ctx.cfg.challenge_threat_weight;
    if ctx.pre_merge {
        score -= challenge_term;
    } else {
        score += challenge_term;
    }

    score += profile.strategic * ctx.cfg.strategic_threat_weight;
    score += social_component(ctx.cast, target, ctx.voters) * ctx.cfg.social_threat_weight;

    score += rng.gen_range(-NOISE_SPAN..NOISE_SPAN) * ctx.cfg.chaos_factor;
    if rng.gen_range(0.0..1.0) < WILD_CHANCE {
        score += rng.gen_range(-WILD_SPAN..WILD_SPAN);
    }

    score.max(SCORE_FLOOR)
}

/// Weighted ballot draw over `pool` from one voter's scores.
fn pick_target(
    ctx: &CouncilContext<'_>,
    voter: PlayerId,
    pool: &[PlayerId],
    rng: &mut impl Rng,
) -> Option<PlayerId> {
    let options: SmallVec<[PlayerId; 8]> =
        pool.iter().copied().filter(|&c| c != voter).collect();
    if options.is_empty() {
        return None;
    }
    let weights: SmallVec<[f64; 8]> = options
        .iter()
        .map(|&target| vote_score(ctx, voter, target, rng))
        .collect();
    let total: f64 = weights.iter().sum();
    if total <= 0.0 {
        return Some(options[rng.gen_range(0..options.len())]);
    }
    let mut roll = rng.gen_range(0.0..total);
    for (idx, weight) in weights.iter().enumerate() {
        if roll < *weight {
            return Some(options[idx]);
        }
        roll -= weight;
    }
    Some(options[options.len() - 1])
}

fn cast_ballots(
    ctx: &CouncilContext<'_>,
    pool: &[PlayerId],
    rng: &mut impl Rng,
) -> Vec<(PlayerId, PlayerId)> {
    let mut ballots = Vec::with_capacity(ctx.voters.len());
    for &voter in ctx.voters {
        if let Some(target) = pick_target(ctx, voter, pool, rng) {
            ballots.push((voter, target));
        }
    }
    ballots
}

/// Tally ballots in candidate-pool order so outcomes are order-stable.
fn tally_ballots(pool: &[PlayerId], ballots: &[(PlayerId, PlayerId)]) -> Vec<(PlayerId, u32)> {
    pool.iter()
        .map(|&candidate| {
            let count = ballots.iter().filter(|&&(_, t)| t == candidate).count() as u32;
            (candidate, count)
        })
        .filter(|&(_, count)| count > 0)
        .collect()
}

fn plurality(tally: &[(PlayerId, u32)]) -> SmallVec<[PlayerId; 4]> {
    let top = tally.iter().map(|&(_, c)| c).max().unwrap_or(0);
    tally
        .iter()
        .filter(|&&(_, c)| c == top && top > 0)
        .map(|&(p, _)| p)
        .collect()
}

/// Resolve one tribal council to exactly one elimination.
///
/// Order of operations: ballots, idol window, nullification re-tally (with
/// a fresh ballot round if the tally empties), then plurality with a
/// restricted revote on ties and a uniform draw if the revote ties again.
pub fn resolve_council(
    ctx: &CouncilContext<'_>,
    idol_holders: &[PlayerId],
    rng: &RngBundle,
) -> CouncilOutcome {
    let mut council_rng = rng.council();
    let ballots = cast_ballots(ctx, ctx.candidates, &mut *council_rng);
    let mut tally = tally_ballots(ctx.candidates, &ballots);
    let total_votes = ballots.len() as u32;

    if tally.is_empty() {
        // No valid ballots (degenerate pool); fall back to a uniform boot.
        let idx = council_rng.gen_range(0..ctx.candidates.len());
        let eliminated = ctx.candidates[idx];
        return CouncilOutcome {
            ballots,
            tally,
            idol_played: None,
            revote: false,
            eliminated,
        };
    }

    // Idol window: the current vote leader may nullify before the reveal.
    let mut idol_played = None;
    let leader = plurality(&tally)[0];
    if ctx.candidates.len() > 1 && idol_holders.contains(&leader) {
        let votes_against = tally
            .iter()
            .find(|&&(p, _)| p == leader)
            .map_or(0, |&(_, c)| c);
        let plays = {
            let mut advantage_rng = rng.advantage();
            advantage::should_play_idol(
                ctx.cast,
                leader,
                votes_against,
                total_votes,
                ctx.players_remaining,
                &mut *advantage_rng,
            )
        };
        if plays {
            debug!("{leader} plays an idol, nullifying {votes_against} votes");
            idol_played = Some(leader);
            tally.retain(|&(p, _)| p != leader);
            if tally.is_empty() {
                // Every ballot hit the idol; re-open the vote to the rest.
                let pool: Vec<PlayerId> = ctx
                    .candidates
                    .iter()
                    .copied()
                    .filter(|&c| c != leader)
                    .collect();
                let reopened = cast_ballots(ctx, &pool, &mut *council_rng);
                tally = tally_ballots(&pool, &reopened);
                if tally.is_empty() {
                    let idx = council_rng.gen_range(0..pool.len());
                    return CouncilOutcome {
                        ballots,
                        tally,
                        idol_played,
                        revote: false,
                        eliminated: pool[idx],
                    };
                }
            }
        }
    }

    let tied = plurality(&tally);
    if tied.len() == 1 {
        return CouncilOutcome {
            ballots,
            tally,
            idol_played,
            revote: false,
            eliminated: tied[0],
        };
    }

    // Deadlock: revote restricted to the tied candidates, tied players
    // sitting out. A second tie resolves by a uniform draw from the
    // council stream; no rock ritual is modeled.
    trace!("revote among {} tied candidates", tied.len());
    let revote_voters: Vec<PlayerId> = ctx
        .voters
        .iter()
        .copied()
        .filter(|v| !tied.contains(v))
        .collect();
    let revote_ctx = CouncilContext {
        voters: &revote_voters,
        ..*ctx
    };
    let revote_ballots = cast_ballots(&revote_ctx, &tied, &mut *council_rng);
    let revote_tally = tally_ballots(&tied, &revote_ballots);
    let second = plurality(&revote_tally);
    let eliminated = if second.len() == 1 {
        second[0]
    } else {
        let pool = if second.is_empty() { &tied } else { &second };
        pool[council_rng.gen_range(0..pool.len())]
    };
    CouncilOutcome {
        ballots,
        tally: if revote_tally.is_empty() { tally } else { revote_tally },
        idol_played,
        revote: true,
        eliminated,
    }
}
