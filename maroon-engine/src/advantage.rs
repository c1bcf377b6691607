//! Hidden-idol supply, searches and defensive play decisions.
use rand::Rng;
use smallvec::SmallVec;

use crate::config::SimConfig;
use crate::profile::{Cast, PlayerId};

/// Finds are capped per episode so a single swing of luck cannot flood the
/// season with idols.
pub const MAX_FINDS_PER_EPISODE: usize = 2;

/// Strategic players search even when the base roll says otherwise.
const STRATEGIST_SEARCH_CUTOFF: f64 = 0.6;
/// Strategic skill converts to bonus find probability at this rate.
const STRATEGIC_FIND_BONUS: f64 = 0.04;
/// Noise band applied to each search attempt.
const SEARCH_NOISE: f64 = 0.3;

/// Players who found an idol this episode.
pub type IdolFinds = SmallVec<[PlayerId; MAX_FINDS_PER_EPISODE]>;

/// Run one episode's search phase over `searchers` (alive non-holders).
///
/// Returns the finders in search order; the caller debits the supply and
/// credits each finder. At most `remaining` idols (and at most
/// [`MAX_FINDS_PER_EPISODE`]) are handed out.
pub fn search_idols(
    cast: &Cast,
    searchers: &[PlayerId],
    remaining: u32,
    cfg: &SimConfig,
    rng: &mut impl Rng,
) -> IdolFinds {
    let mut finds = IdolFinds::new();
    if remaining == 0 {
        return finds;
    }
    for &player in searchers {
        if finds.len() >= MAX_FINDS_PER_EPISODE || finds.len() as u32 >= remaining {
            break;
        }
        let profile = cast.player(player);
        let searches = profile.strategic > STRATEGIST_SEARCH_CUTOFF
            || rng.gen_range(0.0..1.0) < cfg.idol_search_probability;
        if !searches {
            continue;
        }
        let base = profile.idol_aptitude + profile.strategic * STRATEGIC_FIND_BONUS;
        let noise = rng.gen_range(1.0 - SEARCH_NOISE..1.0 + SEARCH_NOISE);
        if rng.gen_range(0.0..1.0) < base * noise {
            finds.push(player);
        }
    }
    finds
}

/// Decide whether a vote-leader plays their idol before the reveal.
///
/// Danger is the fraction of ballots against them plus how big a threat
/// they read as; strategic players read the vote better. The threshold
/// loosens as the season shortens: idols get banked early and burned late.
pub fn should_play_idol(
    cast: &Cast,
    player: PlayerId,
    votes_against: u32,
    total_votes: u32,
    players_remaining: usize,
    rng: &mut impl Rng,
) -> bool {
    let profile = cast.player(player);
    let danger = if total_votes == 0 {
        0.0
    } else {
        f64::from(votes_against) / f64::from(total_votes)
    };
    let threat = crate::vote::composite_threat(profile);
    let read_accuracy = profile.strategic * 0.3 + rng.gen_range(-0.1..0.1);

    let (phase_threshold, phase_modifier) = if players_remaining > 13 {
        (0.55, -0.15)
    } else if players_remaining > 7 {
        (0.40, -0.05)
    } else if players_remaining > 5 {
        (0.30, 0.05)
    } else {
        (0.20, 0.15)
    };

    let perceived = danger + threat * 0.2 + read_accuracy + phase_modifier;
    perceived > phase_threshold + rng.gen_range(-0.1..0.1)
}
