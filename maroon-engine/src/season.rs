//! Season orchestration: the phase state machine driving episodes.
//!
//! One [`Season`] owns all mutable state for a single run: player states,
//! tribes, alliances, the idol supply and the RNG bundle. Construction
//! deals the cast into tribes; `run` plays episodes until the finalists
//! face the jury.
use log::debug;
use rand::Rng;
use rand::seq::SliceRandom;
use smallvec::SmallVec;
use thiserror::Error;

use crate::advantage;
use crate::alliance::AllianceBook;
use crate::challenge;
use crate::config::{ConfigError, SimConfig};
use crate::profile::{Cast, PlayerId};
use crate::result::{ChallengeVictor, EpisodeRecord, FireMaking, SeasonResult};
use crate::rng::RngBundle;
use crate::state::{Phase, PlayerState, TribeId};
use crate::vote::{self, CouncilContext};

/// Tribal challenges run hotter than individual ones.
const TRIBAL_CHAOS_BOOST: f64 = 1.2;
/// Probability split for drawing 0 / 1 / 2 tribe swaps per season.
const SWAP_NONE: f64 = 0.35;
const SWAP_SINGLE: f64 = 0.85;
/// Below this live count a swap collapses to two tribes.
const SWAP_TWO_TRIBE_CUTOFF: usize = 12;
/// Days advance in three-day episode beats.
const DAYS_PER_EPISODE: u16 = 3;

/// Errors that end a single season run.
#[derive(Debug, Error)]
pub enum SeasonError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("cast of {cast} is too small for a final stage of {final_stage}")]
    CastTooSmall { cast: usize, final_stage: u8 },
}

/// One season in flight.
#[derive(Debug)]
pub struct Season<'a> {
    cast: &'a Cast,
    cfg: &'a SimConfig,
    rng: RngBundle,
    players: Vec<PlayerState>,
    alliances: AllianceBook,
    idols_remaining: u32,
    jury: Vec<PlayerId>,
    phase: Phase,
    day: u16,
    episode: u16,
    swap_plan: SmallVec<[u8; 2]>,
    episodes: Vec<EpisodeRecord>,
    elimination_order: Vec<PlayerId>,
    next_placement: u16,
}

impl<'a> Season<'a> {
    /// Deal the cast into tribes and prepare a run.
    ///
    /// # Errors
    ///
    /// Returns `SeasonError::Config` for an invalid configuration and
    /// `SeasonError::CastTooSmall` when the cast cannot reach the final
    /// stage.
    pub fn new(cast: &'a Cast, cfg: &'a SimConfig, seed: u64) -> Result<Self, SeasonError> {
        cfg.validate()?;
        let format = &cfg.format;
        if cast.len() <= usize::from(format.final_stage_at) {
            return Err(SeasonError::CastTooSmall {
                cast: cast.len(),
                final_stage: format.final_stage_at,
            });
        }

        let rng = RngBundle::from_run_seed(seed);
        let mut order: Vec<PlayerId> = cast.ids().collect();
        let swap_plan: SmallVec<[u8; 2]> = {
            let mut casting = rng.casting();
            order.shuffle(&mut *casting);
            let roll = casting.gen_range(0.0..1.0);
            let swaps = if roll < SWAP_NONE {
                0
            } else if roll < SWAP_SINGLE {
                1
            } else {
                2
            };
            format.swap_timings.iter().copied().take(swaps).collect()
        };

        let tribe_count = usize::from(format.tribes);
        let mut players: Vec<PlayerState> =
            cast.ids().map(|_| PlayerState::new(TribeId(0))).collect();
        for (idx, &pid) in order.iter().enumerate() {
            players[pid.0].tribe = TribeId((idx % tribe_count) as u8);
        }

        let cast_size = cast.len() as u16;
        let mut season = Self {
            cast,
            cfg,
            rng,
            players,
            alliances: AllianceBook::default(),
            idols_remaining: cfg.total_idols,
            jury: Vec::new(),
            phase: Phase::PreMerge,
            day: 1,
            episode: 1,
            swap_plan,
            episodes: Vec::new(),
            elimination_order: Vec::new(),
            next_placement: cast_size,
        };
        season.rebuild_tribe_alliances();
        Ok(season)
    }

    /// Play the full season and produce its result.
    ///
    /// # Errors
    ///
    /// Propagates any `SeasonError` raised while resolving episodes; the
    /// aggregator records such failures per run and continues its batch.
    pub fn run(mut self) -> Result<SeasonResult, SeasonError> {
        while self.alive_count() > usize::from(self.cfg.format.finalists) {
            if self.alive_count() > usize::from(self.cfg.format.final_stage_at) {
                self.play_episode();
            } else {
                self.play_fire_episode();
            }
            self.day += DAYS_PER_EPISODE;
            self.episode += 1;
        }
        Ok(self.final_tribal_council())
    }

    fn alive_ids(&self) -> Vec<PlayerId> {
        self.players
            .iter()
            .enumerate()
            .filter(|(_, p)| p.alive)
            .map(|(idx, _)| PlayerId(idx))
            .collect()
    }

    fn alive_count(&self) -> usize {
        self.players.iter().filter(|p| p.alive).count()
    }

    fn active_tribes(&self) -> Vec<(TribeId, Vec<PlayerId>)> {
        let mut tribes: Vec<(TribeId, Vec<PlayerId>)> = Vec::new();
        for tribe in 0..self.cfg.format.tribes {
            let members: Vec<PlayerId> = self
                .alive_ids()
                .into_iter()
                .filter(|&p| self.players[p.0].tribe == TribeId(tribe))
                .collect();
            if !members.is_empty() {
                tribes.push((TribeId(tribe), members));
            }
        }
        tribes
    }

    fn rebuild_tribe_alliances(&mut self) {
        let groups: Vec<Vec<PlayerId>> = self
            .active_tribes()
            .into_iter()
            .map(|(_, members)| members)
            .collect();
        let book = {
            let mut alliance_rng = self.rng.alliance();
            AllianceBook::rebuild(self.cast, &groups, &mut *alliance_rng)
        };
        self.alliances = book;
    }

    fn merge_tribes(&mut self) {
        debug!("tribes merge with {} players left", self.alive_count());
        self.phase = Phase::Merge;
        let alive = self.alive_ids();
        for &p in &alive {
            self.players[p.0].reached_merge = true;
        }
        let book = {
            let mut alliance_rng = self.rng.alliance();
            AllianceBook::rebuild(self.cast, &[alive], &mut *alliance_rng)
        };
        self.alliances = book;
    }

    fn tribe_swap(&mut self) {
        let mut alive = self.alive_ids();
        let num_tribes = if alive.len() >= SWAP_TWO_TRIBE_CUTOFF {
            usize::from(self.cfg.format.tribes)
        } else {
            2
        };
        debug!("tribe swap at {} players into {num_tribes} tribes", alive.len());
        {
            let mut casting = self.rng.casting();
            alive.shuffle(&mut *casting);
        }
        for (idx, &p) in alive.iter().enumerate() {
            self.players[p.0].tribe = TribeId((idx % num_tribes) as u8);
        }
        self.rebuild_tribe_alliances();
    }

    fn idol_search_phase(&mut self) {
        if self.idols_remaining == 0 {
            return;
        }
        let searchers: Vec<PlayerId> = self
            .alive_ids()
            .into_iter()
            .filter(|&p| self.players[p.0].idols == 0)
            .collect();
        let finds = {
            let mut advantage_rng = self.rng.advantage();
            advantage::search_idols(
                self.cast,
                &searchers,
                self.idols_remaining,
                self.cfg,
                &mut *advantage_rng,
            )
        };
        for &finder in &finds {
            debug!("{finder} digs up an idol");
            self.players[finder.0].idols += 1;
            self.idols_remaining -= 1;
        }
    }

    fn eliminate(&mut self, player: PlayerId) {
        let state = &mut self.players[player.0];
        state.alive = false;
        state.placement = self.next_placement;
        self.next_placement -= 1;
        self.elimination_order.push(player);
        self.alliances.drop_player(player);
        if self.phase.seats_jury() {
            self.jury.push(player);
        }
        debug!(
            "{player} is voted out on day {}, placing {}",
            self.day,
            self.players[player.0].placement
        );
    }

    fn play_episode(&mut self) {
        let alive_now = self.alive_count();
        if self.phase == Phase::PreMerge {
            if let Some(pos) = self
                .swap_plan
                .iter()
                .position(|&t| usize::from(t) == alive_now)
            {
                self.swap_plan.remove(pos);
                self.tribe_swap();
            }
            if alive_now <= usize::from(self.cfg.format.merge_at)
                || self.active_tribes().len() < 2
            {
                self.merge_tribes();
            }
        }

        let category = {
            let mut challenge_rng = self.rng.challenge();
            challenge::sample_category(&self.cfg.challenge_distribution, &mut *challenge_rng)
        };

        let pre_merge = self.phase == Phase::PreMerge;
        let alive = self.alive_ids();
        let (victor, immune, voters, candidates) = if pre_merge {
            self.tribal_challenge(category)
        } else {
            self.individual_challenge(category, &alive)
        };

        self.idol_search_phase();

        let idol_holders: Vec<PlayerId> = candidates
            .iter()
            .copied()
            .filter(|&p| self.players[p.0].idols > 0)
            .collect();
        let ctx = CouncilContext {
            cast: self.cast,
            cfg: self.cfg,
            alliances: &self.alliances,
            voters: &voters,
            candidates: &candidates,
            pre_merge,
            players_remaining: alive.len(),
        };
        let outcome = vote::resolve_council(&ctx, &idol_holders, &self.rng);

        for &(voter, target) in &outcome.ballots {
            let state = &mut self.players[voter.0];
            state.ballots_cast += 1;
            if target == outcome.eliminated {
                state.correct_votes += 1;
            }
        }
        if let Some(player) = outcome.idol_played {
            self.players[player.0].idols = self.players[player.0].idols.saturating_sub(1);
        }
        self.eliminate(outcome.eliminated);

        self.episodes.push(EpisodeRecord {
            episode: self.episode,
            day: self.day,
            phase: self.phase,
            category,
            victor,
            immune,
            tally: outcome.tally,
            idol_played: outcome.idol_played,
            revote: outcome.revote,
            eliminated: outcome.eliminated,
            fire_making: None,
        });
    }

    /// Pre-merge: tribes compete, one losing tribe goes to council.
    fn tribal_challenge(
        &mut self,
        category: crate::challenge::ChallengeKind,
    ) -> (ChallengeVictor, Vec<PlayerId>, Vec<PlayerId>, Vec<PlayerId>) {
        let tribes = self.active_tribes();
        let chaos = (self.cfg.chaos_factor * TRIBAL_CHAOS_BOOST).min(1.0);
        let mut challenge_rng = self.rng.challenge();
        let winner = challenge::resolve_tribal(self.cast, &tribes, category, chaos, &mut *challenge_rng)
            .unwrap_or(tribes[0].0);
        let losers: Vec<TribeId> = tribes
            .iter()
            .map(|&(id, _)| id)
            .filter(|&id| id != winner)
            .collect();
        let losing = losers[challenge_rng.gen_range(0..losers.len())];
        let mut immune = Vec::new();
        let mut council = Vec::new();
        for (id, members) in tribes {
            if id == losing {
                council = members;
            } else {
                immune.extend(members);
            }
        }
        (
            ChallengeVictor::Tribe(winner),
            immune,
            council.clone(),
            council,
        )
    }

    /// Post-merge: one player wins immunity, everyone votes.
    fn individual_challenge(
        &mut self,
        category: crate::challenge::ChallengeKind,
        alive: &[PlayerId],
    ) -> (ChallengeVictor, Vec<PlayerId>, Vec<PlayerId>, Vec<PlayerId>) {
        let winner = {
            let mut challenge_rng = self.rng.challenge();
            challenge::resolve_individual(
                self.cast,
                alive,
                category,
                self.cfg.chaos_factor,
                &mut *challenge_rng,
            )
            .unwrap_or(alive[0])
        };
        self.players[winner.0].challenge_wins += 1;
        let candidates: Vec<PlayerId> = alive.iter().copied().filter(|&p| p != winner).collect();
        (
            ChallengeVictor::Player(winner),
            vec![winner],
            alive.to_vec(),
            candidates,
        )
    }

    /// Final stage: immunity, a spared companion, and fire for the rest.
    fn play_fire_episode(&mut self) {
        self.phase = Phase::FinalStage;
        let alive = self.alive_ids();
        let category = {
            let mut challenge_rng = self.rng.challenge();
            challenge::sample_category(&self.cfg.challenge_distribution, &mut *challenge_rng)
        };
        let winner = {
            let mut challenge_rng = self.rng.challenge();
            challenge::resolve_individual(
                self.cast,
                &alive,
                category,
                self.cfg.chaos_factor,
                &mut *challenge_rng,
            )
            .unwrap_or(alive[0])
        };
        self.players[winner.0].challenge_wins += 1;

        // The holder spares whoever reads as the weakest jury threat and
        // sends the rest to the fire.
        let mut others: Vec<(PlayerId, f64)> = {
            let mut council_rng = self.rng.council();
            alive
                .iter()
                .copied()
                .filter(|&p| p != winner)
                .map(|p| {
                    let profile = self.cast.player(p);
                    let threat = profile.jury_tendency * 0.6
                        + profile.strategic * 0.4
                        + council_rng.gen_range(-0.1..0.1);
                    (p, threat)
                })
                .collect()
        };
        others.sort_by(|a, b| a.1.total_cmp(&b.1));
        let spare_count = others.len().saturating_sub(2);
        let spared: Vec<PlayerId> = others[..spare_count].iter().map(|&(p, _)| p).collect();
        let duel: Vec<PlayerId> = others[spare_count..].iter().map(|&(p, _)| p).collect();

        let (fire_winner, fire_loser) = {
            let mut challenge_rng = self.rng.challenge();
            challenge::resolve_fire_duel(self.cast, duel[0], duel[1], &mut *challenge_rng)
        };
        debug!("{fire_winner} wins fire against {fire_loser}");
        self.eliminate(fire_loser);

        let mut immune = vec![winner];
        immune.extend(&spared);
        self.episodes.push(EpisodeRecord {
            episode: self.episode,
            day: self.day,
            phase: self.phase,
            category,
            victor: ChallengeVictor::Player(winner),
            immune,
            tally: Vec::new(),
            idol_played: None,
            revote: false,
            eliminated: fire_loser,
            fire_making: Some(FireMaking {
                winner: fire_winner,
                loser: fire_loser,
                spared: spared.first().copied().unwrap_or(winner),
            }),
        });
    }

    /// A season-long strategic resume, read by jurors at the end.
    fn narrative_score(&self, player: PlayerId) -> f64 {
        let profile = self.cast.player(player);
        let state = &self.players[player.0];
        let wins = f64::from(state.challenge_wins.min(5)) / 5.0;
        profile.strategic * 0.6 + state.correct_vote_rate() * 0.25 + wins * 0.15
    }

    fn final_tribal_council(mut self) -> SeasonResult {
        self.phase = Phase::Ftc;
        let finalists = self.alive_ids();
        let mut jury_votes = vec![0u8; self.cast.len()];
        {
            let mut jury_rng = self.rng.jury();
            for &juror in &self.jury {
                let mut best: Option<(PlayerId, f64)> = None;
                for &finalist in &finalists {
                    let profile = self.cast.player(finalist);
                    let score = self.cast.compatibility(juror, finalist) * 0.40
                        + profile.jury_tendency * 0.35
                        + self.narrative_score(finalist) * 0.25
                        + jury_rng.gen_range(-0.05..0.05);
                    let better = best.is_none_or(|(_, top)| score > top);
                    if better {
                        best = Some((finalist, score));
                    }
                }
                if let Some((choice, _)) = best {
                    jury_votes[choice.0] += 1;
                }
            }
        }

        let top = finalists
            .iter()
            .map(|&f| jury_votes[f.0])
            .max()
            .unwrap_or(0);
        let tied: Vec<PlayerId> = finalists
            .iter()
            .copied()
            .filter(|&f| jury_votes[f.0] == top)
            .collect();
        let winner = if tied.len() == 1 {
            tied[0]
        } else {
            let mut jury_rng = self.rng.jury();
            tied[jury_rng.gen_range(0..tied.len())]
        };
        debug!("{winner} wins the season with {top} jury votes");

        // Runner-up order: jury votes, then roster order.
        let mut ranked: Vec<PlayerId> = finalists
            .iter()
            .copied()
            .filter(|&f| f != winner)
            .collect();
        ranked.sort_by(|&a, &b| jury_votes[b.0].cmp(&jury_votes[a.0]).then(a.0.cmp(&b.0)));

        self.players[winner.0].placement = 1;
        for (idx, &finalist) in ranked.iter().enumerate() {
            self.players[finalist.0].placement = (idx + 2) as u16;
        }
        self.phase = Phase::Terminal;

        let mut finalists_by_place = SmallVec::with_capacity(finalists.len());
        finalists_by_place.push(winner);
        finalists_by_place.extend(ranked);

        SeasonResult {
            winner,
            finalists: finalists_by_place,
            placements: self.players.iter().map(|p| p.placement).collect(),
            elimination_order: self.elimination_order,
            challenge_wins: self.players.iter().map(|p| p.challenge_wins).collect(),
            jury_votes,
            reached_merge: self.players.iter().map(|p| p.reached_merge).collect(),
            episodes: self.episodes,
        }
    }
}
