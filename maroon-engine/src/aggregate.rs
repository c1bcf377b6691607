//! Monte Carlo batch running and per-player outcome statistics.
//!
//! Every run is independent: it owns its state and derives its RNG streams
//! from `(base_seed, run_index)`, so results do not depend on worker count
//! or scheduling order. Workers fold into private accumulators that merge
//! through an order-independent reduce.
use log::{info, warn};
use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::SimConfig;
use crate::numbers::{u32_to_f64, u64_to_f64};
use crate::profile::{Cast, PlayerId};
use crate::result::SeasonResult;
use crate::rng::derive_run_seed;
use crate::season::Season;

/// A single failed run, reported alongside the batch statistics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunFailure {
    pub run_index: u32,
    pub message: String,
}

/// Raw per-player counts accumulated across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlayerAccum {
    pub wins: u64,
    pub finals: u64,
    pub merges: u64,
    pub first_boots: u64,
    pub challenge_wins: u64,
    pub placement_sum: u64,
    /// Bucket per placement, index 0 = winner.
    pub placement_hist: Vec<u64>,
}

impl PlayerAccum {
    fn empty(cast_size: usize) -> Self {
        Self {
            wins: 0,
            finals: 0,
            merges: 0,
            first_boots: 0,
            challenge_wins: 0,
            placement_sum: 0,
            placement_hist: vec![0; cast_size],
        }
    }

    fn merge_from(&mut self, other: &Self) {
        self.wins += other.wins;
        self.finals += other.finals;
        self.merges += other.merges;
        self.first_boots += other.first_boots;
        self.challenge_wins += other.challenge_wins;
        self.placement_sum += other.placement_sum;
        for (bucket, &count) in self.placement_hist.iter_mut().zip(&other.placement_hist) {
            *bucket += count;
        }
    }
}

/// Normalized view of one player's batch outcomes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlayerStats {
    pub player: PlayerId,
    pub name: String,
    pub win_probability: f64,
    pub finalist_probability: f64,
    pub merge_probability: f64,
    pub first_boot_probability: f64,
    pub average_placement: f64,
    pub challenge_wins_per_run: f64,
    pub win_count: u64,
    pub finalist_count: u64,
    pub placement_distribution: Vec<u64>,
}

/// Statistics accumulated over a batch of season runs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateStats {
    runs_requested: u32,
    runs_completed: u32,
    failures: Vec<RunFailure>,
    players: Vec<PlayerAccum>,
}

impl AggregateStats {
    fn empty(cast_size: usize) -> Self {
        Self {
            runs_requested: 0,
            runs_completed: 0,
            failures: Vec::new(),
            players: (0..cast_size).map(|_| PlayerAccum::empty(cast_size)).collect(),
        }
    }

    fn absorb(&mut self, result: &SeasonResult) {
        self.runs_completed += 1;
        for (idx, accum) in self.players.iter_mut().enumerate() {
            let placement = result.placements[idx];
            accum.placement_sum += u64::from(placement);
            if placement >= 1 {
                accum.placement_hist[usize::from(placement) - 1] += 1;
            }
            accum.challenge_wins += u64::from(result.challenge_wins[idx]);
            if result.reached_merge[idx] {
                accum.merges += 1;
            }
        }
        self.players[result.winner.0].wins += 1;
        for &finalist in &result.finalists {
            self.players[finalist.0].finals += 1;
        }
        if let Some(first) = result.first_boot() {
            self.players[first.0].first_boots += 1;
        }
    }

    fn absorb_failure(&mut self, run_index: u32, message: String) {
        self.failures.push(RunFailure { run_index, message });
    }

    /// Order-independent merge of two worker-local accumulators.
    fn merged(mut self, other: Self) -> Self {
        if self.players.is_empty() {
            return other;
        }
        if other.players.is_empty() {
            return self;
        }
        self.runs_completed += other.runs_completed;
        self.failures.extend(other.failures);
        for (mine, theirs) in self.players.iter_mut().zip(&other.players) {
            mine.merge_from(theirs);
        }
        self
    }

    #[must_use]
    pub const fn runs_requested(&self) -> u32 {
        self.runs_requested
    }

    /// Runs that produced a `SeasonResult`; the denominator for every
    /// probability below.
    #[must_use]
    pub const fn runs_completed(&self) -> u32 {
        self.runs_completed
    }

    #[must_use]
    pub fn failure_count(&self) -> u32 {
        self.failures.len() as u32
    }

    #[must_use]
    pub fn failures(&self) -> &[RunFailure] {
        &self.failures
    }

    #[must_use]
    pub fn accums(&self) -> &[PlayerAccum] {
        &self.players
    }

    /// Normalized statistics for every player, in roster order.
    #[must_use]
    pub fn player_stats(&self, cast: &Cast) -> Vec<PlayerStats> {
        let runs = u32_to_f64(self.runs_completed);
        self.players
            .iter()
            .enumerate()
            .map(|(idx, accum)| {
                let id = PlayerId(idx);
                let rate = |count: u64| {
                    if self.runs_completed == 0 {
                        0.0
                    } else {
                        u64_to_f64(count) / runs
                    }
                };
                PlayerStats {
                    player: id,
                    name: cast.player(id).name.clone(),
                    win_probability: rate(accum.wins),
                    finalist_probability: rate(accum.finals),
                    merge_probability: rate(accum.merges),
                    first_boot_probability: rate(accum.first_boots),
                    average_placement: if self.runs_completed == 0 {
                        0.0
                    } else {
                        u64_to_f64(accum.placement_sum) / runs
                    },
                    challenge_wins_per_run: rate(accum.challenge_wins),
                    win_count: accum.wins,
                    finalist_count: accum.finals,
                    placement_distribution: accum.placement_hist.clone(),
                }
            })
            .collect()
    }
}

/// Batch driver: runs N independent seasons and accumulates statistics.
#[derive(Debug, Clone)]
pub struct MonteCarlo<'a> {
    cast: &'a Cast,
    cfg: &'a SimConfig,
    base_seed: u64,
    runs: u32,
    workers: usize,
}

impl<'a> MonteCarlo<'a> {
    #[must_use]
    pub const fn new(cast: &'a Cast, cfg: &'a SimConfig, base_seed: u64) -> Self {
        Self {
            cast,
            cfg,
            base_seed,
            runs: 1_000,
            workers: 1,
        }
    }

    #[must_use]
    pub const fn with_runs(mut self, runs: u32) -> Self {
        self.runs = runs;
        self
    }

    /// Worker threads; above one, runs execute on a rayon pool.
    #[must_use]
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    /// Run the whole batch.
    #[must_use]
    pub fn run(&self) -> AggregateStats {
        self.run_cancellable(&AtomicBool::new(false))
    }

    /// Run the batch, checking `cancel` before each season. Already
    /// accumulated statistics stay consistent: skipped runs are neither
    /// completions nor failures.
    #[must_use]
    pub fn run_cancellable(&self, cancel: &AtomicBool) -> AggregateStats {
        let mut stats = if self.workers > 1 {
            self.run_parallel(cancel)
        } else {
            self.run_sequential(cancel)
        };
        stats.runs_requested = self.runs;
        stats.failures.sort_by_key(|f| f.run_index);
        info!(
            "batch done: {}/{} runs completed, {} failed",
            stats.runs_completed,
            self.runs,
            stats.failures.len()
        );
        stats
    }

    fn run_one(&self, run_index: u32) -> Result<SeasonResult, crate::season::SeasonError> {
        let seed = derive_run_seed(self.base_seed, run_index);
        Season::new(self.cast, self.cfg, seed)?.run()
    }

    fn run_sequential(&self, cancel: &AtomicBool) -> AggregateStats {
        let mut stats = AggregateStats::empty(self.cast.len());
        for run_index in 0..self.runs {
            if cancel.load(Ordering::Relaxed) {
                break;
            }
            match self.run_one(run_index) {
                Ok(result) => stats.absorb(&result),
                Err(err) => {
                    warn!("run {run_index} failed: {err}");
                    stats.absorb_failure(run_index, err.to_string());
                }
            }
        }
        stats
    }

    fn run_parallel(&self, cancel: &AtomicBool) -> AggregateStats {
        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(self.workers)
            .build()
        {
            Ok(pool) => pool,
            Err(err) => {
                warn!("falling back to sequential batch: {err}");
                return self.run_sequential(cancel);
            }
        };
        let cast_size = self.cast.len();
        let stats = pool.install(|| {
            (0..self.runs)
                .into_par_iter()
                .filter(|_| !cancel.load(Ordering::Relaxed))
                .map(|run_index| (run_index, self.run_one(run_index)))
                .fold(
                    || AggregateStats::empty(cast_size),
                    |mut acc, (run_index, outcome)| {
                        match outcome {
                            Ok(result) => acc.absorb(&result),
                            Err(err) => {
                                warn!("run {run_index} failed: {err}");
                                acc.absorb_failure(run_index, err.to_string());
                            }
                        }
                        acc
                    },
                )
                .reduce(|| AggregateStats::empty(0), AggregateStats::merged)
        });
        if stats.players.is_empty() {
            // Every run was cancelled before starting; keep the shape stable.
            return AggregateStats::empty(cast_size);
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::PlayerProfile;
    use std::collections::HashMap;

    fn demo_cast(n: usize) -> Cast {
        let players: Vec<PlayerProfile> = (0..n)
            .map(|i| {
                let spread = i as f64 / (n - 1) as f64;
                PlayerProfile {
                    name: format!("player-{i}"),
                    challenge_win_prob: 0.2 + 0.6 * spread,
                    category_scores: HashMap::new(),
                    strategic: 0.8 - 0.6 * spread,
                    jury_tendency: 0.3 + 0.4 * spread,
                    vote_accuracy: 0.4 + 0.2 * spread,
                    influence: 0.25 + 0.5 * spread,
                    idol_aptitude: 0.05 + 0.05 * spread,
                    prior_winner: false,
                }
            })
            .collect();
        let compatibility = (0..n)
            .map(|a| {
                (0..n)
                    .map(|b| 0.3 + 0.4 * ((a + b) % 5) as f64 / 4.0)
                    .collect()
            })
            .collect();
        Cast::new(players, compatibility).expect("valid cast")
    }

    #[test]
    fn win_probabilities_normalize_over_completed_runs() {
        let cast = demo_cast(9);
        let cfg = SimConfig::default();
        let stats = MonteCarlo::new(&cast, &cfg, 77).with_runs(200).run();
        assert_eq!(stats.runs_completed(), 200);
        assert_eq!(stats.failure_count(), 0);
        let total: f64 = stats
            .player_stats(&cast)
            .iter()
            .map(|s| s.win_probability)
            .sum();
        assert!((total - 1.0).abs() < 1e-9, "win probabilities sum to {total}");
    }

    #[test]
    fn average_placement_stays_in_range() {
        let cast = demo_cast(9);
        let cfg = SimConfig::default();
        let stats = MonteCarlo::new(&cast, &cfg, 5).with_runs(100).run();
        for player in stats.player_stats(&cast) {
            assert!(
                (1.0..=9.0).contains(&player.average_placement),
                "{} placed {:.2} on average",
                player.name,
                player.average_placement
            );
        }
    }

    #[test]
    fn histograms_cover_every_completed_run() {
        let cast = demo_cast(9);
        let cfg = SimConfig::default();
        let stats = MonteCarlo::new(&cast, &cfg, 12).with_runs(150).run();
        for accum in stats.accums() {
            let total: u64 = accum.placement_hist.iter().sum();
            assert_eq!(total, 150);
        }
    }

    #[test]
    fn parallel_batches_match_sequential_ones() {
        let cast = demo_cast(9);
        let cfg = SimConfig::default();
        let sequential = MonteCarlo::new(&cast, &cfg, 31).with_runs(60).run();
        let parallel = MonteCarlo::new(&cast, &cfg, 31)
            .with_runs(60)
            .with_workers(4)
            .run();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn cancellation_keeps_partial_statistics_consistent() {
        let cast = demo_cast(9);
        let cfg = SimConfig::default();
        let cancel = AtomicBool::new(true);
        let stats = MonteCarlo::new(&cast, &cfg, 8)
            .with_runs(50)
            .run_cancellable(&cancel);
        assert_eq!(stats.runs_completed(), 0);
        assert_eq!(stats.failure_count(), 0);
        assert_eq!(stats.runs_requested(), 50);
        for player in stats.player_stats(&cast) {
            assert!((player.win_probability - 0.0).abs() < f64::EPSILON);
        }
    }

    #[test]
    fn failed_runs_are_reported_not_dropped_silently() {
        // A cast at exactly the final-stage size fails in Season::new.
        let cast = demo_cast(4);
        let cfg = SimConfig::default();
        let stats = MonteCarlo::new(&cast, &cfg, 3).with_runs(10).run();
        assert_eq!(stats.runs_completed(), 0);
        assert_eq!(stats.failure_count(), 10);
        assert_eq!(stats.failures()[0].run_index, 0);
        assert!(stats.failures()[0].message.contains("too small"));
    }
}
