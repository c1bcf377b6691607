//! Season outcome records: the episode ledger and the final result.
//!
//! These shapes are the engine's export schema; downstream reporting reads
//! them as serialized documents, so field meaning stays stable.
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::challenge::ChallengeKind;
use crate::profile::PlayerId;
use crate::state::{Phase, TribeId};

/// Who took immunity in an episode's challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeVictor {
    Tribe(TribeId),
    Player(PlayerId),
}

/// Outcome of a final-stage fire-making duel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FireMaking {
    pub winner: PlayerId,
    pub loser: PlayerId,
    /// The player the immunity holder spared from the duel.
    pub spared: PlayerId,
}

/// Immutable ledger entry for one simulated episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRecord {
    /// One-based episode number.
    pub episode: u16,
    /// Day the episode opens on.
    pub day: u16,
    pub phase: Phase,
    pub category: ChallengeKind,
    pub victor: ChallengeVictor,
    /// Players safe from tonight's vote.
    pub immune: Vec<PlayerId>,
    /// Final tally the boot was read from; empty for fire-making episodes.
    pub tally: Vec<(PlayerId, u32)>,
    pub idol_played: Option<PlayerId>,
    pub revote: bool,
    pub eliminated: PlayerId,
    pub fire_making: Option<FireMaking>,
}

/// Result of one complete season run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeasonResult {
    pub winner: PlayerId,
    /// Finalists in placement order (winner first).
    pub finalists: SmallVec<[PlayerId; 3]>,
    /// Placement per player (1 = winner, cast size = first boot).
    pub placements: Vec<u16>,
    /// Players in boot order; index 0 is the first boot.
    pub elimination_order: Vec<PlayerId>,
    /// Individual immunity wins per player.
    pub challenge_wins: Vec<u16>,
    /// Final-tribal-council votes received per player.
    pub jury_votes: Vec<u8>,
    /// Whether each player was still alive at the merge.
    pub reached_merge: Vec<bool>,
    pub episodes: Vec<EpisodeRecord>,
}

impl SeasonResult {
    /// The first player voted out, if any council has happened.
    #[must_use]
    pub fn first_boot(&self) -> Option<PlayerId> {
        self.elimination_order.first().copied()
    }

    /// Cast size this season was played with.
    #[must_use]
    pub const fn cast_size(&self) -> usize {
        self.placements.len()
    }
}
