//! Mutable per-season state owned by the orchestrator.
use serde::{Deserialize, Serialize};

use crate::profile::PlayerId;

/// Identifier for a starting (or swapped) tribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TribeId(pub u8);

impl std::fmt::Display for TribeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tribe-{}", self.0)
    }
}

/// Season phase state machine.
///
/// `PreMerge -> Merge -> FinalStage -> Ftc -> Terminal`, transitions driven
/// by the live player count against [`crate::config::SeasonFormat`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    PreMerge,
    Merge,
    FinalStage,
    Ftc,
    Terminal,
}

impl Phase {
    /// Whether eliminations in this phase seat the booted player on the jury.
    #[must_use]
    pub const fn seats_jury(self) -> bool {
        matches!(self, Self::Merge | Self::FinalStage | Self::Ftc)
    }
}

/// Mutable state for one player, created at season start.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerState {
    pub alive: bool,
    pub tribe: TribeId,
    /// Hidden idols currently held.
    pub idols: u8,
    /// Individual immunity wins this season.
    pub challenge_wins: u16,
    /// Ballots that landed on the eliminated player.
    pub correct_votes: u16,
    /// Ballots cast at tribal councils.
    pub ballots_cast: u16,
    /// Final placement, 1 = winner; 0 until assigned.
    pub placement: u16,
    pub reached_merge: bool,
}

impl PlayerState {
    #[must_use]
    pub const fn new(tribe: TribeId) -> Self {
        Self {
            alive: true,
            tribe,
            idols: 0,
            challenge_wins: 0,
            correct_votes: 0,
            ballots_cast: 0,
            placement: 0,
            reached_merge: false,
        }
    }

    /// Fraction of this player's ballots that hit the actual boot.
    #[must_use]
    pub fn correct_vote_rate(&self) -> f64 {
        if self.ballots_cast == 0 {
            return 0.0;
        }
        f64::from(self.correct_votes) / f64::from(self.ballots_cast)
    }
}

/// Marker for players eliminated in order; index 0 is the first boot.
pub type EliminationOrder = Vec<PlayerId>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jury_seating_tracks_phase() {
        assert!(!Phase::PreMerge.seats_jury());
        assert!(Phase::Merge.seats_jury());
        assert!(Phase::FinalStage.seats_jury());
        assert!(!Phase::Terminal.seats_jury());
    }

    #[test]
    fn correct_vote_rate_guards_zero_ballots() {
        let mut state = PlayerState::new(TribeId(0));
        assert!((state.correct_vote_rate() - 0.0).abs() < f64::EPSILON);
        state.ballots_cast = 4;
        state.correct_votes = 3;
        assert!((state.correct_vote_rate() - 0.75).abs() < f64::EPSILON);
    }
}
