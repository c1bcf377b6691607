//! Player feature profiles and the season cast roster.
//!
//! Profiles are produced upstream by the historical-data pipeline; this
//! module is the strict validation boundary. Every probability-like field
//! must arrive finite and inside [0, 1]; a violation is a load error, never
//! something to clamp or default away.
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

use crate::challenge::ChallengeKind;

/// Index of a player within the season cast.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct PlayerId(pub usize);

impl std::fmt::Display for PlayerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "player#{}", self.0)
    }
}

/// Static per-player feature vector, read-only during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerProfile {
    pub name: String,
    /// Overall individual-challenge win rate.
    pub challenge_win_prob: f64,
    /// Optional per-category skill overrides.
    #[serde(default)]
    pub category_scores: HashMap<ChallengeKind, f64>,
    /// Strategic-game strength.
    pub strategic: f64,
    /// Historical jury-vote tendency.
    pub jury_tendency: f64,
    /// Historical correct-vote rate.
    pub vote_accuracy: f64,
    /// Social power and persuasion.
    pub influence: f64,
    /// Idol-finding aptitude.
    #[serde(default = "PlayerProfile::default_idol_aptitude")]
    pub idol_aptitude: f64,
    /// Whether the player has won a prior season.
    #[serde(default)]
    pub prior_winner: bool,
}

impl PlayerProfile {
    #[must_use]
    pub const fn default_idol_aptitude() -> f64 {
        0.08
    }

    /// Validate every probability-like field.
    ///
    /// # Errors
    ///
    /// Returns `ProfileError::InvalidField` for the first non-finite or
    /// out-of-range value encountered.
    pub fn validate(&self) -> Result<(), ProfileError> {
        let fields = [
            ("challenge_win_prob", self.challenge_win_prob),
            ("strategic", self.strategic),
            ("jury_tendency", self.jury_tendency),
            ("vote_accuracy", self.vote_accuracy),
            ("influence", self.influence),
            ("idol_aptitude", self.idol_aptitude),
        ];
        for (field, value) in fields {
            check_probability(&self.name, field, value)?;
        }
        for kind in crate::challenge::CHALLENGE_ORDER {
            if let Some(&value) = self.category_scores.get(&kind) {
                check_probability(&self.name, "category_scores", value)?;
            }
        }
        Ok(())
    }
}

fn check_probability(player: &str, field: &'static str, value: f64) -> Result<(), ProfileError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(ProfileError::InvalidField {
            player: player.to_string(),
            field,
            value,
        });
    }
    Ok(())
}

/// Errors raised when a profile set fails load-time validation.
#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("cast must contain at least one player")]
    EmptyCast,
    #[error("duplicate player name {name:?}")]
    DuplicateName { name: String },
    #[error("{player}: {field} must be a finite value in [0, 1] (got {value})")]
    InvalidField {
        player: String,
        field: &'static str,
        value: f64,
    },
    #[error("compatibility matrix must be {expected}x{expected} (got {rows} rows)")]
    MatrixShape { expected: usize, rows: usize },
    #[error("compatibility row {row} must have {expected} entries (got {got})")]
    MatrixRow {
        row: usize,
        expected: usize,
        got: usize,
    },
    #[error("compatibility[{row}][{col}] must be a finite value in [0, 1] (got {value})")]
    MatrixEntry { row: usize, col: usize, value: f64 },
    #[error("cast JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// The full season cast: validated profiles plus the pairwise
/// compatibility matrix, indexed by [`PlayerId`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "CastData", into = "CastData")]
pub struct Cast {
    players: Vec<PlayerProfile>,
    compatibility: Vec<Vec<f64>>,
}

/// Raw serialization shape for [`Cast`].
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CastData {
    players: Vec<PlayerProfile>,
    compatibility: Vec<Vec<f64>>,
}

impl From<Cast> for CastData {
    fn from(cast: Cast) -> Self {
        Self {
            players: cast.players,
            compatibility: cast.compatibility,
        }
    }
}

impl TryFrom<CastData> for Cast {
    type Error = ProfileError;

    fn try_from(data: CastData) -> Result<Self, Self::Error> {
        Self::new(data.players, data.compatibility)
    }
}

impl Cast {
    /// Build a cast, validating profiles and the compatibility matrix.
    ///
    /// # Errors
    ///
    /// Returns the first `ProfileError` encountered; nothing is coerced.
    pub fn new(
        players: Vec<PlayerProfile>,
        compatibility: Vec<Vec<f64>>,
    ) -> Result<Self, ProfileError> {
        if players.is_empty() {
            return Err(ProfileError::EmptyCast);
        }
        let mut seen = HashSet::new();
        for profile in &players {
            profile.validate()?;
            if !seen.insert(profile.name.as_str()) {
                return Err(ProfileError::DuplicateName {
                    name: profile.name.clone(),
                });
            }
        }
        let expected = players.len();
        if compatibility.len() != expected {
            return Err(ProfileError::MatrixShape {
                expected,
                rows: compatibility.len(),
            });
        }
        for (row, entries) in compatibility.iter().enumerate() {
            if entries.len() != expected {
                return Err(ProfileError::MatrixRow {
                    row,
                    expected,
                    got: entries.len(),
                });
            }
            for (col, &value) in entries.iter().enumerate() {
                if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                    return Err(ProfileError::MatrixEntry { row, col, value });
                }
            }
        }
        Ok(Self {
            players,
            compatibility,
        })
    }

    /// Load a cast from its JSON document.
    ///
    /// # Errors
    ///
    /// Returns a parse error or the first validation failure.
    pub fn from_json(json: &str) -> Result<Self, ProfileError> {
        let data: CastData = serde_json::from_str(json)?;
        Self::try_from(data)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.players.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Profile for a player id issued by this cast.
    #[must_use]
    pub fn player(&self, id: PlayerId) -> &PlayerProfile {
        &self.players[id.0]
    }

    /// All player ids in roster order.
    pub fn ids(&self) -> impl Iterator<Item = PlayerId> + '_ {
        (0..self.players.len()).map(PlayerId)
    }

    pub fn iter(&self) -> impl Iterator<Item = (PlayerId, &PlayerProfile)> {
        self.players
            .iter()
            .enumerate()
            .map(|(idx, profile)| (PlayerId(idx), profile))
    }

    /// Pairwise compatibility between two players.
    #[must_use]
    pub fn compatibility(&self, a: PlayerId, b: PlayerId) -> f64 {
        self.compatibility[a.0][b.0]
    }

    /// Look up a player id by name.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<PlayerId> {
        self.players
            .iter()
            .position(|p| p.name == name)
            .map(PlayerId)
    }
}
