//! Maroon Season Engine
//!
//! Platform-agnostic core for the Maroon tribal-survival simulator. The
//! crate plays out complete elimination seasons for a fixed cast
//! (challenges, tribal councils, alliances, hidden idols, a jury) and
//! aggregates outcome statistics across many seeded, independent runs.
//! Data loading, reporting and any front-end live elsewhere; callers hand
//! in validated profiles and a configuration, and read structured results
//! back out.

pub mod advantage;
pub mod aggregate;
pub mod alliance;
pub mod challenge;
pub mod config;
pub mod numbers;
pub mod profile;
pub mod result;
pub mod rng;
pub mod season;
pub mod state;
pub mod vote;

// Re-export commonly used types
pub use advantage::{IdolFinds, MAX_FINDS_PER_EPISODE, search_idols, should_play_idol};
pub use aggregate::{AggregateStats, MonteCarlo, PlayerAccum, PlayerStats, RunFailure};
pub use alliance::{Alliance, AllianceBook, MemberSet};
pub use challenge::{
    CHALLENGE_ORDER, ChallengeKind, RewardWinners, category_skill, resolve_fire_duel,
    resolve_individual, resolve_reward, resolve_tribal, sample_category,
};
pub use config::{ConfigError, DISTRIBUTION_TOLERANCE, Preset, SeasonFormat, SimConfig};
pub use profile::{Cast, PlayerId, PlayerProfile, ProfileError};
pub use result::{ChallengeVictor, EpisodeRecord, FireMaking, SeasonResult};
pub use rng::{CountingRng, RngBundle, derive_run_seed};
pub use season::{Season, SeasonError};
pub use state::{Phase, PlayerState, TribeId};
pub use vote::{CouncilContext, CouncilOutcome, WINNER_PENALTY, composite_threat, resolve_council, social_component};
