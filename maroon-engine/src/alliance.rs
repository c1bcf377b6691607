//! Alliance membership and compatibility-driven formation.
//!
//! Alliances are rebuilt at tribe-defining events (initial deal, swap,
//! merge) and only shrink between rebuilds, as eliminated players drop out.
use rand::Rng;
use smallvec::SmallVec;

use crate::profile::{Cast, PlayerId};

/// Inline membership set; alliances rarely exceed six players.
pub type MemberSet = SmallVec<[PlayerId; 6]>;

/// A named voting bloc of currently-alive players.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alliance {
    pub members: MemberSet,
}

impl Alliance {
    #[must_use]
    pub fn contains(&self, player: PlayerId) -> bool {
        self.members.contains(&player)
    }
}

/// All alliances currently alive in the season.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllianceBook {
    alliances: Vec<Alliance>,
}

impl AllianceBook {
    /// Build a book from explicit alliances.
    #[must_use]
    pub const fn from_alliances(alliances: Vec<Alliance>) -> Self {
        Self { alliances }
    }

    /// Rebuild alliances from scratch, clustering each group (tribe, or the
    /// whole merged cast) independently.
    #[must_use]
    pub fn rebuild(cast: &Cast, groups: &[Vec<PlayerId>], rng: &mut impl Rng) -> Self {
        let mut alliances = Vec::new();
        for group in groups {
            cluster_group(cast, group, rng, &mut alliances);
        }
        Self { alliances }
    }

    /// Whether two players currently share any alliance.
    #[must_use]
    pub fn shared(&self, a: PlayerId, b: PlayerId) -> bool {
        self.alliances
            .iter()
            .any(|alliance| alliance.contains(a) && alliance.contains(b))
    }

    /// Remove an eliminated player; alliances reduced below two members
    /// dissolve.
    pub fn drop_player(&mut self, player: PlayerId) {
        for alliance in &mut self.alliances {
            alliance.members.retain(|&mut m| m != player);
        }
        self.alliances.retain(|alliance| alliance.members.len() >= 2);
    }

    #[must_use]
    pub fn alliances(&self) -> &[Alliance] {
        &self.alliances
    }
}

/// Greedy clustering: walk the group in roster order, seed an alliance with
/// each unassigned player, then pull in their most compatible unassigned
/// partners. Partner count is drawn per alliance so bloc sizes vary.
fn cluster_group(cast: &Cast, group: &[PlayerId], rng: &mut impl Rng, out: &mut Vec<Alliance>) {
    let mut assigned: SmallVec<[PlayerId; 8]> = SmallVec::new();
    for &seed in group {
        if assigned.contains(&seed) {
            continue;
        }
        let mut members = MemberSet::new();
        members.push(seed);
        assigned.push(seed);

        let mut partners: Vec<(PlayerId, f64)> = group
            .iter()
            .filter(|&&other| other != seed && !assigned.contains(&other))
            .map(|&other| (other, cast.compatibility(seed, other)))
            .collect();
        partners.sort_by(|a, b| b.1.total_cmp(&a.1));

        let take = rng.gen_range(2..=5).min(partners.len());
        for &(partner, _) in partners.iter().take(take) {
            members.push(partner);
            assigned.push(partner);
        }
        out.push(Alliance { members });
    }
}
