use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorldType {
    Members,
    Pvp,
    SkillTotal,
    HighRisk,
    LastManStanding,
    Deadman,
    BetaWorld,
    PvpArena,
    QuestSpeedrunning,
    FreshStartWorld,
    NosaveMode,
    TournamentWorld,
    Seasonal,
}

/// Snapshot of the flags of the world the player is logged into.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorldAttributes(BTreeSet<WorldType>);

impl WorldAttributes {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn contains(&self, world_type: WorldType) -> bool {
        self.0.contains(&world_type)
    }

    pub fn iter(&self) -> impl Iterator<Item = &WorldType> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn union(&self, other: &WorldAttributes) -> WorldAttributes {
        WorldAttributes(self.0.union(&other.0).copied().collect())
    }
}

impl FromIterator<WorldType> for WorldAttributes {
    fn from_iter<I: IntoIterator<Item = WorldType>>(iter: I) -> Self {
        WorldAttributes(iter.into_iter().collect())
    }
}

impl<const N: usize> From<[WorldType; N]> for WorldAttributes {
    fn from(types: [WorldType; N]) -> Self {
        types.into_iter().collect()
    }
}
