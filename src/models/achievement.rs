use std::{
    fmt::{Display, Formatter, Result as FmtResult},
    str::FromStr,
};

use anyhow::{Error, anyhow};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AchievementKind {
    Slayer,
    Collection,
    Pet,
    Loot,
    Level,
    Death,
    KillCount,
    Clue,
    CombatAchievement,
}

impl AchievementKind {
    pub const ALL: [AchievementKind; 9] = [
        AchievementKind::Slayer,
        AchievementKind::Collection,
        AchievementKind::Pet,
        AchievementKind::Loot,
        AchievementKind::Level,
        AchievementKind::Death,
        AchievementKind::KillCount,
        AchievementKind::Clue,
        AchievementKind::CombatAchievement,
    ];

    pub fn title(&self) -> &'static str {
        match self {
            AchievementKind::Slayer => "Slayer Task",
            AchievementKind::Collection => "Collection Log",
            AchievementKind::Pet => "Pet Obtained",
            AchievementKind::Loot => "Loot Drop",
            AchievementKind::Level => "Level Up",
            AchievementKind::Death => "Player Death",
            AchievementKind::KillCount => "Completion Count",
            AchievementKind::Clue => "Clue Scroll",
            AchievementKind::CombatAchievement => "Combat Achievement",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AchievementKind::Slayer => "SLAYER",
            AchievementKind::Collection => "COLLECTION",
            AchievementKind::Pet => "PET",
            AchievementKind::Loot => "LOOT",
            AchievementKind::Level => "LEVEL",
            AchievementKind::Death => "DEATH",
            AchievementKind::KillCount => "KILL_COUNT",
            AchievementKind::Clue => "CLUE",
            AchievementKind::CombatAchievement => "COMBAT_ACHIEVEMENT",
        }
    }
}

impl Display for AchievementKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AchievementKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase();

        AchievementKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| anyhow!("Unknown achievement kind '{}'", s.trim()))
    }
}

/// One item observation. Quantities are signed so that reduced stacks never
/// overflow on large coin drops.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub id: i32,
    pub quantity: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<String>,
}

impl ItemStack {
    pub fn new(id: i32, quantity: i64) -> Self {
        Self {
            id,
            quantity,
            metadata: None,
        }
    }

    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = Some(metadata.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AchievementDetail {
    SlayerTask { kill_count: u32, task_name: String },
    CollectionLog { item_name: String },
    Pet { duplicate: bool, backpack: bool },
    Drop {
        items: Vec<ItemStack>,
        source: Option<String>,
    },
    LevelUp { skill: String, level: u32 },
    Death { killer: Option<String> },
    KillCount { boss: String, count: u32 },
    ClueScroll { tier: String, count: u32 },
    CombatTask { tier: String, task: String },
}

impl AchievementDetail {
    pub fn kind(&self) -> AchievementKind {
        match self {
            AchievementDetail::SlayerTask { .. } => AchievementKind::Slayer,
            AchievementDetail::CollectionLog { .. } => AchievementKind::Collection,
            AchievementDetail::Pet { .. } => AchievementKind::Pet,
            AchievementDetail::Drop { .. } => AchievementKind::Loot,
            AchievementDetail::LevelUp { .. } => AchievementKind::Level,
            AchievementDetail::Death { .. } => AchievementKind::Death,
            AchievementDetail::KillCount { .. } => AchievementKind::KillCount,
            AchievementDetail::ClueScroll { .. } => AchievementKind::Clue,
            AchievementDetail::CombatTask { .. } => AchievementKind::CombatAchievement,
        }
    }
}

/// A recognized in-game event worth notifying about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Achievement {
    pub player_name: String,
    pub timestamp: DateTime<Utc>,
    pub detail: AchievementDetail,
}

impl Achievement {
    pub fn new(
        player_name: impl Into<String>,
        timestamp: DateTime<Utc>,
        detail: AchievementDetail,
    ) -> Self {
        Self {
            player_name: player_name.into(),
            timestamp,
            detail,
        }
    }

    pub fn kind(&self) -> AchievementKind {
        self.detail.kind()
    }
}
