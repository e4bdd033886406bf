use std::collections::HashMap;

use crate::models::achievement::AchievementKind;

/// Message templates per achievement kind. Placeholders look like
/// `%USERNAME%` and are substituted by the builder.
#[derive(Debug, Clone)]
pub struct Templates {
    templates: HashMap<AchievementKind, String>,
}

impl Templates {
    pub fn empty() -> Self {
        Self {
            templates: HashMap::new(),
        }
    }

    pub fn get(&self, kind: AchievementKind) -> Option<&str> {
        self.templates.get(&kind).map(String::as_str)
    }

    pub fn with_template(mut self, kind: AchievementKind, template: impl Into<String>) -> Self {
        self.templates.insert(kind, template.into());
        self
    }

    pub fn without(mut self, kind: AchievementKind) -> Self {
        self.templates.remove(&kind);
        self
    }
}

impl Default for Templates {
    fn default() -> Self {
        Self::empty()
            .with_template(
                AchievementKind::Slayer,
                "%USERNAME% has completed a slayer task: %COUNT% %TASK%",
            )
            .with_template(
                AchievementKind::Collection,
                "%USERNAME% has added %ITEM% to their collection",
            )
            .with_template(
                AchievementKind::Pet,
                "%USERNAME% has a funny feeling they are being followed",
            )
            .with_template(
                AchievementKind::Loot,
                "%USERNAME% has looted %LOOT% from %SOURCE%",
            )
            .with_template(
                AchievementKind::Level,
                "%USERNAME% has levelled %SKILL% to %LEVEL%",
            )
            .with_template(AchievementKind::Death, "%USERNAME% has died...")
            .with_template(
                AchievementKind::KillCount,
                "%USERNAME% has defeated %BOSS% with a completion count of %COUNT%",
            )
            .with_template(
                AchievementKind::Clue,
                "%USERNAME% has completed a %TIER% clue, they have completed %COUNT%",
            )
            .with_template(
                AchievementKind::CombatAchievement,
                "%USERNAME% has completed %TIER% combat task: %TASK%",
            )
    }
}
