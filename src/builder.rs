use tracing::{debug, warn};

use crate::{
    error::PayloadError,
    models::{
        achievement::{Achievement, AchievementDetail, ItemStack},
        payload::{Embed, Field, Footer, ImageRef, NotificationPayload, UrlEmbed},
        template::Templates,
    },
};

/// Turns achievements into delivery-ready payloads. Pure: no I/O.
#[derive(Debug, Clone, Default)]
pub struct NotificationBuilder {
    templates: Templates,
}

impl NotificationBuilder {
    pub fn new(templates: Templates) -> Self {
        Self { templates }
    }

    pub fn templates(&self) -> &Templates {
        &self.templates
    }

    pub fn build(
        &self,
        achievement: &Achievement,
        player_name: &str,
        image: Option<ImageRef>,
    ) -> Result<NotificationPayload, PayloadError> {
        let kind = achievement.kind();
        let template = self
            .templates
            .get(kind)
            .ok_or(PayloadError::UnsupportedKind(kind))?;

        let (mut variables, fields) = Self::describe(&achievement.detail);
        variables.push(("USERNAME", player_name.to_string()));

        let text = Self::replace_variables(template, &variables);

        debug!(
            kind = %kind,
            player = player_name,
            field_count = fields.len(),
            "Notification payload built"
        );

        let embed = Embed {
            title: Some(kind.title().to_string()),
            description: Some(text.clone()),
            fields,
            image: match &image {
                Some(ImageRef::Url(url)) => Some(UrlEmbed { url: url.clone() }),
                _ => None,
            },
            footer: Some(Footer {
                text: player_name.to_string(),
            }),
            timestamp: Some(achievement.timestamp),
        };

        Ok(NotificationPayload {
            kind,
            player_name: player_name.to_string(),
            text,
            embeds: vec![embed],
            image,
        })
    }

    /// Template variables and embed fields for one achievement.
    fn describe(detail: &AchievementDetail) -> (Vec<(&'static str, String)>, Vec<Field>) {
        match detail {
            AchievementDetail::SlayerTask {
                kill_count,
                task_name,
            } => (
                vec![
                    ("COUNT", kill_count.to_string()),
                    ("TASK", task_name.clone()),
                ],
                vec![
                    Field::new("Task", task_name.clone()),
                    Field::new("Kill Count", kill_count.to_string()),
                ],
            ),
            AchievementDetail::CollectionLog { item_name } => (
                vec![("ITEM", item_name.clone())],
                vec![Field::new("Item", item_name.clone())],
            ),
            AchievementDetail::Pet {
                duplicate,
                backpack,
            } => {
                let mut fields = Vec::new();
                if *duplicate {
                    fields.push(Field::new("Duplicate", "Yes"));
                }
                if *backpack {
                    fields.push(Field::new("Location", "Backpack"));
                }
                (Vec::new(), fields)
            }
            AchievementDetail::Drop { items, source } => {
                let source = source
                    .clone()
                    .unwrap_or_else(|| "an unknown source".to_string());
                let loot = items
                    .iter()
                    .map(Self::describe_item)
                    .collect::<Vec<_>>()
                    .join(", ");
                let fields = items
                    .iter()
                    .map(|item| Field::new(Self::item_name(item), item.quantity.to_string()))
                    .collect();

                (vec![("LOOT", loot), ("SOURCE", source)], fields)
            }
            AchievementDetail::LevelUp { skill, level } => (
                vec![("SKILL", skill.clone()), ("LEVEL", level.to_string())],
                vec![
                    Field::new("Skill", skill.clone()),
                    Field::new("Level", level.to_string()),
                ],
            ),
            AchievementDetail::Death { killer } => match killer {
                Some(killer) => (
                    vec![("KILLER", killer.clone())],
                    vec![Field::new("Killer", killer.clone())],
                ),
                None => (Vec::new(), Vec::new()),
            },
            AchievementDetail::KillCount { boss, count } => (
                vec![("BOSS", boss.clone()), ("COUNT", count.to_string())],
                vec![
                    Field::new("Boss", boss.clone()),
                    Field::new("Completion Count", count.to_string()),
                ],
            ),
            AchievementDetail::ClueScroll { tier, count } => (
                vec![("TIER", tier.clone()), ("COUNT", count.to_string())],
                vec![
                    Field::new("Tier", tier.clone()),
                    Field::new("Completed", count.to_string()),
                ],
            ),
            AchievementDetail::CombatTask { tier, task } => (
                vec![("TIER", tier.clone()), ("TASK", task.clone())],
                vec![
                    Field::new("Tier", tier.clone()),
                    Field::new("Task", task.clone()),
                ],
            ),
        }
    }

    fn item_name(item: &ItemStack) -> String {
        item.metadata
            .clone()
            .unwrap_or_else(|| format!("Item #{}", item.id))
    }

    fn describe_item(item: &ItemStack) -> String {
        format!("{} x {}", item.quantity, Self::item_name(item))
    }

    fn replace_variables(template: &str, variables: &[(&str, String)]) -> String {
        let mut result = template.to_string();

        for (key, value) in variables {
            let placeholder = format!("%{}%", key);
            result = result.replace(&placeholder, value);
        }

        if let Some(start) = result.find('%') {
            let rest = &result[start + 1..];
            if let Some(end) = rest.find('%') {
                let candidate = &rest[..end];
                if !candidate.is_empty()
                    && candidate
                        .chars()
                        .all(|c| c.is_ascii_uppercase() || c == '_')
                {
                    warn!(
                        missing_variable = %candidate,
                        "Template contains unreplaced placeholder"
                    );
                }
            }
        }

        result
    }
}
