use std::sync::Arc;

use anyhow::{Error, Result};
use regex::{Captures, Regex};
use tracing::{debug, info};

use crate::{
    models::{
        achievement::{Achievement, AchievementDetail},
        event::{ChatSource, GameContext, GameEvent},
    },
    utils::{parse_grouped_number, reduce_item_stacks},
};

/// Compiled game message patterns. Built once at startup and shared.
#[derive(Debug)]
pub struct Patterns {
    pub slayer_task: Regex,
    pub collection_log: Regex,
    pub pet: Regex,
    pub kill_count: Regex,
    pub clue_scroll: Regex,
    pub combat_task: Regex,
    combat_task_points: Regex,
    markup_tag: Regex,
}

impl Patterns {
    pub fn compile() -> Result<Self, Error> {
        let patterns = Self {
            slayer_task: Regex::new(
                r"^You have completed your task! You killed (?P<count>[\d,]+) (?P<task>[^.]+)\..*$",
            )?,
            collection_log: Regex::new(r"^New item added to your collection log: (?P<item>.+)$")?,
            pet: Regex::new(
                r"^You (?:have a funny feeling like you|feel something weird sneaking).*$",
            )?,
            kill_count: Regex::new(r"^Your (?P<boss>.+) kill count is: (?P<count>[\d,]+)\b")?,
            clue_scroll: Regex::new(
                r"^You have completed (?P<count>[\d,]+) (?P<tier>\w+) Treasure Trails\.",
            )?,
            combat_task: Regex::new(
                r"^Congratulations, you've completed an? (?P<tier>\w+) combat task: (?P<task>.+)\.",
            )?,
            combat_task_points: Regex::new(r"\s+\(\d+ points?\)$")?,
            markup_tag: Regex::new(r"<[^>]*>")?,
        };

        info!("Game message patterns compiled");

        Ok(patterns)
    }

    fn strip_tags(&self, text: &str) -> String {
        self.markup_tag.replace_all(text, "").trim().to_string()
    }
}

type TextMatcher = fn(&Patterns, &str) -> Option<AchievementDetail>;

/// Priority order of the text matchers; the first match wins.
const TEXT_MATCHERS: [(&str, TextMatcher); 6] = [
    ("slayer_task", match_slayer_task),
    ("collection_log", match_collection_log),
    ("pet", match_pet),
    ("kill_count", match_kill_count),
    ("clue_scroll", match_clue_scroll),
    ("combat_task", match_combat_task),
];

#[derive(Debug, Clone)]
pub struct Classifier {
    patterns: Arc<Patterns>,
}

impl Classifier {
    pub fn new(patterns: Arc<Patterns>) -> Self {
        Self { patterns }
    }

    pub fn compile() -> Result<Self, Error> {
        Ok(Self::new(Arc::new(Patterns::compile()?)))
    }

    pub fn classify(&self, event: &GameEvent, context: &GameContext) -> Option<Achievement> {
        let detail = match event {
            GameEvent::ChatMessage { source, text } => {
                if *source != ChatSource::Game {
                    return None;
                }
                self.classify_detail(text)?
            }
            GameEvent::LootReceived { source, items } => {
                let items = reduce_item_stacks(items.iter().cloned());
                if items.is_empty() {
                    return None;
                }
                AchievementDetail::Drop {
                    items,
                    source: source.clone(),
                }
            }
            GameEvent::LevelChanged {
                skill,
                previous_level,
                level,
            } => {
                if level <= previous_level {
                    return None;
                }
                AchievementDetail::LevelUp {
                    skill: skill.clone(),
                    level: *level,
                }
            }
            GameEvent::PlayerDied { killer } => AchievementDetail::Death {
                killer: killer.clone(),
            },
            GameEvent::WorldChanged => return None,
        };

        Some(Achievement::new(
            context.player_name.clone(),
            context.timestamp,
            detail,
        ))
    }

    /// Classifies one line of game text.
    pub fn classify_text(&self, raw_text: &str, context: &GameContext) -> Option<Achievement> {
        self.classify_detail(raw_text).map(|detail| {
            Achievement::new(context.player_name.clone(), context.timestamp, detail)
        })
    }

    fn classify_detail(&self, raw_text: &str) -> Option<AchievementDetail> {
        let text = self.patterns.strip_tags(raw_text);

        TEXT_MATCHERS.iter().find_map(|(name, matcher)| {
            let detail = matcher(&self.patterns, &text)?;
            debug!(matcher = *name, kind = %detail.kind(), "Game message matched");
            Some(detail)
        })
    }
}

fn group<'t>(captures: &Captures<'t>, name: &str) -> Option<&'t str> {
    captures.name(name).map(|m| m.as_str())
}

fn match_slayer_task(patterns: &Patterns, text: &str) -> Option<AchievementDetail> {
    let captures = patterns.slayer_task.captures(text)?;

    Some(AchievementDetail::SlayerTask {
        kill_count: parse_grouped_number(group(&captures, "count")?)?,
        task_name: group(&captures, "task")?.to_string(),
    })
}

fn match_collection_log(patterns: &Patterns, text: &str) -> Option<AchievementDetail> {
    let captures = patterns.collection_log.captures(text)?;

    Some(AchievementDetail::CollectionLog {
        item_name: group(&captures, "item")?.trim().to_string(),
    })
}

fn match_pet(patterns: &Patterns, text: &str) -> Option<AchievementDetail> {
    if !patterns.pet.is_match(text) {
        return None;
    }

    Some(AchievementDetail::Pet {
        duplicate: text.contains("would have been"),
        backpack: text.contains(" backpack"),
    })
}

fn match_kill_count(patterns: &Patterns, text: &str) -> Option<AchievementDetail> {
    let captures = patterns.kill_count.captures(text)?;

    Some(AchievementDetail::KillCount {
        boss: group(&captures, "boss")?.to_string(),
        count: parse_grouped_number(group(&captures, "count")?)?,
    })
}

fn match_clue_scroll(patterns: &Patterns, text: &str) -> Option<AchievementDetail> {
    let captures = patterns.clue_scroll.captures(text)?;

    Some(AchievementDetail::ClueScroll {
        tier: group(&captures, "tier")?.to_string(),
        count: parse_grouped_number(group(&captures, "count")?)?,
    })
}

fn match_combat_task(patterns: &Patterns, text: &str) -> Option<AchievementDetail> {
    let captures = patterns.combat_task.captures(text)?;
    let task = group(&captures, "task")?;

    Some(AchievementDetail::CombatTask {
        tier: group(&captures, "tier")?.to_string(),
        task: patterns.combat_task_points.replace(task, "").to_string(),
    })
}
