use std::{collections::BTreeSet, path::Path};

use anyhow::{Error, Result, anyhow};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    builder::NotificationBuilder,
    classifier::Classifier,
    clients::dispatcher::Dispatcher,
    config::Config,
    models::{
        achievement::{Achievement, AchievementDetail, AchievementKind},
        event::{GameContext, GameEvent, HostMessage},
        payload::ImageRef,
    },
    utils::is_ignored_world,
};

/// What happened to one host event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    NoMatch,
    IgnoredWorld,
    KindDisabled(AchievementKind),
    BelowThreshold(AchievementKind),
    Enqueued(Vec<Uuid>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub level_interval: u32,
    pub kill_count_interval: u32,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            level_interval: 1,
            kill_count_interval: 1,
        }
    }
}

impl Thresholds {
    /// Level 99 always passes; otherwise the level must be a multiple of the
    /// interval.
    pub fn level_passes(&self, level: u32) -> bool {
        self.level_interval <= 1 || level >= 99 || level % self.level_interval == 0
    }

    /// The first kill always passes.
    pub fn kill_count_passes(&self, count: u32) -> bool {
        self.kill_count_interval <= 1 || count == 1 || count % self.kill_count_interval == 0
    }

    fn passes(&self, achievement: &Achievement) -> bool {
        match &achievement.detail {
            AchievementDetail::LevelUp { level, .. } => self.level_passes(*level),
            AchievementDetail::KillCount { count, .. } => self.kill_count_passes(*count),
            _ => true,
        }
    }
}

/// Host event in, delivery tasks out.
pub struct Notifier {
    classifier: Classifier,
    builder: NotificationBuilder,
    enabled_kinds: BTreeSet<AchievementKind>,
    thresholds: Thresholds,
    dispatcher: Dispatcher,
}

impl Notifier {
    pub fn new(
        classifier: Classifier,
        builder: NotificationBuilder,
        enabled_kinds: BTreeSet<AchievementKind>,
        thresholds: Thresholds,
        dispatcher: Dispatcher,
    ) -> Result<Self, Error> {
        if let Some(kind) = enabled_kinds
            .iter()
            .find(|kind| builder.templates().get(**kind).is_none())
        {
            return Err(anyhow!("Achievement kind {} is enabled but has no template", kind));
        }

        info!(
            enabled_kinds = enabled_kinds.len(),
            level_interval = thresholds.level_interval,
            kill_count_interval = thresholds.kill_count_interval,
            "Notifier ready"
        );

        Ok(Self {
            classifier,
            builder,
            enabled_kinds,
            thresholds,
            dispatcher,
        })
    }

    pub fn from_config(config: &Config, dispatcher: Dispatcher) -> Result<Self, Error> {
        Self::new(
            Classifier::compile()?,
            NotificationBuilder::default(),
            config.enabled_kinds()?,
            Thresholds {
                level_interval: config.level_interval,
                kill_count_interval: config.kill_count_interval,
            },
            dispatcher,
        )
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Parses one JSON line from the host and runs it through the pipeline.
    pub async fn process_message(&self, payload: &str) -> Result<Outcome, Error> {
        let message = serde_json::from_str::<HostMessage>(payload)
            .map_err(|e| anyhow!("Invalid host message: {}", e))?;

        let image = match (&message.screenshot_path, &message.image_url) {
            (Some(path), _) => Some(read_screenshot(path).await?),
            (None, Some(url)) => Some(ImageRef::Url(url.clone())),
            (None, None) => None,
        };

        self.handle_event(&message.event, &message.context, image)
    }

    pub fn handle_event(
        &self,
        event: &GameEvent,
        context: &GameContext,
        image: Option<ImageRef>,
    ) -> Result<Outcome, Error> {
        let Some(achievement) = self.classifier.classify(event, context) else {
            return Ok(Outcome::NoMatch);
        };

        let kind = achievement.kind();

        if is_ignored_world(&context.world) {
            debug!(kind = %kind, player = %context.player_name, "Ignored world, suppressing");
            return Ok(Outcome::IgnoredWorld);
        }

        if !self.enabled_kinds.contains(&kind) {
            debug!(kind = %kind, "Achievement kind disabled, skipping");
            return Ok(Outcome::KindDisabled(kind));
        }

        if !self.thresholds.passes(&achievement) {
            debug!(kind = %kind, "Below notification threshold, skipping");
            return Ok(Outcome::BelowThreshold(kind));
        }

        let payload = self
            .builder
            .build(&achievement, &context.player_name, image)?;
        let task_ids = self.dispatcher.enqueue(payload)?;

        info!(
            kind = %kind,
            player = %context.player_name,
            tasks = task_ids.len(),
            "Achievement notification queued"
        );

        Ok(Outcome::Enqueued(task_ids))
    }
}

async fn read_screenshot(path: &Path) -> Result<ImageRef, Error> {
    let bytes = tokio::fs::read(path).await.map_err(|e| {
        warn!(path = %path.display(), error = %e, "Failed to read screenshot");
        anyhow!("Failed to read screenshot {}: {}", path.display(), e)
    })?;

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "screenshot.png".to_string());

    Ok(ImageRef::Attachment { file_name, bytes })
}
