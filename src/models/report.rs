use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{achievement::AchievementKind, status::DeliveryState};

/// Terminal outcome of one payload against one endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryReport {
    pub task_id: Uuid,
    pub endpoint: String,
    pub kind: AchievementKind,
    pub player_name: String,
    pub status: DeliveryState,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub finished_at: DateTime<Utc>,
}

impl DeliveryReport {
    pub fn new(
        task_id: Uuid,
        endpoint: String,
        kind: AchievementKind,
        player_name: String,
        status: DeliveryState,
        attempts: u32,
    ) -> Self {
        Self {
            task_id,
            endpoint,
            kind,
            player_name,
            status,
            attempts,
            last_error: None,
            finished_at: Utc::now(),
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.last_error = Some(error.into());
        self
    }

    /// Retries performed after the first attempt.
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}
