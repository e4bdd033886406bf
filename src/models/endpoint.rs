use std::{collections::BTreeSet, time::Duration};

use serde::{Deserialize, Serialize};

use crate::models::achievement::AchievementKind;

/// Admission budget of one endpoint: `capacity` sends per `window_ms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub capacity: u32,
    pub window_ms: u64,
}

impl RateLimitConfig {
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    pub fn refill_per_second(&self) -> f64 {
        self.capacity as f64 / self.window().as_secs_f64()
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: 5,
            window_ms: 2000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Endpoint {
    pub name: String,
    pub url: String,

    /// Kinds this endpoint receives; `None` means every kind.
    #[serde(default)]
    pub kinds: Option<BTreeSet<AchievementKind>>,

    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
}

impl Endpoint {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            kinds: None,
            rate_limit: None,
        }
    }

    pub fn with_kinds(mut self, kinds: impl IntoIterator<Item = AchievementKind>) -> Self {
        self.kinds = Some(kinds.into_iter().collect());
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = Some(rate_limit);
        self
    }

    pub fn accepts(&self, kind: AchievementKind) -> bool {
        self.kinds
            .as_ref()
            .is_none_or(|kinds| kinds.contains(&kind))
    }
}
