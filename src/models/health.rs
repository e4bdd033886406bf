use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResponse {
    pub status: HealthStatus,
    pub timestamp: DateTime<Utc>,
    pub checks: HashMap<String, EndpointHealth>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointCounters {
    pub pending: u64,
    pub delivered: u64,
    pub failed: u64,
    pub cancelled: u64,
    pub consecutive_failures: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointHealth {
    pub status: HealthStatus,

    #[serde(flatten)]
    pub counters: EndpointCounters,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl EndpointHealth {
    pub fn healthy(counters: EndpointCounters) -> Self {
        Self {
            status: HealthStatus::Healthy,
            counters,
            last_error: None,
        }
    }

    pub fn degraded(counters: EndpointCounters, last_error: Option<String>) -> Self {
        Self {
            status: HealthStatus::Degraded,
            counters,
            last_error,
        }
    }

    pub fn unhealthy(counters: EndpointCounters, last_error: Option<String>) -> Self {
        Self {
            status: HealthStatus::Unhealthy,
            counters,
            last_error,
        }
    }
}
