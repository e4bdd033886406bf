use std::collections::HashMap;

use chrono::Utc;
use tracing::{debug, warn};

use crate::{
    clients::dispatcher::{Dispatcher, EndpointSnapshot},
    models::health::{EndpointHealth, HealthCheckResponse, HealthStatus},
};

/// Consecutive permanent failures before an endpoint is reported unhealthy.
pub const UNHEALTHY_FAILURE_THRESHOLD: u32 = 3;

pub struct HealthChecker {
    dispatcher: Dispatcher,
}

impl HealthChecker {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    pub fn check_all(&self) -> HealthCheckResponse {
        let checks: HashMap<String, EndpointHealth> = self
            .dispatcher
            .snapshot()
            .into_iter()
            .map(|snapshot| (snapshot.name.clone(), self.check_endpoint(snapshot)))
            .collect();

        let overall_status = self.determine_overall_status(&checks);

        HealthCheckResponse {
            status: overall_status,
            timestamp: Utc::now(),
            checks,
        }
    }

    fn check_endpoint(&self, snapshot: EndpointSnapshot) -> EndpointHealth {
        let failures = snapshot.counters.consecutive_failures;

        debug!(
            endpoint = %snapshot.name,
            pending = snapshot.counters.pending,
            consecutive_failures = failures,
            "Endpoint health checked"
        );

        match failures {
            0 => EndpointHealth::healthy(snapshot.counters),
            n if n < UNHEALTHY_FAILURE_THRESHOLD => {
                EndpointHealth::degraded(snapshot.counters, snapshot.last_error)
            }
            _ => {
                warn!(
                    endpoint = %snapshot.name,
                    consecutive_failures = failures,
                    "Endpoint is failing repeatedly"
                );
                EndpointHealth::unhealthy(snapshot.counters, snapshot.last_error)
            }
        }
    }

    fn determine_overall_status(&self, checks: &HashMap<String, EndpointHealth>) -> HealthStatus {
        if !self.dispatcher.is_accepting() {
            return HealthStatus::Unhealthy;
        }

        let all_unhealthy = !checks.is_empty()
            && checks
                .values()
                .all(|health| health.status == HealthStatus::Unhealthy);

        let has_problem = checks
            .values()
            .any(|health| health.status != HealthStatus::Healthy);

        if all_unhealthy {
            HealthStatus::Unhealthy
        } else if has_problem {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}
