use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use achievement_notifier::{
    builder::NotificationBuilder,
    clients::dispatcher::DispatcherConfig,
    models::{
        achievement::{Achievement, AchievementDetail},
        endpoint::RateLimitConfig,
        payload::NotificationPayload,
        report::DeliveryReport,
        retry::RetryConfig,
    },
};
use anyhow::{Result, anyhow};
use chrono::Utc;
use tokio::{sync::mpsc::UnboundedReceiver, time::Instant};
use wiremock::{Request, Respond, ResponseTemplate};

pub const PLAYER: &str = "dank";

pub fn fast_dispatcher_config() -> DispatcherConfig {
    DispatcherConfig {
        retry: RetryConfig {
            max_retries: 5,
            initial_delay_ms: 50,
            max_delay_ms: 1000,
            backoff_multiplier: 2,
            jitter: false,
            max_retry_after_ms: 60_000,
        },
        request_timeout: Duration::from_secs(5),
        default_rate_limit: RateLimitConfig {
            capacity: 100,
            window_ms: 1000,
        },
        worker_concurrency: 4,
        shutdown_grace: Duration::from_secs(2),
    }
}

pub fn slayer_payload(count: u32, task: &str) -> Result<NotificationPayload> {
    let achievement = Achievement::new(
        PLAYER,
        Utc::now(),
        AchievementDetail::SlayerTask {
            kill_count: count,
            task_name: task.to_string(),
        },
    );

    Ok(NotificationBuilder::default().build(&achievement, PLAYER, None)?)
}

/// Waits for `count` reports or fails after `timeout`.
pub async fn collect_reports(
    reports: &mut UnboundedReceiver<DeliveryReport>,
    count: usize,
    timeout: Duration,
) -> Result<Vec<DeliveryReport>> {
    let mut collected = Vec::with_capacity(count);

    tokio::time::timeout(timeout, async {
        while collected.len() < count {
            match reports.recv().await {
                Some(report) => collected.push(report),
                None => break,
            }
        }
    })
    .await
    .map_err(|_| anyhow!("Timed out with {} of {} reports", collected.len(), count))?;

    Ok(collected)
}

/// Replies with the given responses in order, repeating the last one, and
/// records when each request arrived.
#[derive(Clone)]
pub struct SequenceResponder {
    responses: Arc<Vec<ResponseTemplate>>,
    arrivals: Arc<Mutex<Vec<Instant>>>,
}

impl SequenceResponder {
    pub fn new(responses: Vec<ResponseTemplate>) -> Self {
        Self {
            responses: Arc::new(responses),
            arrivals: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn arrivals(&self) -> Vec<Instant> {
        self.arrivals.lock().unwrap().clone()
    }
}

impl Respond for SequenceResponder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        let mut arrivals = self.arrivals.lock().unwrap();
        let index = arrivals.len().min(self.responses.len() - 1);
        arrivals.push(Instant::now());
        self.responses[index].clone()
    }
}
