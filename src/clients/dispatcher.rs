use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex, PoisonError, RwLock,
        atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicUsize, Ordering},
    },
    time::Duration,
};

use anyhow::{Error, Result, anyhow};
use tokio::{
    sync::{Notify, Semaphore, mpsc},
    time::Instant,
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
    clients::{rate_limiter::RateLimiter, webhook::WebhookClient},
    error::DeliveryError,
    models::{
        endpoint::{Endpoint, RateLimitConfig},
        health::EndpointCounters,
        payload::NotificationPayload,
        report::DeliveryReport,
        retry::RetryConfig,
        status::DeliveryState,
        validation::{validate_endpoint_name, validate_rate_limit, validate_webhook_url},
    },
};

#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    pub retry: RetryConfig,
    pub request_timeout: Duration,
    pub default_rate_limit: RateLimitConfig,
    pub worker_concurrency: usize,
    pub shutdown_grace: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            retry: RetryConfig::default(),
            request_timeout: Duration::from_secs(10),
            default_rate_limit: RateLimitConfig::default(),
            worker_concurrency: 4,
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

/// One payload bound for one endpoint.
#[derive(Debug, Clone)]
pub struct DeliveryTask {
    pub id: Uuid,
    pub payload: Arc<NotificationPayload>,
    pub endpoint: Arc<Endpoint>,
    pub attempts: u32,
    pub next_eligible_at: Instant,
    pub last_error: Option<DeliveryError>,
}

impl DeliveryTask {
    fn new(payload: Arc<NotificationPayload>, endpoint: Arc<Endpoint>) -> Self {
        Self {
            id: Uuid::new_v4(),
            payload,
            endpoint,
            attempts: 0,
            next_eligible_at: Instant::now(),
            last_error: None,
        }
    }

    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }
}

#[derive(Debug, Default)]
struct EndpointStats {
    pending: AtomicU64,
    delivered: AtomicU64,
    failed: AtomicU64,
    cancelled: AtomicU64,
    consecutive_failures: AtomicU32,
    last_error: Mutex<Option<String>>,
}

impl EndpointStats {
    fn record(&self, status: DeliveryState, error: Option<&DeliveryError>) {
        if !status.is_terminal() {
            warn!(status = %status, "Ignoring non-terminal delivery outcome");
            return;
        }

        self.pending.fetch_sub(1, Ordering::Relaxed);

        match status {
            DeliveryState::Delivered => {
                self.delivered.fetch_add(1, Ordering::Relaxed);
                self.consecutive_failures.store(0, Ordering::Relaxed);
            }
            DeliveryState::Failed => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                self.consecutive_failures.fetch_add(1, Ordering::Relaxed);
            }
            DeliveryState::Cancelled => {
                self.cancelled.fetch_add(1, Ordering::Relaxed);
            }
            DeliveryState::Queued | DeliveryState::Sending | DeliveryState::Retrying => {}
        }

        if let (DeliveryState::Failed, Some(error)) = (status, error) {
            *self.last_error.lock().unwrap_or_else(PoisonError::into_inner) =
                Some(error.to_string());
        }
    }

    fn snapshot(&self) -> (EndpointCounters, Option<String>) {
        let counters = EndpointCounters {
            pending: self.pending.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            consecutive_failures: self.consecutive_failures.load(Ordering::Relaxed),
        };
        let last_error = self
            .last_error
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        (counters, last_error)
    }
}

/// Point-in-time view of one endpoint, used by the health endpoint.
#[derive(Debug, Clone)]
pub struct EndpointSnapshot {
    pub name: String,
    pub counters: EndpointCounters,
    pub last_error: Option<String>,
}

struct Lane {
    endpoint: Arc<Endpoint>,
    sender: mpsc::UnboundedSender<DeliveryTask>,
    limiter: Arc<RateLimiter>,
    stats: Arc<EndpointStats>,
}

struct Shared {
    config: DispatcherConfig,
    client: WebhookClient,
    lanes: RwLock<HashMap<String, Lane>>,
    reports: mpsc::UnboundedSender<DeliveryReport>,
    permits: Arc<Semaphore>,
    accepting: AtomicBool,
    in_flight: AtomicUsize,
    idle: Notify,
    shutdown: CancellationToken,
    tracker: TaskTracker,
}

/// Fans payloads out to endpoints and drives each delivery to a terminal state.
///
/// Every endpoint owns a lane: an unbounded queue drained by one worker, so
/// first attempts for an endpoint go out in enqueue order. HTTP requests across
/// all lanes are bounded by a shared semaphore. Transient failures are re-queued
/// into the lane by a timer once their backoff has elapsed.
#[derive(Clone)]
pub struct Dispatcher {
    shared: Arc<Shared>,
}

impl Dispatcher {
    pub fn start(
        config: DispatcherConfig,
        endpoints: Vec<Endpoint>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<DeliveryReport>), Error> {
        validate_endpoints(&endpoints)?;

        let client = WebhookClient::new(config.request_timeout)?;
        let (reports_tx, reports_rx) = mpsc::unbounded_channel();
        let permits = Arc::new(Semaphore::new(config.worker_concurrency.max(1)));

        let shared = Arc::new(Shared {
            config,
            client,
            lanes: RwLock::new(HashMap::new()),
            reports: reports_tx,
            permits,
            accepting: AtomicBool::new(true),
            in_flight: AtomicUsize::new(0),
            idle: Notify::new(),
            shutdown: CancellationToken::new(),
            tracker: TaskTracker::new(),
        });

        let dispatcher = Self { shared };

        {
            let mut lanes = dispatcher.lanes_mut();
            for endpoint in endpoints {
                let lane = dispatcher.open_lane(endpoint);
                lanes.insert(lane.endpoint.name.clone(), lane);
            }

            info!(
                endpoints = lanes.len(),
                worker_concurrency = dispatcher.shared.config.worker_concurrency,
                "Dispatcher started"
            );
        }

        Ok((dispatcher, reports_rx))
    }

    /// Queues one delivery task per endpoint that accepts the payload's kind.
    /// Never blocks. Returns the ids of the created tasks.
    pub fn enqueue(&self, payload: NotificationPayload) -> Result<Vec<Uuid>, Error> {
        if !self.shared.accepting.load(Ordering::SeqCst) {
            return Err(anyhow!("Dispatcher is shutting down"));
        }

        let payload = Arc::new(payload);
        let lanes = self.lanes();
        let mut task_ids = Vec::new();

        for lane in lanes.values() {
            if !lane.endpoint.accepts(payload.kind) {
                debug!(
                    endpoint = %lane.endpoint.name,
                    kind = %payload.kind,
                    "Endpoint does not accept kind, skipping"
                );
                continue;
            }

            let task = DeliveryTask::new(payload.clone(), lane.endpoint.clone());
            let task_id = task.id;

            self.shared.in_flight.fetch_add(1, Ordering::SeqCst);
            lane.stats.pending.fetch_add(1, Ordering::Relaxed);

            debug!(
                task_id = %task_id,
                endpoint = %lane.endpoint.name,
                kind = %payload.kind,
                status = %DeliveryState::Queued,
                "Delivery task queued"
            );

            if let Err(mpsc::error::SendError(task)) = lane.sender.send(task) {
                self.shared.finish(
                    &lane.stats,
                    task,
                    DeliveryState::Cancelled,
                    Some(DeliveryError::Cancelled),
                );
                continue;
            }

            task_ids.push(task_id);
        }

        if task_ids.is_empty() {
            debug!(kind = %payload.kind, "No endpoint accepted payload");
        }

        Ok(task_ids)
    }

    /// Swaps the endpoint set. Lanes whose name survives keep their queue and
    /// in-flight tasks; removed lanes drain what they already hold.
    pub async fn reload_endpoints(&self, endpoints: Vec<Endpoint>) -> Result<(), Error> {
        validate_endpoints(&endpoints)?;

        let mut reconfigure = Vec::new();
        let (added, kept, removed) = {
            let mut lanes = self.lanes_mut();
            let mut next = HashMap::with_capacity(endpoints.len());
            let (mut added, mut kept) = (0, 0);

            for endpoint in endpoints {
                let name = endpoint.name.clone();
                match lanes.remove(&name) {
                    Some(mut lane) => {
                        if *lane.endpoint != endpoint {
                            let rate_limit = endpoint
                                .rate_limit
                                .unwrap_or(self.shared.config.default_rate_limit);
                            reconfigure.push((lane.limiter.clone(), rate_limit));
                            lane.endpoint = Arc::new(endpoint);
                        }
                        kept += 1;
                        next.insert(name, lane);
                    }
                    None => {
                        added += 1;
                        next.insert(name, self.open_lane(endpoint));
                    }
                }
            }

            let removed = lanes.len();
            for name in lanes.keys() {
                info!(endpoint = %name, "Endpoint removed from configuration");
            }

            *lanes = next;
            (added, kept, removed)
        };

        for (limiter, rate_limit) in reconfigure {
            limiter.reconfigure(rate_limit).await;
        }

        info!(added, kept, removed, "Endpoints reloaded");

        Ok(())
    }

    /// Stops intake, lets outstanding tasks finish within the grace period and
    /// reports whatever is left as cancelled. Returns that count.
    pub async fn shutdown(&self) -> usize {
        self.shared.accepting.store(false, Ordering::SeqCst);

        let grace = self.shared.config.shutdown_grace;
        let outstanding = self.shared.in_flight.load(Ordering::SeqCst);
        info!(
            outstanding,
            grace_ms = grace.as_millis() as u64,
            "Dispatcher shutting down"
        );

        let drained = tokio::time::timeout(grace, self.wait_idle()).await.is_ok();
        let remaining = self.shared.in_flight.load(Ordering::SeqCst);

        if !drained {
            warn!(remaining, "Grace period elapsed, cancelling outstanding deliveries");
        }

        self.shared.shutdown.cancel();
        self.shared.tracker.close();
        self.shared.tracker.wait().await;

        info!("Dispatcher stopped");

        if drained { 0 } else { remaining }
    }

    /// Resolves once every queued or retrying task reached a terminal state.
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.shared.idle.notified();
            if self.shared.in_flight.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }

    pub fn in_flight(&self) -> usize {
        self.shared.in_flight.load(Ordering::SeqCst)
    }

    pub fn is_accepting(&self) -> bool {
        self.shared.accepting.load(Ordering::SeqCst)
    }

    pub fn endpoint_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lanes().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn snapshot(&self) -> Vec<EndpointSnapshot> {
        let mut snapshots: Vec<EndpointSnapshot> = self
            .lanes()
            .iter()
            .map(|(name, lane)| {
                let (counters, last_error) = lane.stats.snapshot();
                EndpointSnapshot {
                    name: name.clone(),
                    counters,
                    last_error,
                }
            })
            .collect();
        snapshots.sort_by(|a, b| a.name.cmp(&b.name));
        snapshots
    }

    fn lanes(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Lane>> {
        self.shared
            .lanes
            .read()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn lanes_mut(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Lane>> {
        self.shared
            .lanes
            .write()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn open_lane(&self, endpoint: Endpoint) -> Lane {
        let (sender, receiver) = mpsc::unbounded_channel();
        let rate_limit = endpoint
            .rate_limit
            .unwrap_or(self.shared.config.default_rate_limit);
        let limiter = Arc::new(RateLimiter::new(rate_limit));
        let stats = Arc::new(EndpointStats::default());
        let endpoint = Arc::new(endpoint);

        debug!(
            endpoint = %endpoint.name,
            capacity = rate_limit.capacity,
            window_ms = rate_limit.window_ms,
            "Opening endpoint lane"
        );

        let worker = LaneWorker {
            shared: self.shared.clone(),
            name: endpoint.name.clone(),
            requeue: sender.downgrade(),
            limiter: limiter.clone(),
            stats: stats.clone(),
        };
        self.shared.tracker.spawn(worker.run(receiver));

        Lane {
            endpoint,
            sender,
            limiter,
            stats,
        }
    }
}

impl Shared {
    fn finish(
        &self,
        stats: &EndpointStats,
        task: DeliveryTask,
        status: DeliveryState,
        error: Option<DeliveryError>,
    ) {
        stats.record(status, error.as_ref());

        let mut report = DeliveryReport::new(
            task.id,
            task.endpoint.name.clone(),
            task.payload.kind,
            task.payload.player_name.clone(),
            status,
            task.attempts,
        );
        if let Some(error) = &error {
            report = report.with_error(error.to_string());
        }

        match status {
            DeliveryState::Delivered => info!(
                task_id = %report.task_id,
                endpoint = %report.endpoint,
                kind = %report.kind,
                attempts = report.attempts,
                "Notification delivered"
            ),
            DeliveryState::Failed => error!(
                task_id = %report.task_id,
                endpoint = %report.endpoint,
                kind = %report.kind,
                attempts = report.attempts,
                error = report.last_error.as_deref().unwrap_or_default(),
                "Notification delivery failed"
            ),
            _ => warn!(
                task_id = %report.task_id,
                endpoint = %report.endpoint,
                kind = %report.kind,
                attempts = report.attempts,
                "Notification delivery cancelled"
            ),
        }

        if self.reports.send(report).is_err() {
            debug!("Report receiver dropped");
        }

        if self.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.idle.notify_waiters();
        }
    }
}

struct LaneWorker {
    shared: Arc<Shared>,
    name: String,
    requeue: mpsc::WeakUnboundedSender<DeliveryTask>,
    limiter: Arc<RateLimiter>,
    stats: Arc<EndpointStats>,
}

impl LaneWorker {
    async fn run(self, mut receiver: mpsc::UnboundedReceiver<DeliveryTask>) {
        debug!(endpoint = %self.name, "Lane worker started");

        loop {
            let task = tokio::select! {
                biased;
                _ = self.shared.shutdown.cancelled() => break,
                task = receiver.recv() => task,
            };

            match task {
                Some(task) => self.process(task).await,
                None => {
                    debug!(endpoint = %self.name, "Lane closed, worker exiting");
                    return;
                }
            }
        }

        receiver.close();
        while let Ok(task) = receiver.try_recv() {
            self.cancel(task);
        }

        debug!(endpoint = %self.name, "Lane worker cancelled");
    }

    async fn process(&self, mut task: DeliveryTask) {
        let token = &self.shared.shutdown;

        if self.limiter.acquire(token).await.is_err() {
            return self.cancel(task);
        }

        let permit = tokio::select! {
            _ = token.cancelled() => return self.cancel(task),
            permit = self.shared.permits.clone().acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => return self.cancel(task),
            },
        };

        task.attempts += 1;

        debug!(
            task_id = %task.id,
            endpoint = %self.name,
            attempt = task.attempts,
            status = %DeliveryState::Sending,
            "Sending notification"
        );

        let result = tokio::select! {
            _ = token.cancelled() => Err(DeliveryError::Cancelled),
            result = self.shared.client.send(&task.endpoint.url, &task.payload) => result,
        };

        drop(permit);

        match result {
            Ok(()) => self.shared.finish(&self.stats, task, DeliveryState::Delivered, None),
            Err(DeliveryError::Cancelled) => self.cancel(task),
            Err(e) if e.is_transient() && task.retries() < self.shared.config.retry.max_retries => {
                self.schedule_retry(task, e)
            }
            Err(e) => self.shared.finish(&self.stats, task, DeliveryState::Failed, Some(e)),
        }
    }

    fn schedule_retry(&self, mut task: DeliveryTask, error: DeliveryError) {
        let delay = self
            .shared
            .config
            .retry
            .next_delay(task.attempts, error.retry_after());

        warn!(
            task_id = %task.id,
            endpoint = %self.name,
            attempt = task.attempts,
            retry_in_ms = delay.as_millis() as u64,
            error = %error,
            status = %DeliveryState::Retrying,
            "Transient delivery failure, retrying"
        );

        let Some(next_eligible_at) = Instant::now().checked_add(delay) else {
            return self
                .shared
                .finish(&self.stats, task, DeliveryState::Failed, Some(error));
        };

        task.next_eligible_at = next_eligible_at;
        task.last_error = Some(error);

        if self.requeue.upgrade().is_none() {
            return self.shared.finish(
                &self.stats,
                task,
                DeliveryState::Failed,
                Some(removed_endpoint(&self.name)),
            );
        }

        // The timer only holds a weak sender so a reload that removes the
        // endpoint closes the lane and turns the pending retry into a failure.
        let requeue = self.requeue.clone();
        let shared = self.shared.clone();
        let stats = self.stats.clone();
        let name = self.name.clone();

        self.shared.tracker.spawn(async move {
            tokio::select! {
                _ = shared.shutdown.cancelled() => {
                    shared.finish(&stats, task, DeliveryState::Cancelled, Some(DeliveryError::Cancelled));
                }
                _ = tokio::time::sleep_until(task.next_eligible_at) => {
                    let Some(sender) = requeue.upgrade() else {
                        warn!(task_id = %task.id, endpoint = %name, "Endpoint removed during backoff");
                        return shared.finish(&stats, task, DeliveryState::Failed, Some(removed_endpoint(&name)));
                    };
                    if let Err(mpsc::error::SendError(task)) = sender.send(task) {
                        shared.finish(&stats, task, DeliveryState::Cancelled, Some(DeliveryError::Cancelled));
                    }
                }
            }
        });
    }

    fn cancel(&self, task: DeliveryTask) {
        let error = task.last_error.clone().unwrap_or(DeliveryError::Cancelled);
        self.shared
            .finish(&self.stats, task, DeliveryState::Cancelled, Some(error));
    }
}

fn removed_endpoint(name: &str) -> DeliveryError {
    DeliveryError::InvalidEndpoint(format!("Endpoint '{}' was removed before retry", name))
}

fn validate_endpoints(endpoints: &[Endpoint]) -> Result<(), Error> {
    let mut seen = std::collections::HashSet::new();

    for endpoint in endpoints {
        validate_endpoint_name(&endpoint.name)?;
        validate_webhook_url(&endpoint.url)
            .map_err(|e| anyhow!("Endpoint '{}': {}", endpoint.name, e))?;
        if let Some(rate_limit) = &endpoint.rate_limit {
            validate_rate_limit(&endpoint.name, rate_limit)?;
        }

        if !seen.insert(endpoint.name.as_str()) {
            return Err(anyhow!("Duplicate endpoint name '{}'", endpoint.name));
        }
    }

    Ok(())
}
