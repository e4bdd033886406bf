use std::{
    collections::BTreeSet,
    fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use anyhow::{Error, Result, anyhow};
use dotenvy::dotenv;
use serde::Deserialize;
use tracing::info;

use crate::{
    clients::dispatcher::DispatcherConfig,
    models::{
        achievement::AchievementKind,
        endpoint::{Endpoint, RateLimitConfig},
        retry::RetryConfig,
        validation::{validate_rate_limit, validate_webhook_url},
    },
};

#[derive(Clone, Deserialize, Debug)]
pub struct Config {
    #[serde(default)]
    pub webhook_urls: String,
    #[serde(default)]
    pub endpoints_file: Option<PathBuf>,
    #[serde(default)]
    pub enabled_kinds: Option<String>,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_initial_retry_delay_ms")]
    pub initial_retry_delay_ms: u64,
    #[serde(default = "default_max_retry_delay_ms")]
    pub max_retry_delay_ms: u64,
    #[serde(default = "default_retry_backoff_multiplier")]
    pub retry_backoff_multiplier: u64,
    #[serde(default = "default_true")]
    pub retry_jitter: bool,
    #[serde(default = "default_max_retry_after_ms")]
    pub max_retry_after_ms: u64,

    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    #[serde(default = "default_rate_limit_capacity")]
    pub rate_limit_capacity: u32,
    #[serde(default = "default_rate_limit_window_ms")]
    pub rate_limit_window_ms: u64,

    #[serde(default = "default_worker_concurrency")]
    pub worker_concurrency: usize,
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,

    #[serde(default = "default_interval")]
    pub level_interval: u32,
    #[serde(default = "default_interval")]
    pub kill_count_interval: u32,

    #[serde(default = "default_server_port")]
    pub server_port: u16,
}

fn default_max_retries() -> u32 {
    5
}

fn default_initial_retry_delay_ms() -> u64 {
    1000
}

fn default_max_retry_delay_ms() -> u64 {
    30_000
}

fn default_retry_backoff_multiplier() -> u64 {
    2
}

fn default_max_retry_after_ms() -> u64 {
    300_000
}

fn default_true() -> bool {
    true
}

fn default_request_timeout_ms() -> u64 {
    10_000
}

fn default_rate_limit_capacity() -> u32 {
    5
}

fn default_rate_limit_window_ms() -> u64 {
    2000
}

fn default_worker_concurrency() -> usize {
    4
}

fn default_shutdown_grace_ms() -> u64 {
    5000
}

fn default_interval() -> u32 {
    1
}

fn default_server_port() -> u16 {
    8080
}

impl Config {
    pub fn load() -> Result<Self, Error> {
        dotenv().ok();

        let config = envy::from_env::<Self>()
            .map_err(|e| anyhow!("Invalid or missing environmental variable: {}", e))?;
        config.validate()?;

        info!(
            enabled_kinds = config.enabled_kinds.as_deref().unwrap_or("ALL"),
            worker_concurrency = config.worker_concurrency,
            "Configuration loaded"
        );

        Ok(config)
    }

    pub fn from_vars<I>(vars: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let config = envy::from_iter::<_, Self>(vars)
            .map_err(|e| anyhow!("Invalid configuration: {}", e))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings that would only fail later, at delivery time.
    pub fn validate(&self) -> Result<(), Error> {
        if self.rate_limit_capacity == 0 {
            return Err(anyhow!("RATE_LIMIT_CAPACITY must be greater than zero"));
        }
        if self.rate_limit_window_ms == 0 {
            return Err(anyhow!("RATE_LIMIT_WINDOW_MS must be greater than zero"));
        }
        if self.worker_concurrency == 0 {
            return Err(anyhow!("WORKER_CONCURRENCY must be greater than zero"));
        }
        if self.request_timeout_ms == 0 {
            return Err(anyhow!("REQUEST_TIMEOUT_MS must be greater than zero"));
        }

        self.enabled_kinds()?;
        self.endpoints()?;

        Ok(())
    }

    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            initial_delay_ms: self.initial_retry_delay_ms,
            max_delay_ms: self.max_retry_delay_ms,
            backoff_multiplier: self.retry_backoff_multiplier,
            jitter: self.retry_jitter,
            max_retry_after_ms: self.max_retry_after_ms,
        }
    }

    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            capacity: self.rate_limit_capacity,
            window_ms: self.rate_limit_window_ms,
        }
    }

    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            retry: self.retry_config(),
            request_timeout: Duration::from_millis(self.request_timeout_ms),
            default_rate_limit: self.rate_limit_config(),
            worker_concurrency: self.worker_concurrency,
            shutdown_grace: Duration::from_millis(self.shutdown_grace_ms),
        }
    }

    pub fn enabled_kinds(&self) -> Result<BTreeSet<AchievementKind>, Error> {
        match self.enabled_kinds.as_deref().map(str::trim) {
            None | Some("") => Ok(AchievementKind::ALL.into_iter().collect()),
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(AchievementKind::from_str)
                .collect(),
        }
    }

    /// Endpoints from `WEBHOOK_URLS` followed by those of `ENDPOINTS_FILE`.
    pub fn endpoints(&self) -> Result<Vec<Endpoint>, Error> {
        let mut endpoints: Vec<Endpoint> = split_webhook_urls(&self.webhook_urls)
            .into_iter()
            .enumerate()
            .map(|(index, url)| Endpoint::new(format!("webhook-{}", index + 1), url))
            .collect();

        if let Some(path) = &self.endpoints_file {
            endpoints.extend(load_endpoints_file(path)?);
        }

        if endpoints.is_empty() {
            return Err(anyhow!(
                "No webhook endpoint configured (set WEBHOOK_URLS or ENDPOINTS_FILE)"
            ));
        }

        for endpoint in &endpoints {
            validate_webhook_url(&endpoint.url)?;

            if let Some(rate_limit) = &endpoint.rate_limit {
                validate_rate_limit(&endpoint.name, rate_limit)?;
            }
        }

        Ok(endpoints)
    }
}

pub fn split_webhook_urls(urls: &str) -> Vec<String> {
    urls.split([',', ';', '\n'])
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn load_endpoints_file(path: &Path) -> Result<Vec<Endpoint>, Error> {
    let contents = fs::read_to_string(path)
        .map_err(|e| anyhow!("Failed to read endpoints file {}: {}", path.display(), e))?;

    serde_json::from_str(&contents)
        .map_err(|e| anyhow!("Invalid endpoints file {}: {}", path.display(), e))
}
