use anyhow::{Result, anyhow};
use reqwest::Url;

use crate::models::endpoint::RateLimitConfig;

pub fn validate_webhook_url(url: &str) -> Result<()> {
    if url.trim().is_empty() {
        return Err(anyhow!("Webhook URL cannot be empty"));
    }

    let parsed = Url::parse(url.trim()).map_err(|e| anyhow!("Invalid webhook URL '{}': {}", url, e))?;

    if parsed.scheme() != "http" && parsed.scheme() != "https" {
        return Err(anyhow!(
            "Webhook URL '{}' must use http or https (got {})",
            url,
            parsed.scheme()
        ));
    }

    if parsed.host_str().is_none() {
        return Err(anyhow!("Webhook URL '{}' has no host", url));
    }

    Ok(())
}

pub fn validate_endpoint_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(anyhow!("Endpoint name cannot be empty"));
    }

    if name.len() > 100 {
        return Err(anyhow!("Endpoint name too long (maximum 100 characters)"));
    }

    Ok(())
}

pub fn validate_rate_limit(endpoint: &str, rate_limit: &RateLimitConfig) -> Result<()> {
    if rate_limit.capacity == 0 || rate_limit.window_ms == 0 {
        return Err(anyhow!(
            "Endpoint '{}' has an empty rate limit budget",
            endpoint
        ));
    }

    Ok(())
}
