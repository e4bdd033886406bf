use std::time::Duration;

use anyhow::{Error, Result, anyhow};
use reqwest::{
    Client, Response, StatusCode,
    header::{HeaderMap, RETRY_AFTER},
    multipart::{Form, Part},
};
use tracing::{debug, info};

use crate::{
    error::DeliveryError,
    models::payload::NotificationPayload,
};

const RESET_AFTER: &str = "X-RateLimit-Reset-After";

#[derive(Debug, Clone)]
pub struct WebhookClient {
    http_client: Client,
}

impl WebhookClient {
    pub fn new(request_timeout: Duration) -> Result<Self, Error> {
        let http_client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| anyhow!("Failed to create HTTP client: {}", e))?;

        info!(
            timeout_ms = request_timeout.as_millis() as u64,
            "Webhook client initialized"
        );

        Ok(Self { http_client })
    }

    /// One delivery attempt. Classifies the outcome so the caller can decide
    /// whether to retry.
    pub async fn send(&self, url: &str, payload: &NotificationPayload) -> Result<(), DeliveryError> {
        let body = payload.to_webhook_body();
        let json =
            serde_json::to_string(&body).map_err(|e| DeliveryError::Encoding(e.to_string()))?;

        debug!(
            kind = %payload.kind,
            player = %payload.player_name,
            attachment = payload.attachment().is_some(),
            "Posting webhook payload"
        );

        let request = self.http_client.post(url);
        let request = match payload.attachment() {
            Some((file_name, bytes)) => {
                let file = Part::bytes(bytes.to_vec())
                    .file_name(file_name.to_string())
                    .mime_str("image/png")
                    .map_err(|e| DeliveryError::Encoding(e.to_string()))?;
                let form = Form::new().text("payload_json", json).part("file", file);
                request.multipart(form)
            }
            None => request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(json),
        };

        let response = request.send().await?;

        Self::classify_response(response).await
    }

    async fn classify_response(response: Response) -> Result<(), DeliveryError> {
        let status = response.status();

        if status.is_success() {
            return Ok(());
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let header_hint = parse_retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            let retry_after = header_hint.or_else(|| parse_retry_after_body(&body));
            return Err(DeliveryError::RateLimited { retry_after });
        }

        let body = response.text().await.unwrap_or_default();

        if status.is_server_error() {
            Err(DeliveryError::Server {
                status: status.as_u16(),
                body,
            })
        } else {
            Err(DeliveryError::Rejected {
                status: status.as_u16(),
                body,
            })
        }
    }
}

/// Reads `Retry-After` (then `X-RateLimit-Reset-After`) as seconds. Fractional
/// values are allowed.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    [RETRY_AFTER.as_str(), RESET_AFTER]
        .into_iter()
        .filter_map(|name| headers.get(name))
        .filter_map(|value| value.to_str().ok())
        .find_map(parse_seconds)
}

fn parse_retry_after_body(body: &str) -> Option<Duration> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let seconds = value.get("retry_after")?.as_f64()?;
    seconds_to_duration(seconds)
}

fn parse_seconds(text: &str) -> Option<Duration> {
    seconds_to_duration(text.trim().parse::<f64>().ok()?)
}

/// Out of range values (negative, NaN, beyond `Duration::MAX`) are dropped.
fn seconds_to_duration(seconds: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(seconds).ok()
}
