//! HTTP delivery of record envelopes, with bounded inline retries.

use std::collections::HashMap;
use std::time::Duration;

use reqwest::{Client, Method, Url};
use serde_json::Value;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::PostConfig;
use crate::error::{BridgeError, Result};

/// Classification of a single HTTP attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    Ok,
    /// 4xx other than 429: retrying this request will not help, but the
    /// record is still worth queueing (the receiver may be
    /// misconfigured right now).
    Terminal(u16),
    /// 429, 5xx, timeout, or a network error.
    Retryable(String),
}

/// What became of one record on the inline path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryResult {
    Delivered,
    Failed { last_error: String },
}

pub struct Poster {
    client: Client,
    method: Method,
    url: Url,
    headers: HashMap<String, String>,
    retries: u32,
    retry_delay: Duration,
    multiplier: f64,
}

impl Poster {
    /// Build from config. An unparsable base URL or method is fatal at
    /// startup; the loader validates the same way.
    pub fn from_config(cfg: &PostConfig) -> Result<Self> {
        let base: Url = cfg
            .base_url
            .parse()
            .map_err(|e| BridgeError::Config(format!("Invalid post.baseUrl: {e}")))?;
        let url = base
            .join(&cfg.path)
            .map_err(|e| BridgeError::Config(format!("Invalid post.path: {e}")))?;
        let method = Method::from_bytes(cfg.method.as_bytes())
            .map_err(|_| BridgeError::Config(format!("Invalid post.method: {}", cfg.method)))?;
        let client = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(|e| BridgeError::Http(format!("build http client: {e}")))?;
        Ok(Self {
            client,
            method,
            url,
            headers: cfg.headers.clone(),
            retries: cfg.retries,
            retry_delay: Duration::from_millis(cfg.retry_delay_ms),
            multiplier: cfg.retry_backoff_multiplier,
        })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    /// One request with explicit method, url, and headers; used both
    /// for the inline path and for replaying stored queue entries.
    pub async fn send_raw(
        &self,
        method: Method,
        url: Url,
        headers: &HashMap<String, String>,
        payload: &Value,
    ) -> PostOutcome {
        let body = match serde_json::to_vec(payload) {
            Ok(body) => body,
            Err(e) => return PostOutcome::Retryable(format!("serialize payload: {e}")),
        };
        let mut request = self.client.request(method, url).body(body);
        for (name, value) in headers {
            request = request.header(name, value);
        }
        match request.send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                if (200..300).contains(&status) {
                    PostOutcome::Ok
                } else if status == 429 || status >= 500 {
                    PostOutcome::Retryable(format!("HTTP {status}"))
                } else {
                    PostOutcome::Terminal(status)
                }
            }
            Err(e) => PostOutcome::Retryable(e.to_string()),
        }
    }

    /// Inline delivery: the immediate attempt plus up to `retries`
    /// more, sleeping `retryDelayMs * multiplier^(attempt-1)` between
    /// them. A terminal status aborts the retries straight away.
    pub async fn deliver(&self, payload: &Value) -> DeliveryResult {
        let mut last_error = String::new();
        for attempt in 0..=self.retries {
            if attempt > 0 {
                let factor = self.multiplier.powi(attempt as i32 - 1);
                let delay = self.retry_delay.mul_f64(factor);
                debug!(attempt, delay_ms = delay.as_millis() as u64, "retrying POST");
                sleep(delay).await;
            }
            match self.send_raw(self.method.clone(), self.url.clone(), &self.headers, payload).await
            {
                PostOutcome::Ok => return DeliveryResult::Delivered,
                PostOutcome::Terminal(status) => {
                    warn!(status, "terminal HTTP status, not retrying inline");
                    return DeliveryResult::Failed { last_error: format!("HTTP {status}") };
                }
                PostOutcome::Retryable(error) => {
                    warn!(attempt, error = %error, "POST attempt failed");
                    last_error = error;
                }
            }
        }
        DeliveryResult::Failed { last_error }
    }
}
