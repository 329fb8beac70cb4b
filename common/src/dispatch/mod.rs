// Notification dispatch
// Formats alerts per platform and delivers them with bounded retry

pub mod message;
pub mod platform;

use crate::config::DispatchConfig;
use crate::errors::DispatchError;
use crate::models::{CellChange, MonitoringJob};
use crate::telemetry;
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::Value;
use std::time::{Duration, Instant};

pub use message::{delta_summary, document_link, NotificationMessage};
pub use platform::Platform;

/// Notifier delivers one alert for one detected change
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(
        &self,
        job: &MonitoringJob,
        change: &CellChange,
        source_name: &str,
    ) -> Result<(), DispatchError>;
}

/// Bounded exponential backoff: `base * 2^attempt` between attempts
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Delay to wait after the given zero-based failed attempt
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

/// WebhookNotifier posts platform-formatted JSON to the job's webhook URL.
///
/// Every delivery failure, HTTP or network, is retried up to the configured
/// attempt count; the first success short-circuits. Exhaustion is reported
/// to the caller and never affects job state.
pub struct WebhookNotifier {
    client: Client,
    policy: RetryPolicy,
    document_url_template: String,
}

impl WebhookNotifier {
    pub fn new(config: &DispatchConfig) -> Result<Self, DispatchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .build()
            .map_err(|e| DispatchError::Request(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            policy: RetryPolicy {
                max_attempts: config.max_attempts,
                base_delay: Duration::from_millis(config.backoff_base_ms),
            },
            document_url_template: config.document_url_template.clone(),
        })
    }

    async fn post_once(&self, url: &Url, payload: &Value) -> Result<(), String> {
        let response = self
            .client
            .post(url.clone())
            .json(payload)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(format!("HTTP {}", status.as_u16()))
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    #[tracing::instrument(skip(self, job, change), fields(job_id = %job.id, address = %change.address))]
    async fn send(
        &self,
        job: &MonitoringJob,
        change: &CellChange,
        source_name: &str,
    ) -> Result<(), DispatchError> {
        let url = Url::parse(&job.webhook_url)
            .map_err(|_| DispatchError::InvalidWebhook(job.webhook_url.clone()))?;

        let link = document_link(&self.document_url_template, &job.source_id);
        let message = NotificationMessage::new(job, change, source_name, link);
        let payload = job.platform.payload(&message);

        let started = Instant::now();
        let mut last_error = String::new();
        for attempt in 0..self.policy.max_attempts {
            match self.post_once(&url, &payload).await {
                Ok(()) => {
                    telemetry::record_notification_sent(&job.platform);
                    telemetry::record_dispatch_duration(started.elapsed().as_secs_f64());
                    tracing::info!(
                        platform = %job.platform,
                        attempt = attempt + 1,
                        "Notification delivered"
                    );
                    return Ok(());
                }
                Err(reason) => {
                    last_error = reason;
                    tracing::warn!(
                        platform = %job.platform,
                        attempt = attempt + 1,
                        error = %last_error,
                        "Notification delivery attempt failed"
                    );
                    if attempt + 1 < self.policy.max_attempts {
                        tokio::time::sleep(self.policy.delay_for(attempt)).await;
                    }
                }
            }
        }

        telemetry::record_notification_failed(&job.platform);
        Err(DispatchError::RetriesExhausted {
            attempts: self.policy.max_attempts,
            last_error,
        })
    }
}
