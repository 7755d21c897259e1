// ABOUTME: HTTP health probing for local containers and deployed services.
// ABOUTME: Single checks plus a bounded retry loop with exponential backoff.

use std::time::Duration;

/// Backoff starts here and doubles per attempt.
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
/// Backoff never exceeds this between attempts.
const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Errors from health probing.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("health check returned status {0}")]
    Unhealthy(u16),

    #[error("health check request failed: {0}")]
    Request(String),

    #[error("service did not become healthy within {0:?}")]
    DeadlineExceeded(Duration),
}

/// HTTP health prober.
pub struct HealthProbe {
    client: reqwest::Client,
}

impl HealthProbe {
    pub fn new(timeout: Duration) -> Result<Self, ProbeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProbeError::Request(e.to_string()))?;
        Ok(Self { client })
    }

    /// Single probe. Any 2xx status counts as healthy.
    pub async fn check(&self, url: &str) -> Result<(), ProbeError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProbeError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ProbeError::Unhealthy(status.as_u16()))
        }
    }

    /// Retry with exponential backoff until the probe passes or the
    /// deadline elapses.
    pub async fn wait_healthy(&self, url: &str, deadline: Duration) -> Result<(), ProbeError> {
        let start = tokio::time::Instant::now();
        let mut backoff = INITIAL_BACKOFF;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            match self.check(url).await {
                Ok(()) => {
                    tracing::debug!(attempt, "health probe passed");
                    return Ok(());
                }
                Err(e) => {
                    tracing::debug!(attempt, error = %e, "health probe failed");
                    if start.elapsed() + backoff > deadline {
                        return Err(ProbeError::DeadlineExceeded(deadline));
                    }
                    tokio::time::sleep(backoff).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF);
                }
            }
        }
    }
}
