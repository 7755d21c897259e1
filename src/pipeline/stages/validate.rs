// ABOUTME: Post-deploy validation: wait for the live health endpoint,
// ABOUTME: then optionally exercise the service with a real credential.

use crate::diagnostics::Warning;
use crate::error::{Error, Result};
use crate::pipeline::{PipelineContext, Stage, StageResult, apply_severity};
use crate::probe::HealthProbe;
use async_trait::async_trait;

pub struct ValidateStage;

impl ValidateStage {
    pub fn new() -> Self {
        Self
    }

    /// Hit the health path with a bearer token from the configured env
    /// var. Advisory only: a broken upstream credential should be known,
    /// but the deploy itself succeeded.
    async fn credential_test(&self, ctx: &mut PipelineContext, health_url: &str) {
        let Some(var) = ctx.config.credential_env.clone() else {
            return;
        };
        let Ok(token) = std::env::var(&var) else {
            tracing::debug!(var, "credential env var unset, skipping credentialed check");
            return;
        };

        let client = match reqwest::Client::builder()
            .timeout(ctx.config.health.probe_timeout)
            .build()
        {
            Ok(c) => c,
            Err(e) => {
                ctx.diagnostics
                    .warn(Warning::credential_test(format!("client setup: {e}")));
                return;
            }
        };

        let outcome = client
            .get(health_url)
            .bearer_auth(token)
            .send()
            .await;

        match outcome {
            Ok(response) if response.status().is_success() => {
                tracing::debug!("credentialed request succeeded");
            }
            Ok(response) => {
                ctx.diagnostics.warn(Warning::credential_test(format!(
                    "credentialed request returned {}",
                    response.status()
                )));
            }
            Err(e) => {
                ctx.diagnostics
                    .warn(Warning::credential_test(format!("credentialed request: {e}")));
            }
        }
    }
}

impl Default for ValidateStage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Stage for ValidateStage {
    fn name(&self) -> &'static str {
        "validate"
    }

    async fn run(&self, ctx: &mut PipelineContext) -> Result<StageResult> {
        let base_url = ctx
            .service_url
            .clone()
            .ok_or_else(|| Error::Deploy("no service URL to validate".to_string()))?;

        let health_url = format!(
            "{}{}",
            base_url.trim_end_matches('/'),
            ctx.config.health.path
        );

        let probe = HealthProbe::new(ctx.config.health.probe_timeout)
            .map_err(|e| Error::Deploy(e.to_string()))?;

        let probe_result = probe
            .wait_healthy(&health_url, ctx.config.health.deadline)
            .await;

        let result = match probe_result {
            Ok(()) => StageResult::ok_with(format!("healthy at {health_url}")),
            Err(e) => {
                let severity = ctx.config.severity.health_probe;
                apply_severity(
                    severity,
                    ctx,
                    Warning::health_probe(format!("deployed service: {e}")),
                    Error::Deploy,
                )?
            }
        };

        self.credential_test(ctx, &health_url).await;

        Ok(result)
    }
}
