use crate::{
    config::{AppConfig, ModelDescriptor},
    models::{HealthReport, ModelStatus, StatusReport},
};
use futures::future::join_all;
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::sync::Arc;

/// Availability checks for status reporting. Not used on the generation path.
#[derive(Clone)]
pub struct EndpointProber {
    http: Client,
    config: Arc<AppConfig>,
}

enum ProbeVerdict {
    Available,
    Unavailable,
    Ambiguous,
}

impl ProbeVerdict {
    fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::OK | StatusCode::SERVICE_UNAVAILABLE => ProbeVerdict::Available,
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                ProbeVerdict::Unavailable
            }
            _ => ProbeVerdict::Ambiguous,
        }
    }
}

impl EndpointProber {
    pub fn new(http: Client, config: Arc<AppConfig>) -> Self {
        Self { http, config }
    }

    pub async fn probe(&self, endpoint: &str) -> bool {
        let mut request = self.http.get(endpoint).timeout(self.config.probe_timeout);
        if let Some(token) = self.config.token() {
            request = request.bearer_auth(token);
        }

        let status = match request.send().await {
            Ok(response) => response.status(),
            Err(e) => {
                log::debug!("Probe of {} failed: {}", endpoint, e);
                return false;
            }
        };

        match ProbeVerdict::from_status(status) {
            ProbeVerdict::Available => true,
            ProbeVerdict::Unavailable => false,
            ProbeVerdict::Ambiguous => {
                log::debug!(
                    "Probe of {} returned {}, trying a minimal generation",
                    endpoint,
                    status.as_u16()
                );
                self.probe_with_generation(endpoint).await
            }
        }
    }

    async fn probe_with_generation(&self, endpoint: &str) -> bool {
        let mut request = self
            .http
            .post(endpoint)
            .timeout(self.config.probe_timeout)
            .json(&json!({
                "inputs": "test",
                "parameters": { "num_inference_steps": 1 }
            }));
        if let Some(token) = self.config.token() {
            request = request.bearer_auth(token);
        }

        match request.send().await {
            Ok(response) => matches!(
                response.status(),
                StatusCode::OK | StatusCode::SERVICE_UNAVAILABLE
            ),
            Err(e) => {
                log::debug!("Generation probe of {} failed: {}", endpoint, e);
                false
            }
        }
    }

    pub async fn model_status(&self, model: &ModelDescriptor) -> ModelStatus {
        let available = self.probe(&model.endpoint).await;
        ModelStatus {
            name: model.name.clone(),
            endpoint: model.endpoint.clone(),
            timeout_secs: model.timeout.as_secs(),
            max_retries: model.max_retries,
            available,
        }
    }

    /// Probes every configured model concurrently; order follows the config.
    pub async fn status_report(&self) -> StatusReport {
        let statuses = join_all(
            self.config
                .models
                .iter()
                .map(|model| self.model_status(model)),
        )
        .await;
        let report = StatusReport::from_statuses(statuses);
        log::info!(
            "📊 Model status: {}/{} available",
            report.available,
            report.total
        );
        report
    }

    /// Quick health verdict from the token and the first few models.
    pub async fn health(&self) -> HealthReport {
        let token_configured = self.config.token().is_some();
        let subset: Vec<&ModelDescriptor> = self
            .config
            .models
            .iter()
            .take(self.config.health_probe_count)
            .collect();

        let available = if token_configured {
            join_all(subset.iter().map(|model| self.probe(&model.endpoint)))
                .await
                .into_iter()
                .filter(|up| *up)
                .count()
        } else {
            0
        };

        HealthReport::new(
            token_configured,
            self.config.models.len(),
            if token_configured { subset.len() } else { 0 },
            available,
        )
    }
}
