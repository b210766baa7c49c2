use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelStatus {
    pub name: String,
    pub endpoint: String,
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub available: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusReport {
    pub models: Vec<ModelStatus>,
    pub total: usize,
    pub available: usize,
    pub unavailable: usize,
}

impl StatusReport {
    pub fn from_statuses(models: Vec<ModelStatus>) -> Self {
        let available = models.iter().filter(|model| model.available).count();
        Self {
            total: models.len(),
            unavailable: models.len() - available,
            available,
            models,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub api_token_configured: bool,
    pub models_configured: usize,
    pub models_checked: usize,
    pub models_available: usize,
    pub timestamp: DateTime<Utc>,
}

impl HealthReport {
    pub fn new(
        api_token_configured: bool,
        models_configured: usize,
        models_checked: usize,
        models_available: usize,
    ) -> Self {
        let status = if !api_token_configured || models_configured == 0 {
            HealthStatus::Unhealthy
        } else if models_available == 0 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        };
        Self {
            status,
            api_token_configured,
            models_configured,
            models_checked,
            models_available,
            timestamp: Utc::now(),
        }
    }
}
