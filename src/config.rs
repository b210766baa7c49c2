use crate::error::{GenError, Result};
use std::collections::HashSet;
use std::env;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://api-inference.huggingface.co/models";
pub const DEFAULT_MODELS: &[&str] = &[
    "stabilityai/stable-diffusion-xl-base-1.0",
    "runwayml/stable-diffusion-v1-5",
    "CompVis/stable-diffusion-v1-4",
];

/// One inference endpoint. Its position in `AppConfig::models` is its priority.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelDescriptor {
    pub name: String,
    pub endpoint: String,
    pub timeout: Duration,
    pub max_retries: u32,
}

impl ModelDescriptor {
    pub fn new(name: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            endpoint: endpoint.into(),
            timeout: Duration::from_secs(60),
            max_retries: 3,
        }
    }

    /// Descriptor for a model hosted under `api_base`, named by its repository id.
    pub fn hosted(api_base: &str, model_id: &str) -> Self {
        Self::new(
            model_id,
            format!("{}/{}", api_base.trim_end_matches('/'), model_id),
        )
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// Waits applied between attempts against a single endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    pub loading_base: Duration,
    pub loading_step: Duration,
    pub loading_default_cap: Duration,
    pub loading_max_wait: Duration,
    pub rate_limit_base: Duration,
    pub rate_limit_step: Duration,
    pub error_base: Duration,
    pub error_step: Duration,
    pub error_cap: Duration,
    pub timeout_wait: Duration,
    pub transport_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            loading_base: Duration::from_secs(10),
            loading_step: Duration::from_secs(5),
            loading_default_cap: Duration::from_secs(60),
            loading_max_wait: Duration::from_secs(120),
            rate_limit_base: Duration::from_secs(5),
            rate_limit_step: Duration::from_secs(5),
            error_base: Duration::from_secs(2),
            error_step: Duration::from_secs(3),
            error_cap: Duration::from_secs(30),
            timeout_wait: Duration::from_secs(15),
            transport_wait: Duration::from_secs(10),
        }
    }
}

impl RetryPolicy {
    /// Wait after a 503. A server estimate wins over the progressive default.
    pub fn loading_wait(&self, attempt: u32, estimated: Option<Duration>) -> Duration {
        match estimated {
            Some(estimate) => estimate.min(self.loading_max_wait),
            None => (self.loading_base + self.loading_step * attempt).min(self.loading_default_cap),
        }
    }

    pub fn rate_limit_wait(&self, attempt: u32) -> Duration {
        self.rate_limit_base + self.rate_limit_step * attempt
    }

    pub fn error_wait(&self, attempt: u32) -> Duration {
        (self.error_base + self.error_step * attempt).min(self.error_cap)
    }

    /// A policy that never waits. Useful for tests and local mocks.
    pub fn immediate() -> Self {
        RetryPolicy {
            loading_base: Duration::ZERO,
            loading_step: Duration::ZERO,
            loading_default_cap: Duration::ZERO,
            loading_max_wait: Duration::from_secs(120),
            rate_limit_base: Duration::ZERO,
            rate_limit_step: Duration::ZERO,
            error_base: Duration::ZERO,
            error_step: Duration::ZERO,
            error_cap: Duration::ZERO,
            timeout_wait: Duration::ZERO,
            transport_wait: Duration::ZERO,
        }
    }
}

/// Fixed generation settings sent with every inference call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationParameters {
    pub guidance_scale: f32,
    pub num_inference_steps: u32,
    pub width: u32,
    pub height: u32,
    pub negative_prompt: Option<String>,
}

impl Default for GenerationParameters {
    fn default() -> Self {
        GenerationParameters {
            guidance_scale: 7.5,
            num_inference_steps: 30,
            width: 512,
            height: 512,
            negative_prompt: Some("blurry, low quality, distorted, deformed".to_string()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValidationLimits {
    pub min_bytes: usize,
    pub min_dimension: u32,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        ValidationLimits {
            min_bytes: 1024,
            min_dimension: 256,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_token: Option<String>,
    pub host: String,
    pub port: u16,
    pub debug: bool,
    /// `LOG_FORMAT=json` switches console output to JSON lines.
    pub log_json: bool,
    pub log_file: Option<String>,
    pub images_dir: PathBuf,
    pub public_prefix: String,
    pub models: Vec<ModelDescriptor>,
    pub retry: RetryPolicy,
    pub generation: GenerationParameters,
    pub limits: ValidationLimits,
    pub min_prompt_chars: usize,
    pub probe_timeout: Duration,
    pub health_probe_count: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            api_token: None,
            host: "0.0.0.0".to_string(),
            port: 5000,
            debug: false,
            log_json: false,
            log_file: None,
            images_dir: PathBuf::from("static/images"),
            public_prefix: "/static/images".to_string(),
            models: Vec::new(),
            retry: RetryPolicy::default(),
            generation: GenerationParameters::default(),
            limits: ValidationLimits::default(),
            min_prompt_chars: 3,
            probe_timeout: Duration::from_secs(10),
            health_probe_count: 2,
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let api_token = env::var("HF_API_TOKEN")
            .ok()
            .filter(|token| !token.trim().is_empty());
        let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
        let port = env::var("PORT")
            .ok()
            .and_then(|port| port.parse().ok())
            .unwrap_or(5000);
        let debug = env::var("DEBUG")
            .ok()
            .map_or(false, |val| val == "true" || val == "1");
        let log_json = env::var("LOG_FORMAT")
            .map_or(false, |format| format.trim().eq_ignore_ascii_case("json"));
        let log_file = env::var("LOG_FILE")
            .ok()
            .filter(|path| !path.trim().is_empty());
        let images_dir = env::var("IMAGES_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("static/images"));

        let api_base = env::var("HF_API_BASE").unwrap_or_else(|_| DEFAULT_API_BASE.to_string());
        let timeout = env::var("MODEL_TIMEOUT_SECS")
            .ok()
            .and_then(|secs| secs.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(60));
        let max_retries = env::var("MODEL_MAX_RETRIES")
            .ok()
            .and_then(|n| n.parse().ok())
            .unwrap_or(3);

        let model_ids: Vec<String> = match env::var("HF_MODELS") {
            Ok(list) => parse_model_list(&list),
            Err(_) => DEFAULT_MODELS.iter().map(|id| id.to_string()).collect(),
        };
        let models = model_ids
            .iter()
            .map(|id| {
                ModelDescriptor::hosted(&api_base, id)
                    .with_timeout(timeout)
                    .with_max_retries(max_retries)
            })
            .collect();

        AppConfig {
            api_token,
            host,
            port,
            debug,
            log_json,
            log_file,
            images_dir,
            models,
            ..Default::default()
        }
    }

    pub fn with_api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_images_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.images_dir = dir.into();
        self
    }

    pub fn with_model(mut self, model: ModelDescriptor) -> Self {
        self.models.push(model);
        self
    }

    pub fn with_models(mut self, models: Vec<ModelDescriptor>) -> Self {
        self.models = models;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_generation(mut self, generation: GenerationParameters) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_limits(mut self, limits: ValidationLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_json_logs(mut self, enabled: bool) -> Self {
        self.log_json = enabled;
        self
    }

    pub fn with_log_file(mut self, path: impl Into<String>) -> Self {
        self.log_file = Some(path.into());
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Token if present and non-blank.
    pub fn token(&self) -> Option<&str> {
        self.api_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }

    /// Structural checks run once at startup. A missing token or an empty model
    /// list is not rejected here; generation reports those per request.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for model in &self.models {
            if model.name.trim().is_empty() {
                return Err(GenError::ConfigError("Model name must not be empty".into()));
            }
            if !seen.insert(model.name.as_str()) {
                return Err(GenError::ConfigError(format!(
                    "Duplicate model name: {}",
                    model.name
                )));
            }
            if model.max_retries == 0 {
                return Err(GenError::ConfigError(format!(
                    "Model {} must allow at least one attempt",
                    model.name
                )));
            }
            if model.timeout.is_zero() {
                return Err(GenError::ConfigError(format!(
                    "Model {} has a zero timeout",
                    model.name
                )));
            }
        }
        if self.min_prompt_chars == 0 {
            return Err(GenError::ConfigError(
                "Minimum prompt length must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn find_model(&self, selector: &str) -> Option<&ModelDescriptor> {
        let selector = selector.trim();
        self.models
            .iter()
            .find(|model| model.name == selector)
            .or_else(|| {
                self.models
                    .iter()
                    .find(|model| model.name.eq_ignore_ascii_case(selector))
            })
    }
}

fn parse_model_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(String::from)
        .collect()
}
