use crate::{
    config::{AppConfig, ModelDescriptor},
    inference::backoff::Sleeper,
    models::{FailureReason, GeneratedImage, GenerationOutcome, ModelFailure},
    prompt,
    storage::{ImageStorage, NamingContext, StoredImage},
    validation::{ImageInfo, ImageValidator},
};
use reqwest::{header::ACCEPT, Client, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

const MAX_ERROR_BODY_CHARS: usize = 300;

/// Result of a single HTTP call against one endpoint.
enum Step {
    Stored(StoredImage, ImageInfo),
    Failed(FailureReason),
    Retry {
        reason: FailureReason,
        wait: Option<Duration>,
    },
}

/// Runs the call/validate/backoff cycle against a single model endpoint.
#[derive(Clone)]
pub struct ModelInvoker {
    http: Client,
    config: Arc<AppConfig>,
    validator: ImageValidator,
    storage: Arc<dyn ImageStorage>,
    sleeper: Arc<dyn Sleeper>,
}

impl ModelInvoker {
    pub fn new(
        http: Client,
        config: Arc<AppConfig>,
        storage: Arc<dyn ImageStorage>,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            http,
            validator: ImageValidator::new(config.limits),
            config,
            storage,
            sleeper,
        }
    }

    /// Never fails: every path ends in a `GenerationOutcome`.
    pub async fn invoke(&self, model: &ModelDescriptor, prompt: &str) -> GenerationOutcome {
        let enhanced = prompt::enhance(prompt);
        let payload = self.payload(&enhanced);
        log::debug!("[{}] enhanced prompt: {}", model.name, enhanced);

        let mut last_reason: Option<FailureReason> = None;
        let mut calls = 0;

        for attempt in 0..model.max_retries {
            calls += 1;
            let has_more = attempt + 1 < model.max_retries;
            log::info!(
                "🎨 [{}] attempt {}/{}",
                model.name,
                attempt + 1,
                model.max_retries
            );

            match self.attempt(model, &payload, attempt).await {
                Step::Stored(stored, info) => {
                    log::info!(
                        "✅ [{}] generated {}x{} image in {} call(s)",
                        model.name,
                        info.width,
                        info.height,
                        calls
                    );
                    return GenerationOutcome::Success(GeneratedImage {
                        locator: stored.locator,
                        file_name: stored.file_name,
                        model_name: model.name.clone(),
                        prompt: prompt.to_string(),
                        enhanced_prompt: enhanced,
                        width: info.width,
                        height: info.height,
                        byte_size: stored.byte_size,
                        calls,
                    });
                }
                Step::Failed(reason) => {
                    log::error!("❌ [{}] giving up: {}", model.name, reason);
                    return failure(model, reason, calls);
                }
                Step::Retry { reason, wait } => {
                    if !has_more {
                        if reason.ends_loop_as_is() {
                            log::error!("❌ [{}] final attempt failed: {}", model.name, reason);
                            return failure(model, reason, calls);
                        }
                        last_reason = Some(reason);
                        break;
                    }
                    match wait {
                        Some(wait) if !wait.is_zero() => {
                            log::warn!(
                                "⚠️  [{}] {}, retrying in {:.1}s",
                                model.name,
                                reason,
                                wait.as_secs_f64()
                            );
                            self.sleeper.sleep(wait).await;
                        }
                        _ => log::warn!("⚠️  [{}] {}, retrying", model.name, reason),
                    }
                    last_reason = Some(reason);
                }
            }
        }

        let reason = FailureReason::ExhaustedRetries {
            attempts: calls,
            last: last_reason.map(Box::new),
        };
        log::error!("❌ [{}] {}", model.name, reason);
        failure(model, reason, calls)
    }

    fn payload(&self, prompt: &str) -> Value {
        let generation = &self.config.generation;
        let mut parameters = json!({
            "guidance_scale": generation.guidance_scale,
            "num_inference_steps": generation.num_inference_steps,
            "width": generation.width,
            "height": generation.height,
        });
        if let (Some(negative), Some(obj)) =
            (&generation.negative_prompt, parameters.as_object_mut())
        {
            obj.insert("negative_prompt".to_string(), json!(negative));
        }
        json!({
            "inputs": prompt,
            "parameters": parameters,
        })
    }

    async fn attempt(&self, model: &ModelDescriptor, payload: &Value, attempt: u32) -> Step {
        let retry = &self.config.retry;

        let mut request = self
            .http
            .post(&model.endpoint)
            .timeout(model.timeout)
            .header(ACCEPT, "image/png")
            .json(payload);
        if let Some(token) = self.config.token() {
            request = request.bearer_auth(token);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return self.transport_step(model, e),
        };

        let status = response.status();
        log::debug!("[{}] status code: {}", model.name, status.as_u16());

        match status {
            StatusCode::OK => {
                let bytes = match response.bytes().await {
                    Ok(bytes) => bytes.to_vec(),
                    Err(e) => return self.transport_step(model, e),
                };
                let validated = match self.validator.validate(bytes) {
                    Ok(validated) => validated,
                    Err(rejection) => {
                        return Step::Retry {
                            reason: FailureReason::InvalidImage {
                                detail: rejection.to_string(),
                            },
                            wait: None,
                        }
                    }
                };
                let naming = NamingContext::model(&model.name);
                match self.storage.store(&validated, &naming).await {
                    Ok(stored) => Step::Stored(stored, validated.info),
                    Err(e) => Step::Failed(FailureReason::Storage {
                        detail: e.to_string(),
                    }),
                }
            }
            StatusCode::SERVICE_UNAVAILABLE => {
                let body = response.text().await.unwrap_or_default();
                let estimate = parse_estimated_time(&body);
                Step::Retry {
                    reason: FailureReason::ModelLoading,
                    wait: Some(retry.loading_wait(attempt, estimate)),
                }
            }
            StatusCode::TOO_MANY_REQUESTS => Step::Retry {
                reason: FailureReason::RateLimited,
                wait: Some(retry.rate_limit_wait(attempt)),
            },
            StatusCode::BAD_REQUEST => {
                let body = response.text().await.unwrap_or_default();
                Step::Failed(FailureReason::BadRequest {
                    detail: truncate(&body),
                })
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Step::Failed(FailureReason::Unauthorized)
            }
            StatusCode::NOT_FOUND => Step::Failed(FailureReason::NotFound),
            other => {
                let body = response.text().await.unwrap_or_default();
                Step::Retry {
                    reason: FailureReason::UpstreamStatus {
                        status: other.as_u16(),
                        body: truncate(&body),
                    },
                    wait: Some(retry.error_wait(attempt)),
                }
            }
        }
    }

    fn transport_step(&self, model: &ModelDescriptor, err: reqwest::Error) -> Step {
        let retry = &self.config.retry;
        if err.is_timeout() {
            log::warn!(
                "⏱️  [{}] request timed out after {}s",
                model.name,
                model.timeout.as_secs()
            );
            Step::Retry {
                reason: FailureReason::Timeout,
                wait: Some(retry.timeout_wait),
            }
        } else {
            log::warn!("[{}] request error: {}", model.name, err);
            Step::Retry {
                reason: FailureReason::Transport {
                    detail: err.to_string(),
                },
                wait: Some(retry.transport_wait),
            }
        }
    }
}

fn failure(model: &ModelDescriptor, reason: FailureReason, calls: u32) -> GenerationOutcome {
    GenerationOutcome::Failure(ModelFailure {
        model_name: model.name.clone(),
        reason,
        calls,
    })
}

/// Reads `estimated_time` (seconds) from a loading response body.
/// Values too large for a `Duration` saturate; the retry policy caps them.
pub fn parse_estimated_time(body: &str) -> Option<Duration> {
    let value: Value = serde_json::from_str(body).ok()?;
    let secs = value.get("estimated_time")?.as_f64()?;
    if secs.is_finite() && secs >= 0.0 {
        Some(Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX))
    } else {
        None
    }
}

fn truncate(text: &str) -> String {
    let text = text.trim();
    if text.chars().count() <= MAX_ERROR_BODY_CHARS {
        text.to_string()
    } else {
        let cut: String = text.chars().take(MAX_ERROR_BODY_CHARS).collect();
        format!("{}…", cut)
    }
}
