use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Deserialize)]
pub struct GenerationRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GeneratedImage {
    pub locator: String,
    pub file_name: String,
    pub model_name: String,
    pub prompt: String,
    pub enhanced_prompt: String,
    pub width: u32,
    pub height: u32,
    pub byte_size: u64,
    /// HTTP calls spent against this model, including the successful one.
    pub calls: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    BadRequest { detail: String },
    Unauthorized,
    NotFound,
    ModelLoading,
    RateLimited,
    Timeout,
    Transport { detail: String },
    UpstreamStatus { status: u16, body: String },
    InvalidImage { detail: String },
    Storage { detail: String },
    ExhaustedRetries {
        attempts: u32,
        last: Option<Box<FailureReason>>,
    },
}

impl FailureReason {
    /// Permanent failures are not worth another call against the same endpoint.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            FailureReason::BadRequest { .. } | FailureReason::Unauthorized | FailureReason::NotFound
        )
    }

    /// When the last attempt fails with one of these, the reason is reported
    /// as-is instead of being folded into `ExhaustedRetries`.
    pub fn ends_loop_as_is(&self) -> bool {
        matches!(
            self,
            FailureReason::Timeout
                | FailureReason::Transport { .. }
                | FailureReason::UpstreamStatus { .. }
        )
    }

    pub fn kind(&self) -> &'static str {
        match self {
            FailureReason::BadRequest { .. } => "bad_request",
            FailureReason::Unauthorized => "unauthorized",
            FailureReason::NotFound => "not_found",
            FailureReason::ModelLoading => "model_loading",
            FailureReason::RateLimited => "rate_limited",
            FailureReason::Timeout => "timeout",
            FailureReason::Transport { .. } => "transport",
            FailureReason::UpstreamStatus { .. } => "upstream_status",
            FailureReason::InvalidImage { .. } => "invalid_image",
            FailureReason::Storage { .. } => "storage",
            FailureReason::ExhaustedRetries { .. } => "exhausted_retries",
        }
    }

    /// The underlying cause, looking through `ExhaustedRetries`.
    pub fn root(&self) -> &FailureReason {
        match self {
            FailureReason::ExhaustedRetries {
                last: Some(last), ..
            } => last.root(),
            other => other,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::BadRequest { detail } => write!(f, "bad request: {}", detail),
            FailureReason::Unauthorized => write!(f, "authentication failed"),
            FailureReason::NotFound => write!(f, "model not found"),
            FailureReason::ModelLoading => write!(f, "model is loading"),
            FailureReason::RateLimited => write!(f, "rate limited"),
            FailureReason::Timeout => write!(f, "request timed out"),
            FailureReason::Transport { detail } => write!(f, "request failed: {}", detail),
            FailureReason::UpstreamStatus { status, body } => {
                write!(f, "API error {}: {}", status, body)
            }
            FailureReason::InvalidImage { detail } => write!(f, "invalid image: {}", detail),
            FailureReason::Storage { detail } => write!(f, "storage failed: {}", detail),
            FailureReason::ExhaustedRetries { attempts, last } => {
                write!(f, "exhausted retries after {} attempts", attempts)?;
                if let Some(last) = last {
                    write!(f, " (last error: {})", last)?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ModelFailure {
    pub model_name: String,
    pub reason: FailureReason,
    pub calls: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum GenerationOutcome {
    Success(GeneratedImage),
    Failure(ModelFailure),
}

impl GenerationOutcome {
    pub fn model_name(&self) -> &str {
        match self {
            GenerationOutcome::Success(image) => &image.model_name,
            GenerationOutcome::Failure(failure) => &failure.model_name,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, GenerationOutcome::Success(_))
    }
}

/// Outcomes of one fallback run, in the order the models were tried.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregateResult {
    pub outcomes: Vec<GenerationOutcome>,
}

impl AggregateResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, outcome: GenerationOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn is_success(&self) -> bool {
        self.success().is_some()
    }

    pub fn success(&self) -> Option<&GeneratedImage> {
        self.outcomes.iter().find_map(|outcome| match outcome {
            GenerationOutcome::Success(image) => Some(image),
            GenerationOutcome::Failure(_) => None,
        })
    }

    /// 1-based position of the model that succeeded.
    pub fn attempt_index(&self) -> Option<usize> {
        self.outcomes
            .iter()
            .position(GenerationOutcome::is_success)
            .map(|idx| idx + 1)
    }

    pub fn failures(&self) -> impl Iterator<Item = &ModelFailure> {
        self.outcomes.iter().filter_map(|outcome| match outcome {
            GenerationOutcome::Failure(failure) => Some(failure),
            GenerationOutcome::Success(_) => None,
        })
    }

    /// Human-readable hint for a failed run, derived from what went wrong.
    pub fn suggestion(&self) -> &'static str {
        suggestion_for(self.failures().map(|failure| failure.reason.root()))
    }
}

pub fn suggestion_for<'a>(reasons: impl Iterator<Item = &'a FailureReason>) -> &'static str {
    let reasons: Vec<&FailureReason> = reasons.collect();
    if reasons.is_empty() {
        return "Try again in a few moments.";
    }
    if reasons
        .iter()
        .any(|reason| matches!(reason, FailureReason::Unauthorized))
    {
        return "Check that HF_API_TOKEN is set to a valid token with inference access.";
    }
    if reasons.iter().all(|reason| {
        matches!(
            reason,
            FailureReason::ModelLoading | FailureReason::RateLimited
        )
    }) {
        return "The models are warming up or rate limited. Wait a minute and try again.";
    }
    if reasons
        .iter()
        .all(|reason| matches!(reason, FailureReason::Timeout))
    {
        return "The models are under heavy load. Try again later or use a shorter prompt.";
    }
    if reasons
        .iter()
        .any(|reason| matches!(reason, FailureReason::Storage { .. }))
    {
        return "The server could not save the image. Check that the images directory is writable.";
    }
    "Try again in a few moments or rephrase the prompt."
}

#[cfg(test)]
mod tests {
    use super::*;

    fn failure(model: &str, reason: FailureReason) -> GenerationOutcome {
        GenerationOutcome::Failure(ModelFailure {
            model_name: model.to_string(),
            reason,
            calls: 1,
        })
    }

    #[test]
    fn test_attempt_index_is_one_based() {
        let mut result = AggregateResult::new();
        result.push(failure("a", FailureReason::NotFound));
        result.push(GenerationOutcome::Success(GeneratedImage {
            locator: "/static/images/b.png".into(),
            file_name: "b.png".into(),
            model_name: "b".into(),
            prompt: "p".into(),
            enhanced_prompt: "p".into(),
            width: 300,
            height: 300,
            byte_size: 2048,
            calls: 1,
        }));
        assert_eq!(result.attempt_index(), Some(2));
        assert_eq!(result.success().map(|img| img.model_name.as_str()), Some("b"));
        assert_eq!(result.failures().count(), 1);
    }

    #[test]
    fn test_exhausted_retries_display_and_root() {
        let reason = FailureReason::ExhaustedRetries {
            attempts: 3,
            last: Some(Box::new(FailureReason::ModelLoading)),
        };
        assert_eq!(
            reason.to_string(),
            "exhausted retries after 3 attempts (last error: model is loading)"
        );
        assert_eq!(reason.root(), &FailureReason::ModelLoading);
        assert!(!reason.is_permanent());
    }

    #[test]
    fn test_suggestion_prefers_auth_hint() {
        let mut result = AggregateResult::new();
        result.push(failure("a", FailureReason::ModelLoading));
        result.push(failure("b", FailureReason::Unauthorized));
        assert!(result.suggestion().contains("HF_API_TOKEN"));

        let mut result = AggregateResult::new();
        result.push(failure(
            "a",
            FailureReason::ExhaustedRetries {
                attempts: 3,
                last: Some(Box::new(FailureReason::RateLimited)),
            },
        ));
        assert!(result.suggestion().contains("warming up"));
    }

    #[test]
    fn test_failure_reason_serializes_with_kind_tag() {
        let value = serde_json::to_value(FailureReason::UpstreamStatus {
            status: 500,
            body: "boom".into(),
        })
        .unwrap();
        assert_eq!(value["kind"], "upstream_status");
        assert_eq!(value["status"], 500);
    }
}
