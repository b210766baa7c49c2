use crate::{
    error::GenError,
    models::{
        suggestion_for, AggregateResult, FailureReason, GeneratedImage, GenerationOutcome,
        ModelFailure,
    },
};
use actix_web::{http::StatusCode, HttpResponse};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct GenerateSuccess {
    pub success: bool,
    pub image_url: String,
    pub model: String,
    pub prompt: String,
    pub enhanced_prompt: String,
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub size_bytes: u64,
    /// 1-based position of the model that produced the image.
    pub attempts: usize,
}

impl GenerateSuccess {
    pub fn new(image: &GeneratedImage, attempts: usize) -> Self {
        Self {
            success: true,
            image_url: image.locator.clone(),
            model: image.model_name.clone(),
            prompt: image.prompt.clone(),
            enhanced_prompt: image.enhanced_prompt.clone(),
            filename: image.file_name.clone(),
            width: image.width,
            height: image.height,
            size_bytes: image.byte_size,
            attempts,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ModelError {
    pub model: String,
    pub kind: &'static str,
    pub error: String,
}

impl From<&ModelFailure> for ModelError {
    fn from(failure: &ModelFailure) -> Self {
        Self {
            model: failure.model_name.clone(),
            kind: failure.reason.root().kind(),
            error: failure.reason.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GenerateFailure {
    pub success: bool,
    pub error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<ModelError>,
    pub suggestion: String,
}

impl GenerateFailure {
    pub fn new(error: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            errors: Vec::new(),
            suggestion: suggestion.into(),
        }
    }
}

pub fn error_response(err: &GenError) -> HttpResponse {
    let (status, suggestion) = match err {
        GenError::ValidationError(_) => (
            StatusCode::BAD_REQUEST,
            "Enter a descriptive prompt of at least a few characters.",
        ),
        GenError::ConfigError(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "The server is missing its API token or model list. Contact the administrator.",
        ),
        GenError::StorageError(_) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            "The server could not save the image. Try again later.",
        ),
        _ => (StatusCode::BAD_GATEWAY, "Try again in a few moments."),
    };
    HttpResponse::build(status).json(GenerateFailure::new(err.to_string(), suggestion))
}

/// 504 when every model timed out, 503 while anything may recover, 500 for local
/// storage trouble, 502 when every upstream refused the request outright.
fn failure_status<'a>(reasons: impl Iterator<Item = &'a FailureReason>) -> StatusCode {
    let errors: Vec<(&FailureReason, GenError)> =
        reasons.map(|reason| (reason, GenError::from(reason))).collect();

    if errors
        .iter()
        .all(|(reason, _)| matches!(reason.root(), FailureReason::Timeout))
    {
        StatusCode::GATEWAY_TIMEOUT
    } else if errors.iter().any(|(_, err)| err.is_transient()) {
        StatusCode::SERVICE_UNAVAILABLE
    } else if errors
        .iter()
        .any(|(_, err)| matches!(err, GenError::StorageError(_)))
    {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::BAD_GATEWAY
    }
}

pub fn aggregate_response(result: &AggregateResult) -> HttpResponse {
    if let (Some(image), Some(index)) = (result.success(), result.attempt_index()) {
        return HttpResponse::Ok().json(GenerateSuccess::new(image, index));
    }

    let errors: Vec<ModelError> = result.failures().map(ModelError::from).collect();
    let body = GenerateFailure {
        success: false,
        error: format!(
            "Failed to generate image after trying {} model(s)",
            errors.len()
        ),
        errors,
        suggestion: result.suggestion().to_string(),
    };
    HttpResponse::build(failure_status(result.failures().map(|f| &f.reason))).json(body)
}

pub fn outcome_response(outcome: &GenerationOutcome) -> HttpResponse {
    match outcome {
        GenerationOutcome::Success(image) => {
            HttpResponse::Ok().json(GenerateSuccess::new(image, 1))
        }
        GenerationOutcome::Failure(failure) => {
            let body = GenerateFailure {
                success: false,
                error: format!("{}: {}", failure.model_name, failure.reason),
                errors: vec![ModelError::from(failure)],
                suggestion: suggestion_for(std::iter::once(failure.reason.root())).to_string(),
            };
            HttpResponse::build(failure_status(std::iter::once(&failure.reason))).json(body)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_status_by_reason() {
        let timeout = FailureReason::Timeout;
        let loading = FailureReason::ExhaustedRetries {
            attempts: 3,
            last: Some(Box::new(FailureReason::ModelLoading)),
        };
        let storage = FailureReason::Storage {
            detail: "disk full".into(),
        };

        assert_eq!(
            failure_status([&timeout, &timeout].into_iter()),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            failure_status([&FailureReason::Unauthorized, &loading].into_iter()),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            failure_status([&FailureReason::Unauthorized, &FailureReason::NotFound].into_iter()),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            failure_status([&FailureReason::NotFound, &storage].into_iter()),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
