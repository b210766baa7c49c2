use crate::models::FailureReason;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Transient service error: {0}")]
    TransientServiceError(String),
    #[error("Permanent service error: {0}")]
    PermanentServiceError(String),
    #[error("Storage error: {0}")]
    StorageError(String),
}

impl GenError {
    /// Whether retrying the same call could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, GenError::TransientServiceError(_))
    }
}

impl From<&FailureReason> for GenError {
    fn from(reason: &FailureReason) -> Self {
        let message = reason.to_string();
        match reason.root() {
            FailureReason::BadRequest { .. }
            | FailureReason::Unauthorized
            | FailureReason::NotFound => GenError::PermanentServiceError(message),
            FailureReason::InvalidImage { .. } => GenError::ValidationError(message),
            FailureReason::Storage { .. } => GenError::StorageError(message),
            _ => GenError::TransientServiceError(message),
        }
    }
}

pub type Result<T> = std::result::Result<T, GenError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_reason_mapping() {
        assert!(matches!(
            GenError::from(&FailureReason::NotFound),
            GenError::PermanentServiceError(_)
        ));
        assert!(GenError::from(&FailureReason::Timeout).is_transient());
        let exhausted = FailureReason::ExhaustedRetries {
            attempts: 3,
            last: Some(Box::new(FailureReason::InvalidImage {
                detail: "too small".into(),
            })),
        };
        assert!(matches!(GenError::from(&exhausted), GenError::ValidationError(_)));
        assert!(matches!(
            GenError::from(&FailureReason::Storage { detail: "disk full".into() }),
            GenError::StorageError(_)
        ));
    }
}
