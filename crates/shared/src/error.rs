//! Application-wide error types.
//!
//! Core errors reach the boundary as a `(message, classification)` pair. How a
//! classification is rendered (HTTP status, exit code, …) is the caller's concern.

use serde::Serialize;
use thiserror::Error;

/// Result type alias using `AppError`.
pub type AppResult<T> = Result<T, AppError>;

/// Coarse classification of a failure, stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Malformed input or unknown reference data.
    Validation,
    /// Duplicate reference, double reversal, or a lost race.
    Conflict,
    /// A business rule evaluated against derived state rejected the request.
    BusinessRule,
    /// The underlying store failed.
    Persistence,
    /// An outbound collaborator failed.
    ExternalService,
    /// Anything else.
    Internal,
}

impl ErrorClass {
    /// Returns the snake_case name of the classification.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Conflict => "conflict",
            Self::BusinessRule => "business_rule",
            Self::Persistence => "persistence",
            Self::ExternalService => "external_service",
            Self::Internal => "internal",
        }
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application error types.
#[derive(Debug, Error)]
pub enum AppError {
    /// Validation error.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Conflict (e.g., duplicate reference).
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Business rule violation.
    #[error("Business rule violation: {0}")]
    BusinessRule(String),

    /// Persistence error.
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// External service error.
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Builds an error of the given classification.
    #[must_use]
    pub fn new(class: ErrorClass, message: impl Into<String>) -> Self {
        let message = message.into();
        match class {
            ErrorClass::Validation => Self::Validation(message),
            ErrorClass::Conflict => Self::Conflict(message),
            ErrorClass::BusinessRule => Self::BusinessRule(message),
            ErrorClass::Persistence => Self::Persistence(message),
            ErrorClass::ExternalService => Self::ExternalService(message),
            ErrorClass::Internal => Self::Internal(message),
        }
    }

    /// Returns the classification of this error.
    #[must_use]
    pub const fn classification(&self) -> ErrorClass {
        match self {
            Self::Validation(_) => ErrorClass::Validation,
            Self::Conflict(_) => ErrorClass::Conflict,
            Self::BusinessRule(_) => ErrorClass::BusinessRule,
            Self::Persistence(_) => ErrorClass::Persistence,
            Self::ExternalService(_) => ErrorClass::ExternalService,
            Self::Internal(_) => ErrorClass::Internal,
        }
    }

    /// Returns the error code for boundary responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Conflict(_) => "CONFLICT",
            Self::BusinessRule(_) => "BUSINESS_RULE_VIOLATION",
            Self::Persistence(_) => "PERSISTENCE_ERROR",
            Self::ExternalService(_) => "EXTERNAL_SERVICE_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Returns the bare message without the classification prefix.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Validation(m)
            | Self::Conflict(m)
            | Self::BusinessRule(m)
            | Self::Persistence(m)
            | Self::ExternalService(m)
            | Self::Internal(m) => m,
        }
    }

    /// Splits the error into the `(message, classification)` boundary pair.
    #[must_use]
    pub fn into_parts(self) -> (String, ErrorClass) {
        let class = self.classification();
        match self {
            Self::Validation(m)
            | Self::Conflict(m)
            | Self::BusinessRule(m)
            | Self::Persistence(m)
            | Self::ExternalService(m)
            | Self::Internal(m) => (m, class),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(ErrorClass::Validation, "VALIDATION_ERROR")]
    #[case(ErrorClass::Conflict, "CONFLICT")]
    #[case(ErrorClass::BusinessRule, "BUSINESS_RULE_VIOLATION")]
    #[case(ErrorClass::Persistence, "PERSISTENCE_ERROR")]
    #[case(ErrorClass::ExternalService, "EXTERNAL_SERVICE_ERROR")]
    #[case(ErrorClass::Internal, "INTERNAL_ERROR")]
    fn test_new_preserves_classification(#[case] class: ErrorClass, #[case] code: &str) {
        let err = AppError::new(class, "msg");
        assert_eq!(err.classification(), class);
        assert_eq!(err.error_code(), code);
        assert_eq!(err.message(), "msg");
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            AppError::Validation("msg".into()).to_string(),
            "Validation error: msg"
        );
        assert_eq!(
            AppError::Conflict("msg".into()).to_string(),
            "Conflict: msg"
        );
        assert_eq!(
            AppError::BusinessRule("msg".into()).to_string(),
            "Business rule violation: msg"
        );
        assert_eq!(
            AppError::Persistence("msg".into()).to_string(),
            "Persistence error: msg"
        );
    }

    #[test]
    fn test_into_parts() {
        let (message, class) = AppError::Conflict("duplicate reference".into()).into_parts();
        assert_eq!(message, "duplicate reference");
        assert_eq!(class, ErrorClass::Conflict);
        assert_eq!(class.to_string(), "conflict");
    }
}
