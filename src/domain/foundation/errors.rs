//! Validation errors and the error codes learners see.

use std::fmt;
use thiserror::Error;

/// Rejected input: ids, learner messages, stored enum values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' is too long: {actual} exceeds {max}")]
    TooLong {
        field: String,
        max: usize,
        actual: usize,
    },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField { field: field.into() }
    }

    pub fn too_long(field: impl Into<String>, max: usize, actual: usize) -> Self {
        ValidationError::TooLong {
            field: field.into(),
            max,
            actual,
        }
    }

    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Name of the offending field.
    pub fn field(&self) -> &str {
        match self {
            ValidationError::EmptyField { field }
            | ValidationError::TooLong { field, .. }
            | ValidationError::InvalidFormat { field, .. } => field,
        }
    }
}

/// Code attached to every `error` event sent to a learner.
///
/// Provider failures have no code: they degrade to a fallback reply instead
/// of surfacing as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ValidationFailed,
    ModuleNotFound,
    ConversationNotFound,
    ConversationFinalized,
    PersistenceFailed,
    InternalError,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::ValidationFailed => "VALIDATION_FAILED",
            ErrorCode::ModuleNotFound => "MODULE_NOT_FOUND",
            ErrorCode::ConversationNotFound => "CONVERSATION_NOT_FOUND",
            ErrorCode::ConversationFinalized => "CONVERSATION_FINALIZED",
            ErrorCode::PersistenceFailed => "PERSISTENCE_FAILED",
            ErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn too_long_reports_both_lengths() {
        let err = ValidationError::too_long("content", 2000, 2500);
        assert_eq!(
            err.to_string(),
            "Field 'content' is too long: 2500 exceeds 2000"
        );
        assert_eq!(err.field(), "content");
    }

    #[test]
    fn field_is_available_for_every_variant() {
        assert_eq!(ValidationError::empty_field("learner_id").field(), "learner_id");
        assert_eq!(
            ValidationError::invalid_format("pace", "unknown pace 'fast-ish'").field(),
            "pace"
        );
    }

    #[test]
    fn codes_render_screaming_snake_case() {
        assert_eq!(ErrorCode::ModuleNotFound.to_string(), "MODULE_NOT_FOUND");
        assert_eq!(ErrorCode::ConversationFinalized.as_str(), "CONVERSATION_FINALIZED");
    }
}
