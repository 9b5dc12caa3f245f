//! Ingestion error types

use contracts::{ParameterType, ValidationIssue};
use thiserror::Error;

/// Pipeline construction errors
///
/// Reporting itself never fails; only wiring the pipeline can.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// The durable store could not be opened
    #[error("durable store unavailable: {0}")]
    Store(#[from] contracts::ContractError),

    /// An extra sink could not be created
    #[error("sink setup failed: {0}")]
    Sink(#[from] dispatcher::DispatcherError),
}

/// Ingestion Result alias
pub type Result<T> = std::result::Result<T, IngestionError>;

/// Per-event validation finding
///
/// Only `UndefinedName` is fatal; every other variant annotates the event.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("'{name}' is an undefined event")]
    UndefinedName { name: String },

    #[error(
        "event {name} contains {actual} parameters while the allowed number of parameters is {limit}. Some parameters were removed to process the event."
    )]
    LimitOfParameters {
        name: String,
        actual: usize,
        limit: usize,
    },

    #[error(
        "parameter '{key}' has not been configured for this event. It will not be tracked and cannot be used within a trigger."
    )]
    UndefinedParameter { key: String },

    #[error("event {name} has a mandatory parameter, {key}, which is undefined or empty.")]
    UndefinedMandatoryParameter { name: String, key: String },

    #[error(
        "'{key}' has exceeded the limit of allowed number of characters. The character limit is {limit}"
    )]
    LimitOfCharacters { key: String, limit: usize },

    #[error("'{key}' should be of TYPE {}", expected.as_str())]
    WrongType { key: String, expected: ParameterType },

    #[error("userId, {user_id}, is invalid")]
    InvalidUserId { user_id: String },

    #[error("userId, '{user_id}', is too long, the userId limit is {limit}.")]
    TooLongUserId { user_id: String, limit: usize },

    #[error("user id '{user_id}' was already set")]
    AlreadySetUserId { user_id: String },

    #[error("email, '{email}', is invalid.")]
    InvalidEmail { email: String },

    #[error("email '{email}' was already set")]
    AlreadySetEmail { email: String },
}

impl ValidationError {
    /// Numeric status reported with the issue
    pub fn status(&self) -> u32 {
        match self {
            ValidationError::UndefinedName { .. } => 1010,
            ValidationError::LimitOfParameters { .. } => 1020,
            ValidationError::UndefinedParameter { .. } => 1030,
            ValidationError::UndefinedMandatoryParameter { .. } => 1040,
            ValidationError::LimitOfCharacters { .. } => 1050,
            ValidationError::WrongType { .. } => 1060,
            ValidationError::InvalidUserId { .. } => 1070,
            ValidationError::TooLongUserId { .. } => 1071,
            ValidationError::AlreadySetUserId { .. } => 1072,
            ValidationError::InvalidEmail { .. } => 1080,
            ValidationError::AlreadySetEmail { .. } => 1081,
        }
    }

    /// Whether the event must be dropped
    pub fn is_fatal(&self) -> bool {
        matches!(self, ValidationError::UndefinedName { .. })
    }

    pub fn to_issue(&self) -> ValidationIssue {
        ValidationIssue::new(self.status(), self.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_message() {
        let err = ValidationError::WrongType {
            key: "price".into(),
            expected: ParameterType::Number,
        };
        assert_eq!(err.status(), 1060);
        assert_eq!(err.to_string(), "'price' should be of TYPE number");
        assert!(!err.is_fatal());

        let fatal = ValidationError::UndefinedName {
            name: "nope".into(),
        };
        assert!(fatal.is_fatal());
        let issue = fatal.to_issue();
        assert_eq!(issue.code, 1010);
        assert_eq!(issue.message, "'nope' is an undefined event");
    }
}
