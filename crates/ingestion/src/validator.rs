//! EventValidator - schema checks and identity side effects
//!
//! Checks run in a fixed order and all findings are collected:
//! parameter count (truncating the excess), mandatory parameters, the
//! set-user-id and set-email side effects, then each remaining parameter.

use std::sync::Arc;

use contracts::{
    AttributeValue, EmailValidator, EventSchema, IdentityOutcome, IdentityValidator, RawEvent,
    TelemetryConfig, ValidationIssue,
};
use tracing::{debug, warn};

use crate::error::ValidationError;

/// Event reporting a new user id under `userId`
pub const SET_USER_ID_EVENT: &str = "set_user_id_event";
pub const USER_ID_KEY: &str = "userId";

/// Event reporting a new email under `email`
pub const SET_EMAIL_EVENT: &str = "set_email_event";
pub const EMAIL_KEY: &str = "email";

/// Result of one pipeline stage
#[derive(Debug, Clone, PartialEq)]
pub enum StageOutcome<T> {
    Accepted(T),
    Rejected(Vec<ValidationIssue>),
}

impl<T> StageOutcome<T> {
    /// Feed an accepted value into the next stage
    pub fn and_then<U>(self, next: impl FnOnce(T) -> StageOutcome<U>) -> StageOutcome<U> {
        match self {
            StageOutcome::Accepted(value) => next(value),
            StageOutcome::Rejected(issues) => StageOutcome::Rejected(issues),
        }
    }
}

/// Event that passed validation, with its non-fatal findings
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedEvent {
    pub event: RawEvent,
    pub issues: Vec<ValidationIssue>,
}

/// Validator stage
pub struct EventValidator {
    config: Arc<TelemetryConfig>,
    identity: Arc<dyn IdentityValidator>,
    email: Arc<dyn EmailValidator>,
}

impl EventValidator {
    pub fn new(
        config: Arc<TelemetryConfig>,
        identity: Arc<dyn IdentityValidator>,
        email: Arc<dyn EmailValidator>,
    ) -> Self {
        Self {
            config,
            identity,
            email,
        }
    }

    /// Run the stage: fatal findings reject, others travel with the event
    pub fn validate(&self, mut event: RawEvent) -> StageOutcome<ValidatedEvent> {
        let errors = self.check(&mut event);
        for error in &errors {
            warn!(event = %event.name, status = error.status(), "{error}");
        }

        let issues: Vec<ValidationIssue> = errors.iter().map(ValidationError::to_issue).collect();
        if errors.iter().any(ValidationError::is_fatal) {
            return StageOutcome::Rejected(issues);
        }
        StageOutcome::Accepted(ValidatedEvent { event, issues })
    }

    /// Collect all findings for `event`
    ///
    /// Truncates the attributes in place when the parameter limit is
    /// exceeded and applies identity side effects.
    pub fn check(&self, event: &mut RawEvent) -> Vec<ValidationError> {
        let Some(schema) = self.config.events.get(&event.name) else {
            return vec![ValidationError::UndefinedName {
                name: event.name.clone(),
            }];
        };

        let mut errors = Vec::new();
        errors.extend(self.check_parameter_count(schema, event));
        errors.extend(check_mandatory(schema, event));
        errors.extend(self.check_set_user_id(event));
        errors.extend(self.check_set_email(event));
        errors.extend(self.check_parameters(schema, event));
        errors
    }

    fn check_parameter_count(
        &self,
        schema: &EventSchema,
        event: &mut RawEvent,
    ) -> Option<ValidationError> {
        let limit = self.config.max_parameters_for(schema);
        let actual = event.attributes.len();
        if actual <= limit {
            return None;
        }
        event.attributes.truncate(limit);
        debug!(event = %event.name, actual, limit, "Trailing parameters dropped");
        Some(ValidationError::LimitOfParameters {
            name: event.name.clone(),
            actual,
            limit,
        })
    }

    fn check_set_user_id(&self, event: &RawEvent) -> Option<ValidationError> {
        if event.name != SET_USER_ID_EVENT {
            return None;
        }
        let user_id = event.attributes.get(USER_ID_KEY)?.as_str()?.trim();

        let limit = self.config.limits.legal_user_id_length;
        if user_id.chars().count() > limit {
            return Some(ValidationError::TooLongUserId {
                user_id: user_id.to_string(),
                limit,
            });
        }

        match self.identity.validate_user_id(user_id) {
            IdentityOutcome::Valid => {
                self.identity.commit_user_id(user_id);
                None
            }
            IdentityOutcome::AlreadySet => Some(ValidationError::AlreadySetUserId {
                user_id: user_id.to_string(),
            }),
            IdentityOutcome::Invalid => Some(ValidationError::InvalidUserId {
                user_id: user_id.to_string(),
            }),
        }
    }

    fn check_set_email(&self, event: &RawEvent) -> Option<ValidationError> {
        if event.name != SET_EMAIL_EVENT {
            return None;
        }
        let email = event.attributes.get(EMAIL_KEY)?.as_str()?;

        match self.email.validate_email(email) {
            IdentityOutcome::Valid => {
                self.email.commit_email(email);
                None
            }
            IdentityOutcome::AlreadySet => Some(ValidationError::AlreadySetEmail {
                email: email.to_string(),
            }),
            IdentityOutcome::Invalid => Some(ValidationError::InvalidEmail {
                email: email.to_string(),
            }),
        }
    }

    fn check_parameters(&self, schema: &EventSchema, event: &RawEvent) -> Vec<ValidationError> {
        let legal_length = self.config.limits.legal_parameter_length;
        let mut errors = Vec::new();

        for (key, value) in event.attributes.iter() {
            let Some(spec) = schema.parameters.get(key) else {
                errors.push(ValidationError::UndefinedParameter {
                    key: key.to_string(),
                });
                continue;
            };
            if !spec.param_type.matches(value) {
                errors.push(ValidationError::WrongType {
                    key: key.to_string(),
                    expected: spec.param_type,
                });
                continue;
            }
            // Booleans have no length limit
            if !matches!(value, AttributeValue::Boolean(_)) && value.text_len() > legal_length {
                errors.push(ValidationError::LimitOfCharacters {
                    key: key.to_string(),
                    limit: legal_length,
                });
            }
        }
        errors
    }
}

fn check_mandatory(schema: &EventSchema, event: &RawEvent) -> Vec<ValidationError> {
    schema
        .parameters
        .iter()
        .filter(|(key, spec)| spec.mandatory && !event.attributes.contains_key(key))
        .map(|(key, _)| ValidationError::UndefinedMandatoryParameter {
            name: event.name.clone(),
            key: key.clone(),
        })
        .collect()
}
