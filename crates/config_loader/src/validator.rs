//! Configuration validation
//!
//! Rules:
//! - field ranges declared on the config types (tenant id, limits, batch size)
//! - schema names match their keys and are non-empty
//! - per-event parameter limits are > 0
//! - file sinks carry a `path` parameter
//! - sink names are unique

use std::collections::HashSet;

use contracts::{ContractError, SinkType, TelemetryConfig};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Validate a TelemetryConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &TelemetryConfig) -> Result<(), ContractError> {
    validate_ranges(config)?;
    validate_event_schemas(config)?;
    validate_sinks(config)?;
    Ok(())
}

/// Declarative range checks
fn validate_ranges(config: &TelemetryConfig) -> Result<(), ContractError> {
    config.validate().map_err(|errors| {
        let field = first_field_path(&errors).unwrap_or_else(|| "config".to_string());
        ContractError::config_validation(field, errors.to_string())
    })
}

/// Dotted path of the first failing field
fn first_field_path(errors: &ValidationErrors) -> Option<String> {
    let (key, kind) = errors.errors().iter().next()?;
    let nested = match kind {
        ValidationErrorsKind::Field(_) => None,
        ValidationErrorsKind::Struct(inner) => first_field_path(inner).map(|p| format!("{key}.{p}")),
        ValidationErrorsKind::List(items) => items.iter().next().and_then(|(idx, inner)| {
            first_field_path(inner).map(|p| format!("{key}[{idx}].{p}"))
        }),
    };
    nested.or_else(|| Some(key.to_string()))
}

/// Schema name consistency and limits
fn validate_event_schemas(config: &TelemetryConfig) -> Result<(), ContractError> {
    for (key, schema) in &config.events {
        if key.trim().is_empty() {
            return Err(ContractError::config_validation(
                "events",
                "event name cannot be empty",
            ));
        }
        if schema.name != *key {
            return Err(ContractError::config_validation(
                format!("events[{key}].name"),
                format!("schema name '{}' does not match key '{key}'", schema.name),
            ));
        }
        if schema.max_parameters == Some(0) {
            return Err(ContractError::config_validation(
                format!("events[{key}].max_parameters"),
                "max_parameters must be > 0",
            ));
        }
    }
    Ok(())
}

/// Sink names and type-specific parameters
fn validate_sinks(config: &TelemetryConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for (idx, sink) in config.sinks.iter().enumerate() {
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[{idx}].name"),
                format!("duplicate sink name '{}'", sink.name),
            ));
        }
        if sink.sink_type == SinkType::File && !sink.params.contains_key("path") {
            return Err(ContractError::config_validation(
                format!("sinks[{idx}].params.path"),
                "file sink requires a 'path' parameter",
            ));
        }
    }
    Ok(())
}
