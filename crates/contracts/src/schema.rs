//! Event schemas - per-event parameter declarations from configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::AttributeValue;

/// Declared parameter type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ParameterType {
    String,
    Number,
    Boolean,
}

impl ParameterType {
    /// Check a run-time value against the declared type
    pub fn matches(&self, value: &AttributeValue) -> bool {
        matches!(
            (self, value),
            (ParameterType::String, AttributeValue::String(_))
                | (ParameterType::Number, AttributeValue::Number(_))
                | (ParameterType::Boolean, AttributeValue::Boolean(_))
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterType::String => "string",
            ParameterType::Number => "number",
            ParameterType::Boolean => "boolean",
        }
    }
}

/// Parameter declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    #[serde(rename = "type")]
    pub param_type: ParameterType,

    #[serde(default)]
    pub mandatory: bool,
}

impl ParameterSpec {
    pub fn optional(param_type: ParameterType) -> Self {
        Self {
            param_type,
            mandatory: false,
        }
    }

    pub fn mandatory(param_type: ParameterType) -> Self {
        Self {
            param_type,
            mandatory: true,
        }
    }
}

/// Schema of one event name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventSchema {
    /// Event name (filled from the map key when omitted)
    #[serde(default)]
    pub name: String,

    /// Declared parameters
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterSpec>,

    /// Per-event parameter limit, overrides the global one
    #[serde(default)]
    pub max_parameters: Option<usize>,

    /// Event may trigger an immediate dispatch
    #[serde(default)]
    pub realtime: bool,

    /// Wire category override
    #[serde(default)]
    pub category: Option<String>,
}

impl EventSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_parameter(mut self, key: impl Into<String>, spec: ParameterSpec) -> Self {
        self.parameters.insert(key.into(), spec);
        self
    }

    pub fn with_realtime(mut self, realtime: bool) -> Self {
        self.realtime = realtime;
        self
    }
}
