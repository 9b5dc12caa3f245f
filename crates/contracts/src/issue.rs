//! ValidationIssue - validator finding attached to an event

use serde::{Deserialize, Serialize};

/// Validation finding carried with the event downstream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationIssue {
    #[serde(rename = "status")]
    pub code: u32,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}
