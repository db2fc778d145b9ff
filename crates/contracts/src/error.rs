//! Layered error definitions
//!
//! Categorized by source: config / schema / sink

use thiserror::Error;
use validator::{ValidationErrors, ValidationErrorsKind};

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Schema Errors =====
    /// Events of one batch carry different key sets
    #[error(
        "Events have to have the same structure: event {index} has keys {found:?}, expected {expected:?}"
    )]
    SchemaMismatch {
        index: usize,
        expected: Vec<String>,
        found: Vec<String>,
    },

    // ===== Sink Errors =====
    /// Sink write error
    #[error("sink '{sink_name}' write error: {message}")]
    SinkWrite { sink_name: String, message: String },

    /// Sink connection error
    #[error("sink '{sink_name}' connection error: {message}")]
    SinkConnection { sink_name: String, message: String },

    /// Record serialization error
    #[error("serialize error: {0}")]
    Serialize(#[from] serde_json::Error),

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create sink write error
    pub fn sink_write(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkWrite {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// Create sink connection error
    pub fn sink_connection(sink_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkConnection {
            sink_name: sink_name.into(),
            message: message.into(),
        }
    }

    /// True for errors raised while building the client
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            Self::ConfigParse { .. } | Self::ConfigValidation { .. }
        )
    }
}

impl From<ValidationErrors> for ContractError {
    fn from(errors: ValidationErrors) -> Self {
        match first_violation(&errors, "") {
            Some((field, message)) => Self::config_validation(field, message),
            None => Self::config_validation("<unknown>", errors.to_string()),
        }
    }
}

/// Flatten nested validator output into `(dotted.path, message)`
fn first_violation(errors: &ValidationErrors, prefix: &str) -> Option<(String, String)> {
    let mut fields: Vec<_> = errors.errors().iter().collect();
    fields.sort_by(|a, b| a.0.cmp(b.0));

    for (field, kind) in fields {
        let path = if prefix.is_empty() {
            field.to_string()
        } else {
            format!("{prefix}.{field}")
        };
        match kind {
            ValidationErrorsKind::Field(violations) => {
                if let Some(violation) = violations.first() {
                    let message = violation
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| violation.code.to_string());
                    return Some((path, message));
                }
            }
            ValidationErrorsKind::Struct(inner) => {
                if let Some(found) = first_violation(inner, &path) {
                    return Some(found);
                }
            }
            ValidationErrorsKind::List(items) => {
                for (idx, inner) in items {
                    if let Some(found) = first_violation(inner, &format!("{path}[{idx}]")) {
                        return Some(found);
                    }
                }
            }
        }
    }
    None
}
