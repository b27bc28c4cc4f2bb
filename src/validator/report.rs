//! Accumulated result of validating one request

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// A blocking problem with one field
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ValidationError {
    /// Field path such as `body.items[2]` or `headers.Authorization`
    pub field: String,
    pub message: String,
    /// The offending value, when there is one
    pub value: Option<Value>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>, value: Option<&Value>) {
        self.errors.push(ValidationError {
            field: field.into(),
            message: message.into(),
            value: value.cloned(),
        });
    }

    pub fn add_warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn add_suggestion(&mut self, message: impl Into<String>) {
        self.suggestions.push(message.into());
    }

    /// Warnings and suggestions never make a request invalid
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Errors recorded for one field path
    pub fn errors_for<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a ValidationError> + 'a {
        self.errors.iter().filter(move |e| e.field == field)
    }

    pub fn summary(&self) -> String {
        if self.is_valid() {
            if self.warnings.is_empty() {
                "Request is valid".to_string()
            } else {
                format!("Request is valid ({} warnings)", self.warnings.len())
            }
        } else {
            format!("Request has {} validation errors", self.errors.len())
        }
    }
}
