//! Field-level validation errors.

use serde::Serialize;
use serde_json::Value;

/// A single rule violation for one field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    /// Field the rule was attached to.
    pub field: String,
    /// Human readable message, safe to show to the caller.
    pub message: String,
    /// Stable machine code (e.g. `MIN_LENGTH`).
    pub code: String,
    /// The offending value as received (after sanitization).
    pub value: Value,
}

impl FieldError {
    pub fn new(
        field: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
        value: Value,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: code.into(),
            value,
        }
    }
}

/// Aggregate of every rule violation found in one record.
///
/// Errors are kept in schema order: fields in declaration order, rules in
/// the order they were attached to the field.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("validation failed with {} error(s)", errors.len())]
pub struct ValidationFailure {
    pub errors: Vec<FieldError>,
}

impl ValidationFailure {
    pub fn new(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }

    /// Failure for a payload that is not a JSON object at all.
    pub fn not_an_object(value: Value) -> Self {
        Self::new(vec![FieldError::new(
            "body",
            "INVALID_TYPE",
            "Request body must be a JSON object",
            value,
        )])
    }

    /// Errors reported for a given field.
    pub fn for_field<'a>(&'a self, field: &'a str) -> impl Iterator<Item = &'a FieldError> + 'a {
        self.errors.iter().filter(move |e| e.field == field)
    }

    /// Names of the fields that failed, in order, without duplicates.
    pub fn fields(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::new();
        for e in &self.errors {
            if !out.contains(&e.field.as_str()) {
                out.push(&e.field);
            }
        }
        out
    }
}
