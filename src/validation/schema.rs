//! Declarative schemas and the validator that runs them.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::error::{FieldError, ValidationFailure};
use super::rule::{Record, Rule, RuleContext};

/// Rules attached to one field, evaluated in order.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: &'static str,
    pub rules: Vec<Rule>,
}

/// A named, immutable set of field rules.
#[derive(Debug, Clone)]
pub struct Schema {
    name: &'static str,
    fields: Vec<FieldSpec>,
}

impl Schema {
    pub fn builder(name: &'static str) -> SchemaBuilder {
        SchemaBuilder {
            name,
            fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    /// Validate a record against the schema using the current time.
    pub fn validate(&self, record: &Record) -> Result<Record, ValidationFailure> {
        self.validate_at(record, Utc::now())
    }

    /// Validate a record with an explicit notion of "now".
    ///
    /// Every rule of every field runs; violations are collected rather than
    /// returned on first failure. On success only declared fields present in
    /// the input are carried over.
    pub fn validate_at(
        &self,
        record: &Record,
        now: DateTime<Utc>,
    ) -> Result<Record, ValidationFailure> {
        let mut errors: Vec<FieldError> = Vec::new();

        for field_spec in &self.fields {
            let value = record.get(field_spec.name);
            let ctx = RuleContext {
                field: field_spec.name,
                record,
                now,
            };
            for rule in &field_spec.rules {
                if let Err(e) = rule.check(value, &ctx) {
                    errors.push(e);
                }
            }
        }

        if !errors.is_empty() {
            tracing::debug!(
                schema = self.name,
                error_count = errors.len(),
                "Record failed validation"
            );
            return Err(ValidationFailure::new(errors));
        }

        Ok(self
            .fields
            .iter()
            .filter_map(|field_spec| {
                record
                    .get(field_spec.name)
                    .map(|v| (field_spec.name.to_string(), v.clone()))
            })
            .collect())
    }

    /// Validate an arbitrary JSON value, rejecting anything that is not an object.
    pub fn validate_value(&self, value: &Value) -> Result<Record, ValidationFailure> {
        match value {
            Value::Object(record) => self.validate(record),
            other => Err(ValidationFailure::not_an_object(other.clone())),
        }
    }
}

/// Builder used while assembling schemas at startup.
pub struct SchemaBuilder {
    name: &'static str,
    fields: Vec<FieldSpec>,
}

impl SchemaBuilder {
    pub fn field(mut self, name: &'static str, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.fields.push(FieldSpec {
            name,
            rules: rules.into_iter().collect(),
        });
        self
    }

    pub fn build(self) -> Arc<Schema> {
        Arc::new(Schema {
            name: self.name,
            fields: self.fields,
        })
    }
}
