//! The schemas routes can declare, built once at startup.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::custom::{self, standard_registry};
use super::rule::{Rule, RuleRegistry, UnknownRule};
use super::schema::Schema;
use crate::auth::Role;

const GENDERS: &[&str] = &["female", "male", "other", "prefer_not_to_say"];
const APPOINTMENT_TYPES: &[&str] = &[
    "checkup",
    "cleaning",
    "filling",
    "extraction",
    "root_canal",
    "consultation",
    "emergency",
];
pub const PAYMENT_METHODS: &[&str] = &["cash", "card", "insurance", "bank_transfer"];

/// Minimum patient age accepted at registration.
pub const PATIENT_MIN_AGE: u32 = 18;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaName {
    Patient,
    Appointment,
    Payment,
    StaffInvitation,
}

/// Immutable lookup from [`SchemaName`] to its schema.
#[derive(Debug, Clone)]
pub struct SchemaCatalog {
    schemas: HashMap<SchemaName, Arc<Schema>>,
}

impl SchemaCatalog {
    /// Build the standard catalog with the built-in rule registry.
    pub fn standard() -> Result<Self, UnknownRule> {
        Self::with_registry(&standard_registry())
    }

    /// Build the standard catalog resolving named rules from `registry`.
    pub fn with_registry(registry: &RuleRegistry) -> Result<Self, UnknownRule> {
        let mut schemas = HashMap::new();
        schemas.insert(SchemaName::Patient, patient());
        schemas.insert(SchemaName::Appointment, appointment());
        schemas.insert(SchemaName::Payment, payment(registry)?);
        schemas.insert(SchemaName::StaffInvitation, staff_invitation());
        Ok(Self { schemas })
    }

    pub fn get(&self, name: SchemaName) -> Option<&Arc<Schema>> {
        self.schemas.get(&name)
    }
}

fn person_name() -> [Rule; 3] {
    [Rule::Required, Rule::MinLength(2), Rule::MaxLength(50)]
}

fn patient() -> Arc<Schema> {
    Schema::builder("patient")
        .field("firstName", person_name())
        .field("lastName", person_name())
        .field("email", [Rule::Required, Rule::Email])
        .field("phone", [Rule::Required, Rule::Phone])
        .field("dateOfBirth", [
            Rule::Required,
            Rule::Date,
            Rule::PastDate,
            Rule::MinAge(PATIENT_MIN_AGE),
        ])
        .field("gender", [Rule::OneOf(GENDERS)])
        .field("address", [Rule::MaxLength(200)])
        .field("insuranceProvider", [Rule::MaxLength(100)])
        .field("notes", [Rule::MaxLength(1000)])
        .build()
}

fn appointment() -> Arc<Schema> {
    Schema::builder("appointment")
        .field("patientId", [Rule::Required, Rule::Uuid])
        .field("dentistId", [Rule::Required, Rule::Uuid])
        .field("startTime", [Rule::Required, Rule::Date, Rule::FutureDate])
        .field("durationMinutes", [
            Rule::Required,
            Rule::Integer,
            Rule::Min(15.0),
            Rule::Max(240.0),
        ])
        .field("type", [Rule::Required, Rule::OneOf(APPOINTMENT_TYPES)])
        .field("notes", [Rule::MaxLength(1000)])
        .build()
}

fn payment(registry: &RuleRegistry) -> Result<Arc<Schema>, UnknownRule> {
    Ok(Schema::builder("payment")
        .field("patientId", [Rule::Required, Rule::Uuid])
        .field("amount", [
            Rule::Required,
            Rule::Numeric,
            Rule::Min(0.01),
            Rule::Max(100_000.0),
        ])
        .field("paymentMethod", [Rule::Required, Rule::OneOf(PAYMENT_METHODS)])
        .field("cardNumber", [registry.resolve(custom::CARD_NUMBER)?])
        .field("expiryDate", [registry.resolve(custom::CARD_EXPIRY)?])
        .field("cvv", [registry.resolve(custom::CARD_CVV)?])
        .field("reference", [Rule::MaxLength(100)])
        .build())
}

fn staff_invitation() -> Arc<Schema> {
    Schema::builder("staff_invitation")
        .field("email", [Rule::Required, Rule::Email])
        .field("role", [Rule::Required, Rule::OneOf(Role::NAMES)])
        .field("firstName", person_name())
        .field("lastName", person_name())
        .build()
}
