//! Rule kinds and their evaluation.
//!
//! # Design Decisions
//! - Rules are a closed enum; integrators add behaviour through
//!   [`Rule::Custom`], resolved by name from a [`RuleRegistry`] while
//!   schemas are built at startup
//! - Built-in rules other than `Required` pass on absent, null or blank
//!   values so optional fields only get checked when supplied
//! - Rules that depend on a parsed value (bounds, date comparisons) pass
//!   when the value cannot be parsed; the format rule reports it instead,
//!   which keeps one violation per failing rule
//! - Custom rules always run: they see the full record and decide for
//!   themselves whether an empty value is acceptable

use std::collections::HashMap;
use std::sync::LazyLock;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use regex::Regex;
use serde_json::{Map, Value};

use super::error::FieldError;

/// A record under validation: field name to JSON value.
pub type Record = Map<String, Value>;

/// Signature shared by every named custom rule.
pub type CustomCheck = fn(Option<&Value>, &RuleContext<'_>) -> Result<(), FieldError>;

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern"));

static PHONE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[1-9]\d{9,14}$").expect("phone pattern"));

static PHONE_SEPARATORS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\s\-().]").expect("phone separator pattern"));

/// Everything a rule may look at besides the value itself.
#[derive(Debug, Clone, Copy)]
pub struct RuleContext<'a> {
    pub field: &'a str,
    pub record: &'a Record,
    pub now: DateTime<Utc>,
}

impl RuleContext<'_> {
    /// Build a [`FieldError`] for the current field.
    pub fn error(&self, code: &str, message: impl Into<String>, value: Option<&Value>) -> FieldError {
        FieldError::new(
            self.field,
            code,
            message,
            value.cloned().unwrap_or(Value::Null),
        )
    }

    /// String value of another field in the same record.
    pub fn sibling_str(&self, field: &str) -> Option<&str> {
        self.record.get(field).and_then(Value::as_str)
    }
}

/// One validation rule attached to a schema field.
#[derive(Clone)]
pub enum Rule {
    Required,
    MinLength(usize),
    MaxLength(usize),
    Email,
    Phone,
    Uuid,
    Pattern { regex: Regex, message: &'static str },
    Numeric,
    Integer,
    Min(f64),
    Max(f64),
    Date,
    FutureDate,
    PastDate,
    MinAge(u32),
    MaxAge(u32),
    OneOf(&'static [&'static str]),
    Custom { name: &'static str, check: CustomCheck },
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Rule::Pattern { regex, .. } => write!(f, "Pattern({})", regex.as_str()),
            Rule::Custom { name, .. } => write!(f, "Custom({name})"),
            Rule::MinLength(n) => write!(f, "MinLength({n})"),
            Rule::MaxLength(n) => write!(f, "MaxLength({n})"),
            Rule::Min(n) => write!(f, "Min({n})"),
            Rule::Max(n) => write!(f, "Max({n})"),
            Rule::MinAge(n) => write!(f, "MinAge({n})"),
            Rule::MaxAge(n) => write!(f, "MaxAge({n})"),
            Rule::OneOf(opts) => write!(f, "OneOf({opts:?})"),
            other => f.write_str(other.kind()),
        }
    }
}

impl Rule {
    fn kind(&self) -> &'static str {
        match self {
            Rule::Required => "Required",
            Rule::MinLength(_) => "MinLength",
            Rule::MaxLength(_) => "MaxLength",
            Rule::Email => "Email",
            Rule::Phone => "Phone",
            Rule::Uuid => "Uuid",
            Rule::Pattern { .. } => "Pattern",
            Rule::Numeric => "Numeric",
            Rule::Integer => "Integer",
            Rule::Min(_) => "Min",
            Rule::Max(_) => "Max",
            Rule::Date => "Date",
            Rule::FutureDate => "FutureDate",
            Rule::PastDate => "PastDate",
            Rule::MinAge(_) => "MinAge",
            Rule::MaxAge(_) => "MaxAge",
            Rule::OneOf(_) => "OneOf",
            Rule::Custom { .. } => "Custom",
        }
    }

    /// Evaluate the rule against one field value.
    pub fn check(&self, value: Option<&Value>, ctx: &RuleContext<'_>) -> Result<(), FieldError> {
        if let Rule::Custom { check, .. } = self {
            return check(value, ctx);
        }
        if is_blank(value) {
            return match self {
                Rule::Required => Err(ctx.error(
                    "REQUIRED",
                    format!("{} is required", ctx.field),
                    value,
                )),
                _ => Ok(()),
            };
        }
        // Non-blank from here on.
        let Some(v) = value else { return Ok(()) };

        match self {
            Rule::Required | Rule::Custom { .. } => Ok(()),
            Rule::MinLength(min) => match v.as_str() {
                Some(s) if s.trim().chars().count() < *min => Err(ctx.error(
                    "MIN_LENGTH",
                    format!("{} must be at least {} characters", ctx.field, min),
                    value,
                )),
                Some(_) => Ok(()),
                None => Err(type_error(ctx, value, "a string")),
            },
            Rule::MaxLength(max) => match v.as_str() {
                Some(s) if s.trim().chars().count() > *max => Err(ctx.error(
                    "MAX_LENGTH",
                    format!("{} must be at most {} characters", ctx.field, max),
                    value,
                )),
                Some(_) => Ok(()),
                None => Err(type_error(ctx, value, "a string")),
            },
            Rule::Email => match v.as_str() {
                Some(s) if EMAIL_RE.is_match(s.trim()) => Ok(()),
                _ => Err(ctx.error("INVALID_EMAIL", "Invalid email format", value)),
            },
            Rule::Phone => match v.as_str() {
                Some(s) if is_phone(s) => Ok(()),
                _ => Err(ctx.error("INVALID_PHONE", "Invalid phone number format", value)),
            },
            Rule::Uuid => match v.as_str().map(uuid::Uuid::parse_str) {
                Some(Ok(_)) => Ok(()),
                _ => Err(ctx.error(
                    "INVALID_UUID",
                    format!("{} must be a valid identifier", ctx.field),
                    value,
                )),
            },
            Rule::Pattern { regex, message } => match v.as_str() {
                Some(s) if regex.is_match(s) => Ok(()),
                _ => Err(ctx.error("INVALID_FORMAT", *message, value)),
            },
            Rule::Numeric => match as_number(v) {
                Some(_) => Ok(()),
                None => Err(ctx.error(
                    "NOT_NUMERIC",
                    format!("{} must be a number", ctx.field),
                    value,
                )),
            },
            Rule::Integer => match as_number(v) {
                Some(n) if n.fract() == 0.0 => Ok(()),
                _ => Err(ctx.error(
                    "NOT_INTEGER",
                    format!("{} must be a whole number", ctx.field),
                    value,
                )),
            },
            Rule::Min(min) => match as_number(v) {
                Some(n) if n < *min => Err(ctx.error(
                    "BELOW_MINIMUM",
                    format!("{} must be at least {}", ctx.field, min),
                    value,
                )),
                _ => Ok(()),
            },
            Rule::Max(max) => match as_number(v) {
                Some(n) if n > *max => Err(ctx.error(
                    "ABOVE_MAXIMUM",
                    format!("{} must be at most {}", ctx.field, max),
                    value,
                )),
                _ => Ok(()),
            },
            Rule::Date => match parse_instant(v) {
                Some(_) => Ok(()),
                None => Err(ctx.error(
                    "INVALID_DATE",
                    format!("{} must be a valid date", ctx.field),
                    value,
                )),
            },
            Rule::FutureDate => match parse_instant(v) {
                Some(at) if at <= ctx.now => Err(ctx.error(
                    "NOT_IN_FUTURE",
                    format!("{} must be in the future", ctx.field),
                    value,
                )),
                _ => Ok(()),
            },
            Rule::PastDate => match parse_instant(v) {
                Some(at) if at >= ctx.now => Err(ctx.error(
                    "NOT_IN_PAST",
                    format!("{} must be in the past", ctx.field),
                    value,
                )),
                _ => Ok(()),
            },
            Rule::MinAge(min) => match parse_instant(v) {
                Some(at) if age_in_years(at.date_naive(), ctx.now.date_naive()) < i64::from(*min) => {
                    Err(ctx.error(
                        "BELOW_MINIMUM_AGE",
                        format!("Must be at least {} years old", min),
                        value,
                    ))
                }
                _ => Ok(()),
            },
            Rule::MaxAge(max) => match parse_instant(v) {
                Some(at) if age_in_years(at.date_naive(), ctx.now.date_naive()) > i64::from(*max) => {
                    Err(ctx.error(
                        "ABOVE_MAXIMUM_AGE",
                        format!("Must be at most {} years old", max),
                        value,
                    ))
                }
                _ => Ok(()),
            },
            Rule::OneOf(options) => match v.as_str() {
                Some(s) if options.contains(&s) => Ok(()),
                _ => Err(ctx.error(
                    "INVALID_CHOICE",
                    format!("{} must be one of: {}", ctx.field, options.join(", ")),
                    value,
                )),
            },
        }
    }
}

/// Error raised by [`RuleRegistry::resolve`] when a schema names a rule
/// that was never registered.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown validation rule '{0}'")]
pub struct UnknownRule(pub String);

/// Dispatch table of named custom rules, populated once at startup.
#[derive(Default, Clone)]
pub struct RuleRegistry {
    rules: HashMap<&'static str, CustomCheck>,
}

impl RuleRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) a named rule.
    pub fn register(&mut self, name: &'static str, check: CustomCheck) -> &mut Self {
        self.rules.insert(name, check);
        self
    }

    /// Look up a named rule, producing the [`Rule::Custom`] to attach to a field.
    pub fn resolve(&self, name: &str) -> Result<Rule, UnknownRule> {
        self.rules
            .get_key_value(name)
            .map(|(name, check)| Rule::Custom { name: *name, check: *check })
            .ok_or_else(|| UnknownRule(name.to_string()))
    }

    pub fn names(&self) -> impl Iterator<Item = &&'static str> {
        self.rules.keys()
    }
}

/// Absent, null, blank string or empty array.
pub fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(a)) => a.is_empty(),
        Some(_) => false,
    }
}

fn type_error(ctx: &RuleContext<'_>, value: Option<&Value>, expected: &str) -> FieldError {
    ctx.error(
        "INVALID_TYPE",
        format!("{} must be {}", ctx.field, expected),
        value,
    )
}

fn is_phone(raw: &str) -> bool {
    let compact = PHONE_SEPARATORS_RE.replace_all(raw.trim(), "");
    PHONE_RE.is_match(&compact)
}

/// Numbers and numeric strings.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Parse RFC 3339 timestamps, `YYYY-MM-DDTHH:MM:SS` (taken as UTC) and
/// plain `YYYY-MM-DD` dates (midnight UTC).
pub fn parse_instant(value: &Value) -> Option<DateTime<Utc>> {
    let s = value.as_str()?.trim();
    if let Ok(at) = DateTime::parse_from_rfc3339(s) {
        return Some(at.with_timezone(&Utc));
    }
    if let Ok(at) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(at.and_utc());
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|at| at.and_utc())
}

/// Whole years between `birth` and `today`, minus one if this year's
/// birthday has not been reached yet.
pub fn age_in_years(birth: NaiveDate, today: NaiveDate) -> i64 {
    let mut years = i64::from(today.year()) - i64::from(birth.year());
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        years -= 1;
    }
    years
}
