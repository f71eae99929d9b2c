//! Named cross-field rules registered at startup.
//!
//! Card details are only required when `paymentMethod` is `card`; the
//! checks read the method from the full record instead of branching the
//! schema.

use std::sync::LazyLock;

use chrono::Datelike;
use regex::Regex;
use serde_json::Value;

use super::error::FieldError;
use super::rule::{is_blank, RuleContext, RuleRegistry};

pub const CARD_NUMBER: &str = "card_number";
pub const CARD_EXPIRY: &str = "card_expiry";
pub const CARD_CVV: &str = "card_cvv";

static EXPIRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(0[1-9]|1[0-2])/(\d{2})$").expect("expiry pattern"));

static CVV_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{3,4}$").expect("cvv pattern"));

/// Registry holding every rule the standard schemas refer to by name.
pub fn standard_registry() -> RuleRegistry {
    let mut registry = RuleRegistry::new();
    registry
        .register(CARD_NUMBER, card_number)
        .register(CARD_EXPIRY, card_expiry)
        .register(CARD_CVV, card_cvv);
    registry
}

fn paying_by_card(ctx: &RuleContext<'_>) -> bool {
    ctx.sibling_str("paymentMethod") == Some("card")
}

fn required_for_card(value: Option<&Value>, ctx: &RuleContext<'_>) -> Result<(), FieldError> {
    if is_blank(value) {
        return Err(ctx.error(
            "REQUIRED",
            format!("{} is required for card payments", ctx.field),
            value,
        ));
    }
    Ok(())
}

fn card_number(value: Option<&Value>, ctx: &RuleContext<'_>) -> Result<(), FieldError> {
    if !paying_by_card(ctx) {
        return Ok(());
    }
    required_for_card(value, ctx)?;
    let digits: String = value
        .and_then(Value::as_str)
        .unwrap_or_default()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    if (13..=19).contains(&digits.len()) && luhn_valid(&digits) {
        Ok(())
    } else {
        Err(ctx.error("INVALID_CARD_NUMBER", "Invalid card number", value))
    }
}

fn card_expiry(value: Option<&Value>, ctx: &RuleContext<'_>) -> Result<(), FieldError> {
    if !paying_by_card(ctx) {
        return Ok(());
    }
    required_for_card(value, ctx)?;
    let raw = value.and_then(Value::as_str).unwrap_or_default().trim();
    let Some(caps) = EXPIRY_RE.captures(raw) else {
        return Err(ctx.error(
            "INVALID_FORMAT",
            "Expiry date must be in MM/YY format",
            value,
        ));
    };
    // Both groups are fixed-width digits, parsing cannot fail.
    let month: u32 = caps[1].parse().unwrap_or(0);
    let year: i32 = 2000 + caps[2].parse::<i32>().unwrap_or(0);

    let today = ctx.now.date_naive();
    if (year, month) < (today.year(), today.month()) {
        return Err(ctx.error("CARD_EXPIRED", "Card has expired", value));
    }
    Ok(())
}

fn card_cvv(value: Option<&Value>, ctx: &RuleContext<'_>) -> Result<(), FieldError> {
    if !paying_by_card(ctx) {
        return Ok(());
    }
    required_for_card(value, ctx)?;
    match value.and_then(Value::as_str) {
        Some(s) if CVV_RE.is_match(s.trim()) => Ok(()),
        _ => Err(ctx.error("INVALID_CVV", "CVV must be 3 or 4 digits", value)),
    }
}

/// Luhn checksum over an all-digit string.
pub fn luhn_valid(digits: &str) -> bool {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let sum: u32 = digits
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let d = u32::from(b - b'0');
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}
