//! Input sanitization.
//!
//! Best-effort, defense-in-depth filter applied to request bodies before
//! validation. It does not replace output encoding where data is rendered.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static JAVASCRIPT_PROTOCOL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)javascript:").expect("javascript protocol pattern"));

static EVENT_HANDLER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)on\w+=").expect("event handler pattern"));

/// Strip unsafe substrings from a single string.
///
/// Removal is repeated until nothing changes so that fragments which only
/// form a pattern once an inner match is removed (`javajavascript:script:`)
/// are caught too; this keeps the function idempotent.
pub fn sanitize_str(input: &str) -> String {
    let mut current: String = input.chars().filter(|c| *c != '<' && *c != '>').collect();
    loop {
        let next = JAVASCRIPT_PROTOCOL_RE.replace_all(&current, "");
        let next = EVENT_HANDLER_RE.replace_all(&next, "").into_owned();
        if next == current {
            break;
        }
        current = next;
    }
    current.trim().to_string()
}

/// Recursively sanitize strings inside arrays and objects.
///
/// Object keys are preserved as-is; numbers, booleans and null pass through.
pub fn sanitize(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(sanitize_str(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(sanitize).collect()),
        Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, sanitize(v))).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_strips_angle_brackets_and_trims() {
        assert_eq!(sanitize_str("  <b>bold</b> "), "bbold/b");
    }

    #[test]
    fn test_strips_javascript_protocol_case_insensitive() {
        assert_eq!(sanitize_str("JavaScript:alert(1)"), "alert(1)");
        assert_eq!(sanitize_str("javajavascript:script:x"), "x");
    }

    #[test]
    fn test_strips_event_handlers() {
        assert_eq!(sanitize_str("img src=x OnError=alert(1)"), "img src=x alert(1)");
        assert_eq!(sanitize_str("ONMOUSEOVER=steal()"), "steal()");
    }

    #[test]
    fn test_recurses_into_containers() {
        let input = json!({
            "name": " <Jane> ",
            "tags": ["ok", "javascript:evil"],
            "nested": { "bio": "onload=x hi" },
            "age": 30,
            "active": true,
            "none": null,
        });
        let out = sanitize(input);
        assert_eq!(out, json!({
            "name": "Jane",
            "tags": ["ok", "evil"],
            "nested": { "bio": "x hi" },
            "age": 30,
            "active": true,
            "none": null,
        }));
    }

    #[test]
    fn test_idempotent() {
        let samples = [
            json!("  <script>javascript:onload=alert(1)</script>  "),
            json!(["jajavascript:vascript:", "ononerror=error=", " < > "]),
            json!({ "a": { "b": ["oNcLiCk=1", "x>y"] }, "c": 1.5 }),
            json!("on on=x"),
        ];
        for sample in samples {
            let once = sanitize(sample);
            let twice = sanitize(once.clone());
            assert_eq!(once, twice);
        }
    }
}
