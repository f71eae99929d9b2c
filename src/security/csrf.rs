//! CSRF token checks.
//!
//! # Design Decisions
//! - Safe methods never need a token
//! - Mutating methods need the header token and the session cookie token,
//!   and they must be byte-for-byte equal (no trimming, no case folding)

use axum::http::{header, HeaderMap, Method};

/// Returns true for methods that must not change server state.
pub fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS | Method::TRACE)
}

/// Decide whether a request may proceed.
pub fn check(method: &Method, supplied: Option<&str>, session: Option<&str>) -> bool {
    if is_safe_method(method) {
        return true;
    }
    match (supplied, session) {
        (Some(s), Some(t)) if !s.is_empty() && !t.is_empty() => tokens_equal(s, t),
        _ => false,
    }
}

/// Byte comparison whose running time does not depend on where the tokens differ.
fn tokens_equal(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Generate a fresh random token for a session.
pub fn issue_token() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Read a cookie value by name from the `Cookie` headers.
pub fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(k, _)| *k == name)
        .map(|(_, v)| v)
}

/// `Set-Cookie` value binding `token` to the caller's session.
pub fn session_cookie(name: &str, token: &str) -> String {
    format!("{name}={token}; Path=/; HttpOnly; Secure; SameSite=Strict")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const MUTATING: [Method; 4] = [Method::POST, Method::PUT, Method::PATCH, Method::DELETE];

    #[test]
    fn test_safe_methods_always_pass() {
        for method in [Method::GET, Method::HEAD, Method::OPTIONS] {
            assert!(check(&method, None, None));
            assert!(check(&method, Some("a"), Some("b")));
        }
    }

    #[test]
    fn test_missing_tokens_deny() {
        for method in MUTATING {
            assert!(!check(&method, None, Some("t")));
            assert!(!check(&method, Some("t"), None));
            assert!(!check(&method, None, None));
            assert!(!check(&method, Some(""), Some("")));
        }
    }

    #[test]
    fn test_mismatch_denies_and_exact_match_allows() {
        for method in MUTATING {
            assert!(!check(&method, Some("abc"), Some("abd")));
            assert!(!check(&method, Some("ABC"), Some("abc")));
            assert!(!check(&method, Some("abc "), Some("abc")));
            assert!(!check(&method, Some("ab"), Some("abc")));
            assert!(check(&method, Some("abc"), Some("abc")));
        }
    }

    #[test]
    fn test_cookie_value_parsing() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark; csrf_token=tok123"));
        headers.append(header::COOKIE, HeaderValue::from_static("other=1"));
        assert_eq!(cookie_value(&headers, "csrf_token"), Some("tok123"));
        assert_eq!(cookie_value(&headers, "other"), Some("1"));
        assert_eq!(cookie_value(&headers, "missing"), None);
    }

    #[test]
    fn test_issued_tokens_are_unique() {
        assert_ne!(issue_token(), issue_token());
        assert_eq!(issue_token().len(), 32);
    }
}
