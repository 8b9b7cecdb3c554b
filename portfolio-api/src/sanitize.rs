//! Inbound text sanitation and shape checks.
//!
//! Everything user-supplied is normalized here before it reaches the
//! document store: markup stripped, control characters removed, edges
//! trimmed.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::ApiError;

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());

static SUSPICIOUS_SQL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(union\s+select|drop\s+table|--|;\s*shutdown|or\s+1=1)").unwrap()
});

static IDEMPOTENCY_KEY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]{8,120}$").unwrap());

static EMAIL: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

/// Strip markup and control characters, then trim.
pub fn normalize_text(value: &str) -> String {
    let stripped = HTML_TAG.replace_all(value, "");
    stripped
        .chars()
        .filter(|c| !matches!(c, '\u{0000}'..='\u{001f}' | '\u{007f}'))
        .collect::<String>()
        .trim()
        .to_string()
}

/// Normalize every element and drop the ones that end up empty.
pub fn normalize_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .map(|value| normalize_text(value))
        .filter(|value| !value.is_empty())
        .collect()
}

pub fn is_suspicious(value: &str) -> bool {
    SUSPICIOUS_SQL.is_match(value)
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL.is_match(value)
}

pub fn is_valid_idempotency_key(value: &str) -> bool {
    IDEMPOTENCY_KEY.is_match(value)
}

/// Normalize a free-text field and enforce its length bounds and the
/// suspicious-pattern guard in one place.
pub fn validated_text(
    field: &str,
    value: &str,
    min: usize,
    max: usize,
) -> Result<String, ApiError> {
    let normalized = normalize_text(value);
    let length = normalized.chars().count();
    if length < min || length > max {
        return Err(ApiError::Validation(format!(
            "{field} must be between {min} and {max} characters"
        )));
    }
    if is_suspicious(&normalized) {
        return Err(ApiError::SuspiciousPayload);
    }
    Ok(normalized)
}
