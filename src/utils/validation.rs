use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;
use std::str::FromStr;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex")
});

/// Field name → message, in field order.
pub type FieldErrors = BTreeMap<&'static str, String>;

pub fn is_valid_email(value: &str) -> bool {
    EMAIL_RE.is_match(value)
}

/// Records an error when `value` is blank.
pub fn require(errors: &mut FieldErrors, field: &'static str, value: &str, message: &str) {
    if value.trim().is_empty() {
        errors.insert(field, message.to_string());
    }
}

/// Parses a non-blank value, recording `message` when it does not parse.
/// Blank or absent values yield `None` without an error.
pub fn parse_field<T: FromStr>(
    errors: &mut FieldErrors,
    field: &'static str,
    value: Option<&str>,
    message: &str,
) -> Option<T> {
    let value = value.map(str::trim).filter(|v| !v.is_empty())?;
    match value.parse() {
        Ok(parsed) => Some(parsed),
        Err(_) => {
            errors.insert(field, message.to_string());
            None
        }
    }
}

/// Trims an optional text field; blank means "no value".
pub fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
