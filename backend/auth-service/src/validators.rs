/// Input validation and normalization shared by both transports
use chrono::{DateTime, NaiveDate};

use crate::error::{AuthError, Result};

/// Shortest accepted password
pub const MIN_PASSWORD_LEN: usize = 6;

/// Trim and lowercase an email for lookup and storage
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Mask an email for logs: `alice@x.com` becomes `a***@x.com`
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => {
            let mut chars = local.chars();
            match (chars.next(), chars.next()) {
                (Some(first), Some(_)) => format!("{}***@{}", first, domain),
                _ => format!("**@{}", domain),
            }
        }
        None => "***@***".to_string(),
    }
}

/// Fail with a validation error naming every empty field
pub fn require_fields(fields: &[(&str, &str)]) -> Result<()> {
    let missing: Vec<&str> = fields
        .iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| *name)
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(AuthError::Validation(format!(
            "{} required",
            match missing.len() {
                1 => format!("{} is", missing[0]),
                _ => format!("{} are", missing.join(", ")),
            }
        )))
    }
}

pub fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::Validation(format!(
            "password must be at least {} characters long",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

/// Parse a date of birth given as an RFC 3339 timestamp or a `YYYY-MM-DD` date
///
/// Calendar-invalid dates such as `2024-02-30` are rejected.
pub fn parse_date_of_birth(raw: &str) -> Result<NaiveDate> {
    let raw = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(timestamp.date_naive());
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| AuthError::Validation("invalid DOB format".to_string()))
}

/// Blank strings become `None`
pub fn non_empty(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}
