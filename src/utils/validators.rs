use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer};

// +62 / 62 / 0 prefix followed by an 8xx mobile number
static PHONE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\+62|62|0)8[0-9]{7,11}$").unwrap());

pub const MAX_NOTES_LEN: usize = 500;

pub fn validate_phone(phone: &str) -> bool {
    let compact: String = phone
        .chars()
        .filter(|c| !matches!(c, ' ' | '-'))
        .collect();
    PHONE_REGEX.is_match(&compact)
}

pub fn sanitize_string(input: &str) -> String {
    input.trim().to_string()
}

/// Trims free text and turns blank input into `None`.
pub fn normalize_notes(input: Option<&str>) -> Option<String> {
    input
        .map(sanitize_string)
        .filter(|notes| !notes.is_empty())
}

/// Serde helper: a missing, blank or whitespace-only string field becomes `None`.
pub fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(normalize_notes(value.as_deref()))
}

pub fn validate_notes(notes: Option<&str>) -> bool {
    notes.map_or(true, |n| n.chars().count() <= MAX_NOTES_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("081234567890"));
        assert!(validate_phone("+6281234567890"));
        assert!(validate_phone("0812-3456-7890"));
        assert!(!validate_phone("12345"));
        assert!(!validate_phone("+77771234567"));
        assert!(!validate_phone("0212345678"));
    }

    #[test]
    fn test_normalize_notes() {
        assert_eq!(normalize_notes(Some("  sudah transfer ")), Some("sudah transfer".to_string()));
        assert_eq!(normalize_notes(Some("   ")), None);
        assert_eq!(normalize_notes(None), None);
    }

    #[test]
    fn test_validate_notes() {
        assert!(validate_notes(None));
        assert!(validate_notes(Some("ok")));
        assert!(!validate_notes(Some(&"x".repeat(MAX_NOTES_LEN + 1))));
    }
}
