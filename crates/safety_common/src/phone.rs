//! Phone number contract: validation, E.164-ish normalization, display.
//!
//! Contacts are stored normalized so the outbound transport never has to
//! guess at formatting.

use once_cell::sync::Lazy;
use regex::Regex;

/// A plausible dialable number: optional +countrycode, then 10+ digits
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?\d{10,}$").expect("phone regex is valid"));

/// Strip spaces, dashes, dots and parentheses
fn strip_formatting(input: &str) -> String {
    input
        .chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect()
}

/// Accepts any string with 10+ digits after stripping formatting and an
/// optional leading +countrycode.
pub fn is_valid_phone_number(input: &str) -> bool {
    PHONE_RE.is_match(&strip_formatting(input))
}

/// Produce `+{countrycode}{digits}`. A bare 10-digit number defaults to
/// country code +1. Normalizing an already-normalized number is a no-op.
pub fn normalize_phone_number(input: &str) -> String {
    let stripped = strip_formatting(input);
    let digits: String = stripped.chars().filter(|c| c.is_ascii_digit()).collect();

    if stripped.starts_with('+') {
        return format!("+{}", digits);
    }
    if digits.len() == 10 {
        return format!("+1{}", digits);
    }
    format!("+{}", digits)
}

/// Render a normalized number as `(XXX) XXX-XXXX`, or
/// `+{cc} (XXX) XXX-XXXX` for non-US country codes.
///
/// Input that cannot be split into a country code and 10 local digits is
/// returned unchanged.
pub fn format_phone_number(input: &str) -> String {
    let normalized = normalize_phone_number(input);
    let digits = normalized.trim_start_matches('+');
    if digits.len() < 10 {
        return input.to_string();
    }

    let (cc, local) = digits.split_at(digits.len() - 10);
    let area = &local[0..3];
    let mid = &local[3..6];
    let line = &local[6..10];

    if cc.is_empty() || cc == "1" {
        format!("({}) {}-{}", area, mid, line)
    } else {
        format!("+{} ({}) {}-{}", cc, area, mid, line)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_numbers() {
        assert!(is_valid_phone_number("5551234567"));
        assert!(is_valid_phone_number("(555) 123-4567"));
        assert!(is_valid_phone_number("+1 555 123 4567"));
        assert!(is_valid_phone_number("+44 20 7946 0958"));
    }

    #[test]
    fn test_invalid_numbers() {
        assert!(!is_valid_phone_number(""));
        assert!(!is_valid_phone_number("555-1234"));
        assert!(!is_valid_phone_number("call me maybe"));
        assert!(!is_valid_phone_number("555123456x"));
    }

    #[test]
    fn test_normalize_us_number() {
        assert_eq!(normalize_phone_number("(555) 123-4567"), "+15551234567");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize_phone_number("(555) 123-4567");
        assert_eq!(normalize_phone_number(&once), once);
    }

    #[test]
    fn test_normalize_keeps_country_code() {
        assert_eq!(normalize_phone_number("+44 20 7946 0958"), "+442079460958");
        assert_eq!(normalize_phone_number("15551234567"), "+15551234567");
    }

    #[test]
    fn test_format_us_number() {
        assert_eq!(format_phone_number("+15551234567"), "(555) 123-4567");
        assert_eq!(format_phone_number("5551234567"), "(555) 123-4567");
    }

    #[test]
    fn test_format_international_number() {
        assert_eq!(format_phone_number("+442079460958"), "+44 (207) 946-0958");
    }
}
