//! Common validation and input-shape utilities.

use validator::ValidationError;

/// Characters allowed in a coupon prefix and code body.
const CODE_ALPHABET_PATTERN: &str = r"^[A-Z0-9]+$";

lazy_static::lazy_static! {
    static ref CODE_SEGMENT_REGEX: regex::Regex =
        regex::Regex::new(CODE_ALPHABET_PATTERN).unwrap();
}

/// Returns true if the identifier should be treated as an email address.
///
/// Anything containing `@` is an email; everything else is a phone number.
pub fn is_email_identifier(identifier: &str) -> bool {
    identifier.contains('@')
}

/// Strips whitespace and hyphens from a phone number as typed by an attendee.
pub fn strip_phone_formatting(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect()
}

/// Returns true if the segment is non-empty uppercase ASCII alphanumerics.
pub fn is_code_segment(segment: &str) -> bool {
    CODE_SEGMENT_REGEX.is_match(segment)
}

/// Validates that a free-form string is not blank.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Validates a check-in identifier (email or phone number).
pub fn validate_identifier(identifier: &str) -> Result<(), ValidationError> {
    let trimmed = identifier.trim();
    if trimmed.is_empty() {
        let mut err = ValidationError::new("identifier_blank");
        err.message = Some("Please enter your email or phone number".into());
        return Err(err);
    }
    if trimmed.len() > 320 {
        let mut err = ValidationError::new("identifier_length");
        err.message = Some("Identifier is too long".into());
        return Err(err);
    }
    if !is_email_identifier(trimmed) && strip_phone_formatting(trimmed).is_empty() {
        let mut err = ValidationError::new("identifier_empty_phone");
        err.message = Some("Please enter your email or phone number".into());
        return Err(err);
    }
    Ok(())
}
