//! Identity resolution helpers.
//!
//! Attendees type their email or phone number in whatever shape they know it.
//! Phone numbers are expanded into the national (`0...`), international
//! (`+234...`) and bare-international (`234...`) forms so any of them matches
//! the stored value.

use shared::validation::{is_email_identifier, strip_phone_formatting};

/// Country calling code used for phone variant expansion.
pub const COUNTRY_CODE: &str = "234";

/// A classified check-in identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Identifier {
    Email(String),
    /// Phone lookup candidates; the normalized input is always first.
    Phone(Vec<String>),
}

impl Identifier {
    /// Classifies raw input. Anything containing `@` is an email.
    ///
    /// Returns `None` for a phone number with no digits left after
    /// formatting is stripped.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if is_email_identifier(trimmed) {
            return Some(Identifier::Email(trimmed.to_string()));
        }
        if strip_phone_formatting(trimmed).is_empty() {
            return None;
        }
        Some(Identifier::Phone(phone_candidates(trimmed)))
    }

    /// Message shown when nothing matched.
    pub fn not_found_message(&self) -> &'static str {
        match self {
            Identifier::Email(_) => {
                "No registration found with this email address. Please check the spelling or try your phone number."
            }
            Identifier::Phone(_) => {
                "No registration found with this phone number. Please check the number or try your email address."
            }
        }
    }
}

/// Expands a phone number into the candidate forms it may be stored under.
pub fn phone_candidates(raw: &str) -> Vec<String> {
    let normalized = strip_phone_formatting(raw);
    let mut candidates = vec![normalized.clone()];

    let international = format!("+{}", COUNTRY_CODE);
    if let Some(rest) = normalized.strip_prefix(&international) {
        candidates.push(format!("0{}", rest));
    } else if let Some(rest) = normalized.strip_prefix(COUNTRY_CODE) {
        candidates.push(format!("+{}", normalized));
        candidates.push(format!("0{}", rest));
    } else if let Some(rest) = normalized.strip_prefix('0') {
        candidates.push(format!("+{}{}", COUNTRY_CODE, rest));
        candidates.push(format!("{}{}", COUNTRY_CODE, rest));
    } else {
        candidates.push(format!("0{}", normalized));
        candidates.push(format!("+{}{}", COUNTRY_CODE, normalized));
        candidates.push(format!("{}{}", COUNTRY_CODE, normalized));
    }

    candidates.dedup();
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_email() {
        assert_eq!(
            Identifier::parse("  someone@example.com "),
            Some(Identifier::Email("someone@example.com".to_string()))
        );
    }

    #[test]
    fn test_email_is_case_preserved() {
        assert_eq!(
            Identifier::parse("Someone@Example.com"),
            Some(Identifier::Email("Someone@Example.com".to_string()))
        );
    }

    #[test]
    fn test_international_prefix() {
        assert_eq!(
            phone_candidates("+2348012345678"),
            vec!["+2348012345678", "08012345678"]
        );
    }

    #[test]
    fn test_bare_country_code() {
        assert_eq!(
            phone_candidates("2348012345678"),
            vec!["2348012345678", "+2348012345678", "08012345678"]
        );
    }

    #[test]
    fn test_national_prefix() {
        assert_eq!(
            phone_candidates("08012345678"),
            vec!["08012345678", "+2348012345678", "2348012345678"]
        );
    }

    #[test]
    fn test_subscriber_number() {
        assert_eq!(
            phone_candidates("8012345678"),
            vec![
                "8012345678",
                "08012345678",
                "+2348012345678",
                "2348012345678"
            ]
        );
    }

    #[test]
    fn test_formatting_is_stripped_first() {
        assert_eq!(
            phone_candidates("+234 801-234-5678"),
            vec!["+2348012345678", "08012345678"]
        );
    }

    #[test]
    fn test_equivalent_inputs_share_a_candidate() {
        let stored = "08012345678".to_string();
        for input in ["08012345678", "+2348012345678", "2348012345678", "8012345678"] {
            assert!(
                phone_candidates(input).contains(&stored),
                "{} should reach the national form",
                input
            );
        }
    }

    #[test]
    fn test_not_found_messages_differ() {
        let email = Identifier::parse("a@b.c").unwrap();
        let phone = Identifier::parse("0801").unwrap();
        assert!(email.not_found_message().contains("email address"));
        assert!(phone.not_found_message().contains("phone number"));
    }

    #[test]
    fn test_formatting_only_phone_is_rejected() {
        assert_eq!(Identifier::parse("---"), None);
        assert_eq!(Identifier::parse(" - \t- "), None);
        assert!(Identifier::parse("0-8-0-1").is_some());
    }
}
