//! Coupon code generation and submission normalization.
//!
//! Codes have the shape `{PREFIX}-{8 uppercase alphanumerics}`, for example
//! `AGAPE26-AB12CD34`. They resist casual guessing but are not secrets.

use shared::random::random_code_body;

/// Prefix used when none is configured.
pub const DEFAULT_COUPON_PREFIX: &str = "AGAPE26";

/// Length of the random part of a code.
pub const COUPON_BODY_LENGTH: usize = 8;

/// Shortest submission considered for lookup.
pub const MIN_COUPON_INPUT_LENGTH: usize = 4;

/// Generates and normalizes coupon codes for one prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CouponCodeGenerator {
    prefix: String,
}

impl Default for CouponCodeGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_COUPON_PREFIX)
    }
}

impl CouponCodeGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into().to_ascii_uppercase(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Produces a fresh code.
    pub fn generate(&self) -> String {
        format!("{}-{}", self.prefix, random_code_body(COUPON_BODY_LENGTH))
    }

    /// Builds the lookup variants for a submitted code, upper-cased.
    ///
    /// Returns `None` when the trimmed input is too short to be a code.
    /// A dashed submission is also tried without dashes; an undashed one that
    /// starts with the prefix is also tried with the dash restored.
    pub fn lookup_variants(&self, submitted: &str) -> Option<Vec<String>> {
        let code = submitted.trim().to_ascii_uppercase();
        if code.chars().count() < MIN_COUPON_INPUT_LENGTH {
            return None;
        }

        let mut variants = vec![code.clone()];
        if code.contains('-') {
            variants.push(code.replace('-', ""));
        } else if let Some(rest) = code.strip_prefix(&self.prefix) {
            if !rest.is_empty() {
                variants.push(format!("{}-{}", self.prefix, rest));
            }
        }
        Some(variants)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::validation::is_code_segment;

    #[test]
    fn test_generate_format() {
        let generator = CouponCodeGenerator::default();
        let code = generator.generate();
        assert_eq!(code.len(), "AGAPE26-".len() + COUPON_BODY_LENGTH);
        let (prefix, body) = code.split_once('-').unwrap();
        assert_eq!(prefix, "AGAPE26");
        assert_eq!(body.len(), 8);
        assert!(is_code_segment(body));
    }

    #[test]
    fn test_generate_uniqueness() {
        let generator = CouponCodeGenerator::default();
        let codes: std::collections::HashSet<String> =
            (0..200).map(|_| generator.generate()).collect();
        assert!(codes.len() >= 199);
    }

    #[test]
    fn test_prefix_is_uppercased() {
        let generator = CouponCodeGenerator::new("vendor");
        assert_eq!(generator.prefix(), "VENDOR");
        assert!(generator.generate().starts_with("VENDOR-"));
    }

    #[test]
    fn test_variants_for_undashed_code() {
        let generator = CouponCodeGenerator::default();
        assert_eq!(
            generator.lookup_variants("AGAPE26AB12CD34").unwrap(),
            vec!["AGAPE26AB12CD34", "AGAPE26-AB12CD34"]
        );
    }

    #[test]
    fn test_variants_for_lowercase_dashed_code() {
        let generator = CouponCodeGenerator::default();
        assert_eq!(
            generator.lookup_variants("  agape26-ab12cd34 ").unwrap(),
            vec!["AGAPE26-AB12CD34", "AGAPE26AB12CD34"]
        );
    }

    #[test]
    fn test_variants_without_prefix() {
        let generator = CouponCodeGenerator::default();
        assert_eq!(
            generator.lookup_variants("AB12CD34").unwrap(),
            vec!["AB12CD34"]
        );
    }

    #[test]
    fn test_short_input_is_rejected() {
        let generator = CouponCodeGenerator::default();
        assert!(generator.lookup_variants("AB1").is_none());
        assert!(generator.lookup_variants("   AB1   ").is_none());
        assert!(generator.lookup_variants("").is_none());
        assert!(generator.lookup_variants("AB12").is_some());
    }
}
