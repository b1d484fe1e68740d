//! Check-in and coupon request payloads and operation outcomes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::registration::{CheckInSnapshot, RegistrationSummary};

/// Request to find a registration by email or phone number.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct LookupRequest {
    #[validate(custom(function = "shared::validation::validate_identifier"))]
    pub identifier: String,
}

/// Request to complete check-in for a verified registration.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct CompleteCheckInRequest {
    /// Whether the attendee asked for a vendor coupon. Absent means no.
    #[serde(default)]
    pub wants_coupon: bool,
}

/// Request from a vendor terminal to validate a coupon code.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "snake_case")]
pub struct ValidateCouponRequest {
    #[validate(length(max = 64, message = "Coupon code is too long"))]
    pub code: String,
}

/// Result of looking up or verifying a registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "registration", rename_all = "snake_case")]
pub enum VerifyOutcome {
    Verified(RegistrationSummary),
    AlreadyCheckedIn(CheckInSnapshot),
}

impl VerifyOutcome {
    pub fn already_checked_in(&self) -> bool {
        matches!(self, VerifyOutcome::AlreadyCheckedIn(_))
    }
}

/// Result of completing a check-in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CheckInOutcome {
    CheckedIn {
        registration: CheckInSnapshot,
        /// Set when this call generated and stored a new coupon code.
        #[serde(skip)]
        coupon_issued: bool,
    },
    AlreadyCheckedIn {
        registration: CheckInSnapshot,
    },
}

impl CheckInOutcome {
    pub fn snapshot(&self) -> &CheckInSnapshot {
        match self {
            CheckInOutcome::CheckedIn { registration, .. }
            | CheckInOutcome::AlreadyCheckedIn { registration } => registration,
        }
    }

    pub fn already_checked_in(&self) -> bool {
        matches!(self, CheckInOutcome::AlreadyCheckedIn { .. })
    }

    pub fn coupon_issued(&self) -> bool {
        matches!(
            self,
            CheckInOutcome::CheckedIn {
                coupon_issued: true,
                ..
            }
        )
    }
}

/// A coupon that may be consumed, shown to the vendor before redemption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct ValidCoupon {
    pub registration_id: Uuid,
    pub holder_name: String,
    pub code: String,
}

/// Result of validating a coupon code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CouponValidation {
    Valid(ValidCoupon),
    AlreadyRedeemed {
        holder_name: String,
        code: String,
        redeemed_at: Option<DateTime<Utc>>,
    },
}

/// A successfully consumed coupon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct RedeemedCoupon {
    pub registration_id: Uuid,
    pub holder_name: String,
    pub code: String,
    pub redeemed_at: DateTime<Utc>,
}

/// Result of a redemption attempt.
///
/// A lost race, an already-used coupon and a registration without a coupon all
/// collapse into `AlreadyRedeemedOrInvalid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedemptionOutcome {
    Redeemed(RedeemedCoupon),
    AlreadyRedeemedOrInvalid,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::registration::CouponStatus;

    #[test]
    fn test_lookup_request_validation() {
        let valid = LookupRequest {
            identifier: "08012345678".to_string(),
        };
        assert!(valid.validate().is_ok());

        let blank = LookupRequest {
            identifier: "   ".to_string(),
        };
        assert!(blank.validate().is_err());
    }

    #[test]
    fn test_complete_check_in_request_defaults_to_no_coupon() {
        let request: CompleteCheckInRequest = serde_json::from_str("{}").unwrap();
        assert!(!request.wants_coupon);

        let request: CompleteCheckInRequest =
            serde_json::from_str(r#"{"wants_coupon": true}"#).unwrap();
        assert!(request.wants_coupon);
    }

    #[test]
    fn test_validate_coupon_request_length() {
        let ok = ValidateCouponRequest {
            code: "AGAPE26-AB12CD34".to_string(),
        };
        assert!(ok.validate().is_ok());

        let too_long = ValidateCouponRequest {
            code: "A".repeat(65),
        };
        assert!(too_long.validate().is_err());
    }

    #[test]
    fn test_verify_outcome_serialization() {
        let summary = RegistrationSummary {
            id: Uuid::nil(),
            first_name: "Ada".to_string(),
            last_name: "Obi".to_string(),
            email: "ada@example.com".to_string(),
            phone_number: None,
            gender: None,
        };
        let json = serde_json::to_value(VerifyOutcome::Verified(summary)).unwrap();
        assert_eq!(json["status"], "verified");
        assert_eq!(json["registration"]["first_name"], "Ada");
    }

    #[test]
    fn test_check_in_outcome_flags() {
        let snapshot = CheckInSnapshot {
            id: Uuid::nil(),
            first_name: "Ada".to_string(),
            last_name: "Obi".to_string(),
            email: "ada@example.com".to_string(),
            checked_in_at: Utc::now(),
            coupon_code: None,
            coupon_status: CouponStatus::NoCoupon,
            coupon_redeemed_at: None,
        };
        let first = CheckInOutcome::CheckedIn {
            registration: snapshot.clone(),
            coupon_issued: false,
        };
        let again = CheckInOutcome::AlreadyCheckedIn {
            registration: snapshot.clone(),
        };
        assert!(!first.already_checked_in());
        assert!(again.already_checked_in());
        assert!(!first.coupon_issued());
        assert_eq!(first.snapshot(), again.snapshot());

        let json = serde_json::to_value(&again).unwrap();
        assert_eq!(json["status"], "already_checked_in");
        assert_eq!(json["registration"]["first_name"], "Ada");

        let json = serde_json::to_value(&first).unwrap();
        assert_eq!(json["status"], "checked_in");
        assert!(json.get("coupon_issued").is_none());
    }
}
