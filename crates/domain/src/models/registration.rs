//! Registration domain models.
//!
//! A registration moves forward only: unchecked, then checked in (optionally
//! with a coupon), then coupon redeemed. Coupon state is a single enum so that
//! an active coupon with a redemption timestamp cannot be represented.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Coupon lifecycle for a single registration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CouponState {
    NoCoupon,
    Issued {
        code: String,
        issued_at: DateTime<Utc>,
    },
    Redeemed {
        code: String,
        issued_at: DateTime<Utc>,
        redeemed_at: DateTime<Utc>,
    },
}

/// Flat coupon status used in API payloads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CouponStatus {
    NoCoupon,
    Issued,
    Redeemed,
}

impl std::fmt::Display for CouponStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CouponStatus::NoCoupon => write!(f, "no_coupon"),
            CouponStatus::Issued => write!(f, "issued"),
            CouponStatus::Redeemed => write!(f, "redeemed"),
        }
    }
}

impl CouponState {
    /// The coupon code, if one was ever issued.
    pub fn code(&self) -> Option<&str> {
        match self {
            CouponState::NoCoupon => None,
            CouponState::Issued { code, .. } | CouponState::Redeemed { code, .. } => Some(code),
        }
    }

    /// True only while a coupon exists and has not been redeemed.
    pub fn is_active(&self) -> bool {
        matches!(self, CouponState::Issued { .. })
    }

    pub fn redeemed_at(&self) -> Option<DateTime<Utc>> {
        match self {
            CouponState::Redeemed { redeemed_at, .. } => Some(*redeemed_at),
            _ => None,
        }
    }

    pub fn status(&self) -> CouponStatus {
        match self {
            CouponState::NoCoupon => CouponStatus::NoCoupon,
            CouponState::Issued { .. } => CouponStatus::Issued,
            CouponState::Redeemed { .. } => CouponStatus::Redeemed,
        }
    }
}

/// One attendee's record for one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Registration {
    pub id: Uuid,
    pub event_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub gender: Option<String>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub coupon: CouponState,
    pub created_at: DateTime<Utc>,
}

impl Registration {
    pub fn is_checked_in(&self) -> bool {
        self.checked_in_at.is_some()
    }

    /// Display name shown to desk staff and vendors.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name.trim(), self.last_name.trim())
            .trim()
            .to_string()
    }

    pub fn summary(&self) -> RegistrationSummary {
        RegistrationSummary {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            phone_number: self.phone_number.clone(),
            gender: self.gender.clone(),
        }
    }

    /// Read-only view of a checked-in registration. `None` if not checked in.
    pub fn check_in_snapshot(&self) -> Option<CheckInSnapshot> {
        let checked_in_at = self.checked_in_at?;
        Some(CheckInSnapshot {
            id: self.id,
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            email: self.email.clone(),
            checked_in_at,
            coupon_code: self.coupon.code().map(str::to_string),
            coupon_status: self.coupon.status(),
            coupon_redeemed_at: self.coupon.redeemed_at(),
        })
    }
}

/// Basic attendee info returned when a registration is verified but not yet checked in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RegistrationSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub gender: Option<String>,
}

/// State of a registration after check-in, including any coupon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CheckInSnapshot {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub checked_in_at: DateTime<Utc>,
    pub coupon_code: Option<String>,
    pub coupon_status: CouponStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coupon_redeemed_at: Option<DateTime<Utc>>,
}

/// Per-event counters for the staff desk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CheckInStats {
    pub registered: i64,
    pub checked_in: i64,
    pub coupons_issued: i64,
    pub coupons_redeemed: i64,
}
