//! Registration entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{CheckInStats, CouponState, Registration};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the registrations table.
///
/// `coupon_active` is kept consistent with `coupon_code` and `coupon_used_at`
/// by a CHECK constraint, so the domain conversion derives state from those two.
#[derive(Debug, Clone, FromRow)]
pub struct RegistrationEntity {
    pub id: Uuid,
    pub event_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: Option<String>,
    pub gender: Option<String>,
    pub checked_in_at: Option<DateTime<Utc>>,
    pub coupon_code: Option<String>,
    pub coupon_active: bool,
    pub coupon_issued_at: Option<DateTime<Utc>>,
    pub coupon_used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RegistrationEntity {
    fn coupon_state(&self) -> CouponState {
        let Some(code) = self.coupon_code.clone() else {
            return CouponState::NoCoupon;
        };
        // Rows written before issuance was timestamped fall back to check-in time.
        let issued_at = self
            .coupon_issued_at
            .or(self.checked_in_at)
            .unwrap_or(self.updated_at);
        match self.coupon_used_at {
            None => CouponState::Issued { code, issued_at },
            Some(redeemed_at) => CouponState::Redeemed {
                code,
                issued_at,
                redeemed_at,
            },
        }
    }
}

impl From<RegistrationEntity> for Registration {
    fn from(entity: RegistrationEntity) -> Self {
        let coupon = entity.coupon_state();
        Self {
            id: entity.id,
            event_id: entity.event_id,
            first_name: entity.first_name,
            last_name: entity.last_name,
            email: entity.email,
            phone_number: entity.phone_number,
            gender: entity.gender,
            checked_in_at: entity.checked_in_at,
            coupon,
            created_at: entity.created_at,
        }
    }
}

/// Aggregated counters for one event.
#[derive(Debug, Clone, FromRow)]
pub struct CheckInStatsEntity {
    pub registered: i64,
    pub checked_in: i64,
    pub coupons_issued: i64,
    pub coupons_redeemed: i64,
}

impl From<CheckInStatsEntity> for CheckInStats {
    fn from(entity: CheckInStatsEntity) -> Self {
        Self {
            registered: entity.registered,
            checked_in: entity.checked_in,
            coupons_issued: entity.coupons_issued,
            coupons_redeemed: entity.coupons_redeemed,
        }
    }
}
