//! Vendor coupon endpoint handlers.
//!
//! Validation is read-only; only `redeem` consumes a coupon.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use domain::models::{
    CouponValidation, RedeemedCoupon, RedemptionOutcome, ValidCoupon, ValidateCouponRequest,
};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::{record_coupon_redeemed, record_redemption_rejected};
use crate::response::{success, Envelope};

const REDEMPTION_REJECTED: &str = "This coupon has already been redeemed or is not valid";

/// Check a coupon code before redeeming it.
///
/// POST /api/v1/events/:slug/coupons/validate
pub async fn validate_coupon(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    payload: Result<Json<ValidateCouponRequest>, JsonRejection>,
) -> Result<Envelope<ValidCoupon>, ApiError> {
    let Json(request) = payload?;
    request.validate()?;

    match state.check_in.validate_coupon(&slug, &request.code).await? {
        CouponValidation::Valid(coupon) => Ok(success(coupon)),
        CouponValidation::AlreadyRedeemed {
            holder_name,
            code,
            redeemed_at,
        } => {
            let when = redeemed_at
                .map(|t| format!(" at {}", t.format("%H:%M on %d %b")))
                .unwrap_or_default();
            Err(ApiError::AlreadyRedeemed(format!(
                "Coupon {} for {} was already redeemed{}",
                code, holder_name, when
            )))
        }
    }
}

/// Consume a registration's coupon. At most one call succeeds.
///
/// POST /api/v1/events/:slug/registrations/:id/redeem
pub async fn redeem_coupon(
    State(state): State<AppState>,
    Path((slug, id)): Path<(String, String)>,
) -> Result<Envelope<RedeemedCoupon>, ApiError> {
    // An unparseable id is reported like any other rejected redemption.
    let Ok(registration_id) = Uuid::parse_str(&id) else {
        record_redemption_rejected();
        return Err(ApiError::AlreadyRedeemed(REDEMPTION_REJECTED.to_string()));
    };

    match state.check_in.redeem_coupon(&slug, registration_id).await? {
        RedemptionOutcome::Redeemed(coupon) => {
            record_coupon_redeemed();
            Ok(success(coupon))
        }
        RedemptionOutcome::AlreadyRedeemedOrInvalid => {
            record_redemption_rejected();
            Err(ApiError::AlreadyRedeemed(REDEMPTION_REJECTED.to_string()))
        }
    }
}
