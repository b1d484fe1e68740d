//! Attendee check-in endpoint handlers.

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Json,
};
use domain::models::{
    CheckInOutcome, CheckInStats, CompleteCheckInRequest, LookupRequest, VerifyOutcome,
};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::middleware::metrics::{record_check_in, record_coupon_issued};
use crate::response::{success, Envelope};

const REGISTRATION_NOT_FOUND: &str = "Registration not found";

/// A path id that is not a UUID cannot name any registration.
pub(crate) fn parse_registration_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::NotFound(REGISTRATION_NOT_FOUND.to_string()))
}

/// Find a registration by email or phone number.
///
/// POST /api/v1/events/:slug/registrations/lookup
pub async fn lookup_registration(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    payload: Result<Json<LookupRequest>, JsonRejection>,
) -> Result<Envelope<VerifyOutcome>, ApiError> {
    let Json(request) = payload?;
    request.validate()?;

    let outcome = state
        .check_in
        .find_by_identifier(&slug, &request.identifier)
        .await?;
    Ok(success(outcome))
}

/// Verify a registration id, typically scanned from a QR code.
///
/// GET /api/v1/events/:slug/registrations/:id/verify
pub async fn verify_registration(
    State(state): State<AppState>,
    Path((slug, id)): Path<(String, String)>,
) -> Result<Envelope<VerifyOutcome>, ApiError> {
    let registration_id = parse_registration_id(&id)?;
    let outcome = state.check_in.verify(&slug, registration_id).await?;
    Ok(success(outcome))
}

/// Complete check-in, optionally issuing a vendor coupon.
///
/// POST /api/v1/events/:slug/registrations/:id/check-in
pub async fn complete_check_in(
    State(state): State<AppState>,
    Path((slug, id)): Path<(String, String)>,
    payload: Result<Json<CompleteCheckInRequest>, JsonRejection>,
) -> Result<Envelope<CheckInOutcome>, ApiError> {
    let registration_id = parse_registration_id(&id)?;
    let Json(request) = payload?;

    let outcome = state
        .check_in
        .complete_check_in(&slug, registration_id, request.wants_coupon)
        .await?;

    if let CheckInOutcome::CheckedIn {
        registration,
        coupon_issued,
    } = &outcome
    {
        record_check_in(registration.coupon_code.is_some());
        if *coupon_issued {
            record_coupon_issued();
        }
    }

    Ok(success(outcome))
}

/// Check-in counters for the staff desk.
///
/// GET /api/v1/events/:slug/check-in/stats
pub async fn check_in_stats(
    State(state): State<AppState>,
    Path(slug): Path<String>,
) -> Result<Envelope<CheckInStats>, ApiError> {
    Ok(success(state.check_in.stats(&slug).await?))
}
