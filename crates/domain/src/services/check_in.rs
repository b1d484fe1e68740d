//! Check-in and coupon lifecycle engine.
//!
//! Every operation is scoped to one event, addressed by slug. Registrations
//! only move forward: unchecked, checked in (with or without coupon), coupon
//! redeemed. Both forward writes are delegated to the store as conditional
//! single-row updates, so repeated or concurrent calls never double-apply.

use chrono::Utc;
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::error::CheckInError;
use crate::models::{
    CheckInOutcome, CheckInStats, CouponState, CouponValidation, Event, RedeemedCoupon,
    Registration, RedemptionOutcome, ValidCoupon, VerifyOutcome,
};
use crate::services::coupon_code::{CouponCodeGenerator, MIN_COUPON_INPUT_LENGTH};
use crate::services::identity::Identifier;
use crate::services::store::RegistrationStore;

/// Default number of attempts to find an unused coupon code.
pub const DEFAULT_MAX_GENERATION_ATTEMPTS: u32 = 10;

/// Check-in state machine, coupon issuance and redemption guard.
#[derive(Clone)]
pub struct CheckInService {
    store: Arc<dyn RegistrationStore>,
    codes: CouponCodeGenerator,
    max_generation_attempts: u32,
}

impl std::fmt::Debug for CheckInService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckInService")
            .field("coupon_prefix", &self.codes.prefix())
            .field("max_generation_attempts", &self.max_generation_attempts)
            .finish()
    }
}

impl CheckInService {
    pub fn new(store: Arc<dyn RegistrationStore>, codes: CouponCodeGenerator) -> Self {
        Self {
            store,
            codes,
            max_generation_attempts: DEFAULT_MAX_GENERATION_ATTEMPTS,
        }
    }

    pub fn with_max_generation_attempts(mut self, attempts: u32) -> Self {
        self.max_generation_attempts = attempts.max(1);
        self
    }

    /// Finds the registration matching an email or phone number.
    pub async fn find_by_identifier(
        &self,
        event_slug: &str,
        identifier: &str,
    ) -> Result<VerifyOutcome, CheckInError> {
        let event = self.event(event_slug).await?;
        let identifier = Identifier::parse(identifier).ok_or_else(|| {
            CheckInError::Malformed("Please enter your email or phone number".to_string())
        })?;

        let found = match &identifier {
            Identifier::Email(email) => self.store.find_by_email(event.id, email).await?,
            Identifier::Phone(candidates) => {
                self.store.find_by_phone(event.id, candidates).await?
            }
        };

        let registration = found.ok_or_else(|| {
            CheckInError::NotFound(identifier.not_found_message().to_string())
        })?;

        info!(
            event_slug = %event.slug,
            registration_id = %registration.id,
            "Registration found by identifier"
        );
        Ok(verify_outcome(&registration))
    }

    /// Looks up a registration by id, typically from a scanned QR code.
    ///
    /// Read-only.
    pub async fn verify(
        &self,
        event_slug: &str,
        registration_id: Uuid,
    ) -> Result<VerifyOutcome, CheckInError> {
        let event = self.event(event_slug).await?;
        let registration = self.scoped_registration(&event, registration_id).await?;
        Ok(verify_outcome(&registration))
    }

    /// Marks the registration as checked in, issuing a coupon if asked for.
    ///
    /// Already checked-in registrations are returned unchanged. A coupon is
    /// never issued for a `wants_coupon = false` call and never replaces one
    /// that already exists.
    pub async fn complete_check_in(
        &self,
        event_slug: &str,
        registration_id: Uuid,
        wants_coupon: bool,
    ) -> Result<CheckInOutcome, CheckInError> {
        let event = self.event(event_slug).await?;
        let registration = self.scoped_registration(&event, registration_id).await?;

        if let Some(snapshot) = registration.check_in_snapshot() {
            return Ok(CheckInOutcome::AlreadyCheckedIn {
                registration: snapshot,
            });
        }

        let new_code = if wants_coupon && registration.coupon.code().is_none() {
            Some(self.unique_code().await?)
        } else {
            None
        };

        let updated = self
            .store
            .mark_checked_in(registration_id, Utc::now(), new_code.as_deref())
            .await
            .map_err(|e| {
                error!(
                    event_slug = %event.slug,
                    registration_id = %registration_id,
                    error = %e,
                    "Failed to write check-in"
                );
                CheckInError::from(e)
            })?;

        match updated {
            Some(updated) => {
                let snapshot = updated.check_in_snapshot().ok_or_else(|| {
                    CheckInError::Persistence("check-in write returned an unchecked row".into())
                })?;
                info!(
                    event_slug = %event.slug,
                    registration_id = %registration_id,
                    coupon_code = snapshot.coupon_code.as_deref().unwrap_or("-"),
                    "Registration checked in"
                );
                Ok(CheckInOutcome::CheckedIn {
                    registration: snapshot,
                    coupon_issued: new_code.is_some(),
                })
            }
            None => {
                // Another caller checked this registration in between our read and write.
                warn!(
                    event_slug = %event.slug,
                    registration_id = %registration_id,
                    "Check-in lost a concurrent race; returning existing state"
                );
                let current = self.scoped_registration(&event, registration_id).await?;
                let snapshot = current.check_in_snapshot().ok_or_else(|| {
                    CheckInError::Persistence("conditional check-in matched no row".into())
                })?;
                Ok(CheckInOutcome::AlreadyCheckedIn {
                    registration: snapshot,
                })
            }
        }
    }

    /// Checks whether a submitted coupon code can be redeemed. Read-only.
    pub async fn validate_coupon(
        &self,
        event_slug: &str,
        submitted: &str,
    ) -> Result<CouponValidation, CheckInError> {
        let event = self.event(event_slug).await?;
        let variants = self.codes.lookup_variants(submitted).ok_or_else(|| {
            CheckInError::Malformed(format!(
                "Coupon code must be at least {} characters",
                MIN_COUPON_INPUT_LENGTH
            ))
        })?;

        let registration = self
            .store
            .find_by_coupon_code(event.id, &variants)
            .await?
            .ok_or_else(coupon_not_found)?;

        let holder_name = registration.full_name();
        match registration.coupon {
            CouponState::Issued { code, .. } => Ok(CouponValidation::Valid(ValidCoupon {
                registration_id: registration.id,
                holder_name,
                code,
            })),
            CouponState::Redeemed {
                code, redeemed_at, ..
            } => Ok(CouponValidation::AlreadyRedeemed {
                holder_name,
                code,
                redeemed_at: Some(redeemed_at),
            }),
            CouponState::NoCoupon => Err(coupon_not_found()),
        }
    }

    /// Consumes the registration's coupon. At most one call ever succeeds.
    pub async fn redeem_coupon(
        &self,
        event_slug: &str,
        registration_id: Uuid,
    ) -> Result<RedemptionOutcome, CheckInError> {
        let event = self.event(event_slug).await?;

        let updated = self
            .store
            .redeem_coupon(event.id, registration_id, Utc::now())
            .await
            .map_err(|e| {
                error!(
                    event_slug = %event.slug,
                    registration_id = %registration_id,
                    error = %e,
                    "Failed to write coupon redemption"
                );
                CheckInError::from(e)
            })?;

        let Some(registration) = updated else {
            info!(
                event_slug = %event.slug,
                registration_id = %registration_id,
                "Coupon redemption rejected"
            );
            return Ok(RedemptionOutcome::AlreadyRedeemedOrInvalid);
        };

        let holder_name = registration.full_name();
        match registration.coupon {
            CouponState::Redeemed {
                code, redeemed_at, ..
            } => {
                info!(
                    event_slug = %event.slug,
                    registration_id = %registration_id,
                    coupon_code = %code,
                    "Coupon redeemed"
                );
                Ok(RedemptionOutcome::Redeemed(RedeemedCoupon {
                    registration_id,
                    holder_name,
                    code,
                    redeemed_at,
                }))
            }
            _ => Err(CheckInError::Persistence(
                "redemption write returned an unredeemed row".into(),
            )),
        }
    }

    /// Counts registrations, check-ins and coupons for the event.
    pub async fn stats(&self, event_slug: &str) -> Result<CheckInStats, CheckInError> {
        let event = self.event(event_slug).await?;
        Ok(self.store.check_in_stats(event.id).await?)
    }

    async fn event(&self, slug: &str) -> Result<Event, CheckInError> {
        self.store
            .find_event_by_slug(slug)
            .await?
            .ok_or_else(|| CheckInError::EventNotFound(slug.to_string()))
    }

    async fn scoped_registration(
        &self,
        event: &Event,
        registration_id: Uuid,
    ) -> Result<Registration, CheckInError> {
        let registration = self
            .store
            .find_registration(registration_id)
            .await?
            .ok_or_else(|| CheckInError::NotFound("Registration not found".to_string()))?;

        if !event.owns(registration.event_id) {
            warn!(
                event_slug = %event.slug,
                registration_id = %registration_id,
                "Registration presented at the wrong event"
            );
            return Err(CheckInError::WrongEvent);
        }
        Ok(registration)
    }

    /// Generates a code not yet present in the store.
    async fn unique_code(&self) -> Result<String, CheckInError> {
        for _ in 0..self.max_generation_attempts {
            let code = self.codes.generate();
            if !self.store.coupon_code_exists(&code).await? {
                return Ok(code);
            }
        }
        Err(crate::error::StoreError::CodeGenerationExhausted(self.max_generation_attempts).into())
    }
}

fn verify_outcome(registration: &Registration) -> VerifyOutcome {
    match registration.check_in_snapshot() {
        Some(snapshot) => VerifyOutcome::AlreadyCheckedIn(snapshot),
        None => VerifyOutcome::Verified(registration.summary()),
    }
}

fn coupon_not_found() -> CheckInError {
    CheckInError::NotFound("Coupon not found. Please check the code and try again.".to_string())
}
