//! Registration store abstraction.
//!
//! The engine reaches persisted state only through [`RegistrationStore`]. Both
//! write methods are single-row compare-and-set operations: they take effect
//! only while their guard column is still null and report whether this call
//! was the one that changed the row.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::error::StoreError;
use crate::models::{CheckInStats, CouponState, Event, Registration};

/// Persistence operations needed by the check-in engine.
#[async_trait::async_trait]
pub trait RegistrationStore: Send + Sync {
    async fn find_event_by_slug(&self, slug: &str) -> Result<Option<Event>, StoreError>;

    /// Finds a registration by id, regardless of event.
    async fn find_registration(&self, id: Uuid) -> Result<Option<Registration>, StoreError>;

    /// Exact, case-sensitive email match within the event.
    async fn find_by_email(
        &self,
        event_id: Uuid,
        email: &str,
    ) -> Result<Option<Registration>, StoreError>;

    /// First registration in the event whose phone number equals any candidate.
    async fn find_by_phone(
        &self,
        event_id: Uuid,
        candidates: &[String],
    ) -> Result<Option<Registration>, StoreError>;

    /// Registration in the event whose upper-cased coupon code equals any variant.
    /// Variants are expected to be upper-cased already.
    async fn find_by_coupon_code(
        &self,
        event_id: Uuid,
        variants: &[String],
    ) -> Result<Option<Registration>, StoreError>;

    async fn coupon_code_exists(&self, code: &str) -> Result<bool, StoreError>;

    /// Sets `checked_in_at` only if it is still null, issuing `coupon_code` when
    /// given and no coupon exists yet. Returns the updated row, or `None` if the
    /// row was already checked in (or does not exist).
    async fn mark_checked_in(
        &self,
        id: Uuid,
        checked_in_at: DateTime<Utc>,
        coupon_code: Option<&str>,
    ) -> Result<Option<Registration>, StoreError>;

    /// Consumes the coupon only if it exists and is unredeemed. Returns the
    /// updated row, or `None` when nothing was consumed.
    async fn redeem_coupon(
        &self,
        event_id: Uuid,
        id: Uuid,
        redeemed_at: DateTime<Utc>,
    ) -> Result<Option<Registration>, StoreError>;

    async fn check_in_stats(&self, event_id: Uuid) -> Result<CheckInStats, StoreError>;
}

#[derive(Debug, Default)]
struct MemoryState {
    events: Vec<Event>,
    registrations: Vec<Registration>,
}

/// In-process store for development and testing.
///
/// Writes hold the lock for the whole compare-and-set, so concurrent callers
/// observe the same at-most-once behavior as the database conditional updates.
#[derive(Debug, Default)]
pub struct InMemoryRegistrationStore {
    state: Mutex<MemoryState>,
    /// Whether every call fails, for exercising persistence error paths.
    pub simulate_failure: bool,
}

impl InMemoryRegistrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store whose every operation fails.
    pub fn failing() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
            simulate_failure: true,
        }
    }

    pub async fn insert_event(&self, event: Event) {
        self.state.lock().await.events.push(event);
    }

    pub async fn insert_registration(&self, registration: Registration) {
        self.state.lock().await.registrations.push(registration);
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.simulate_failure {
            Err(StoreError::Database("simulated store failure".to_string()))
        } else {
            Ok(())
        }
    }
}

#[async_trait::async_trait]
impl RegistrationStore for InMemoryRegistrationStore {
    async fn find_event_by_slug(&self, slug: &str) -> Result<Option<Event>, StoreError> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state.events.iter().find(|e| e.slug == slug).cloned())
    }

    async fn find_registration(&self, id: Uuid) -> Result<Option<Registration>, StoreError> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state.registrations.iter().find(|r| r.id == id).cloned())
    }

    async fn find_by_email(
        &self,
        event_id: Uuid,
        email: &str,
    ) -> Result<Option<Registration>, StoreError> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state
            .registrations
            .iter()
            .find(|r| r.event_id == event_id && r.email == email)
            .cloned())
    }

    async fn find_by_phone(
        &self,
        event_id: Uuid,
        candidates: &[String],
    ) -> Result<Option<Registration>, StoreError> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state
            .registrations
            .iter()
            .find(|r| {
                r.event_id == event_id
                    && r.phone_number
                        .as_ref()
                        .is_some_and(|phone| candidates.contains(phone))
            })
            .cloned())
    }

    async fn find_by_coupon_code(
        &self,
        event_id: Uuid,
        variants: &[String],
    ) -> Result<Option<Registration>, StoreError> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state
            .registrations
            .iter()
            .find(|r| {
                r.event_id == event_id
                    && r.coupon
                        .code()
                        .is_some_and(|code| variants.contains(&code.to_ascii_uppercase()))
            })
            .cloned())
    }

    async fn coupon_code_exists(&self, code: &str) -> Result<bool, StoreError> {
        self.check_available()?;
        let state = self.state.lock().await;
        Ok(state
            .registrations
            .iter()
            .any(|r| r.coupon.code() == Some(code)))
    }

    async fn mark_checked_in(
        &self,
        id: Uuid,
        checked_in_at: DateTime<Utc>,
        coupon_code: Option<&str>,
    ) -> Result<Option<Registration>, StoreError> {
        self.check_available()?;
        let mut state = self.state.lock().await;

        if let Some(code) = coupon_code {
            let taken: HashSet<&str> = state
                .registrations
                .iter()
                .filter(|r| r.id != id)
                .filter_map(|r| r.coupon.code())
                .collect();
            if taken.contains(code) {
                return Err(StoreError::Database(format!(
                    "duplicate coupon code {}",
                    code
                )));
            }
        }

        let Some(registration) = state
            .registrations
            .iter_mut()
            .find(|r| r.id == id && r.checked_in_at.is_none())
        else {
            return Ok(None);
        };

        registration.checked_in_at = Some(checked_in_at);
        if let Some(code) = coupon_code {
            if matches!(registration.coupon, CouponState::NoCoupon) {
                registration.coupon = CouponState::Issued {
                    code: code.to_string(),
                    issued_at: checked_in_at,
                };
            }
        }
        Ok(Some(registration.clone()))
    }

    async fn redeem_coupon(
        &self,
        event_id: Uuid,
        id: Uuid,
        redeemed_at: DateTime<Utc>,
    ) -> Result<Option<Registration>, StoreError> {
        self.check_available()?;
        let mut state = self.state.lock().await;

        let Some(registration) = state
            .registrations
            .iter_mut()
            .find(|r| r.id == id && r.event_id == event_id)
        else {
            return Ok(None);
        };

        let (code, issued_at) = match &registration.coupon {
            CouponState::Issued { code, issued_at } => (code.clone(), *issued_at),
            _ => return Ok(None),
        };
        registration.coupon = CouponState::Redeemed {
            code,
            issued_at,
            redeemed_at,
        };
        Ok(Some(registration.clone()))
    }

    async fn check_in_stats(&self, event_id: Uuid) -> Result<CheckInStats, StoreError> {
        self.check_available()?;
        let state = self.state.lock().await;
        let mut stats = CheckInStats::default();
        for registration in state.registrations.iter().filter(|r| r.event_id == event_id) {
            stats.registered += 1;
            if registration.is_checked_in() {
                stats.checked_in += 1;
            }
            match registration.coupon {
                CouponState::NoCoupon => {}
                CouponState::Issued { .. } => stats.coupons_issued += 1,
                CouponState::Redeemed { .. } => {
                    stats.coupons_issued += 1;
                    stats.coupons_redeemed += 1;
                }
            }
        }
        Ok(stats)
    }
}
