//! Registration repository for database operations.
//!
//! Check-in and redemption are single conditional `UPDATE ... RETURNING`
//! statements. A returned row means this statement made the change; no row
//! means the guard column was already set (or the row does not exist).

use chrono::{DateTime, Utc};
use domain::error::StoreError;
use domain::models::{CheckInStats, Event, Registration};
use domain::services::RegistrationStore;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{CheckInStatsEntity, RegistrationEntity};
use crate::metrics::QueryTimer;
use crate::repositories::EventRepository;

/// Repository for registration-related database operations.
#[derive(Clone)]
pub struct RegistrationRepository {
    pool: PgPool,
}

impl RegistrationRepository {
    /// Creates a new RegistrationRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Find registration by ID.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<RegistrationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_registration_by_id");
        let result = sqlx::query_as::<_, RegistrationEntity>(
            r#"
            SELECT id, event_id, first_name, last_name, email, phone_number, gender,
                   checked_in_at, coupon_code, coupon_active, coupon_issued_at, coupon_used_at,
                   created_at, updated_at
            FROM registrations
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find registration in an event by exact email.
    pub async fn find_by_email(
        &self,
        event_id: Uuid,
        email: &str,
    ) -> Result<Option<RegistrationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_registration_by_email");
        let result = sqlx::query_as::<_, RegistrationEntity>(
            r#"
            SELECT id, event_id, first_name, last_name, email, phone_number, gender,
                   checked_in_at, coupon_code, coupon_active, coupon_issued_at, coupon_used_at,
                   created_at, updated_at
            FROM registrations
            WHERE event_id = $1 AND email = $2
            ORDER BY created_at, id
            LIMIT 1
            "#,
        )
        .bind(event_id)
        .bind(email)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find the first registration in an event whose phone matches any candidate.
    pub async fn find_by_phone(
        &self,
        event_id: Uuid,
        candidates: &[String],
    ) -> Result<Option<RegistrationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_registration_by_phone");
        let result = sqlx::query_as::<_, RegistrationEntity>(
            r#"
            SELECT id, event_id, first_name, last_name, email, phone_number, gender,
                   checked_in_at, coupon_code, coupon_active, coupon_issued_at, coupon_used_at,
                   created_at, updated_at
            FROM registrations
            WHERE event_id = $1 AND phone_number = ANY($2)
            ORDER BY created_at, id
            LIMIT 1
            "#,
        )
        .bind(event_id)
        .bind(candidates)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Find registration in an event by coupon code, case-insensitively.
    ///
    /// `variants` must already be upper-cased.
    pub async fn find_by_coupon_code(
        &self,
        event_id: Uuid,
        variants: &[String],
    ) -> Result<Option<RegistrationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_registration_by_coupon_code");
        let result = sqlx::query_as::<_, RegistrationEntity>(
            r#"
            SELECT id, event_id, first_name, last_name, email, phone_number, gender,
                   checked_in_at, coupon_code, coupon_active, coupon_issued_at, coupon_used_at,
                   created_at, updated_at
            FROM registrations
            WHERE event_id = $1 AND UPPER(coupon_code) = ANY($2)
            LIMIT 1
            "#,
        )
        .bind(event_id)
        .bind(variants)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Check if a coupon code is already taken in any event.
    pub async fn coupon_code_exists(&self, code: &str) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("check_coupon_code_exists");
        let result = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS(SELECT 1 FROM registrations WHERE coupon_code = $1)
            "#,
        )
        .bind(code)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Mark a registration as checked in, guarded on `checked_in_at IS NULL`.
    ///
    /// When `coupon_code` is given and the row has no coupon yet, the coupon is
    /// issued in the same statement. An existing coupon is never overwritten.
    pub async fn mark_checked_in(
        &self,
        id: Uuid,
        checked_in_at: DateTime<Utc>,
        coupon_code: Option<&str>,
    ) -> Result<Option<RegistrationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("mark_registration_checked_in");
        let result = sqlx::query_as::<_, RegistrationEntity>(
            r#"
            UPDATE registrations
            SET checked_in_at = $2,
                coupon_code = COALESCE(coupon_code, $3),
                coupon_active = CASE
                    WHEN coupon_code IS NULL AND $3::text IS NOT NULL THEN true
                    ELSE coupon_active
                END,
                coupon_issued_at = CASE
                    WHEN coupon_code IS NULL AND $3::text IS NOT NULL THEN $2
                    ELSE coupon_issued_at
                END,
                updated_at = NOW()
            WHERE id = $1 AND checked_in_at IS NULL
            RETURNING id, event_id, first_name, last_name, email, phone_number, gender,
                      checked_in_at, coupon_code, coupon_active, coupon_issued_at, coupon_used_at,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(checked_in_at)
        .bind(coupon_code)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Consume a coupon, guarded on `coupon_used_at IS NULL`.
    pub async fn redeem_coupon(
        &self,
        event_id: Uuid,
        id: Uuid,
        redeemed_at: DateTime<Utc>,
    ) -> Result<Option<RegistrationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("redeem_coupon");
        let result = sqlx::query_as::<_, RegistrationEntity>(
            r#"
            UPDATE registrations
            SET coupon_active = false,
                coupon_used_at = $3,
                updated_at = NOW()
            WHERE id = $1
              AND event_id = $2
              AND coupon_code IS NOT NULL
              AND coupon_used_at IS NULL
            RETURNING id, event_id, first_name, last_name, email, phone_number, gender,
                      checked_in_at, coupon_code, coupon_active, coupon_issued_at, coupon_used_at,
                      created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(event_id)
        .bind(redeemed_at)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Count registrations, check-ins and coupons for an event.
    pub async fn check_in_stats(&self, event_id: Uuid) -> Result<CheckInStatsEntity, sqlx::Error> {
        let timer = QueryTimer::new("check_in_stats");
        let result = sqlx::query_as::<_, CheckInStatsEntity>(
            r#"
            SELECT
                COUNT(*) AS registered,
                COUNT(checked_in_at) AS checked_in,
                COUNT(coupon_code) AS coupons_issued,
                COUNT(coupon_used_at) AS coupons_redeemed
            FROM registrations
            WHERE event_id = $1
            "#,
        )
        .bind(event_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }
}

fn store_error(err: sqlx::Error) -> StoreError {
    StoreError::Database(err.to_string())
}

#[async_trait::async_trait]
impl RegistrationStore for RegistrationRepository {
    async fn find_event_by_slug(&self, slug: &str) -> Result<Option<Event>, StoreError> {
        EventRepository::new(self.pool.clone())
            .find_by_slug(slug)
            .await
            .map(|e| e.map(Into::into))
            .map_err(store_error)
    }

    async fn find_registration(&self, id: Uuid) -> Result<Option<Registration>, StoreError> {
        self.find_by_id(id)
            .await
            .map(|r| r.map(Into::into))
            .map_err(store_error)
    }

    async fn find_by_email(
        &self,
        event_id: Uuid,
        email: &str,
    ) -> Result<Option<Registration>, StoreError> {
        RegistrationRepository::find_by_email(self, event_id, email)
            .await
            .map(|r| r.map(Into::into))
            .map_err(store_error)
    }

    async fn find_by_phone(
        &self,
        event_id: Uuid,
        candidates: &[String],
    ) -> Result<Option<Registration>, StoreError> {
        RegistrationRepository::find_by_phone(self, event_id, candidates)
            .await
            .map(|r| r.map(Into::into))
            .map_err(store_error)
    }

    async fn find_by_coupon_code(
        &self,
        event_id: Uuid,
        variants: &[String],
    ) -> Result<Option<Registration>, StoreError> {
        RegistrationRepository::find_by_coupon_code(self, event_id, variants)
            .await
            .map(|r| r.map(Into::into))
            .map_err(store_error)
    }

    async fn coupon_code_exists(&self, code: &str) -> Result<bool, StoreError> {
        RegistrationRepository::coupon_code_exists(self, code)
            .await
            .map_err(store_error)
    }

    async fn mark_checked_in(
        &self,
        id: Uuid,
        checked_in_at: DateTime<Utc>,
        coupon_code: Option<&str>,
    ) -> Result<Option<Registration>, StoreError> {
        RegistrationRepository::mark_checked_in(self, id, checked_in_at, coupon_code)
            .await
            .map(|r| r.map(Into::into))
            .map_err(store_error)
    }

    async fn redeem_coupon(
        &self,
        event_id: Uuid,
        id: Uuid,
        redeemed_at: DateTime<Utc>,
    ) -> Result<Option<Registration>, StoreError> {
        RegistrationRepository::redeem_coupon(self, event_id, id, redeemed_at)
            .await
            .map(|r| r.map(Into::into))
            .map_err(store_error)
    }

    async fn check_in_stats(&self, event_id: Uuid) -> Result<CheckInStats, StoreError> {
        RegistrationRepository::check_in_stats(self, event_id)
            .await
            .map(Into::into)
            .map_err(store_error)
    }
}
