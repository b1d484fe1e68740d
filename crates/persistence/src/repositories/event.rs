//! Event repository for database operations.

use sqlx::PgPool;

use crate::entities::EventEntity;
use crate::metrics::QueryTimer;

/// Repository for event lookups.
#[derive(Clone)]
pub struct EventRepository {
    pool: PgPool,
}

impl EventRepository {
    /// Creates a new EventRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Find an event by its slug.
    pub async fn find_by_slug(&self, slug: &str) -> Result<Option<EventEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_event_by_slug");
        let result = sqlx::query_as::<_, EventEntity>(
            r#"
            SELECT id, slug, name, config, created_at
            FROM events
            WHERE slug = $1
            "#,
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }
}
