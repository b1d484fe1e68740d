//! Event entity (database row mapping).

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the events table.
#[derive(Debug, Clone, FromRow)]
pub struct EventEntity {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub config: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl From<EventEntity> for domain::models::Event {
    fn from(entity: EventEntity) -> Self {
        Self {
            id: entity.id,
            slug: entity.slug,
            name: entity.name,
            config: entity.config,
            created_at: entity.created_at,
        }
    }
}
