//! Event domain model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A ticketed event. Registrations are always scoped to exactly one event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Event {
    pub id: Uuid,
    /// Stable human key used in URLs and terminal configuration.
    pub slug: String,
    pub name: String,
    pub config: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl Event {
    /// Returns true if the registration's event reference points at this event.
    pub fn owns(&self, event_id: Uuid) -> bool {
        self.id == event_id
    }
}
