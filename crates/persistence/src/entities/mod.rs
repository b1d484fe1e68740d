//! Database entity definitions.
//!
//! Entities are direct mappings to database rows.

pub mod event;
pub mod registration;

pub use event::EventEntity;
pub use registration::{CheckInStatsEntity, RegistrationEntity};
