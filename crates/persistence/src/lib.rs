//! Persistence layer for the event check-in backend.
//!
//! This crate contains:
//! - Database connection management
//! - Entity definitions (database row mappings)
//! - Repository implementations, including the PostgreSQL registration store
//! - Query metrics

pub mod db;
pub mod entities;
pub mod metrics;
pub mod repositories;
