//! Domain layer for the event check-in backend.
//!
//! This crate contains:
//! - Domain models (Event, Registration, coupon state, operation outcomes)
//! - The registration store abstraction and an in-memory implementation
//! - The check-in and coupon lifecycle engine
//! - Domain error types

pub mod error;
pub mod models;
pub mod services;
