//! Shared utilities for the event check-in backend.
//!
//! This crate provides input-shape helpers used across the other crates:
//! - Identifier classification and phone formatting cleanup
//! - Random code material for coupons
//! - Custom validators for request payloads

pub mod random;
pub mod validation;
