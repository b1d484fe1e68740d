//! HTTP route handlers.

pub mod check_in;
pub mod coupons;
pub mod health;
