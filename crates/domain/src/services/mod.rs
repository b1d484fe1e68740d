//! Domain services for event check-in.
//!
//! Services contain business logic that operates on domain models.

pub mod check_in;
pub mod coupon_code;
pub mod identity;
pub mod store;

pub use check_in::{CheckInService, DEFAULT_MAX_GENERATION_ATTEMPTS};
pub use coupon_code::{CouponCodeGenerator, DEFAULT_COUPON_PREFIX};
pub use identity::{phone_candidates, Identifier};
pub use store::{InMemoryRegistrationStore, RegistrationStore};
