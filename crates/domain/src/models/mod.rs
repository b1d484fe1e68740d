//! Domain models for event check-in.

pub mod check_in;
pub mod event;
pub mod registration;

pub use check_in::{
    CheckInOutcome, CompleteCheckInRequest, CouponValidation, LookupRequest, RedeemedCoupon,
    RedemptionOutcome, ValidCoupon, ValidateCouponRequest, VerifyOutcome,
};
pub use event::Event;
pub use registration::{
    CheckInSnapshot, CheckInStats, CouponState, CouponStatus, Registration, RegistrationSummary,
};
