//! Domain entities representing core business objects.

pub mod booking;
pub mod inquiry;
pub mod property;
pub mod user;

// Re-export commonly used types
pub use booking::{generate_invoice_id, Booking, BookingReview, BookingStatus, NewBooking};
pub use inquiry::{Inquiry, InquiryStatus, NewInquiry};
pub use property::{
    round2, BookingPolicy, NewProperty, Property, PropertyStatus, PropertyUpdate, REQUIRED_PHOTOS,
};
pub use user::{
    placeholder_avatar, ProfileUpdate, SignupRequest, User, UserRole, VerificationStatus,
};
