//! Marketplace module: listings, bookings, inquiries and reviews
//!
//! The three collections are mirrored in memory from the remote document
//! store. An empty properties collection is seeded with sample listings
//! before the mirrors attach.

mod review;
mod seed;
mod service;

#[cfg(test)]
mod tests;

pub use review::{ReviewOutcome, ReviewSubmission, MAX_COMMENT_CHARS};
pub use seed::{sample_properties, sample_property_id, seed_properties};
pub use service::MarketplaceService;
