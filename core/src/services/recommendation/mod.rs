//! AI recommendation call-out
//!
//! The recommender is an opaque network collaborator behind
//! [`RecommendationClient`]; the service validates criteria and turns any
//! failure into one generic error.

mod service;
mod types;

pub use service::{RecommendationClient, RecommendationService};
pub use types::{RecommendationCriteria, RecommendedProperty};
