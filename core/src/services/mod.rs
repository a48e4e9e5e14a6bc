//! Business services containing domain logic and use cases.

mod access;
pub mod auth;
pub mod marketplace;
pub mod mirror;
pub mod recommendation;
pub mod settings;

// Re-export commonly used types
pub use auth::AuthService;
pub use marketplace::{MarketplaceService, ReviewOutcome};
pub use mirror::RealtimeMirror;
pub use recommendation::{
    RecommendationClient, RecommendationCriteria, RecommendationService, RecommendedProperty,
};
pub use settings::SettingsService;
