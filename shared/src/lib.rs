//! Shared utilities and common types for StayNest server
//!
//! This crate provides common functionality used across all server modules:
//! - Configuration types
//! - Display preference types (language, currency)
//! - Utility functions (email validation, etc.)

pub mod config;
pub mod types;
pub mod utils;

// Re-export commonly used items at crate root
pub use config::{
    AppConfig, AuthConfig, CacheConfig, DatabaseConfig, Environment, LogFormat, LoggingConfig,
    MarketplaceConfig, RecommendationConfig, StorageBackend, StorageConfig,
};
pub use types::{Currency, Language, Preferences};
pub use utils::validation;
