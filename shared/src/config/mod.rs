//! Configuration module with business-specific sub-modules
//!
//! This module organizes configuration into logical business areas:
//! - `auth` - Password hashing, session key and super-admin bootstrap
//! - `cache` - Redis connection for the key-value store
//! - `database` - Document database connection and pool configuration
//! - `environment` - Environment detection and logging configuration
//! - `marketplace` - Seeding and transaction behaviour of the listing store
//! - `recommendation` - AI recommendation endpoint
//! - `storage` - Which backends hold documents and preferences

pub mod auth;
pub mod cache;
pub mod database;
pub mod environment;
pub mod marketplace;
pub mod recommendation;
pub mod storage;

use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use auth::AuthConfig;
pub use cache::CacheConfig;
pub use database::DatabaseConfig;
pub use environment::{Environment, LogFormat, LoggingConfig};
pub use marketplace::MarketplaceConfig;
pub use recommendation::RecommendationConfig;
pub use storage::{StorageBackend, StorageConfig};

/// Complete application configuration combining all sub-configurations
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// Environment configuration
    pub environment: Environment,

    /// Document database configuration
    pub database: DatabaseConfig,

    /// Redis configuration
    pub cache: CacheConfig,

    /// Authentication configuration
    pub auth: AuthConfig,

    /// Listing/booking store configuration
    pub marketplace: MarketplaceConfig,

    /// Recommendation service configuration
    pub recommendation: RecommendationConfig,

    /// Storage backend selection
    pub storage: StorageConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let env = Environment::default();
        Self {
            environment: env,
            database: DatabaseConfig::default(),
            cache: CacheConfig::default(),
            auth: AuthConfig::default(),
            marketplace: MarketplaceConfig::default(),
            recommendation: RecommendationConfig::default(),
            storage: StorageConfig::default(),
            logging: LoggingConfig::for_environment(env),
        }
    }
}

impl AppConfig {
    /// Create configuration for development environment
    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            database: DatabaseConfig::new("mysql://localhost:3306/staynest_dev"),
            storage: StorageConfig::memory(),
            logging: LoggingConfig::for_environment(Environment::Development),
            ..Default::default()
        }
    }

    /// Create configuration for production environment
    pub fn production() -> Self {
        Self {
            environment: Environment::Production,
            database: DatabaseConfig::new("mysql://prod-db:3306/staynest")
                .with_max_connections(50),
            auth: AuthConfig {
                bcrypt_cost: 12,
                ..Default::default()
            },
            storage: StorageConfig {
                documents: StorageBackend::Mysql,
                preferences: StorageBackend::Redis,
                ..Default::default()
            },
            logging: LoggingConfig::for_environment(Environment::Production),
            ..Default::default()
        }
    }

    /// Load configuration preset from environment
    pub fn from_env() -> Self {
        let env = Environment::from_env();
        match env {
            Environment::Development => Self::development(),
            Environment::Production => Self::production(),
            Environment::Staging => {
                let mut config = Self::development();
                config.environment = Environment::Staging;
                config.storage = StorageConfig {
                    documents: StorageBackend::Mysql,
                    preferences: StorageBackend::File,
                    ..Default::default()
                };
                config.logging = LoggingConfig::for_environment(Environment::Staging);
                config
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_preset() {
        let config = AppConfig::production();
        assert!(config.environment.is_production());
        assert_eq!(config.database.max_connections, 50);
        assert_eq!(config.storage.documents, StorageBackend::Mysql);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AppConfig = serde_json::from_str(
            r#"{ "marketplace": { "seed_on_empty": false } }"#,
        )
        .unwrap();
        assert!(!config.marketplace.seed_on_empty);
        assert_eq!(config.marketplace.transaction_max_attempts, 5);
        assert_eq!(config.auth.session_key, "staynest:session_user_id");
    }
}
