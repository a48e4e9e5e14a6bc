//! # Infrastructure Layer
//!
//! Concrete backends for the StayNest services defined in `nest_core`.
//!
//! ## Architecture
//!
//! The infrastructure layer contains:
//! - **Database**: MySQL document store using SQLx
//! - **Key-value**: JSON-file and Redis stores for the session and preferences
//! - **Recommendation**: HTTP client for the AI recommendation endpoint
//! - **Config / telemetry**: configuration loading and tracing setup
//! - **App**: wiring of the stores and services from an `AppConfig`
//!
//! ## Features
//!
//! - `mysql`: Enable the MySQL document store (default)
//! - `redis-store`: Enable the Redis key-value store (default)

use nest_core::errors::DomainError;

pub mod app;
pub mod config;
#[cfg(feature = "mysql")]
pub mod database;
pub mod kv;
pub mod recommendation;
pub mod telemetry;

pub use app::StayNest;
pub use config::load_config;
pub use telemetry::init_tracing;

/// Infrastructure-specific error types
#[derive(Debug, thiserror::Error)]
pub enum InfrastructureError {
    /// Database connection or query error
    #[cfg(feature = "mysql")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Redis error
    #[cfg(feature = "redis-store")]
    #[error("Cache error: {0}")]
    Cache(#[from] redis::RedisError),

    /// HTTP request error for external services
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    /// Failure reported by a store or service while wiring the application
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// General infrastructure error
    #[error("Infrastructure error: {0}")]
    General(String),
}

impl From<InfrastructureError> for DomainError {
    fn from(err: InfrastructureError) -> Self {
        match err {
            InfrastructureError::Http(_) => DomainError::ExternalService {
                service: "http".to_string(),
            },
            InfrastructureError::Domain(inner) => inner,
            other => DomainError::internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_errors_map_to_external_service() {
        let err = reqwest::Client::new()
            .get("not a url")
            .build()
            .unwrap_err();
        match DomainError::from(InfrastructureError::from(err)) {
            DomainError::ExternalService { service } => assert_eq!(service, "http"),
            other => panic!("unexpected mapping: {other:?}"),
        }
    }

    #[test]
    fn test_local_failures_map_to_internal() {
        let io = InfrastructureError::Io(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
        match DomainError::from(io) {
            DomainError::Internal { message } => assert!(message.contains("disk full")),
            other => panic!("unexpected mapping: {other:?}"),
        }

        let general = InfrastructureError::General("boom".to_string());
        assert!(matches!(DomainError::from(general), DomainError::Internal { .. }));

        let domain = InfrastructureError::Domain(DomainError::Unauthorized);
        assert!(matches!(DomainError::from(domain), DomainError::Unauthorized));
    }
}
