//! AI recommendation service configuration

use serde::{Deserialize, Serialize};

/// Recommendation endpoint configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RecommendationConfig {
    /// Whether recommendations are requested at all
    pub enabled: bool,

    /// Endpoint receiving the search criteria as JSON
    pub endpoint: String,

    /// Optional bearer key sent with each request
    pub api_key: Option<String>,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum number of suggestions kept from a response
    pub max_results: usize,
}

impl Default for RecommendationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: String::from("http://localhost:8787/recommendations"),
            api_key: None,
            timeout_secs: 15,
            max_results: 6,
        }
    }
}

impl RecommendationConfig {
    /// Create from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            endpoint: std::env::var("RECOMMENDATION_ENDPOINT").unwrap_or(defaults.endpoint),
            api_key: std::env::var("RECOMMENDATION_API_KEY").ok(),
            ..defaults
        }
    }
}
