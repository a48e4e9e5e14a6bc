//! HTTP transport to the recommendation endpoint

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use nest_core::errors::{DomainError, DomainResult};
use nest_core::services::recommendation::{
    RecommendationClient, RecommendationCriteria, RecommendedProperty,
};
use nest_shared::config::RecommendationConfig;

use crate::InfrastructureError;

/// Endpoints answer either with a bare list or wrapped in an object
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecommendationResponse {
    List(Vec<RecommendedProperty>),
    Wrapped {
        recommendations: Vec<RecommendedProperty>,
    },
}

impl RecommendationResponse {
    fn into_inner(self) -> Vec<RecommendedProperty> {
        match self {
            Self::List(items) | Self::Wrapped { recommendations: items } => items,
        }
    }
}

/// Posts search criteria as JSON and reads back suggestions
pub struct HttpRecommendationClient {
    http: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpRecommendationClient {
    pub fn new(config: &RecommendationConfig) -> Result<Self, InfrastructureError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
        })
    }

    async fn send(
        &self,
        criteria: &RecommendationCriteria,
    ) -> Result<Vec<RecommendedProperty>, InfrastructureError> {
        let mut request = self.http.post(&self.endpoint).json(criteria);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?.error_for_status()?;
        let body = response.text().await?;
        let parsed: RecommendationResponse = serde_json::from_str(&body)?;
        Ok(parsed.into_inner())
    }
}

#[async_trait]
impl RecommendationClient for HttpRecommendationClient {
    async fn recommend(
        &self,
        criteria: &RecommendationCriteria,
    ) -> DomainResult<Vec<RecommendedProperty>> {
        debug!(endpoint = %self.endpoint, location = %criteria.location, "Requesting recommendations");
        self.send(criteria).await.map_err(|err| {
            warn!(endpoint = %self.endpoint, error = %err, "Recommendation request failed");
            DomainError::from(err)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_bare_and_wrapped_responses() {
        let bare = r#"[{"title":"Cliff House","location":"Goa","pricePerNight":4200}]"#;
        let parsed: RecommendationResponse = serde_json::from_str(bare).unwrap();
        let items = parsed.into_inner();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].reason, "");

        let wrapped = r#"{"recommendations":[
            {"propertyId":"p1","title":"Loft","location":"Pune","pricePerNight":1800,"reason":"quiet"},
            {"title":"Hut","location":"Manali","pricePerNight":900}
        ]}"#;
        let parsed: RecommendationResponse = serde_json::from_str(wrapped).unwrap();
        let items = parsed.into_inner();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].property_id.as_deref(), Some("p1"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_external_failure() {
        let config = RecommendationConfig {
            endpoint: "http://127.0.0.1:9/recommendations".to_string(),
            timeout_secs: 2,
            ..Default::default()
        };
        let client = HttpRecommendationClient::new(&config).unwrap();
        let criteria = RecommendationCriteria {
            location: "Goa".to_string(),
            guests: 2,
            ..Default::default()
        };

        let err = client.recommend(&criteria).await.unwrap_err();
        assert!(matches!(err, DomainError::ExternalService { .. }));
    }
}
