use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use crate::errors::{DomainError, DomainResult, ValidationError};

use super::types::{RecommendationCriteria, RecommendedProperty};

/// Name reported in `DomainError::ExternalService`
const SERVICE_NAME: &str = "recommendations";

/// Transport to the recommender
#[async_trait]
pub trait RecommendationClient: Send + Sync {
    async fn recommend(&self, criteria: &RecommendationCriteria) -> DomainResult<Vec<RecommendedProperty>>;
}

/// Criteria validation and failure mapping around a [`RecommendationClient`]
pub struct RecommendationService {
    client: Arc<dyn RecommendationClient>,
    max_results: usize,
}

impl RecommendationService {
    pub fn new(client: Arc<dyn RecommendationClient>, max_results: usize) -> Self {
        Self {
            client,
            max_results,
        }
    }

    pub async fn recommend(&self, criteria: &RecommendationCriteria) -> DomainResult<Vec<RecommendedProperty>> {
        validate(criteria)?;

        match self.client.recommend(criteria).await {
            Ok(mut suggestions) => {
                suggestions.truncate(self.max_results);
                info!(
                    location = %criteria.location,
                    count = suggestions.len(),
                    "Recommendations received"
                );
                Ok(suggestions)
            }
            Err(err) => {
                error!(error = %err, "Recommendation call failed");
                Err(DomainError::ExternalService {
                    service: SERVICE_NAME.to_string(),
                })
            }
        }
    }
}

fn validate(criteria: &RecommendationCriteria) -> DomainResult<()> {
    if criteria.location.trim().is_empty() {
        return Err(ValidationError::RequiredField {
            field: "location".to_string(),
        }
        .into());
    }
    if criteria.guests == 0 {
        return Err(ValidationError::OutOfRange {
            field: "guests".to_string(),
            min: "1".to_string(),
            max: "50".to_string(),
        }
        .into());
    }
    if let (Some(check_in), Some(check_out)) = (criteria.check_in, criteria.check_out) {
        if check_out <= check_in {
            return Err(ValidationError::InvalidDateRange.into());
        }
    }
    if let (Some(min), Some(max)) = (criteria.min_price, criteria.max_price) {
        if min > max {
            return Err(DomainError::Validation {
                message: "invalid fields: min_price, max_price".to_string(),
            });
        }
    }
    Ok(())
}
