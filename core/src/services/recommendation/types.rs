use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// What the guest is looking for
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationCriteria {
    pub location: String,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub guests: u32,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    /// Free-form wishes such as "quiet, near the beach"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferences: Option<String>,
}

/// A suggestion returned by the recommender
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedProperty {
    /// Id of a known listing, when the recommender matched one
    #[serde(default)]
    pub property_id: Option<String>,
    pub title: String,
    pub location: String,
    pub price_per_night: f64,
    #[serde(default)]
    pub reason: String,
}
