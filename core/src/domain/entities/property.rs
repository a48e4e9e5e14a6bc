//! Property (listing) entity authored by a host.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use nest_shared::validation::validators;

/// Number of photos every listing must carry
pub const REQUIRED_PHOTOS: usize = 4;

/// Moderation lifecycle of a listing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PropertyStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
}

/// How booking requests are handled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BookingPolicy {
    /// Host confirms each request
    #[default]
    ReviewFirst,
    /// Advertised as instant; requests still start as pending
    InstantBook,
}

/// Property entity as stored in the `properties` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    #[serde(default)]
    pub id: String,
    pub host_id: String,
    pub title: String,
    pub description: String,
    pub location: String,
    pub property_type: String,
    /// Nightly base price in USD
    pub price_per_night: f64,
    /// Percentage added to the base price on Friday and Saturday nights
    #[serde(default)]
    pub weekend_premium_percent: f64,
    pub max_guests: u32,
    pub bedrooms: u32,
    pub beds: u32,
    pub bathrooms: u32,
    #[serde(default)]
    pub amenities: Vec<String>,
    #[serde(default)]
    pub photos: Vec<String>,
    /// Running mean of all review ratings, two decimals
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub reviews_count: u32,
    /// Sum of every submitted rating
    #[serde(default)]
    pub rating_sum: Option<f64>,
    #[serde(default)]
    pub status: PropertyStatus,
    #[serde(default)]
    pub booking_policy: BookingPolicy,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Property {
    /// Sum of ratings so far; older documents only carry the mean
    pub fn total_rating(&self) -> f64 {
        self.rating_sum
            .unwrap_or(self.rating * f64::from(self.reviews_count))
    }

    pub fn is_bookable(&self) -> bool {
        self.status == PropertyStatus::Approved
    }
}

/// Round to two decimal places
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn validate_photos(photos: &[String]) -> Result<(), ValidationError> {
    if photos.len() != REQUIRED_PHOTOS {
        return Err(ValidationError::new("photo_count"));
    }
    if !photos.iter().all(|p| validators::is_valid_photo_ref(p)) {
        return Err(ValidationError::new("photo_ref"));
    }
    Ok(())
}

/// Listing data submitted by a host
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewProperty {
    #[validate(length(min = 5, max = 100))]
    pub title: String,
    #[validate(length(min = 20, max = 5000))]
    pub description: String,
    #[validate(length(min = 2, max = 120))]
    pub location: String,
    #[validate(length(min = 1, max = 40))]
    pub property_type: String,
    #[validate(range(min = 1.0))]
    pub price_per_night: f64,
    #[validate(range(min = 0.0, max = 100.0))]
    pub weekend_premium_percent: f64,
    #[validate(range(min = 1, max = 50))]
    pub max_guests: u32,
    pub bedrooms: u32,
    #[validate(range(min = 1))]
    pub beds: u32,
    pub bathrooms: u32,
    pub amenities: Vec<String>,
    #[validate(custom = "validate_photos")]
    pub photos: Vec<String>,
    pub booking_policy: BookingPolicy,
}

/// Partial update of a listing. Rating, review count, host and status are
/// not editable here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct PropertyUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 5, max = 100))]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 20, max = 5000))]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 2, max = 120))]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub property_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1.0))]
    pub price_per_night: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 0.0, max = 100.0))]
    pub weekend_premium_percent: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1, max = 50))]
    pub max_guests: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bedrooms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub beds: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bathrooms: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amenities: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(custom = "validate_photos")]
    pub photos: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub booking_policy: Option<BookingPolicy>,
}
