//! Listing search criteria and dashboard aggregates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::entities::property::Property;

/// Filters applied to approved listings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchCriteria {
    /// Case-insensitive substring of the listing location
    pub location: Option<String>,
    pub check_in: Option<NaiveDate>,
    pub check_out: Option<NaiveDate>,
    pub guests: Option<u32>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
}

impl SearchCriteria {
    /// The stay dates, when both are given and form a non-empty range
    pub fn stay(&self) -> Option<(NaiveDate, NaiveDate)> {
        match (self.check_in, self.check_out) {
            (Some(check_in), Some(check_out)) if check_out > check_in => {
                Some((check_in, check_out))
            }
            _ => None,
        }
    }

    /// Static attribute filters; availability is checked by the caller
    pub fn matches(&self, property: &Property) -> bool {
        if let Some(location) = &self.location {
            let needle = location.trim().to_lowercase();
            if !needle.is_empty() && !property.location.to_lowercase().contains(&needle) {
                return false;
            }
        }
        if let Some(guests) = self.guests {
            if guests > property.max_guests {
                return false;
            }
        }
        if let Some(min) = self.min_price {
            if property.price_per_night < min {
                return false;
            }
        }
        if let Some(max) = self.max_price {
            if property.price_per_night > max {
                return false;
            }
        }
        true
    }
}

/// Aggregates shown on a host's dashboard
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostSummary {
    pub listings: usize,
    pub approved_listings: usize,
    pub pending_bookings: usize,
    pub confirmed_bookings: usize,
    pub pending_inquiries: usize,
    /// Sum of confirmed booking totals in USD
    pub confirmed_revenue: f64,
}
