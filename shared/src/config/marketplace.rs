//! Listing, booking and inquiry store configuration

use serde::{Deserialize, Serialize};

/// Configuration for the marketplace store
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MarketplaceConfig {
    /// Write the sample listings when the properties collection is empty
    pub seed_on_empty: bool,

    /// Host id stamped on seeded listings
    pub seed_host_id: String,

    /// Attempts made by the review transaction before giving up on conflicts
    pub transaction_max_attempts: u32,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            seed_on_empty: true,
            seed_host_id: String::from("seed-host"),
            transaction_max_attempts: 5,
        }
    }
}
