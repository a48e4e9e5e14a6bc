//! Inquiry entity: a free-text question from a guest to a host.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InquiryStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

impl InquiryStatus {
    /// Only pending inquiries can be answered, and only once
    pub fn can_transition_to(&self, next: InquiryStatus) -> bool {
        *self == InquiryStatus::Pending && next != InquiryStatus::Pending
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Inquiry {
    #[serde(default)]
    pub id: String,
    pub property_id: String,
    pub host_id: String,
    pub guest_id: String,
    pub message: String,
    #[serde(default)]
    pub status: InquiryStatus,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewInquiry {
    #[validate(length(min = 1))]
    pub property_id: String,
    #[validate(length(min = 5, max = 2000))]
    pub message: String,
}
