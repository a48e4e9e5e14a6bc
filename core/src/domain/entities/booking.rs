//! Booking entity: a guest's reservation of a property for a date range.

use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Booking lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    #[default]
    Pending,
    Confirmed,
    Cancelled,
}

impl BookingStatus {
    /// Allowed status transitions
    pub fn can_transition_to(&self, next: BookingStatus) -> bool {
        matches!(
            (self, next),
            (BookingStatus::Pending, BookingStatus::Confirmed)
                | (BookingStatus::Pending, BookingStatus::Cancelled)
                | (BookingStatus::Confirmed, BookingStatus::Cancelled)
        )
    }
}

/// Guest review attached to a booking once it has been reviewed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookingReview {
    pub rating: u8,
    pub comment: String,
    pub submitted_at: DateTime<Utc>,
}

/// Booking entity as stored in the `bookings` collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    #[serde(default)]
    pub id: String,
    pub property_id: String,
    /// Denormalized from the property at creation time
    pub host_id: String,
    pub guest_id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: u32,
    /// Total in USD, service fee included
    pub total_price: f64,
    pub payment_method: String,
    #[serde(default)]
    pub status: BookingStatus,
    pub invoice_id: String,
    /// Flips to true exactly once, together with the property aggregate
    #[serde(default)]
    pub reviewed: bool,
    #[serde(default)]
    pub review: Option<BookingReview>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Booking {
    /// Half-open `[check_in, check_out)` overlap test
    pub fn overlaps(&self, check_in: NaiveDate, check_out: NaiveDate) -> bool {
        self.check_in < check_out && check_in < self.check_out
    }

    /// Nights blocked on the calendar by this booking
    pub fn blocks_calendar(&self) -> bool {
        self.status == BookingStatus::Confirmed
    }
}

/// Booking request submitted by a guest
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct NewBooking {
    #[validate(length(min = 1))]
    pub property_id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    #[validate(range(min = 1))]
    pub guests: u32,
    #[validate(length(min = 2, max = 40))]
    pub payment_method: String,
}

/// Invoice id of the form `INV-<epoch millis>-<4 hex chars>`
pub fn generate_invoice_id(now: DateTime<Utc>) -> String {
    let suffix: u16 = rand::thread_rng().gen();
    format!("INV-{}-{:04X}", now.timestamp_millis(), suffix)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_status_transitions() {
        assert!(BookingStatus::Pending.can_transition_to(BookingStatus::Confirmed));
        assert!(BookingStatus::Pending.can_transition_to(BookingStatus::Cancelled));
        assert!(BookingStatus::Confirmed.can_transition_to(BookingStatus::Cancelled));
        assert!(!BookingStatus::Cancelled.can_transition_to(BookingStatus::Confirmed));
        assert!(!BookingStatus::Confirmed.can_transition_to(BookingStatus::Pending));
        assert!(!BookingStatus::Pending.can_transition_to(BookingStatus::Pending));
    }

    #[test]
    fn test_invoice_id_format() {
        let now = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let id = generate_invoice_id(now);
        let parts: Vec<&str> = id.split('-').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "INV");
        assert_eq!(parts[1], now.timestamp_millis().to_string());
        assert_eq!(parts[2].len(), 4);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_overlap_is_half_open() {
        let booking = Booking {
            id: "b1".to_string(),
            property_id: "p1".to_string(),
            host_id: "h1".to_string(),
            guest_id: "g1".to_string(),
            check_in: date("2024-06-10"),
            check_out: date("2024-06-15"),
            guests: 2,
            total_price: 500.0,
            payment_method: "card".to_string(),
            status: BookingStatus::Confirmed,
            invoice_id: "INV-1-ABCD".to_string(),
            reviewed: false,
            review: None,
            created_at: None,
        };
        assert!(booking.overlaps(date("2024-06-14"), date("2024-06-20")));
        assert!(booking.overlaps(date("2024-06-01"), date("2024-06-11")));
        assert!(!booking.overlaps(date("2024-06-15"), date("2024-06-18")));
        assert!(!booking.overlaps(date("2024-06-05"), date("2024-06-10")));
    }
}
