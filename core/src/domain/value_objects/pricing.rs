//! Booking price calculation.
//!
//! Nights are the exclusive day count between check-in and check-out. A night
//! is a weekend night when it starts on a Friday or a Saturday; weekend nights
//! are charged the base price plus the listing's weekend premium. A flat
//! service fee of 10% of the subtotal is added on top.

use chrono::{Datelike, Days, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};

use crate::domain::entities::property::{round2, Property};

/// Service fee as a fraction of the subtotal
pub const SERVICE_FEE_RATE: f64 = 0.10;

/// Itemized price of a stay
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct PriceBreakdown {
    pub nights: u32,
    pub weekday_nights: u32,
    pub weekend_nights: u32,
    pub base_price: f64,
    pub weekend_price: f64,
    pub subtotal: f64,
    pub service_fee: f64,
    pub total: f64,
}

impl PriceBreakdown {
    /// A stay of zero nights cannot be booked
    pub fn is_bookable(&self) -> bool {
        self.nights > 0
    }
}

fn is_weekend_night(date: NaiveDate) -> bool {
    matches!(date.weekday(), Weekday::Fri | Weekday::Sat)
}

/// Price a stay from raw inputs. Returns an all-zero breakdown when
/// `check_out <= check_in`.
pub fn calculate_price(
    check_in: NaiveDate,
    check_out: NaiveDate,
    base_price: f64,
    weekend_premium_percent: f64,
) -> PriceBreakdown {
    if check_out <= check_in {
        return PriceBreakdown::default();
    }

    let mut weekday_nights = 0u32;
    let mut weekend_nights = 0u32;
    let mut night = check_in;
    while night < check_out {
        if is_weekend_night(night) {
            weekend_nights += 1;
        } else {
            weekday_nights += 1;
        }
        night = match night.checked_add_days(Days::new(1)) {
            Some(next) => next,
            None => break,
        };
    }

    let weekend_price = round2(base_price * (1.0 + weekend_premium_percent / 100.0));
    let subtotal = round2(
        f64::from(weekday_nights) * base_price + f64::from(weekend_nights) * weekend_price,
    );
    let service_fee = round2(subtotal * SERVICE_FEE_RATE);

    PriceBreakdown {
        nights: weekday_nights + weekend_nights,
        weekday_nights,
        weekend_nights,
        base_price,
        weekend_price,
        subtotal,
        service_fee,
        total: round2(subtotal + service_fee),
    }
}

/// Price a stay at a listing
pub fn quote(property: &Property, check_in: NaiveDate, check_out: NaiveDate) -> PriceBreakdown {
    calculate_price(
        check_in,
        check_out,
        property.price_per_night,
        property.weekend_premium_percent,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_week_from_wednesday() {
        // 2024-05-01 is a Wednesday
        let price = calculate_price(date("2024-05-01"), date("2024-05-08"), 1000.0, 10.0);
        assert_eq!(price.nights, 7);
        assert_eq!(price.weekday_nights, 5);
        assert_eq!(price.weekend_nights, 2);
        assert_eq!(price.weekend_price, 1100.0);
        assert_eq!(price.subtotal, 7200.0);
        assert_eq!(price.service_fee, 720.0);
        assert_eq!(price.total, 7920.0);
        assert!(price.is_bookable());
    }

    #[test]
    fn test_degenerate_ranges_are_zero() {
        let same_day = calculate_price(date("2024-05-01"), date("2024-05-01"), 1000.0, 10.0);
        assert_eq!(same_day, PriceBreakdown::default());
        assert!(!same_day.is_bookable());

        let reversed = calculate_price(date("2024-05-05"), date("2024-05-01"), 1000.0, 10.0);
        assert_eq!(reversed.nights, 0);
        assert_eq!(reversed.total, 0.0);
        assert!(!reversed.is_bookable());
    }

    #[test]
    fn test_sunday_night_is_weekday() {
        // Saturday 2024-05-04 to Monday 2024-05-06: Saturday night + Sunday night
        let price = calculate_price(date("2024-05-04"), date("2024-05-06"), 200.0, 25.0);
        assert_eq!(price.weekend_nights, 1);
        assert_eq!(price.weekday_nights, 1);
        assert_eq!(price.weekend_price, 250.0);
        assert_eq!(price.subtotal, 450.0);
        assert_eq!(price.service_fee, 45.0);
        assert_eq!(price.total, 495.0);
    }

    #[test]
    fn test_no_premium_means_flat_rate() {
        let price = calculate_price(date("2024-05-03"), date("2024-05-05"), 150.0, 0.0);
        assert_eq!(price.weekend_nights, 2);
        assert_eq!(price.weekend_price, 150.0);
        assert_eq!(price.subtotal, 300.0);
        assert_eq!(price.total, 330.0);
    }
}
