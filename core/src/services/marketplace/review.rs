//! Review transaction
//!
//! Records a guest review on a booking and folds the rating into the
//! property's aggregate. Both documents are written in one batch pinned to
//! the versions that were read, so a booking is counted exactly once even
//! when reviews race.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::domain::entities::booking::{Booking, BookingReview, BookingStatus};
use crate::domain::entities::property::{round2, Property};
use crate::domain::value_objects::Actor;
use crate::errors::{DomainError, DomainResult, ValidationError};
use crate::repositories::document::{run_transaction, Collection, DocumentStore, Fields, WriteBatch};

/// Longest accepted review comment, in characters
pub const MAX_COMMENT_CHARS: usize = 2000;

/// Property aggregate after a review was recorded
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReviewOutcome {
    pub rating: f64,
    pub reviews_count: u32,
}

/// Guest review of a stay
#[derive(Debug, Clone)]
pub struct ReviewSubmission<'a> {
    pub booking_id: &'a str,
    pub property_id: &'a str,
    pub rating: u8,
    pub comment: &'a str,
}

impl ReviewSubmission<'_> {
    fn validate(&self) -> DomainResult<()> {
        if !(1..=5).contains(&self.rating) {
            return Err(ValidationError::OutOfRange {
                field: "rating".to_string(),
                min: "1".to_string(),
                max: "5".to_string(),
            }
            .into());
        }
        if self.comment.chars().count() > MAX_COMMENT_CHARS {
            return Err(ValidationError::OutOfRange {
                field: "comment".to_string(),
                min: "0".to_string(),
                max: MAX_COMMENT_CHARS.to_string(),
            }
            .into());
        }
        Ok(())
    }
}

fn object(value: serde_json::Value) -> Fields {
    value.as_object().cloned().unwrap_or_default()
}

/// Run the review transaction, retrying on conflicting writes
pub async fn submit_review(
    store: &dyn DocumentStore,
    max_attempts: u32,
    actor: &Actor,
    review: &ReviewSubmission<'_>,
) -> DomainResult<ReviewOutcome> {
    review.validate()?;
    let comment = review.comment.trim();

    let outcome = run_transaction(store, max_attempts, || async move {
        let property_doc = store
            .get(Collection::Properties, review.property_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("property {}", review.property_id)))?;
        let booking_doc = store
            .get(Collection::Bookings, review.booking_id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("booking {}", review.booking_id)))?;
        let property: Property = property_doc.decode()?;
        let booking: Booking = booking_doc.decode()?;

        actor.require(actor.is(&booking.guest_id))?;
        if booking.property_id != property.id {
            return Err(DomainError::rule("booking does not belong to this property"));
        }
        if booking.status != BookingStatus::Confirmed {
            return Err(DomainError::rule("only confirmed stays can be reviewed"));
        }
        if booking.reviewed {
            return Err(DomainError::rule("booking has already been reviewed"));
        }

        let reviews_count = property.reviews_count + 1;
        let rating_sum = property.total_rating() + f64::from(review.rating);
        let rating = round2(rating_sum / f64::from(reviews_count));
        let entry = BookingReview {
            rating: review.rating,
            comment: comment.to_string(),
            submitted_at: Utc::now(),
        };

        let batch = WriteBatch::new()
            .merge_at_version(
                Collection::Properties,
                &property.id,
                property_doc.version,
                object(json!({
                    "rating": rating,
                    "reviews_count": reviews_count,
                    "rating_sum": rating_sum,
                })),
            )
            .merge_at_version(
                Collection::Bookings,
                &booking.id,
                booking_doc.version,
                object(json!({ "reviewed": true, "review": entry })),
            );
        Ok((batch, ReviewOutcome { rating, reviews_count }))
    })
    .await?;

    info!(
        booking_id = review.booking_id,
        property_id = review.property_id,
        rating = outcome.rating,
        reviews_count = outcome.reviews_count,
        "Review recorded"
    );
    Ok(outcome)
}
