//! Booking and inquiry operations

use crate::domain::entities::booking::BookingStatus;
use crate::domain::entities::inquiry::{InquiryStatus, NewInquiry};
use crate::domain::entities::user::UserRole;
use crate::errors::{DomainError, ValidationError};
use crate::repositories::document::{Collection, DocumentStore};

use super::fixtures::*;

#[tokio::test]
async fn test_add_booking_prices_on_the_server() {
    let f = fixture().await;
    let property = f.approved_property().await;

    // Wednesday to Wednesday: five weekday and two weekend nights
    let booking = f
        .market
        .add_booking(&f.guest, draft_booking(&property.id, "2024-05-01", "2024-05-08"))
        .await
        .unwrap();

    assert_eq!(booking.total_price, 7920.0);
    assert_eq!(booking.status, BookingStatus::Pending);
    assert_eq!(booking.host_id, "host-1");
    assert_eq!(booking.guest_id, "guest-1");
    assert!(!booking.reviewed);
    assert!(booking.invoice_id.starts_with("INV-"));

    let stored = f.store.get(Collection::Bookings, &booking.id).await.unwrap().unwrap();
    assert_eq!(stored.fields["check_in"], "2024-05-01");
    assert!(stored.fields.contains_key("created_at"));
}

#[tokio::test]
async fn test_degenerate_range_is_blocked() {
    let f = fixture().await;
    let property = f.approved_property().await;
    for (check_in, check_out) in [("2024-05-08", "2024-05-08"), ("2024-05-08", "2024-05-01")] {
        let err = f
            .market
            .add_booking(&f.guest, draft_booking(&property.id, check_in, check_out))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::ValidationErr(ValidationError::InvalidDateRange)
        ));
    }
    assert!(f.store.list(Collection::Bookings).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_booking_preconditions() {
    let f = fixture().await;
    let pending = f.market.add_property(&f.host, draft_property()).await.unwrap();
    let err = f
        .market
        .add_booking(&f.guest, draft_booking(&pending.id, "2024-05-01", "2024-05-03"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::BusinessRule { .. }));

    let property = f.approved_property().await;
    let err = f
        .market
        .add_booking(&f.host, draft_booking(&property.id, "2024-05-01", "2024-05-03"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Unauthorized));

    let mut crowded = draft_booking(&property.id, "2024-05-01", "2024-05-03");
    crowded.guests = 9;
    let err = f.market.add_booking(&f.guest, crowded).await.unwrap_err();
    assert!(matches!(
        err,
        DomainError::ValidationErr(ValidationError::OutOfRange { .. })
    ));

    let err = f
        .market
        .add_booking(&f.guest, draft_booking("missing", "2024-05-01", "2024-05-03"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound { .. }));
}

#[tokio::test]
async fn test_confirmed_dates_are_unavailable() {
    let f = fixture().await;
    let property = f.approved_property().await;
    f.confirmed_booking(&property.id, "2024-06-10", "2024-06-15").await;

    let other_guest = f.user("guest-2", UserRole::Guest).await;
    let err = f
        .market
        .add_booking(&other_guest, draft_booking(&property.id, "2024-06-14", "2024-06-16"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::BusinessRule { .. }));

    // Check-out day is free again
    f.market
        .add_booking(&other_guest, draft_booking(&property.id, "2024-06-15", "2024-06-17"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_confirming_an_overlap_is_rejected() {
    let f = fixture().await;
    let property = f.approved_property().await;
    let first = f
        .market
        .add_booking(&f.guest, draft_booking(&property.id, "2024-06-10", "2024-06-15"))
        .await
        .unwrap();
    let other_guest = f.user("guest-2", UserRole::Guest).await;
    let second = f
        .market
        .add_booking(&other_guest, draft_booking(&property.id, "2024-06-12", "2024-06-14"))
        .await
        .unwrap();

    f.market
        .update_booking_status(&f.host, &first.id, BookingStatus::Confirmed)
        .await
        .unwrap();
    let err = f
        .market
        .update_booking_status(&f.host, &second.id, BookingStatus::Confirmed)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::BusinessRule { .. }));

    f.market
        .update_booking_status(&f.host, &second.id, BookingStatus::Cancelled)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_booking_status_capabilities_and_transitions() {
    let f = fixture().await;
    let property = f.approved_property().await;
    let booking = f
        .market
        .add_booking(&f.guest, draft_booking(&property.id, "2024-06-10", "2024-06-15"))
        .await
        .unwrap();

    let err = f
        .market
        .update_booking_status(&f.guest, &booking.id, BookingStatus::Confirmed)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Unauthorized));

    let stranger = f.user("guest-9", UserRole::Guest).await;
    let err = f
        .market
        .update_booking_status(&stranger, &booking.id, BookingStatus::Cancelled)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Unauthorized));

    f.market
        .update_booking_status(&f.guest, &booking.id, BookingStatus::Cancelled)
        .await
        .unwrap();
    let err = f
        .market
        .update_booking_status(&f.host, &booking.id, BookingStatus::Confirmed)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::BusinessRule { .. }));

    let stored = f.store.get(Collection::Bookings, &booking.id).await.unwrap().unwrap();
    assert_eq!(stored.fields["status"], "cancelled");
}

#[tokio::test]
async fn test_inquiry_flow() {
    let f = fixture().await;
    let property = f.approved_property().await;
    let draft = NewInquiry {
        property_id: property.id.clone(),
        message: "Are pets allowed?".to_string(),
    };

    let err = f.market.add_inquiry(&f.host, draft.clone()).await.unwrap_err();
    assert!(matches!(err, DomainError::Unauthorized));

    let inquiry = f.market.add_inquiry(&f.guest, draft).await.unwrap();
    assert_eq!(inquiry.host_id, "host-1");
    assert_eq!(inquiry.status, InquiryStatus::Pending);

    let err = f
        .market
        .update_inquiry_status(&f.guest, &inquiry.id, InquiryStatus::Accepted)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Unauthorized));

    f.market
        .update_inquiry_status(&f.host, &inquiry.id, InquiryStatus::Accepted)
        .await
        .unwrap();
    let err = f
        .market
        .update_inquiry_status(&f.host, &inquiry.id, InquiryStatus::Rejected)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::BusinessRule { .. }));
}

#[tokio::test]
async fn test_write_failures_are_surfaced() {
    let f = fixture().await;
    let property = f.approved_property().await;
    f.store.set_fail_writes(true);
    let err = f
        .market
        .add_booking(&f.guest, draft_booking(&property.id, "2024-06-10", "2024-06-15"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Internal { .. }));
}
