//! Actors whose accounts changed, and confirmations racing for one calendar

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;

use crate::domain::entities::booking::BookingStatus;
use crate::domain::entities::property::PropertyStatus;
use crate::domain::entities::user::UserRole;
use crate::domain::value_objects::Actor;
use crate::errors::{DomainError, DomainResult};
use crate::repositories::document::{
    ChangeStream, Collection, Document, DocumentStore, Fields, InMemoryDocumentStore, WriteBatch,
};
use crate::services::marketplace::MarketplaceService;

use super::fixtures::*;

/// Stretches the bookings scan so concurrent confirmations overlap
struct SlowBookingScan {
    inner: Arc<InMemoryDocumentStore>,
}

#[async_trait]
impl DocumentStore for SlowBookingScan {
    async fn get(&self, collection: Collection, id: &str) -> DomainResult<Option<Document>> {
        self.inner.get(collection, id).await
    }

    async fn list(&self, collection: Collection) -> DomainResult<Vec<Document>> {
        if collection == Collection::Bookings {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        self.inner.list(collection).await
    }

    async fn insert(&self, collection: Collection, fields: Fields) -> DomainResult<Document> {
        self.inner.insert(collection, fields).await
    }

    async fn commit(&self, batch: WriteBatch) -> DomainResult<()> {
        self.inner.commit(batch).await
    }

    fn subscribe(&self, collection: Collection) -> ChangeStream {
        self.inner.subscribe(collection)
    }
}

#[tokio::test]
async fn test_disabled_guest_cannot_book() {
    let f = fixture().await;
    let property = f.approved_property().await;
    f.update_user("guest-1", json!({ "is_disabled": true })).await;

    let err = f
        .market
        .add_booking(&f.guest, draft_booking(&property.id, "2024-05-01", "2024-05-03"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Unauthorized));
    assert!(f.store.list(Collection::Bookings).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_demoted_host_cannot_list_or_confirm() {
    let f = fixture().await;
    let property = f.approved_property().await;
    let booking = f
        .market
        .add_booking(&f.guest, draft_booking(&property.id, "2024-05-01", "2024-05-03"))
        .await
        .unwrap();
    f.update_user("host-1", json!({ "role": "guest" })).await;

    let err = f.market.add_property(&f.host, draft_property()).await.unwrap_err();
    assert!(matches!(err, DomainError::Unauthorized));
    let err = f
        .market
        .update_booking_status(&f.host, &booking.id, BookingStatus::Confirmed)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Unauthorized));
}

#[tokio::test]
async fn test_unknown_admin_cannot_moderate() {
    let f = fixture().await;
    let property = f.market.add_property(&f.host, draft_property()).await.unwrap();
    let unknown = Actor::new("admin-unknown", UserRole::Admin);

    let err = f
        .market
        .update_property_status(&unknown, &property.id, PropertyStatus::Approved)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Unauthorized));
    let stored = f.store.get(Collection::Properties, &property.id).await.unwrap().unwrap();
    assert_eq!(stored.fields["status"], "pending");
}

#[tokio::test]
async fn test_concurrent_confirmations_of_overlapping_stays_admit_one() {
    let f = fixture().await;
    let property = f.approved_property().await;
    let other_guest = f.user("guest-2", UserRole::Guest).await;
    let first = f
        .market
        .add_booking(&f.guest, draft_booking(&property.id, "2024-06-10", "2024-06-15"))
        .await
        .unwrap();
    let second = f
        .market
        .add_booking(&other_guest, draft_booking(&property.id, "2024-06-12", "2024-06-14"))
        .await
        .unwrap();

    let slow: Arc<dyn DocumentStore> = Arc::new(SlowBookingScan {
        inner: f.store.clone(),
    });
    let market = MarketplaceService::start(slow, unseeded_config()).await.unwrap();
    let (a, b) = tokio::join!(
        market.update_booking_status(&f.host, &first.id, BookingStatus::Confirmed),
        market.update_booking_status(&f.host, &second.id, BookingStatus::Confirmed),
    );

    assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
    let err = a.err().or(b.err()).unwrap();
    assert!(matches!(err, DomainError::BusinessRule { .. }), "{err}");

    let confirmed = f
        .store
        .list(Collection::Bookings)
        .await
        .unwrap()
        .iter()
        .filter(|d| d.fields["status"] == "confirmed")
        .count();
    assert_eq!(confirmed, 1);
}
