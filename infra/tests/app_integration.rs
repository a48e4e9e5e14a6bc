//! End-to-end flows over the embedded backends
//!
//! These tests need no external services.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use nest_core::{
    BookingPolicy, BookingStatus, DocumentStore, InMemoryDocumentStore, NewBooking, NewProperty,
    PropertyStatus, SignupRequest, UserRole,
};
use nest_infra::app::{build_document_store, StayNest};
use nest_infra::kv::FileKeyValueStore;
use nest_shared::config::{AppConfig, AuthConfig, StorageBackend, StorageConfig};
use nest_shared::types::Currency;

fn embedded_config() -> AppConfig {
    let mut config = AppConfig::development();
    config.storage = StorageConfig::memory();
    config.auth = AuthConfig::for_tests();
    config.recommendation.enabled = false;
    config
}

fn signup(name: &str, email: &str, role: UserRole) -> SignupRequest {
    SignupRequest {
        name: name.to_string(),
        email: email.to_string(),
        password: "correct-horse".to_string(),
        role,
    }
}

fn date(s: &str) -> NaiveDate {
    s.parse().unwrap()
}

fn listing() -> NewProperty {
    NewProperty {
        title: "Treehouse in the Pines".to_string(),
        description: "A cedar treehouse with a rope bridge and a wood stove.".to_string(),
        location: "Asheville, USA".to_string(),
        property_type: "treehouse".to_string(),
        price_per_night: 150.0,
        weekend_premium_percent: 20.0,
        max_guests: 2,
        bedrooms: 1,
        beds: 1,
        bathrooms: 1,
        amenities: vec!["stove".to_string()],
        photos: (0..4)
            .map(|i| format!("https://cdn.example.com/tree-{i}.jpg"))
            .collect(),
        booking_policy: BookingPolicy::ReviewFirst,
    }
}

#[tokio::test]
async fn test_listing_to_review_flow() {
    let config = embedded_config();
    let admin_email = config.auth.super_admin_email.clone();
    let admin_password = config.auth.super_admin_password.clone();
    let app = StayNest::start(config).await.unwrap();
    assert!(app.recommendations.is_none());
    assert_eq!(app.marketplace.properties().len(), 6);

    // Host lists a property
    app.auth
        .signup(signup("Hana Host", "hana@example.com", UserRole::Host))
        .await
        .unwrap();
    let host = app.auth.actor().unwrap();
    let property = app.marketplace.add_property(&host, listing()).await.unwrap();
    assert_eq!(property.status, PropertyStatus::Pending);

    // Admin approves it
    app.auth.login(&admin_email, &admin_password).await.unwrap();
    let admin = app.auth.actor().unwrap();
    app.marketplace
        .update_property_status(&admin, &property.id, PropertyStatus::Approved)
        .await
        .unwrap();

    // Guest books, host confirms
    app.auth
        .signup(signup("Gil Guest", "gil@example.com", UserRole::Guest))
        .await
        .unwrap();
    let guest = app.auth.actor().unwrap();
    let booking = app
        .marketplace
        .add_booking(
            &guest,
            NewBooking {
                property_id: property.id.clone(),
                check_in: date("2025-03-03"),
                check_out: date("2025-03-05"),
                guests: 2,
                payment_method: "card".to_string(),
            },
        )
        .await
        .unwrap();
    app.auth.login("hana@example.com", "correct-horse").await.unwrap();
    app.marketplace
        .update_booking_status(&app.auth.actor().unwrap(), &booking.id, BookingStatus::Confirmed)
        .await
        .unwrap();

    // Guest reviews the stay
    app.auth.login("gil@example.com", "correct-horse").await.unwrap();
    let outcome = app
        .marketplace
        .add_review_and_rating(&app.auth.actor().unwrap(), &booking.id, &property.id, 4, "Lovely")
        .await
        .unwrap();
    assert_eq!(outcome.reviews_count, 1);
    assert_eq!(outcome.rating, 4.0);

    let mut bookings = app.marketplace.subscribe_bookings();
    tokio::time::timeout(
        Duration::from_secs(2),
        bookings.wait_for(|all| all.iter().any(|b| b.id == booking.id && b.reviewed)),
    )
    .await
    .unwrap()
    .unwrap();

    app.stop();
}

#[tokio::test]
async fn test_session_and_preferences_survive_restart() {
    let dir = std::env::temp_dir().join(format!("staynest-app-{}", uuid::Uuid::new_v4().simple()));
    let path = dir.join("preferences.json");
    let store: Arc<dyn DocumentStore> = Arc::new(InMemoryDocumentStore::new());

    let first = StayNest::with_stores(
        embedded_config(),
        store.clone(),
        Arc::new(FileKeyValueStore::open(&path).await.unwrap()),
    )
    .await
    .unwrap();
    let user = first
        .auth
        .signup(signup("Remy Returner", "remy@example.com", UserRole::Guest))
        .await
        .unwrap();
    first.settings.set_currency(Currency::Eur).await.unwrap();
    first.stop();
    drop(first);

    let second = StayNest::with_stores(
        embedded_config(),
        store,
        Arc::new(FileKeyValueStore::open(&path).await.unwrap()),
    )
    .await
    .unwrap();
    assert_eq!(second.auth.current_user().map(|u| u.id), Some(user.id));
    assert_eq!(second.settings.currency(), Currency::Eur);
    // Seeding only happens into an empty collection
    assert_eq!(second.marketplace.properties().len(), 6);
}

#[tokio::test]
async fn test_unsupported_document_backend_is_rejected() {
    let mut config = embedded_config();
    config.storage.documents = StorageBackend::File;
    assert!(build_document_store(&config).await.is_err());
}
