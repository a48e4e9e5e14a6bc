//! Sample listings written when the properties collection is empty

use tracing::info;

use crate::domain::entities::property::{round2, BookingPolicy, Property, PropertyStatus};
use crate::errors::{DomainError, DomainResult};
use crate::repositories::document::{encode, Collection, DocumentStore, WriteBatch};

struct Sample {
    title: &'static str,
    location: &'static str,
    property_type: &'static str,
    price_per_night: f64,
    weekend_premium_percent: f64,
    max_guests: u32,
    bedrooms: u32,
    beds: u32,
    bathrooms: u32,
    amenities: &'static [&'static str],
    photo_ids: [&'static str; 4],
    rating: f64,
    reviews_count: u32,
    booking_policy: BookingPolicy,
}

const SAMPLES: &[Sample] = &[
    Sample {
        title: "Oceanfront Villa with Infinity Pool",
        location: "Malibu, California",
        property_type: "villa",
        price_per_night: 850.0,
        weekend_premium_percent: 20.0,
        max_guests: 8,
        bedrooms: 4,
        beds: 5,
        bathrooms: 4,
        amenities: &["wifi", "pool", "kitchen", "parking", "ocean view"],
        photo_ids: ["1613490493576", "1613977257363", "1600596542815", "1600585154340"],
        rating: 4.9,
        reviews_count: 128,
        booking_policy: BookingPolicy::ReviewFirst,
    },
    Sample {
        title: "Cozy Mountain Cabin",
        location: "Aspen, Colorado",
        property_type: "cabin",
        price_per_night: 320.0,
        weekend_premium_percent: 15.0,
        max_guests: 4,
        bedrooms: 2,
        beds: 2,
        bathrooms: 1,
        amenities: &["wifi", "fireplace", "hot tub", "kitchen"],
        photo_ids: ["1449158743715", "1510798831971", "1542718610", "1587061949409"],
        rating: 4.8,
        reviews_count: 86,
        booking_policy: BookingPolicy::InstantBook,
    },
    Sample {
        title: "Modern Loft in the Arts District",
        location: "Brooklyn, New York",
        property_type: "apartment",
        price_per_night: 210.0,
        weekend_premium_percent: 10.0,
        max_guests: 3,
        bedrooms: 1,
        beds: 2,
        bathrooms: 1,
        amenities: &["wifi", "workspace", "washer", "air conditioning"],
        photo_ids: ["1502672260266", "1522708323590", "1560448204", "1484154218962"],
        rating: 4.7,
        reviews_count: 203,
        booking_policy: BookingPolicy::InstantBook,
    },
    Sample {
        title: "Whitewashed Cliffside Suite",
        location: "Santorini, Greece",
        property_type: "suite",
        price_per_night: 480.0,
        weekend_premium_percent: 0.0,
        max_guests: 2,
        bedrooms: 1,
        beds: 1,
        bathrooms: 1,
        amenities: &["wifi", "plunge pool", "breakfast", "sea view"],
        photo_ids: ["1570077188670", "1613395877344", "1601581875309", "1533105079780"],
        rating: 4.95,
        reviews_count: 64,
        booking_policy: BookingPolicy::ReviewFirst,
    },
    Sample {
        title: "Traditional Machiya Townhouse",
        location: "Kyoto, Japan",
        property_type: "house",
        price_per_night: 260.0,
        weekend_premium_percent: 12.0,
        max_guests: 5,
        bedrooms: 2,
        beds: 3,
        bathrooms: 1,
        amenities: &["wifi", "garden", "tea set", "bicycles"],
        photo_ids: ["1493976040374", "1545569341", "1528360983277", "1480796927426"],
        rating: 4.85,
        reviews_count: 97,
        booking_policy: BookingPolicy::ReviewFirst,
    },
    Sample {
        title: "Jungle Treehouse Retreat",
        location: "Tulum, Mexico",
        property_type: "treehouse",
        price_per_night: 175.0,
        weekend_premium_percent: 8.0,
        max_guests: 2,
        bedrooms: 1,
        beds: 1,
        bathrooms: 1,
        amenities: &["wifi", "outdoor shower", "hammock", "bicycles"],
        photo_ids: ["1520250497591", "1618767689160", "1596178065887", "1571003123894"],
        rating: 4.6,
        reviews_count: 51,
        booking_policy: BookingPolicy::InstantBook,
    },
];

/// Document id of the n-th sample listing, the same in every process
pub fn sample_property_id(index: usize) -> String {
    format!("sample-{:02}", index + 1)
}

/// The sample listings, approved and owned by `host_id`
pub fn sample_properties(host_id: &str) -> Vec<Property> {
    SAMPLES
        .iter()
        .enumerate()
        .map(|(index, s)| Property {
            id: sample_property_id(index),
            host_id: host_id.to_string(),
            title: s.title.to_string(),
            description: format!(
                "{} in {}. Hosted by a verified StayNest host, sleeps up to {} guests.",
                s.title, s.location, s.max_guests
            ),
            location: s.location.to_string(),
            property_type: s.property_type.to_string(),
            price_per_night: s.price_per_night,
            weekend_premium_percent: s.weekend_premium_percent,
            max_guests: s.max_guests,
            bedrooms: s.bedrooms,
            beds: s.beds,
            bathrooms: s.bathrooms,
            amenities: s.amenities.iter().map(|a| a.to_string()).collect(),
            photos: s
                .photo_ids
                .iter()
                .map(|id| format!("https://images.unsplash.com/photo-{}?w=1200", id))
                .collect(),
            rating: s.rating,
            reviews_count: s.reviews_count,
            rating_sum: Some(round2(s.rating * f64::from(s.reviews_count))),
            status: PropertyStatus::Approved,
            booking_policy: s.booking_policy,
            created_at: None,
        })
        .collect()
}

/// Write the sample listings in one batch. Returns how many were written:
/// none when another process seeded them first.
pub async fn seed_properties(store: &dyn DocumentStore, host_id: &str) -> DomainResult<usize> {
    let properties = sample_properties(host_id);
    let mut batch = WriteBatch::new();
    for property in &properties {
        batch = batch.create(Collection::Properties, &property.id, encode(property)?);
    }
    match store.commit(batch).await {
        Ok(()) => {
            info!(count = properties.len(), host_id, "Seeded sample properties");
            Ok(properties.len())
        }
        Err(DomainError::Conflict { .. }) => {
            info!("Sample properties were already seeded");
            Ok(0)
        }
        Err(err) => Err(err),
    }
}
