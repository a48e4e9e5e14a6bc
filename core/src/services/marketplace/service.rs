//! Listing, booking and inquiry service

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde_json::json;
use tokio::sync::watch;
use tracing::{error, info, warn};
use validator::Validate;

use nest_shared::config::MarketplaceConfig;

use crate::domain::entities::booking::{generate_invoice_id, Booking, BookingStatus, NewBooking};
use crate::domain::entities::inquiry::{Inquiry, InquiryStatus, NewInquiry};
use crate::domain::entities::property::{
    round2, NewProperty, Property, PropertyStatus, PropertyUpdate,
};
use crate::domain::entities::user::UserRole;
use crate::domain::value_objects::{quote, Actor, HostSummary, PriceBreakdown, SearchCriteria};
use crate::errors::{DomainError, DomainResult, ValidationError};
use crate::repositories::document::{
    encode, run_transaction, Collection, Document, DocumentStore, Fields, WriteBatch,
};
use crate::services::access::authorize;
use crate::services::mirror::{decode_all, RealtimeMirror};

use super::review::{submit_review, ReviewOutcome, ReviewSubmission};
use super::seed::seed_properties;

fn object(value: serde_json::Value) -> Fields {
    value.as_object().cloned().unwrap_or_default()
}

/// Log a failed remote write and pass the error on
fn write_failed(operation: &'static str, err: DomainError) -> DomainError {
    error!(operation, error = %err, "Remote write failed");
    err
}

/// Log a rejected operation and build the rule violation
fn rejected(operation: &'static str, message: &str) -> DomainError {
    warn!(operation, reason = message, "Operation rejected");
    DomainError::rule(message)
}

/// Marketplace service over the properties, bookings and inquiries collections
///
/// Each collection is held as a realtime mirror. Reads are served from the
/// mirrors; writes go to the remote store and come back through the change
/// streams. Every mutation takes the calling [`Actor`], re-reads its account
/// and is refused with `DomainError::Unauthorized` when the account is gone,
/// disabled, holds another role or lacks the capability.
pub struct MarketplaceService {
    store: Arc<dyn DocumentStore>,
    config: MarketplaceConfig,
    properties: RealtimeMirror<Property>,
    bookings: RealtimeMirror<Booking>,
    inquiries: RealtimeMirror<Inquiry>,
}

impl MarketplaceService {
    /// Load the three collections, seeding sample listings into an empty
    /// properties collection, then keep them mirrored
    pub async fn start(store: Arc<dyn DocumentStore>, config: MarketplaceConfig) -> DomainResult<Self> {
        // Subscribe first so nothing committed after the listing is missed
        let property_stream = store.subscribe(Collection::Properties);
        let booking_stream = store.subscribe(Collection::Bookings);
        let inquiry_stream = store.subscribe(Collection::Inquiries);

        let mut property_docs = store.list(Collection::Properties).await?;
        if property_docs.is_empty() && config.seed_on_empty {
            seed_properties(store.as_ref(), &config.seed_host_id)
                .await
                .map_err(|e| write_failed("seed_properties", e))?;
            property_docs = store.list(Collection::Properties).await?;
        }
        let booking_docs = store.list(Collection::Bookings).await?;
        let inquiry_docs = store.list(Collection::Inquiries).await?;

        info!(
            properties = property_docs.len(),
            bookings = booking_docs.len(),
            inquiries = inquiry_docs.len(),
            "Marketplace loaded"
        );

        Ok(Self {
            properties: RealtimeMirror::attach(Collection::Properties, property_stream, &property_docs),
            bookings: RealtimeMirror::attach(Collection::Bookings, booking_stream, &booking_docs),
            inquiries: RealtimeMirror::attach(Collection::Inquiries, inquiry_stream, &inquiry_docs),
            store,
            config,
        })
    }

    /// Detach all three mirrors
    pub fn stop(&self) {
        self.properties.detach();
        self.bookings.detach();
        self.inquiries.detach();
        info!("Marketplace detached");
    }

    pub fn properties(&self) -> Arc<Vec<Property>> {
        self.properties.current()
    }

    pub fn bookings(&self) -> Arc<Vec<Booking>> {
        self.bookings.current()
    }

    pub fn inquiries(&self) -> Arc<Vec<Inquiry>> {
        self.inquiries.current()
    }

    pub fn subscribe_properties(&self) -> watch::Receiver<Arc<Vec<Property>>> {
        self.properties.subscribe()
    }

    pub fn subscribe_bookings(&self) -> watch::Receiver<Arc<Vec<Booking>>> {
        self.bookings.subscribe()
    }

    pub fn subscribe_inquiries(&self) -> watch::Receiver<Arc<Vec<Inquiry>>> {
        self.inquiries.subscribe()
    }

    /// Cached lookup; may lag behind the remote store
    pub fn property(&self, id: &str) -> Option<Property> {
        self.properties.current().iter().find(|p| p.id == id).cloned()
    }

    /// Cached lookup; may lag behind the remote store
    pub fn booking(&self, id: &str) -> Option<Booking> {
        self.bookings.current().iter().find(|b| b.id == id).cloned()
    }

    pub fn properties_for_host(&self, host_id: &str) -> Vec<Property> {
        self.properties
            .current()
            .iter()
            .filter(|p| p.host_id == host_id)
            .cloned()
            .collect()
    }

    /// Moderation queue
    pub fn pending_properties(&self) -> Vec<Property> {
        self.properties
            .current()
            .iter()
            .filter(|p| p.status == PropertyStatus::Pending)
            .cloned()
            .collect()
    }

    pub fn bookings_for_host(&self, host_id: &str) -> Vec<Booking> {
        self.bookings
            .current()
            .iter()
            .filter(|b| b.host_id == host_id)
            .cloned()
            .collect()
    }

    pub fn bookings_for_guest(&self, guest_id: &str) -> Vec<Booking> {
        self.bookings
            .current()
            .iter()
            .filter(|b| b.guest_id == guest_id)
            .cloned()
            .collect()
    }

    pub fn inquiries_for_host(&self, host_id: &str) -> Vec<Inquiry> {
        self.inquiries
            .current()
            .iter()
            .filter(|i| i.host_id == host_id)
            .cloned()
            .collect()
    }

    pub fn inquiries_for_guest(&self, guest_id: &str) -> Vec<Inquiry> {
        self.inquiries
            .current()
            .iter()
            .filter(|i| i.guest_id == guest_id)
            .cloned()
            .collect()
    }

    /// Dashboard aggregates of one host
    pub fn host_summary(&self, host_id: &str) -> HostSummary {
        let mut summary = HostSummary::default();
        for property in self.properties.current().iter().filter(|p| p.host_id == host_id) {
            summary.listings += 1;
            if property.status == PropertyStatus::Approved {
                summary.approved_listings += 1;
            }
        }
        for booking in self.bookings.current().iter().filter(|b| b.host_id == host_id) {
            match booking.status {
                BookingStatus::Pending => summary.pending_bookings += 1,
                BookingStatus::Confirmed => {
                    summary.confirmed_bookings += 1;
                    summary.confirmed_revenue += booking.total_price;
                }
                BookingStatus::Cancelled => {}
            }
        }
        summary.confirmed_revenue = round2(summary.confirmed_revenue);
        summary.pending_inquiries = self
            .inquiries
            .current()
            .iter()
            .filter(|i| i.host_id == host_id && i.status == InquiryStatus::Pending)
            .count();
        summary
    }

    /// Approved listings matching the criteria and free for the stay, if given
    pub fn search_properties(&self, criteria: &SearchCriteria) -> Vec<Property> {
        let bookings = self.bookings.current();
        let stay = criteria.stay();
        self.properties
            .current()
            .iter()
            .filter(|p| p.status == PropertyStatus::Approved && criteria.matches(p))
            .filter(|p| match stay {
                Some((check_in, check_out)) => !bookings.iter().any(|b| {
                    b.property_id == p.id && b.blocks_calendar() && b.overlaps(check_in, check_out)
                }),
                None => true,
            })
            .cloned()
            .collect()
    }

    /// Price a stay at a cached listing
    pub fn quote_stay(
        &self,
        property_id: &str,
        check_in: NaiveDate,
        check_out: NaiveDate,
    ) -> DomainResult<PriceBreakdown> {
        let property = self
            .property(property_id)
            .ok_or_else(|| DomainError::not_found(format!("property {}", property_id)))?;
        Ok(quote(&property, check_in, check_out))
    }

    /// Create a listing owned by the actor; it starts pending moderation
    pub async fn add_property(&self, actor: &Actor, draft: NewProperty) -> DomainResult<Property> {
        authorize(self.store.as_ref(), actor).await?;
        actor.require(actor.role() == UserRole::Host || actor.is_admin())?;
        draft.validate()?;

        let property = Property {
            id: String::new(),
            host_id: actor.user_id().to_string(),
            title: draft.title.trim().to_string(),
            description: draft.description.trim().to_string(),
            location: draft.location.trim().to_string(),
            property_type: draft.property_type,
            price_per_night: draft.price_per_night,
            weekend_premium_percent: draft.weekend_premium_percent,
            max_guests: draft.max_guests,
            bedrooms: draft.bedrooms,
            beds: draft.beds,
            bathrooms: draft.bathrooms,
            amenities: draft.amenities,
            photos: draft.photos,
            rating: 0.0,
            reviews_count: 0,
            rating_sum: Some(0.0),
            status: PropertyStatus::Pending,
            booking_policy: draft.booking_policy,
            created_at: None,
        };
        let property: Property = self
            .store
            .insert(Collection::Properties, encode(&property)?)
            .await
            .map_err(|e| write_failed("add_property", e))?
            .decode()?;

        info!(property_id = %property.id, host_id = %property.host_id, "Property added");
        Ok(property)
    }

    /// Change listing details (owning host or admin)
    pub async fn update_property(
        &self,
        actor: &Actor,
        property_id: &str,
        update: PropertyUpdate,
    ) -> DomainResult<()> {
        update.validate()?;
        authorize(self.store.as_ref(), actor).await?;
        let (property, _) = self.load::<Property>(Collection::Properties, property_id).await?;
        actor.require(actor.owns_or_admin(&property.host_id))?;

        let fields = encode(&update)?;
        if fields.is_empty() {
            return Ok(());
        }
        self.store
            .merge(Collection::Properties, property_id, fields)
            .await
            .map_err(|e| write_failed("update_property", e))?;
        info!(property_id, "Property updated");
        Ok(())
    }

    /// Remove a listing (owning host or admin)
    pub async fn delete_property(&self, actor: &Actor, property_id: &str) -> DomainResult<()> {
        authorize(self.store.as_ref(), actor).await?;
        let (property, _) = self.load::<Property>(Collection::Properties, property_id).await?;
        actor.require(actor.owns_or_admin(&property.host_id))?;

        self.store
            .delete(Collection::Properties, property_id)
            .await
            .map_err(|e| write_failed("delete_property", e))?;
        info!(property_id, "Property deleted");
        Ok(())
    }

    /// Moderate a listing (admin)
    pub async fn update_property_status(
        &self,
        actor: &Actor,
        property_id: &str,
        status: PropertyStatus,
    ) -> DomainResult<()> {
        authorize(self.store.as_ref(), actor).await?;
        actor.require_admin()?;
        self.load::<Property>(Collection::Properties, property_id).await?;

        self.store
            .merge(Collection::Properties, property_id, object(json!({ "status": status })))
            .await
            .map_err(|e| write_failed("update_property_status", e))?;
        info!(property_id, status = ?status, "Property status changed");
        Ok(())
    }

    /// Request a stay. The total is priced here, never taken from the caller.
    pub async fn add_booking(&self, actor: &Actor, draft: NewBooking) -> DomainResult<Booking> {
        draft.validate()?;
        authorize(self.store.as_ref(), actor).await?;
        let (property, _) = self
            .load::<Property>(Collection::Properties, &draft.property_id)
            .await?;
        actor.require(!actor.is(&property.host_id))?;
        if !property.is_bookable() {
            return Err(rejected("add_booking", "property is not open for booking"));
        }
        if draft.guests > property.max_guests {
            return Err(ValidationError::OutOfRange {
                field: "guests".to_string(),
                min: "1".to_string(),
                max: property.max_guests.to_string(),
            }
            .into());
        }

        let price = quote(&property, draft.check_in, draft.check_out);
        if !price.is_bookable() {
            return Err(ValidationError::InvalidDateRange.into());
        }
        if self
            .has_confirmed_overlap(&property.id, draft.check_in, draft.check_out, None)
            .await?
        {
            return Err(rejected("add_booking", "dates are not available"));
        }

        let booking = Booking {
            id: String::new(),
            property_id: property.id.clone(),
            host_id: property.host_id.clone(),
            guest_id: actor.user_id().to_string(),
            check_in: draft.check_in,
            check_out: draft.check_out,
            guests: draft.guests,
            total_price: price.total,
            payment_method: draft.payment_method.trim().to_string(),
            status: BookingStatus::Pending,
            invoice_id: generate_invoice_id(Utc::now()),
            reviewed: false,
            review: None,
            created_at: None,
        };
        let booking: Booking = self
            .store
            .insert(Collection::Bookings, encode(&booking)?)
            .await
            .map_err(|e| write_failed("add_booking", e))?
            .decode()?;

        info!(
            booking_id = %booking.id,
            property_id = %booking.property_id,
            invoice_id = %booking.invoice_id,
            total = booking.total_price,
            "Booking requested"
        );
        Ok(booking)
    }

    /// Confirm or cancel a booking
    ///
    /// Confirming is up to the host; cancelling is open to the host and the
    /// guest. Admins may do both. A confirmation also pins the listing's
    /// version, so confirmations on one listing commit one at a time and each
    /// sees the bookings the previous one confirmed.
    pub async fn update_booking_status(
        &self,
        actor: &Actor,
        booking_id: &str,
        status: BookingStatus,
    ) -> DomainResult<()> {
        authorize(self.store.as_ref(), actor).await?;
        let this = self;
        run_transaction(self.store.as_ref(), self.config.transaction_max_attempts, || {
            async move {
                let document = this
                    .store
                    .get(Collection::Bookings, booking_id)
                    .await?
                    .ok_or_else(|| DomainError::not_found(format!("booking {}", booking_id)))?;
                let booking: Booking = document.decode()?;

                let allowed = match status {
                    BookingStatus::Cancelled => {
                        actor.owns_or_admin(&booking.host_id) || actor.is(&booking.guest_id)
                    }
                    _ => actor.owns_or_admin(&booking.host_id),
                };
                actor.require(allowed)?;

                if !booking.status.can_transition_to(status) {
                    return Err(rejected("update_booking_status", "status transition not allowed"));
                }

                let mut batch = WriteBatch::new();
                if status == BookingStatus::Confirmed {
                    let (_, property_version) = this
                        .load::<Property>(Collection::Properties, &booking.property_id)
                        .await?;
                    if this
                        .has_confirmed_overlap(
                            &booking.property_id,
                            booking.check_in,
                            booking.check_out,
                            Some(&booking.id),
                        )
                        .await?
                    {
                        return Err(rejected(
                            "update_booking_status",
                            "dates overlap a confirmed booking",
                        ));
                    }
                    batch = batch.merge_at_version(
                        Collection::Properties,
                        &booking.property_id,
                        property_version,
                        Fields::new(),
                    );
                }

                let batch = batch.merge_at_version(
                    Collection::Bookings,
                    booking_id,
                    document.version,
                    object(json!({ "status": status })),
                );
                Ok((batch, ()))
            }
        })
        .await
        .map_err(|e| match e {
            e @ (DomainError::Conflict { .. } | DomainError::Internal { .. }) => {
                write_failed("update_booking_status", e)
            }
            e => e,
        })?;

        info!(booking_id, status = ?status, "Booking status changed");
        Ok(())
    }

    /// Send a question to the host of an approved listing
    pub async fn add_inquiry(&self, actor: &Actor, draft: NewInquiry) -> DomainResult<Inquiry> {
        draft.validate()?;
        authorize(self.store.as_ref(), actor).await?;
        let (property, _) = self
            .load::<Property>(Collection::Properties, &draft.property_id)
            .await?;
        actor.require(!actor.is(&property.host_id))?;
        if !property.is_bookable() {
            return Err(rejected("add_inquiry", "property is not listed"));
        }

        let inquiry = Inquiry {
            id: String::new(),
            property_id: property.id.clone(),
            host_id: property.host_id.clone(),
            guest_id: actor.user_id().to_string(),
            message: draft.message.trim().to_string(),
            status: InquiryStatus::Pending,
            created_at: None,
        };
        let inquiry: Inquiry = self
            .store
            .insert(Collection::Inquiries, encode(&inquiry)?)
            .await
            .map_err(|e| write_failed("add_inquiry", e))?
            .decode()?;

        info!(inquiry_id = %inquiry.id, property_id = %inquiry.property_id, "Inquiry sent");
        Ok(inquiry)
    }

    /// Accept or reject an inquiry (owning host or admin)
    pub async fn update_inquiry_status(
        &self,
        actor: &Actor,
        inquiry_id: &str,
        status: InquiryStatus,
    ) -> DomainResult<()> {
        authorize(self.store.as_ref(), actor).await?;
        let (inquiry, version) = self.load::<Inquiry>(Collection::Inquiries, inquiry_id).await?;
        actor.require(actor.owns_or_admin(&inquiry.host_id))?;
        if !inquiry.status.can_transition_to(status) {
            return Err(rejected("update_inquiry_status", "inquiry was already answered"));
        }

        self.store
            .commit(WriteBatch::new().merge_at_version(
                Collection::Inquiries,
                inquiry_id,
                version,
                object(json!({ "status": status })),
            ))
            .await
            .map_err(|e| write_failed("update_inquiry_status", e))?;
        info!(inquiry_id, status = ?status, "Inquiry answered");
        Ok(())
    }

    /// Review a confirmed stay and update the listing's rating atomically
    pub async fn add_review_and_rating(
        &self,
        actor: &Actor,
        booking_id: &str,
        property_id: &str,
        rating: u8,
        comment: &str,
    ) -> DomainResult<ReviewOutcome> {
        authorize(self.store.as_ref(), actor).await?;
        let review = ReviewSubmission {
            booking_id,
            property_id,
            rating,
            comment,
        };
        submit_review(
            self.store.as_ref(),
            self.config.transaction_max_attempts,
            actor,
            &review,
        )
        .await
        .map_err(|e| {
            warn!(booking_id, property_id, error = %e, "Review failed");
            e
        })
    }

    /// Point read from the remote store with the version that was read
    async fn load<T: serde::de::DeserializeOwned>(
        &self,
        collection: Collection,
        id: &str,
    ) -> DomainResult<(T, u64)> {
        let document: Document = self
            .store
            .get(collection, id)
            .await?
            .ok_or_else(|| DomainError::not_found(format!("{} {}", collection, id)))?;
        Ok((document.decode()?, document.version))
    }

    async fn has_confirmed_overlap(
        &self,
        property_id: &str,
        check_in: NaiveDate,
        check_out: NaiveDate,
        except: Option<&str>,
    ) -> DomainResult<bool> {
        let documents = self.store.list(Collection::Bookings).await?;
        Ok(decode_all::<Booking>(Collection::Bookings, &documents)
            .iter()
            .any(|b| {
                b.property_id == property_id
                    && Some(b.id.as_str()) != except
                    && b.blocks_calendar()
                    && b.overlaps(check_in, check_out)
            }))
    }
}
