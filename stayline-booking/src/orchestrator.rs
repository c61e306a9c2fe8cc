use chrono::{Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use stayline_core::booking::{generate_reference, DEFAULT_REFERENCE_LENGTH};
use stayline_core::supplier::{HotelDetails, Holder, ReservationRequest};
use stayline_core::{
    Booking, BookingEvent, BookingRepository, BookingStatus, BookingSummary, CreateBookingRequest, PaymentType,
    PricingService, Recipient, Stay, SupplierClient, SupplierError, UpdateBookingRequest,
};
use stayline_shared::{EventBus, RequestContext};
use uuid::Uuid;

use crate::error::{BookingError, BookingResult};
use crate::state_machine::BookingStateMachine;

/// Tunables of the booking lifecycle.
#[derive(Debug, Clone)]
pub struct BookingPolicy {
    /// How far in the past a check-in date may lie at creation time.
    pub check_in_grace: Duration,
    pub reference_length: usize,
    /// Upper bound (and default) for one page of a user's bookings.
    pub max_page_size: u32,
}

impl Default for BookingPolicy {
    fn default() -> Self {
        Self {
            check_in_grace: Duration::hours(24),
            reference_length: DEFAULT_REFERENCE_LENGTH,
            max_page_size: 100,
        }
    }
}

/// A booking enriched with the supplier's hotel details, when they could be
/// fetched.
#[derive(Debug, Clone, Serialize)]
pub struct BookingDetails {
    #[serde(flatten)]
    pub booking: Booking,
    pub hotel: Option<HotelDetails>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct QuotedRoom {
    pub room_id: String,
    pub name: String,
    pub net_price: i64,
    pub sell_price: i64,
    pub margin: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct StayQuote {
    pub hotel: HotelDetails,
    pub available: bool,
    pub rooms: Vec<QuotedRoom>,
}

/// Drives bookings through their lifecycle: validation, supplier pricing,
/// persistence, transitions and event publication.
pub struct BookingService {
    repository: Arc<dyn BookingRepository>,
    supplier: Arc<dyn SupplierClient>,
    pricing: Arc<dyn PricingService>,
    events: Arc<EventBus<BookingEvent>>,
    policy: BookingPolicy,
}

impl BookingService {
    pub fn new(
        repository: Arc<dyn BookingRepository>,
        supplier: Arc<dyn SupplierClient>,
        pricing: Arc<dyn PricingService>,
        events: Arc<EventBus<BookingEvent>>,
    ) -> Self {
        Self::with_policy(repository, supplier, pricing, events, BookingPolicy::default())
    }

    pub fn with_policy(
        repository: Arc<dyn BookingRepository>,
        supplier: Arc<dyn SupplierClient>,
        pricing: Arc<dyn PricingService>,
        events: Arc<EventBus<BookingEvent>>,
        policy: BookingPolicy,
    ) -> Self {
        Self {
            repository,
            supplier,
            pricing,
            events,
            policy,
        }
    }

    pub fn policy(&self) -> &BookingPolicy {
        &self.policy
    }

    /// Create a booking from a supplier-priced offer and move it to
    /// `AWAITING_PAYMENT`.
    #[tracing::instrument(
        skip(self, ctx, request),
        fields(correlation_id = ?ctx.correlation_id(), hotel_id = %request.hotel_id, room_id = %request.room_id)
    )]
    pub async fn create_booking(
        &self,
        ctx: &RequestContext,
        user_id: &str,
        request: CreateBookingRequest,
    ) -> BookingResult<Booking> {
        let stay = request.stay();
        self.validate_stay(&stay)?;
        let payment_type: PaymentType = request.payment_type.parse()?;

        let availability = ctx
            .run(self.supplier.get_availability(ctx, &stay))
            .await
            .map_err(|source| availability_failed(&stay, source))?;
        if !availability.available || availability.rooms.is_empty() {
            tracing::info!(
                "Room {} of hotel {} unavailable for {} -> {}",
                stay.room_id,
                stay.hotel_id,
                stay.check_in,
                stay.check_out
            );
            return Err(BookingError::RoomNotAvailable {
                hotel_id: stay.hotel_id,
                room_id: stay.room_id,
                check_in: stay.check_in,
                check_out: stay.check_out,
            });
        }

        let rate = ctx
            .run(self.supplier.get_room_rate(ctx, &stay))
            .await
            .map_err(|source| pricing_failed(&stay, source))?;
        if rate.total_price <= 0 || rate.currency.trim().is_empty() {
            let source = SupplierError::Rejected(format!(
                "unusable quote {} {:?}",
                rate.total_price, rate.currency
            ));
            return Err(pricing_failed(&stay, source));
        }

        let mut booking = Booking::new(
            user_id.to_string(),
            generate_reference(self.policy.reference_length),
            stay,
            rate,
            payment_type,
            request.contact,
        );

        ctx.run(self.repository.create(ctx, &booking))
            .await
            .map_err(BookingError::FailedToCreate)?;
        tracing::info!("Booking {} ({}) created for user {}", booking.id, booking.reference, user_id);

        let previous = BookingStateMachine::transition(&mut booking, BookingStatus::AwaitingPayment)?;
        let stored = match ctx
            .run(
                self.repository
                    .update_status(ctx, booking.id, previous, booking.status),
            )
            .await
        {
            Ok(stored) => stored,
            Err(e) => {
                tracing::error!(
                    "Booking {} persisted as {} but could not move to {}: {}",
                    booking.id,
                    previous,
                    booking.status,
                    e
                );
                return Err(BookingError::FailedToUpdateStatus(e));
            }
        };

        self.publish(ctx, BookingEvent::Created { booking: (&stored).into() })
            .await;

        Ok(stored)
    }

    pub async fn get_booking(&self, ctx: &RequestContext, id: Uuid) -> BookingResult<Booking> {
        self.load(ctx, id).await
    }

    /// Like [`get_booking`](Self::get_booking), with hotel details attached.
    /// A failed hotel lookup leaves `hotel` empty.
    pub async fn get_booking_with_details(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> BookingResult<BookingDetails> {
        let booking = self.load(ctx, id).await?;

        let hotel = match ctx
            .run(self.supplier.get_hotel_details(ctx, &booking.stay.hotel_id))
            .await
        {
            Ok(details) => Some(details),
            Err(e) => {
                tracing::warn!(
                    "Hotel details for {} unavailable, returning booking {} without them: {}",
                    booking.stay.hotel_id,
                    booking.id,
                    e
                );
                None
            }
        };

        Ok(BookingDetails { booking, hotel })
    }

    /// Newest first. `limit` defaults to, and is capped at, the policy's page
    /// size.
    pub async fn list_user_bookings(
        &self,
        ctx: &RequestContext,
        user_id: &str,
        limit: Option<u32>,
        offset: u32,
    ) -> BookingResult<Vec<Booking>> {
        let max = self.policy.max_page_size.max(1);
        let limit = limit.unwrap_or(max).clamp(1, max);

        ctx.run(self.repository.get_by_user_id(ctx, user_id, limit, offset))
            .await
            .map_err(BookingError::FailedToLoad)
    }

    /// Price the supplier's rooms for a stay with our markup applied.
    #[tracing::instrument(skip(self, ctx, stay), fields(correlation_id = ?ctx.correlation_id(), hotel_id = %stay.hotel_id))]
    pub async fn quote_stay(&self, ctx: &RequestContext, stay: &Stay) -> BookingResult<StayQuote> {
        self.validate_stay(stay)?;

        let hotel = ctx
            .run(self.supplier.get_hotel_details(ctx, &stay.hotel_id))
            .await
            .map_err(|source| BookingError::HotelLookupFailed {
                hotel_id: stay.hotel_id.clone(),
                source,
            })?;

        let availability = ctx
            .run(self.supplier.get_availability(ctx, stay))
            .await
            .map_err(|source| availability_failed(stay, source))?;

        let rooms = availability
            .rooms
            .into_iter()
            .map(|room| {
                let price = self.pricing.calculate_sell_price(room.net_price, hotel.category);
                QuotedRoom {
                    room_id: room.room_id,
                    name: room.name,
                    net_price: room.net_price,
                    sell_price: price.sell_price,
                    margin: price.margin,
                    currency: room.currency,
                }
            })
            .collect();

        Ok(StayQuote {
            hotel,
            available: availability.available,
            rooms,
        })
    }

    /// Apply the supplied guest-contact fields and payment type. Only allowed
    /// before payment.
    #[tracing::instrument(skip(self, ctx, request), fields(correlation_id = ?ctx.correlation_id()))]
    pub async fn update_booking(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        request: UpdateBookingRequest,
    ) -> BookingResult<Booking> {
        let payment_type = request
            .payment_type
            .as_deref()
            .map(str::parse::<PaymentType>)
            .transpose()?;

        let mut booking = self.load(ctx, id).await?;
        if !booking.status.is_pre_payment() {
            return Err(BookingError::CannotUpdate(booking.status));
        }

        if let Some(name) = request.guest_name {
            booking.contact.guest_name = Some(name);
        }
        if let Some(email) = request.guest_email {
            booking.contact.guest_email = Some(email);
        }
        if let Some(phone) = request.guest_phone {
            booking.contact.guest_phone = Some(phone);
        }
        if let Some(special_requests) = request.special_requests {
            booking.contact.special_requests = Some(special_requests);
        }
        if let Some(payment_type) = payment_type {
            booking.payment_type = payment_type;
        }
        booking.touch();

        ctx.run(self.repository.update(ctx, &booking))
            .await
            .map_err(|e| BookingError::from_write(id, e, BookingError::FailedToUpdate))
    }

    /// The generic transition primitive: validate, persist, publish.
    #[tracing::instrument(skip(self, ctx), fields(correlation_id = ?ctx.correlation_id()))]
    pub async fn update_status(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        target: BookingStatus,
    ) -> BookingResult<Booking> {
        let booking = self.load(ctx, id).await?;

        // CONFIRMED is reachable only through a supplier reservation.
        if target == BookingStatus::Confirmed && booking.supplier_reference.is_none() {
            BookingStateMachine::ensure(booking.status, target)?;
            return Err(BookingError::SupplierReferenceRequired(id));
        }

        self.apply_transition(ctx, booking, target, false).await
    }

    /// Cancel locally, releasing the supplier reservation first when there
    /// is one. A failed supplier release does not block the cancellation.
    #[tracing::instrument(skip(self, ctx), fields(correlation_id = ?ctx.correlation_id()))]
    pub async fn cancel_booking(&self, ctx: &RequestContext, id: Uuid) -> BookingResult<Booking> {
        let booking = self.load(ctx, id).await?;
        BookingStateMachine::ensure(booking.status, BookingStatus::Cancelled)?;

        let mut supplier_cancellation_failed = false;
        if let Some(supplier_reference) = booking.supplier_reference.as_deref() {
            match ctx
                .run(self.supplier.cancel_reservation(ctx, supplier_reference))
                .await
            {
                Ok(()) => tracing::info!(
                    "Supplier reservation {} released for booking {}",
                    supplier_reference,
                    booking.id
                ),
                Err(e) => {
                    tracing::warn!(
                        "Supplier cancellation of {} failed for booking {}, cancelling locally: {}",
                        supplier_reference,
                        booking.id,
                        e
                    );
                    supplier_cancellation_failed = true;
                }
            }
        }

        self.apply_transition(ctx, booking, BookingStatus::Cancelled, supplier_cancellation_failed)
            .await
    }

    /// Reserve the room with the supplier for a paid booking, then record the
    /// supplier reference and `CONFIRMED` in one write.
    #[tracing::instrument(skip(self, ctx), fields(correlation_id = ?ctx.correlation_id()))]
    pub async fn confirm_booking_with_supplier(
        &self,
        ctx: &RequestContext,
        id: Uuid,
    ) -> BookingResult<Booking> {
        let mut booking = self.load(ctx, id).await?;
        if booking.status != BookingStatus::Paid {
            return Err(BookingError::InvalidStatus {
                id,
                required: BookingStatus::Paid,
                actual: booking.status,
            });
        }

        let request = ReservationRequest {
            client_reference: booking.reference.clone(),
            holder: Holder {
                name: booking
                    .contact
                    .guest_name
                    .clone()
                    .unwrap_or_else(|| booking.user_id.clone()),
                email: booking.contact.guest_email.clone(),
                phone: booking.contact.guest_phone.clone(),
            },
            payment_method: booking.payment_type,
            stay: booking.stay.clone(),
        };

        let reservation = ctx
            .run(self.supplier.create_reservation(ctx, &request))
            .await
            .map_err(|source| BookingError::ReservationFailed {
                reference: booking.reference.clone(),
                source,
            })?;

        booking.supplier_reference = Some(reservation.supplier_reference.clone());
        let previous = BookingStateMachine::transition(&mut booking, BookingStatus::Confirmed)?;

        let stored = match ctx.run(self.repository.update(ctx, &booking)).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::error!(
                    "Supplier reservation {} for booking {} is not recorded locally: {}",
                    reservation.supplier_reference,
                    id,
                    e
                );
                // Release the unrecorded reservation so a retry does not hold two rooms.
                if let Err(cancel_err) = ctx
                    .run(self.supplier.cancel_reservation(ctx, &reservation.supplier_reference))
                    .await
                {
                    tracing::error!(
                        "Failed to release orphaned supplier reservation {} for booking {}: {}",
                        reservation.supplier_reference,
                        id,
                        cancel_err
                    );
                }
                return Err(BookingError::from_write(id, e, BookingError::FailedToUpdateStatus));
            }
        };
        tracing::info!(
            "Booking {} confirmed with supplier reference {}",
            stored.id,
            reservation.supplier_reference
        );

        self.publish_status_event(ctx, &stored, previous, false).await;
        Ok(stored)
    }

    async fn apply_transition(
        &self,
        ctx: &RequestContext,
        mut booking: Booking,
        target: BookingStatus,
        supplier_cancellation_failed: bool,
    ) -> BookingResult<Booking> {
        let id = booking.id;
        let previous = BookingStateMachine::transition(&mut booking, target)?;

        let stored = ctx
            .run(self.repository.update_status(ctx, id, previous, target))
            .await
            .map_err(|e| BookingError::from_write(id, e, BookingError::FailedToUpdateStatus))?;
        tracing::info!("Booking {} moved {} -> {}", id, previous, target);

        self.publish_status_event(ctx, &stored, previous, supplier_cancellation_failed)
            .await;
        Ok(stored)
    }

    async fn publish_status_event(
        &self,
        ctx: &RequestContext,
        booking: &Booking,
        previous_status: BookingStatus,
        supplier_cancellation_failed: bool,
    ) {
        let summary: BookingSummary = booking.into();
        let event = match booking.status {
            BookingStatus::Paid => BookingEvent::Paid {
                booking: summary,
                recipient: Recipient::from(booking),
            },
            BookingStatus::Confirmed => BookingEvent::Confirmed {
                booking: summary,
                recipient: Recipient::from(booking),
            },
            BookingStatus::Cancelled => BookingEvent::Cancelled {
                booking: summary,
                recipient: Recipient::from(booking),
                previous_status,
                supplier_cancellation_failed,
            },
            BookingStatus::Completed => BookingEvent::Completed { booking: summary },
            BookingStatus::Init | BookingStatus::AwaitingPayment => return,
        };

        self.publish(ctx, event).await;
    }

    /// Best effort: a failed publish is logged, never returned.
    async fn publish(&self, ctx: &RequestContext, event: BookingEvent) {
        let booking_id = event.booking().booking_id;
        if let Err(e) = self.events.publish(ctx, event).await {
            tracing::error!("Event for booking {} not fully delivered: {}", booking_id, e);
        }
    }

    async fn load(&self, ctx: &RequestContext, id: Uuid) -> BookingResult<Booking> {
        ctx.run(self.repository.get_by_id(ctx, id))
            .await
            .map_err(|e| BookingError::from_read(id, e))
    }

    fn validate_stay(&self, stay: &Stay) -> BookingResult<()> {
        if stay.check_out <= stay.check_in {
            return Err(BookingError::InvalidDateRange {
                check_in: stay.check_in,
                check_out: stay.check_out,
            });
        }

        let earliest = (Utc::now() - self.policy.check_in_grace).date_naive();
        if stay.check_in < earliest {
            return Err(BookingError::InvalidCheckIn(stay.check_in));
        }

        if stay.guests < 1 {
            return Err(BookingError::InvalidGuestCount);
        }

        Ok(())
    }
}

fn availability_failed(stay: &Stay, source: SupplierError) -> BookingError {
    BookingError::AvailabilityFailed {
        hotel_id: stay.hotel_id.clone(),
        room_id: stay.room_id.clone(),
        check_in: stay.check_in,
        check_out: stay.check_out,
        source,
    }
}

fn pricing_failed(stay: &Stay, source: SupplierError) -> BookingError {
    BookingError::PricingFailed {
        hotel_id: stay.hotel_id.clone(),
        room_id: stay.room_id.clone(),
        check_in: stay.check_in,
        check_out: stay.check_out,
        source,
    }
}
