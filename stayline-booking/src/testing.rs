//! Scripted collaborators for the booking tests.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use stayline_core::booking::{GuestContact, Stay};
use stayline_core::notification::{AdminAlert, NotificationError};
use stayline_core::pricing::{MarkupPricingService, PricingConfig};
use stayline_core::refund::{RefundError, RefundReceipt, RefundRequest};
use stayline_core::supplier::{
    Availability, HotelDetails, Reservation, ReservationRequest, RoomRate, SupplierRoom,
};
use stayline_core::{
    Booking, BookingEvent, BookingRepository, BookingStatus, BookingSummary, CreateBookingRequest,
    NotificationService, PaymentType, Recipient, RefundProcessor, RepositoryError, SupplierClient,
    SupplierError,
};
use stayline_shared::{EventBus, EventEnvelope, EventHandler, HandlerError, RequestContext};
use stayline_store::InMemoryBookingRepository;
use uuid::Uuid;

use crate::orchestrator::BookingService;

pub fn tomorrow() -> NaiveDate {
    (Utc::now() + Duration::hours(24)).date_naive()
}

pub fn create_request() -> CreateBookingRequest {
    CreateBookingRequest {
        hotel_id: "h1".to_string(),
        room_id: "r1".to_string(),
        check_in: tomorrow(),
        check_out: tomorrow() + Duration::days(1),
        guests: 2,
        payment_type: "PAY_NOW".to_string(),
        contact: GuestContact::default(),
    }
}

pub fn summary(status: BookingStatus) -> BookingSummary {
    BookingSummary {
        booking_id: Uuid::new_v4(),
        user_id: "u1".to_string(),
        reference: "SLTEST01".to_string(),
        hotel_id: "h1".to_string(),
        room_id: "r1".to_string(),
        check_in: tomorrow(),
        check_out: tomorrow() + Duration::days(1),
        total_amount: 1_500_000,
        currency: "IDR".to_string(),
        payment_type: PaymentType::PayNow,
        status,
        supplier_reference: None,
    }
}

/// A stored booking already sitting in `status`.
pub fn booking_in(status: BookingStatus, supplier_reference: Option<&str>) -> Booking {
    let mut booking = Booking::new(
        "u1".to_string(),
        format!("SL{}", &Uuid::new_v4().simple().to_string()[..8].to_uppercase()),
        Stay {
            hotel_id: "h1".to_string(),
            room_id: "r1".to_string(),
            check_in: tomorrow(),
            check_out: tomorrow() + Duration::days(1),
            guests: 2,
        },
        RoomRate { total_price: 1_500_000, currency: "IDR".to_string() },
        PaymentType::PayNow,
        GuestContact::default(),
    );
    booking.status = status;
    booking.supplier_reference = supplier_reference.map(str::to_string);
    booking
}

/// Supplier with programmable answers that logs every call it receives.
pub struct ScriptedSupplier {
    pub available: bool,
    pub rate: Option<RoomRate>,
    pub reserve_fails: bool,
    pub cancel_fails: bool,
    pub hotel_fails: bool,
    /// Delay before answering availability checks.
    pub latency: std::time::Duration,
    pub calls: Mutex<Vec<String>>,
}

impl Default for ScriptedSupplier {
    fn default() -> Self {
        Self {
            available: true,
            rate: Some(RoomRate { total_price: 1_500_000, currency: "IDR".to_string() }),
            reserve_fails: false,
            cancel_fails: false,
            hotel_fails: false,
            latency: std::time::Duration::ZERO,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl ScriptedSupplier {
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl SupplierClient for ScriptedSupplier {
    async fn get_availability(
        &self,
        _ctx: &RequestContext,
        stay: &Stay,
    ) -> Result<Availability, SupplierError> {
        self.record(format!("availability:{}/{}", stay.hotel_id, stay.room_id));
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if !self.available {
            return Ok(Availability { available: false, rooms: vec![] });
        }
        Ok(Availability {
            available: true,
            rooms: vec![SupplierRoom {
                room_id: stay.room_id.clone(),
                name: "Deluxe".to_string(),
                net_price: 1_000_000,
                currency: "IDR".to_string(),
            }],
        })
    }

    async fn get_room_rate(&self, _ctx: &RequestContext, stay: &Stay) -> Result<RoomRate, SupplierError> {
        self.record(format!("rate:{}/{}", stay.hotel_id, stay.room_id));
        self.rate
            .clone()
            .ok_or_else(|| SupplierError::Unavailable("rate service down".to_string()))
    }

    async fn create_reservation(
        &self,
        _ctx: &RequestContext,
        request: &ReservationRequest,
    ) -> Result<Reservation, SupplierError> {
        self.record(format!("reserve:{}", request.client_reference));
        if self.reserve_fails {
            return Err(SupplierError::Rejected("no allotment".to_string()));
        }
        Ok(Reservation {
            supplier_reference: "HB-123".to_string(),
            status: "CONFIRMED".to_string(),
        })
    }

    async fn cancel_reservation(
        &self,
        _ctx: &RequestContext,
        supplier_reference: &str,
    ) -> Result<(), SupplierError> {
        self.record(format!("cancel:{}", supplier_reference));
        if self.cancel_fails {
            return Err(SupplierError::Unavailable("timeout".to_string()));
        }
        Ok(())
    }

    async fn get_hotel_details(
        &self,
        _ctx: &RequestContext,
        hotel_id: &str,
    ) -> Result<HotelDetails, SupplierError> {
        self.record(format!("hotel:{}", hotel_id));
        if self.hotel_fails {
            return Err(SupplierError::Unavailable("content api down".to_string()));
        }
        Ok(HotelDetails {
            hotel_id: hotel_id.to_string(),
            name: "Hotel Test".to_string(),
            category: 4,
            city: "Bandung".to_string(),
            address: "Jl. Braga 1".to_string(),
        })
    }
}

/// In-memory repository whose writes can be made to fail on demand.
#[derive(Default)]
pub struct FlakyRepository {
    inner: InMemoryBookingRepository,
    pub fail_create: AtomicBool,
    pub fail_update_status: AtomicBool,
    pub fail_update: AtomicBool,
}

impl FlakyRepository {
    pub async fn seed(&self, booking: &Booking) {
        self.inner
            .create(&RequestContext::new(), booking)
            .await
            .unwrap();
    }

    pub async fn stored(&self, id: Uuid) -> Option<Booking> {
        self.inner.get_by_id(&RequestContext::new(), id).await.ok()
    }

    pub async fn count(&self) -> usize {
        self.inner.len().await
    }

    fn check(flag: &AtomicBool) -> Result<(), RepositoryError> {
        if flag.load(Ordering::SeqCst) {
            return Err(RepositoryError::Backend("connection reset".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl BookingRepository for FlakyRepository {
    async fn create(&self, ctx: &RequestContext, booking: &Booking) -> Result<(), RepositoryError> {
        Self::check(&self.fail_create)?;
        self.inner.create(ctx, booking).await
    }

    async fn get_by_id(&self, ctx: &RequestContext, id: Uuid) -> Result<Booking, RepositoryError> {
        self.inner.get_by_id(ctx, id).await
    }

    async fn get_by_user_id(
        &self,
        ctx: &RequestContext,
        user_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Booking>, RepositoryError> {
        self.inner.get_by_user_id(ctx, user_id, limit, offset).await
    }

    async fn update(&self, ctx: &RequestContext, booking: &Booking) -> Result<Booking, RepositoryError> {
        Self::check(&self.fail_update)?;
        self.inner.update(ctx, booking).await
    }

    async fn update_status(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        expected: BookingStatus,
        status: BookingStatus,
    ) -> Result<Booking, RepositoryError> {
        Self::check(&self.fail_update_status)?;
        self.inner.update_status(ctx, id, expected, status).await
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    fn record(&self, kind: &str, who: &str) -> Result<(), NotificationError> {
        self.sent.lock().unwrap().push(format!("{}:{}", kind, who));
        Ok(())
    }
}

#[async_trait]
impl NotificationService for RecordingNotifier {
    async fn send_booking_confirmation(
        &self,
        recipient: &Recipient,
        _booking: &BookingSummary,
    ) -> Result<(), NotificationError> {
        self.record("booking_confirmation", &recipient.user_id)
    }

    async fn send_payment_confirmation(
        &self,
        recipient: &Recipient,
        _booking: &BookingSummary,
    ) -> Result<(), NotificationError> {
        self.record("payment_confirmation", &recipient.user_id)
    }

    async fn send_booking_cancelled(
        &self,
        recipient: &Recipient,
        _booking: &BookingSummary,
    ) -> Result<(), NotificationError> {
        self.record("booking_cancelled", &recipient.user_id)
    }

    async fn send_admin_alert(&self, alert: &AdminAlert) -> Result<(), NotificationError> {
        self.record("admin_alert", &alert.reference)
    }
}

#[derive(Default)]
pub struct RecordingRefunds {
    requests: Mutex<Vec<RefundRequest>>,
    fail: bool,
}

impl RecordingRefunds {
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn requests(&self) -> Vec<RefundRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl RefundProcessor for RecordingRefunds {
    async fn request_refund(&self, request: &RefundRequest) -> Result<RefundReceipt, RefundError> {
        if self.fail {
            return Err(RefundError::Unavailable("gateway down".to_string()));
        }
        self.requests.lock().unwrap().push(request.clone());
        Ok(RefundReceipt {
            refund_id: "rf_test".to_string(),
            booking_id: request.booking_id,
        })
    }
}

/// Synchronous subscriber that records what it saw and optionally fails.
pub struct EventRecorder {
    seen: Mutex<Vec<BookingEvent>>,
    correlation_ids: Mutex<Vec<Option<String>>>,
    fail: bool,
}

impl EventRecorder {
    pub fn new(fail: bool) -> Self {
        Self { seen: Mutex::new(Vec::new()), correlation_ids: Mutex::new(Vec::new()), fail }
    }

    pub fn correlation_ids(&self) -> Vec<Option<String>> {
        self.correlation_ids.lock().unwrap().clone()
    }

    pub fn seen(&self) -> Vec<BookingEvent> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventHandler<BookingEvent> for EventRecorder {
    fn name(&self) -> &'static str {
        "recorder"
    }

    async fn handle(&self, event: &EventEnvelope<BookingEvent>) -> Result<(), HandlerError> {
        self.seen.lock().unwrap().push(event.payload.clone());
        self.correlation_ids.lock().unwrap().push(event.correlation_id.clone());
        if self.fail {
            return Err("recorder told to fail".into());
        }
        Ok(())
    }
}

pub struct Harness {
    pub service: BookingService,
    pub repository: Arc<FlakyRepository>,
    pub supplier: Arc<ScriptedSupplier>,
    pub bus: Arc<EventBus<BookingEvent>>,
}

pub fn harness(supplier: ScriptedSupplier) -> Harness {
    let repository = Arc::new(FlakyRepository::default());
    let supplier = Arc::new(supplier);
    let bus: Arc<EventBus<BookingEvent>> = Arc::new(EventBus::new());
    let service = BookingService::new(
        repository.clone(),
        supplier.clone(),
        Arc::new(MarkupPricingService::new(PricingConfig::default())),
        bus.clone(),
    );

    Harness {
        service,
        repository,
        supplier,
        bus,
    }
}
