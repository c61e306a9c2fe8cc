use async_trait::async_trait;
use std::sync::Arc;
use stayline_core::events::{BOOKING_CANCELLED, BOOKING_CONFIRMED, BOOKING_PAID};
use stayline_core::notification::AdminAlert;
use stayline_core::refund::RefundRequest;
use stayline_core::{BookingEvent, BookingStatus, NotificationService, PaymentType, RefundProcessor};
use stayline_shared::{EventBus, EventEnvelope, EventHandler, HandlerError};

/// Whether a cancelled booking is owed money back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefundDecision {
    Full,
    NotRequired,
}

/// A full refund is due once we have collected the money: the booking had
/// been paid (or confirmed after payment) and the guest was not paying at
/// the hotel.
pub fn decide_refund(previous_status: BookingStatus, payment_type: PaymentType) -> RefundDecision {
    let collected = matches!(previous_status, BookingStatus::Paid | BookingStatus::Confirmed);
    if collected && payment_type != PaymentType::PayAtHotel {
        RefundDecision::Full
    } else {
        RefundDecision::NotRequired
    }
}

/// Synchronous: a refund failure is reported back to the publisher.
pub struct RefundHandler {
    refunds: Arc<dyn RefundProcessor>,
}

impl RefundHandler {
    pub fn new(refunds: Arc<dyn RefundProcessor>) -> Self {
        Self { refunds }
    }
}

#[async_trait]
impl EventHandler<BookingEvent> for RefundHandler {
    fn name(&self) -> &'static str {
        "refund"
    }

    async fn handle(&self, event: &EventEnvelope<BookingEvent>) -> Result<(), HandlerError> {
        let BookingEvent::Cancelled { booking, previous_status, .. } = &event.payload else {
            return Ok(());
        };

        match decide_refund(*previous_status, booking.payment_type) {
            RefundDecision::NotRequired => {
                tracing::debug!(
                    "No refund for {} (was {}, {})",
                    booking.reference,
                    previous_status,
                    booking.payment_type
                );
                Ok(())
            }
            RefundDecision::Full => {
                let receipt = self
                    .refunds
                    .request_refund(&RefundRequest {
                        booking_id: booking.booking_id,
                        reference: booking.reference.clone(),
                        amount: booking.total_amount,
                        currency: booking.currency.clone(),
                        reason: format!("booking cancelled from {}", previous_status),
                    })
                    .await?;
                tracing::info!("Refund {} issued for {}", receipt.refund_id, booking.reference);
                Ok(())
            }
        }
    }
}

/// Guest-facing messages for payment, confirmation and cancellation.
pub struct NotificationHandler {
    notifier: Arc<dyn NotificationService>,
}

impl NotificationHandler {
    pub fn new(notifier: Arc<dyn NotificationService>) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl EventHandler<BookingEvent> for NotificationHandler {
    fn name(&self) -> &'static str {
        "notification"
    }

    async fn handle(&self, event: &EventEnvelope<BookingEvent>) -> Result<(), HandlerError> {
        match &event.payload {
            BookingEvent::Paid { booking, recipient } => {
                self.notifier.send_payment_confirmation(recipient, booking).await?
            }
            BookingEvent::Confirmed { booking, recipient } => {
                self.notifier.send_booking_confirmation(recipient, booking).await?
            }
            BookingEvent::Cancelled { booking, recipient, .. } => {
                self.notifier.send_booking_cancelled(recipient, booking).await?
            }
            BookingEvent::Created { .. } | BookingEvent::Completed { .. } => {}
        }
        Ok(())
    }
}

/// Tells operators when a cancellation left a live reservation at the
/// supplier.
pub struct AdminAlertHandler {
    notifier: Arc<dyn NotificationService>,
}

impl AdminAlertHandler {
    pub fn new(notifier: Arc<dyn NotificationService>) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl EventHandler<BookingEvent> for AdminAlertHandler {
    fn name(&self) -> &'static str {
        "admin_alert"
    }

    async fn handle(&self, event: &EventEnvelope<BookingEvent>) -> Result<(), HandlerError> {
        let BookingEvent::Cancelled { booking, supplier_cancellation_failed: true, .. } = &event.payload else {
            return Ok(());
        };

        let alert = AdminAlert {
            subject: "Supplier cancellation failed".to_string(),
            booking_id: booking.booking_id,
            reference: booking.reference.clone(),
            detail: format!(
                "Booking cancelled locally but supplier reservation {} may still be active",
                booking.supplier_reference.as_deref().unwrap_or("-")
            ),
        };
        self.notifier.send_admin_alert(&alert).await?;
        Ok(())
    }
}

/// Wire the standard side effects onto `bus`.
pub async fn register_default_handlers(
    bus: &EventBus<BookingEvent>,
    notifier: Arc<dyn NotificationService>,
    refunds: Arc<dyn RefundProcessor>,
) {
    bus.subscribe(BOOKING_CANCELLED, Arc::new(RefundHandler::new(refunds)))
        .await;

    let notifications: Arc<dyn EventHandler<BookingEvent>> =
        Arc::new(NotificationHandler::new(Arc::clone(&notifier)));
    for event_type in [BOOKING_PAID, BOOKING_CONFIRMED, BOOKING_CANCELLED] {
        bus.subscribe_async(event_type, Arc::clone(&notifications)).await;
    }

    bus.subscribe_async(BOOKING_CANCELLED, Arc::new(AdminAlertHandler::new(notifier)))
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{summary, RecordingNotifier, RecordingRefunds};
    use chrono::Utc;
    use stayline_core::Recipient;
    use stayline_shared::RequestContext;
    use uuid::Uuid;

    fn envelope(payload: BookingEvent) -> EventEnvelope<BookingEvent> {
        EventEnvelope {
            id: Uuid::new_v4(),
            event_type: stayline_shared::BusEvent::event_type(&payload),
            occurred_at: Utc::now(),
            correlation_id: None,
            payload,
        }
    }

    fn cancelled(previous: BookingStatus, payment_type: PaymentType, supplier_failed: bool) -> BookingEvent {
        let mut booking = summary(BookingStatus::Cancelled);
        booking.payment_type = payment_type;
        booking.supplier_reference = Some("HB-123".to_string());
        BookingEvent::Cancelled {
            recipient: Recipient {
                user_id: booking.user_id.clone(),
                name: None,
                email: None,
                phone: None,
            },
            booking,
            previous_status: previous,
            supplier_cancellation_failed: supplier_failed,
        }
    }

    #[test]
    fn test_refund_decision() {
        use BookingStatus::*;
        assert_eq!(decide_refund(Paid, PaymentType::PayNow), RefundDecision::Full);
        assert_eq!(decide_refund(Confirmed, PaymentType::PayNow), RefundDecision::Full);
        assert_eq!(decide_refund(Confirmed, PaymentType::PayLater), RefundDecision::Full);
        assert_eq!(decide_refund(Confirmed, PaymentType::PayAtHotel), RefundDecision::NotRequired);
        assert_eq!(decide_refund(AwaitingPayment, PaymentType::PayNow), RefundDecision::NotRequired);
        assert_eq!(decide_refund(Init, PaymentType::PayNow), RefundDecision::NotRequired);
    }

    #[tokio::test]
    async fn test_refund_handler_requests_full_amount() {
        let refunds = Arc::new(RecordingRefunds::default());
        let handler = RefundHandler::new(refunds.clone());

        handler
            .handle(&envelope(cancelled(BookingStatus::Confirmed, PaymentType::PayNow, false)))
            .await
            .unwrap();
        handler
            .handle(&envelope(cancelled(BookingStatus::AwaitingPayment, PaymentType::PayNow, false)))
            .await
            .unwrap();

        let requests = refunds.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].amount, 1_500_000);
        assert_eq!(requests[0].currency, "IDR");
    }

    #[tokio::test]
    async fn test_refund_failure_surfaces_to_publisher() {
        let refunds = Arc::new(RecordingRefunds::failing());
        let bus: EventBus<BookingEvent> = EventBus::new();
        bus.subscribe(BOOKING_CANCELLED, Arc::new(RefundHandler::new(refunds)))
            .await;

        let result = bus
            .publish(
                &RequestContext::new(),
                cancelled(BookingStatus::Paid, PaymentType::PayNow, false),
            )
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_notification_routing() {
        let notifier = Arc::new(RecordingNotifier::default());
        let handler = NotificationHandler::new(notifier.clone());
        let recipient = Recipient {
            user_id: "u1".to_string(),
            name: None,
            email: None,
            phone: None,
        };

        handler
            .handle(&envelope(BookingEvent::Paid {
                booking: summary(BookingStatus::Paid),
                recipient: recipient.clone(),
            }))
            .await
            .unwrap();
        handler
            .handle(&envelope(BookingEvent::Created { booking: summary(BookingStatus::AwaitingPayment) }))
            .await
            .unwrap();
        handler
            .handle(&envelope(cancelled(BookingStatus::Paid, PaymentType::PayNow, false)))
            .await
            .unwrap();

        assert_eq!(notifier.sent(), vec!["payment_confirmation:u1", "booking_cancelled:u1"]);
    }

    #[tokio::test]
    async fn test_admin_alert_only_when_supplier_cancel_failed() {
        let notifier = Arc::new(RecordingNotifier::default());
        let handler = AdminAlertHandler::new(notifier.clone());

        handler
            .handle(&envelope(cancelled(BookingStatus::Confirmed, PaymentType::PayNow, false)))
            .await
            .unwrap();
        assert!(notifier.sent().is_empty());

        handler
            .handle(&envelope(cancelled(BookingStatus::Confirmed, PaymentType::PayNow, true)))
            .await
            .unwrap();
        assert_eq!(notifier.sent().len(), 1);
        assert!(notifier.sent()[0].starts_with("admin_alert:"));
    }

    #[tokio::test]
    async fn test_default_handlers_registration() {
        let bus: EventBus<BookingEvent> = EventBus::new();
        register_default_handlers(
            &bus,
            Arc::new(RecordingNotifier::default()),
            Arc::new(RecordingRefunds::default()),
        )
        .await;

        assert_eq!(bus.subscriber_count(BOOKING_CANCELLED).await, 3);
        assert_eq!(bus.subscriber_count(BOOKING_PAID).await, 1);
        assert_eq!(bus.subscriber_count(BOOKING_CONFIRMED).await, 1);
        assert_eq!(bus.subscriber_count("booking.created").await, 0);
    }
}
