use chrono::NaiveDate;
use serde::Serialize;
use stayline_shared::BusEvent;
use uuid::Uuid;

use crate::booking::{Booking, BookingStatus, PaymentType};
use crate::notification::Recipient;

pub const BOOKING_CREATED: &str = "booking.created";
pub const BOOKING_PAID: &str = "booking.paid";
pub const BOOKING_CONFIRMED: &str = "booking.confirmed";
pub const BOOKING_CANCELLED: &str = "booking.cancelled";
pub const BOOKING_COMPLETED: &str = "booking.completed";

/// Snapshot of a booking at the moment an event was raised.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct BookingSummary {
    pub booking_id: Uuid,
    pub user_id: String,
    pub reference: String,
    pub hotel_id: String,
    pub room_id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub total_amount: i64,
    pub currency: String,
    pub payment_type: PaymentType,
    pub status: BookingStatus,
    pub supplier_reference: Option<String>,
}

impl From<&Booking> for BookingSummary {
    fn from(booking: &Booking) -> Self {
        Self {
            booking_id: booking.id,
            user_id: booking.user_id.clone(),
            reference: booking.reference.clone(),
            hotel_id: booking.stay.hotel_id.clone(),
            room_id: booking.stay.room_id.clone(),
            check_in: booking.stay.check_in,
            check_out: booking.stay.check_out,
            total_amount: booking.total_amount,
            currency: booking.currency.clone(),
            payment_type: booking.payment_type,
            status: booking.status,
            supplier_reference: booking.supplier_reference.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum BookingEvent {
    #[serde(rename = "booking.created")]
    Created { booking: BookingSummary },

    #[serde(rename = "booking.paid")]
    Paid { booking: BookingSummary, recipient: Recipient },

    #[serde(rename = "booking.confirmed")]
    Confirmed { booking: BookingSummary, recipient: Recipient },

    #[serde(rename = "booking.cancelled")]
    Cancelled {
        booking: BookingSummary,
        recipient: Recipient,
        previous_status: BookingStatus,
        /// The supplier still holds the room: someone has to reconcile by hand.
        supplier_cancellation_failed: bool,
    },

    #[serde(rename = "booking.completed")]
    Completed { booking: BookingSummary },
}

impl BookingEvent {
    pub fn booking(&self) -> &BookingSummary {
        match self {
            BookingEvent::Created { booking }
            | BookingEvent::Paid { booking, .. }
            | BookingEvent::Confirmed { booking, .. }
            | BookingEvent::Cancelled { booking, .. }
            | BookingEvent::Completed { booking } => booking,
        }
    }
}

impl BusEvent for BookingEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BookingEvent::Created { .. } => BOOKING_CREATED,
            BookingEvent::Paid { .. } => BOOKING_PAID,
            BookingEvent::Confirmed { .. } => BOOKING_CONFIRMED,
            BookingEvent::Cancelled { .. } => BOOKING_CANCELLED,
            BookingEvent::Completed { .. } => BOOKING_COMPLETED,
        }
    }
}
