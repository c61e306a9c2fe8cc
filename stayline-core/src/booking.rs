use chrono::{DateTime, NaiveDate, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use stayline_shared::Masked;
use uuid::Uuid;

use crate::supplier::RoomRate;

pub const DEFAULT_REFERENCE_LENGTH: usize = 8;

// No 0/O or 1/I, guests read these aloud over the phone.
const REFERENCE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Booking status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Init,
    AwaitingPayment,
    Paid,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 6] = [
        BookingStatus::Init,
        BookingStatus::AwaitingPayment,
        BookingStatus::Paid,
        BookingStatus::Confirmed,
        BookingStatus::Completed,
        BookingStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Init => "INIT",
            BookingStatus::AwaitingPayment => "AWAITING_PAYMENT",
            BookingStatus::Paid => "PAID",
            BookingStatus::Confirmed => "CONFIRMED",
            BookingStatus::Completed => "COMPLETED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }

    /// Guest details and payment type may only change before payment.
    pub fn is_pre_payment(&self) -> bool {
        matches!(self, BookingStatus::Init | BookingStatus::AwaitingPayment)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown booking status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for BookingStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BookingStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentType {
    PayNow,
    PayAtHotel,
    PayLater,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::PayNow => "PAY_NOW",
            PaymentType::PayAtHotel => "PAY_AT_HOTEL",
            PaymentType::PayLater => "PAY_LATER",
        }
    }
}

impl fmt::Display for PaymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown payment type: {0}")]
pub struct UnknownPaymentType(pub String);

impl FromStr for PaymentType {
    type Err = UnknownPaymentType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PAY_NOW" => Ok(PaymentType::PayNow),
            "PAY_AT_HOTEL" => Ok(PaymentType::PayAtHotel),
            "PAY_LATER" => Ok(PaymentType::PayLater),
            other => Err(UnknownPaymentType(other.to_string())),
        }
    }
}

/// What is being booked: one room of one hotel for a date range.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Stay {
    pub hotel_id: String,
    pub room_id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: u32,
}

impl Stay {
    pub fn nights(&self) -> i64 {
        (self.check_out - self.check_in).num_days()
    }
}

/// Optional guest-contact fields, editable only before payment.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GuestContact {
    pub guest_name: Option<String>,
    pub guest_email: Option<Masked<String>>,
    pub guest_phone: Option<Masked<String>>,
    pub special_requests: Option<String>,
}

/// A guest's reservation. Never deleted: cancellation and completion are
/// terminal statuses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Booking {
    pub id: Uuid,
    pub reference: String,
    pub user_id: String,
    #[serde(flatten)]
    pub stay: Stay,
    /// Minor currency units, always the supplier's quoted price.
    pub total_amount: i64,
    pub currency: String,
    pub payment_type: PaymentType,
    pub status: BookingStatus,
    pub supplier_reference: Option<String>,
    #[serde(flatten)]
    pub contact: GuestContact,
    /// Bumped by the repository on every stored write.
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(
        user_id: String,
        reference: String,
        stay: Stay,
        rate: RoomRate,
        payment_type: PaymentType,
        contact: GuestContact,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            reference,
            user_id,
            stay,
            total_amount: rate.total_price,
            currency: rate.currency,
            payment_type,
            status: BookingStatus::Init,
            supplier_reference: None,
            contact,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

/// Generate a short guest-facing booking reference, e.g. `SL7KQ4MZ2P`.
pub fn generate_reference(length: usize) -> String {
    let mut rng = rand::thread_rng();
    let body: String = (0..length)
        .map(|_| char::from(REFERENCE_ALPHABET[rng.gen_range(0..REFERENCE_ALPHABET.len())]))
        .collect();
    format!("SL{}", body)
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookingRequest {
    pub hotel_id: String,
    pub room_id: String,
    pub check_in: NaiveDate,
    pub check_out: NaiveDate,
    pub guests: u32,
    pub payment_type: String,
    #[serde(flatten)]
    pub contact: GuestContact,
}

impl CreateBookingRequest {
    pub fn stay(&self) -> Stay {
        Stay {
            hotel_id: self.hotel_id.clone(),
            room_id: self.room_id.clone(),
            check_in: self.check_in,
            check_out: self.check_out,
            guests: self.guests,
        }
    }
}

/// Partial update: every absent field is left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateBookingRequest {
    pub guest_name: Option<String>,
    pub guest_email: Option<Masked<String>>,
    pub guest_phone: Option<Masked<String>>,
    pub special_requests: Option<String>,
    pub payment_type: Option<String>,
}
