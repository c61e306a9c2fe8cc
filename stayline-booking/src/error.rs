use chrono::NaiveDate;
use stayline_core::booking::UnknownPaymentType;
use stayline_core::{BookingStatus, RepositoryError, SupplierError};
use uuid::Uuid;

use crate::state_machine::TransitionError;

/// Coarse class of a [`BookingError`], enough for a transport layer to pick
/// a status code without inspecting messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad input, rejected before any external call.
    Validation,
    NotFound,
    /// Availability or a concurrent writer got in the way.
    Conflict,
    /// Wrong status for the requested operation.
    Precondition,
    /// The supplier failed.
    Upstream,
    /// Storage failed after the input was accepted.
    Persistence,
}

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("check-out {check_out} must be after check-in {check_in}")]
    InvalidDateRange { check_in: NaiveDate, check_out: NaiveDate },

    #[error("check-in {0} is in the past")]
    InvalidCheckIn(NaiveDate),

    #[error("guest count must be at least 1")]
    InvalidGuestCount,

    #[error(transparent)]
    InvalidPaymentType(#[from] UnknownPaymentType),

    #[error("booking {0} not found")]
    NotFound(Uuid),

    #[error(transparent)]
    InvalidTransition(#[from] TransitionError),

    #[error("booking {id} must be {required} but is {actual}")]
    InvalidStatus {
        id: Uuid,
        required: BookingStatus,
        actual: BookingStatus,
    },

    #[error("cannot update booking in status {0}")]
    CannotUpdate(BookingStatus),

    #[error("booking {0} has no supplier reservation to confirm")]
    SupplierReferenceRequired(Uuid),

    #[error("room {room_id} of hotel {hotel_id} is not available from {check_in} to {check_out}")]
    RoomNotAvailable {
        hotel_id: String,
        room_id: String,
        check_in: NaiveDate,
        check_out: NaiveDate,
    },

    #[error("availability check failed for room {room_id} of hotel {hotel_id} ({check_in} to {check_out}): {source}")]
    AvailabilityFailed {
        hotel_id: String,
        room_id: String,
        check_in: NaiveDate,
        check_out: NaiveDate,
        #[source]
        source: SupplierError,
    },

    #[error("pricing failed for room {room_id} of hotel {hotel_id} ({check_in} to {check_out}): {source}")]
    PricingFailed {
        hotel_id: String,
        room_id: String,
        check_in: NaiveDate,
        check_out: NaiveDate,
        #[source]
        source: SupplierError,
    },

    #[error("supplier reservation failed for booking {reference}: {source}")]
    ReservationFailed {
        reference: String,
        #[source]
        source: SupplierError,
    },

    #[error("hotel {hotel_id} lookup failed: {source}")]
    HotelLookupFailed {
        hotel_id: String,
        #[source]
        source: SupplierError,
    },

    #[error("failed to create booking: {0}")]
    FailedToCreate(#[source] RepositoryError),

    #[error("failed to update booking status: {0}")]
    FailedToUpdateStatus(#[source] RepositoryError),

    #[error("failed to update booking: {0}")]
    FailedToUpdate(#[source] RepositoryError),

    #[error("failed to load booking: {0}")]
    FailedToLoad(#[source] RepositoryError),

    #[error("booking {0} was changed by a concurrent request")]
    ConcurrentModification(Uuid),
}

impl BookingError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            BookingError::InvalidDateRange { .. }
            | BookingError::InvalidCheckIn(_)
            | BookingError::InvalidGuestCount
            | BookingError::InvalidPaymentType(_) => ErrorKind::Validation,
            BookingError::NotFound(_) => ErrorKind::NotFound,
            BookingError::InvalidTransition(_)
            | BookingError::InvalidStatus { .. }
            | BookingError::CannotUpdate(_)
            | BookingError::SupplierReferenceRequired(_) => ErrorKind::Precondition,
            BookingError::RoomNotAvailable { .. } | BookingError::ConcurrentModification(_) => {
                ErrorKind::Conflict
            }
            BookingError::AvailabilityFailed { .. }
            | BookingError::PricingFailed { .. }
            | BookingError::ReservationFailed { .. }
            | BookingError::HotelLookupFailed { .. } => ErrorKind::Upstream,
            BookingError::FailedToCreate(_)
            | BookingError::FailedToUpdateStatus(_)
            | BookingError::FailedToUpdate(_)
            | BookingError::FailedToLoad(_) => ErrorKind::Persistence,
        }
    }

    /// Map a failed write: lost races and vanished rows keep their meaning,
    /// anything else becomes `wrap(err)`.
    pub(crate) fn from_write(id: Uuid, err: RepositoryError, wrap: fn(RepositoryError) -> Self) -> Self {
        match err {
            RepositoryError::Conflict { .. } => BookingError::ConcurrentModification(id),
            RepositoryError::NotFound(_) => BookingError::NotFound(id),
            other => wrap(other),
        }
    }

    pub(crate) fn from_read(id: Uuid, err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(_) => BookingError::NotFound(id),
            other => BookingError::FailedToLoad(other),
        }
    }
}

pub type BookingResult<T> = Result<T, BookingError>;
