use stayline_core::{Booking, BookingStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Invalid state transition from {from} to {to}")]
pub struct TransitionError {
    pub from: BookingStatus,
    pub to: BookingStatus,
}

/// The booking lifecycle table. Every step is explicit: there is no
/// skip-ahead and no implicit default-allow.
///
/// ```text
/// INIT ──> AWAITING_PAYMENT ──> PAID ──> CONFIRMED ──> COMPLETED
///   └──────────┴────────────────┴──────────┴─────> CANCELLED
/// ```
pub struct BookingStateMachine;

impl BookingStateMachine {
    pub fn allowed_transitions(from: BookingStatus) -> &'static [BookingStatus] {
        use BookingStatus::*;
        match from {
            Init => &[AwaitingPayment, Cancelled],
            AwaitingPayment => &[Paid, Cancelled],
            Paid => &[Confirmed, Cancelled],
            Confirmed => &[Completed, Cancelled],
            Completed | Cancelled => &[],
        }
    }

    pub fn can_transition(from: BookingStatus, to: BookingStatus) -> bool {
        Self::allowed_transitions(from).contains(&to)
    }

    pub fn is_terminal(status: BookingStatus) -> bool {
        Self::allowed_transitions(status).is_empty()
    }

    /// Check a transition without applying it.
    pub fn ensure(from: BookingStatus, to: BookingStatus) -> Result<(), TransitionError> {
        if Self::can_transition(from, to) {
            Ok(())
        } else {
            Err(TransitionError { from, to })
        }
    }

    /// Move `booking` to `target`, returning the status it left.
    ///
    /// On error the booking is untouched.
    pub fn transition(booking: &mut Booking, target: BookingStatus) -> Result<BookingStatus, TransitionError> {
        let from = booking.status;
        Self::ensure(from, target)?;

        booking.status = target;
        booking.touch();
        tracing::debug!("Booking {} moved {} -> {}", booking.id, from, target);
        Ok(from)
    }
}
