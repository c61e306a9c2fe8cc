pub mod error;
pub mod handlers;
pub mod orchestrator;
pub mod state_machine;

#[cfg(test)]
mod testing;

pub use error::{BookingError, BookingResult, ErrorKind};
pub use handlers::{
    decide_refund, register_default_handlers, AdminAlertHandler, NotificationHandler,
    RefundDecision, RefundHandler,
};
pub use orchestrator::{BookingDetails, BookingPolicy, BookingService, QuotedRoom, StayQuote};
pub use state_machine::{BookingStateMachine, TransitionError};
