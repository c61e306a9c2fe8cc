use std::sync::Arc;
use std::time::Duration;
use stayline_booking::BookingService;

#[derive(Clone)]
pub struct AppState {
    pub bookings: Arc<BookingService>,
    /// Deadline given to each request's collaborator calls.
    pub request_timeout: Duration,
}
