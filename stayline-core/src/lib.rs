pub mod booking;
pub mod events;
pub mod notification;
pub mod pricing;
pub mod refund;
pub mod repository;
pub mod supplier;

pub use booking::{
    Booking, BookingStatus, CreateBookingRequest, GuestContact, PaymentType, Stay,
    UpdateBookingRequest,
};
pub use events::{BookingEvent, BookingSummary};
pub use notification::{NotificationService, Recipient};
pub use pricing::PricingService;
pub use refund::RefundProcessor;
pub use repository::{BookingRepository, RepositoryError};
pub use supplier::{SupplierClient, SupplierError};
