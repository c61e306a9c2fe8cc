use async_trait::async_trait;
use stayline_shared::{DeadlineExceeded, RequestContext};
use uuid::Uuid;

use crate::booking::{Booking, BookingStatus};

#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("booking {0} not found")]
    NotFound(Uuid),

    /// A conditional write lost against a concurrent writer.
    #[error("booking {id} was modified concurrently")]
    Conflict { id: Uuid },

    #[error(transparent)]
    DeadlineExceeded(#[from] DeadlineExceeded),

    #[error("storage error: {0}")]
    Backend(String),
}

/// Repository trait for booking data access
///
/// Writes are conditional so that two racing transitions on one booking
/// cannot both win.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn create(&self, ctx: &RequestContext, booking: &Booking) -> Result<(), RepositoryError>;

    async fn get_by_id(&self, ctx: &RequestContext, id: Uuid) -> Result<Booking, RepositoryError>;

    /// Newest first.
    async fn get_by_user_id(
        &self,
        ctx: &RequestContext,
        user_id: &str,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Booking>, RepositoryError>;

    /// Write all mutable fields if the stored version still equals
    /// `booking.version`. Returns the stored row with its new version.
    async fn update(&self, ctx: &RequestContext, booking: &Booking) -> Result<Booking, RepositoryError>;

    /// Set `status` if the stored status still equals `expected`.
    async fn update_status(
        &self,
        ctx: &RequestContext,
        id: Uuid,
        expected: BookingStatus,
        status: BookingStatus,
    ) -> Result<Booking, RepositoryError>;
}
