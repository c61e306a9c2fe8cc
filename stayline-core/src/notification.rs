use async_trait::async_trait;
use serde::Serialize;
use stayline_shared::Masked;
use uuid::Uuid;

use crate::booking::Booking;
use crate::events::BookingSummary;

/// Who a guest-facing notification goes to.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Recipient {
    pub user_id: String,
    pub name: Option<String>,
    pub email: Option<Masked<String>>,
    pub phone: Option<Masked<String>>,
}

impl From<&Booking> for Recipient {
    fn from(booking: &Booking) -> Self {
        Self {
            user_id: booking.user_id.clone(),
            name: booking.contact.guest_name.clone(),
            email: booking.contact.guest_email.clone(),
            phone: booking.contact.guest_phone.clone(),
        }
    }
}

/// Operator-facing alert for situations needing manual follow-up.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct AdminAlert {
    pub subject: String,
    pub booking_id: Uuid,
    pub reference: String,
    pub detail: String,
}

#[derive(Debug, thiserror::Error)]
pub enum NotificationError {
    #[error("recipient {0} has no reachable contact")]
    Unreachable(String),
    #[error("notification channel failed: {0}")]
    Channel(String),
}

/// Outbound guest and operator messaging (email/SMS delivery lives behind it).
#[async_trait]
pub trait NotificationService: Send + Sync {
    async fn send_booking_confirmation(
        &self,
        recipient: &Recipient,
        booking: &BookingSummary,
    ) -> Result<(), NotificationError>;

    async fn send_payment_confirmation(
        &self,
        recipient: &Recipient,
        booking: &BookingSummary,
    ) -> Result<(), NotificationError>;

    async fn send_booking_cancelled(
        &self,
        recipient: &Recipient,
        booking: &BookingSummary,
    ) -> Result<(), NotificationError>;

    async fn send_admin_alert(&self, alert: &AdminAlert) -> Result<(), NotificationError>;
}

/// Writes every notification to the log instead of delivering it.
#[derive(Debug, Default, Clone)]
pub struct LogNotificationService;

#[async_trait]
impl NotificationService for LogNotificationService {
    async fn send_booking_confirmation(
        &self,
        recipient: &Recipient,
        booking: &BookingSummary,
    ) -> Result<(), NotificationError> {
        tracing::info!(
            "[notify] booking confirmation to user {} for {} (supplier ref {:?})",
            recipient.user_id,
            booking.reference,
            booking.supplier_reference
        );
        Ok(())
    }

    async fn send_payment_confirmation(
        &self,
        recipient: &Recipient,
        booking: &BookingSummary,
    ) -> Result<(), NotificationError> {
        tracing::info!(
            "[notify] payment of {} {} received from user {} for {}",
            booking.total_amount,
            booking.currency,
            recipient.user_id,
            booking.reference
        );
        Ok(())
    }

    async fn send_booking_cancelled(
        &self,
        recipient: &Recipient,
        booking: &BookingSummary,
    ) -> Result<(), NotificationError> {
        tracing::info!(
            "[notify] cancellation notice to user {} for {}",
            recipient.user_id,
            booking.reference
        );
        Ok(())
    }

    async fn send_admin_alert(&self, alert: &AdminAlert) -> Result<(), NotificationError> {
        tracing::warn!(
            "[admin] {} - booking {} ({}): {}",
            alert.subject,
            alert.reference,
            alert.booking_id,
            alert.detail
        );
        Ok(())
    }
}
