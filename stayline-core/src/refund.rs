use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefundRequest {
    pub booking_id: Uuid,
    pub reference: String,
    /// Minor units.
    pub amount: i64,
    pub currency: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefundReceipt {
    pub refund_id: String,
    pub booking_id: Uuid,
}

#[derive(Debug, thiserror::Error)]
pub enum RefundError {
    #[error("refund declined: {0}")]
    Declined(String),
    #[error("payment provider unavailable: {0}")]
    Unavailable(String),
}

/// Hands refunds to the payment provider
#[async_trait]
pub trait RefundProcessor: Send + Sync {
    async fn request_refund(&self, request: &RefundRequest) -> Result<RefundReceipt, RefundError>;
}

/// Records refund requests in the log; nothing is charged back.
#[derive(Debug, Default, Clone)]
pub struct LogRefundProcessor;

#[async_trait]
impl RefundProcessor for LogRefundProcessor {
    async fn request_refund(&self, request: &RefundRequest) -> Result<RefundReceipt, RefundError> {
        tracing::info!(
            "Refund of {} {} requested for {} ({})",
            request.amount,
            request.currency,
            request.reference,
            request.reason
        );
        Ok(RefundReceipt {
            refund_id: format!("rf_{}", request.booking_id.simple()),
            booking_id: request.booking_id,
        })
    }
}
