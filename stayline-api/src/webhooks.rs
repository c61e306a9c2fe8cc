use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde::Deserialize;
use stayline_core::BookingStatus;
use uuid::Uuid;

use crate::error::AppError;
use crate::extract::Ctx;
use crate::state::AppState;

pub const PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/webhooks/payments", post(handle_payment_webhook))
}

#[derive(Debug, Deserialize)]
pub struct PaymentWebhook {
    pub id: String,
    #[serde(rename = "type")]
    pub type_: String,
    pub data: WebhookData,
}

#[derive(Debug, Deserialize)]
pub struct WebhookData {
    pub object: PaymentIntentObject,
}

#[derive(Debug, Deserialize)]
pub struct PaymentIntentObject {
    pub id: String,
    #[serde(default)]
    pub metadata: PaymentMetadata,
}

#[derive(Debug, Default, Deserialize)]
pub struct PaymentMetadata {
    pub booking_id: Option<Uuid>,
}

/// POST /v1/webhooks/payments
/// A succeeded payment moves its booking to PAID; other event types, and
/// redeliveries for bookings already past payment, are acknowledged and ignored.
async fn handle_payment_webhook(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Json(payload): Json<PaymentWebhook>,
) -> Result<StatusCode, AppError> {
    tracing::info!("Received webhook {}: {} for intent {}", payload.id, payload.type_, payload.data.object.id);

    if payload.type_ != PAYMENT_SUCCEEDED {
        return Ok(StatusCode::OK);
    }

    let booking_id = payload.data.object.metadata.booking_id.ok_or_else(|| {
        AppError::BadRequest(format!("payment intent {} carries no booking_id", payload.data.object.id))
    })?;

    let booking = state.bookings.get_booking(&ctx, booking_id).await?;
    if matches!(
        booking.status,
        BookingStatus::Paid | BookingStatus::Confirmed | BookingStatus::Completed | BookingStatus::Cancelled
    ) {
        tracing::info!(
            "Webhook {} redelivered for booking {} already {}, acknowledging",
            payload.id,
            booking_id,
            booking.status
        );
        return Ok(StatusCode::OK);
    }

    state
        .bookings
        .update_status(&ctx, booking_id, BookingStatus::Paid)
        .await?;
    tracing::info!("Booking {} marked as PAID via webhook", booking_id);

    Ok(StatusCode::OK)
}
