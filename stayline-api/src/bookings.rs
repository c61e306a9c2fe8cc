use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use stayline_booking::BookingDetails;
use stayline_core::{Booking, BookingStatus, CreateBookingRequest, UpdateBookingRequest};
use stayline_shared::RequestContext;
use uuid::Uuid;

use crate::error::AppError;
use crate::extract::{Caller, Ctx};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/v1/bookings", post(create_booking).get(list_bookings))
        .route("/v1/bookings/{id}", get(get_booking).patch(update_booking))
        .route("/v1/bookings/{id}/cancel", post(cancel_booking))
        .route("/v1/bookings/{id}/confirm", post(confirm_booking))
        .route("/v1/bookings/{id}/complete", post(complete_booking))
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<u32>,
    #[serde(default)]
    pub offset: u32,
}

/// Load a booking on behalf of `caller`. Someone else's booking is reported
/// as missing.
async fn owned_booking(
    state: &AppState,
    ctx: &RequestContext,
    caller: &Caller,
    id: Uuid,
) -> Result<Booking, AppError> {
    let booking = state.bookings.get_booking(ctx, id).await?;
    if booking.user_id != caller.0 {
        return Err(AppError::NotFound(format!("booking {} not found", id)));
    }
    Ok(booking)
}

/// POST /v1/bookings
async fn create_booking(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    caller: Caller,
    Json(req): Json<CreateBookingRequest>,
) -> Result<(StatusCode, Json<Booking>), AppError> {
    let booking = state.bookings.create_booking(&ctx, &caller.0, req).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

/// GET /v1/bookings?limit=&offset=
async fn list_bookings(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    caller: Caller,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<Booking>>, AppError> {
    let bookings = state
        .bookings
        .list_user_bookings(&ctx, &caller.0, params.limit, params.offset)
        .await?;
    Ok(Json(bookings))
}

/// GET /v1/bookings/{id}
async fn get_booking(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<BookingDetails>, AppError> {
    let details = state.bookings.get_booking_with_details(&ctx, id).await?;
    if details.booking.user_id != caller.0 {
        return Err(AppError::NotFound(format!("booking {} not found", id)));
    }
    Ok(Json(details))
}

/// PATCH /v1/bookings/{id}
async fn update_booking(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    caller: Caller,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateBookingRequest>,
) -> Result<Json<Booking>, AppError> {
    owned_booking(&state, &ctx, &caller, id).await?;
    let booking = state.bookings.update_booking(&ctx, id, req).await?;
    Ok(Json(booking))
}

/// POST /v1/bookings/{id}/cancel
async fn cancel_booking(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    owned_booking(&state, &ctx, &caller, id).await?;
    let booking = state.bookings.cancel_booking(&ctx, id).await?;
    tracing::info!("Booking {} cancelled by {}", id, caller.0);
    Ok(Json(booking))
}

/// POST /v1/bookings/{id}/confirm
async fn confirm_booking(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    owned_booking(&state, &ctx, &caller, id).await?;
    let booking = state.bookings.confirm_booking_with_supplier(&ctx, id).await?;
    Ok(Json(booking))
}

/// POST /v1/bookings/{id}/complete
async fn complete_booking(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    caller: Caller,
    Path(id): Path<Uuid>,
) -> Result<Json<Booking>, AppError> {
    owned_booking(&state, &ctx, &caller, id).await?;
    let booking = state
        .bookings
        .update_status(&ctx, id, BookingStatus::Completed)
        .await?;
    Ok(Json(booking))
}
