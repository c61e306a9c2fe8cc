use axum::{extract::State, routing::post, Json, Router};
use stayline_booking::StayQuote;
use stayline_core::Stay;

use crate::error::AppError;
use crate::extract::Ctx;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/v1/quotes", post(quote_stay))
}

/// POST /v1/quotes
/// Supplier rooms for a stay, priced with our markup.
async fn quote_stay(
    State(state): State<AppState>,
    Ctx(ctx): Ctx,
    Json(stay): Json<Stay>,
) -> Result<Json<StayQuote>, AppError> {
    let quote = state.bookings.quote_stay(&ctx, &stay).await?;
    Ok(Json(quote))
}
