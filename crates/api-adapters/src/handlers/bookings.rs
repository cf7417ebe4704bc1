//! Booking requests: created by buyers, resolved by the listing's seller.

use axum::extract::State;
use axum::http::StatusCode;
use tracing::info;

use domains::{BookingId, BookingStatus};
use services::BookingCommand;

use crate::auth::{BuyerUser, SellerUser};
use crate::error::ApiError;
use crate::extract::{JsonBody, PathParam};
use crate::state::AppState;

/// Writes the booking and its companion message, then pushes a live event
/// to the seller. Push outcome never affects the response.
pub async fn create(
    State(state): State<AppState>,
    BuyerUser(buyer): BuyerUser,
    JsonBody(command): JsonBody<BookingCommand>,
) -> Result<(StatusCode, &'static str), ApiError> {
    let created = state.bookings.create_booking(buyer.id(), command).await?;

    state.metrics.bookings_created.inc();
    state
        .metrics
        .live_events_delivered
        .inc_by(created.live_deliveries as u64);
    info!(
        booking_id = created.booking.id,
        seller_id = created.seller_id,
        live_deliveries = created.live_deliveries,
        "booking request accepted"
    );

    Ok((StatusCode::CREATED, "Booking request sent and message delivered."))
}

pub async fn approve(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
    PathParam(id): PathParam<BookingId>,
) -> Result<&'static str, ApiError> {
    state
        .bookings
        .update_booking_status(id, seller.id(), BookingStatus::Approved)
        .await?;
    Ok("Booking request approved")
}

pub async fn decline(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
    PathParam(id): PathParam<BookingId>,
) -> Result<&'static str, ApiError> {
    state
        .bookings
        .update_booking_status(id, seller.id(), BookingStatus::Declined)
        .await?;
    Ok("Booking request declined")
}
