//! Buyer dashboard: bookings, saved listings, profile.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use domains::{BuyerBooking, BuyerSummary, ProfileUpdate, PropertyId, SavedListing, UserProfile};
use services::PasswordChange;

use crate::auth::BuyerUser;
use crate::error::ApiError;
use crate::extract::{JsonBody, PathParam};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SaveRequest {
    pub property_id: PropertyId,
}

pub async fn dashboard_summary(
    State(state): State<AppState>,
    BuyerUser(buyer): BuyerUser,
) -> Result<Json<BuyerSummary>, ApiError> {
    Ok(Json(state.dashboard.buyer_summary(buyer.id()).await?))
}

pub async fn upcoming_bookings(
    State(state): State<AppState>,
    BuyerUser(buyer): BuyerUser,
) -> Result<Json<Vec<BuyerBooking>>, ApiError> {
    Ok(Json(state.bookings.upcoming_for_buyer(buyer.id()).await?))
}

pub async fn past_bookings(
    State(state): State<AppState>,
    BuyerUser(buyer): BuyerUser,
) -> Result<Json<Vec<BuyerBooking>>, ApiError> {
    Ok(Json(state.bookings.past_for_buyer(buyer.id()).await?))
}

pub async fn profile(
    State(state): State<AppState>,
    BuyerUser(buyer): BuyerUser,
) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(state.accounts.profile(buyer.id()).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    BuyerUser(buyer): BuyerUser,
    JsonBody(update): JsonBody<ProfileUpdate>,
) -> Result<&'static str, ApiError> {
    state
        .accounts
        .update_profile(buyer.session_id, buyer.id(), update)
        .await?;
    Ok("Profile updated successfully")
}

pub async fn change_password(
    State(state): State<AppState>,
    BuyerUser(buyer): BuyerUser,
    JsonBody(change): JsonBody<PasswordChange>,
) -> Result<&'static str, ApiError> {
    state.accounts.change_password(buyer.id(), change).await?;
    Ok("Password changed successfully")
}

pub async fn saved_properties(
    State(state): State<AppState>,
    BuyerUser(buyer): BuyerUser,
) -> Result<Json<Vec<SavedListing>>, ApiError> {
    Ok(Json(state.saved.list(buyer.id()).await?))
}

pub async fn save_property(
    State(state): State<AppState>,
    BuyerUser(buyer): BuyerUser,
    JsonBody(request): JsonBody<SaveRequest>,
) -> Result<(StatusCode, &'static str), ApiError> {
    state.saved.save(buyer.id(), request.property_id).await?;
    Ok((StatusCode::CREATED, "Property saved successfully"))
}

pub async fn remove_saved_property(
    State(state): State<AppState>,
    BuyerUser(buyer): BuyerUser,
    PathParam(property_id): PathParam<PropertyId>,
) -> Result<&'static str, ApiError> {
    state.saved.remove(buyer.id(), property_id).await?;
    Ok("Property removed from saved list")
}
