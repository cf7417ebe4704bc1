//! Seller dashboard: summary counters, booking requests, profile, inbox.

use axum::extract::State;
use axum::Json;

use domains::{BookingRequest, NotificationId, ProfileUpdate, SellerSummary, StoredNotification, UserProfile};
use services::PasswordChange;

use crate::auth::SellerUser;
use crate::error::ApiError;
use crate::extract::{JsonBody, PathParam};
use crate::state::AppState;

pub async fn dashboard_summary(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
) -> Result<Json<SellerSummary>, ApiError> {
    Ok(Json(state.dashboard.seller_summary(seller.id()).await?))
}

pub async fn booking_requests(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
) -> Result<Json<Vec<BookingRequest>>, ApiError> {
    Ok(Json(state.bookings.requests_for_seller(seller.id()).await?))
}

pub async fn profile(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
) -> Result<Json<UserProfile>, ApiError> {
    Ok(Json(state.accounts.profile(seller.id()).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
    JsonBody(update): JsonBody<ProfileUpdate>,
) -> Result<&'static str, ApiError> {
    state
        .accounts
        .update_profile(seller.session_id, seller.id(), update)
        .await?;
    Ok("Profile updated successfully")
}

pub async fn change_password(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
    JsonBody(change): JsonBody<PasswordChange>,
) -> Result<&'static str, ApiError> {
    state.accounts.change_password(seller.id(), change).await?;
    Ok("Password changed successfully")
}

pub async fn notifications(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
) -> Result<Json<Vec<StoredNotification>>, ApiError> {
    Ok(Json(state.inbox.list(seller.id()).await?))
}

pub async fn mark_notification_read(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
    PathParam(id): PathParam<NotificationId>,
) -> Result<&'static str, ApiError> {
    state.inbox.mark_read(id, seller.id()).await?;
    Ok("Notification marked as read")
}

pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
) -> Result<&'static str, ApiError> {
    state.inbox.mark_all_read(seller.id()).await?;
    Ok("All notifications marked as read")
}
