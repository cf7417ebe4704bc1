//! Admin moderation: counters, the activity feed, users, listings.

use axum::extract::State;
use axum::Json;

use domains::{ActivityEntry, Property, PropertyId, PropertyStatus, User, UserId};

use super::Count;
use crate::auth::AdminUser;
use crate::error::ApiError;
use crate::extract::PathParam;
use crate::state::AppState;

pub async fn pending_count(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<Count>, ApiError> {
    let count = state.properties.count_by_status(PropertyStatus::Pending).await?;
    Ok(Json(Count { count }))
}

pub async fn approved_count(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<Count>, ApiError> {
    let count = state.properties.count_by_status(PropertyStatus::Approved).await?;
    Ok(Json(Count { count }))
}

pub async fn total_users(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<Count>, ApiError> {
    let count = state.dashboard.total_users().await?;
    Ok(Json(Count { count }))
}

pub async fn recent_activity(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<ActivityEntry>>, ApiError> {
    Ok(Json(state.dashboard.recent_activity().await?))
}

pub async fn list_users(State(state): State<AppState>, _admin: AdminUser) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.accounts.list_users().await?))
}

pub async fn delete_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    PathParam(id): PathParam<UserId>,
) -> Result<&'static str, ApiError> {
    state.accounts.delete_user(id).await?;
    Ok("User deleted successfully")
}

pub async fn block_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    PathParam(id): PathParam<UserId>,
) -> Result<&'static str, ApiError> {
    state.accounts.block_user(id).await?;
    Ok("User blocked successfully")
}

pub async fn unblock_user(
    State(state): State<AppState>,
    _admin: AdminUser,
    PathParam(id): PathParam<UserId>,
) -> Result<&'static str, ApiError> {
    state.accounts.unblock_user(id).await?;
    Ok("User unblocked successfully")
}

pub async fn pending_listings(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<Property>>, ApiError> {
    Ok(Json(state.properties.list_by_status(PropertyStatus::Pending).await?))
}

pub async fn approved_listings(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<Json<Vec<Property>>, ApiError> {
    Ok(Json(state.properties.list_by_status(PropertyStatus::Approved).await?))
}

pub async fn approve_listing(
    State(state): State<AppState>,
    _admin: AdminUser,
    PathParam(id): PathParam<PropertyId>,
) -> Result<&'static str, ApiError> {
    state.properties.moderate(id, PropertyStatus::Approved).await?;
    Ok("Listing approved successfully")
}

pub async fn block_listing(
    State(state): State<AppState>,
    _admin: AdminUser,
    PathParam(id): PathParam<PropertyId>,
) -> Result<&'static str, ApiError> {
    state.properties.moderate(id, PropertyStatus::Blocked).await?;
    Ok("Listing blocked successfully")
}

pub async fn approve_next_pending(
    State(state): State<AppState>,
    _admin: AdminUser,
) -> Result<String, ApiError> {
    let id = state.properties.approve_next_pending().await?;
    Ok(format!("Listing {id} approved successfully."))
}
