//! Direct messages. Sellers and buyers each have their own mailbox route;
//! conversations are open to any logged-in user.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

use domains::{Conversation, MessageView};
use services::OutgoingMessage;

use crate::auth::{BuyerUser, CurrentUser, SellerUser};
use crate::error::ApiError;
use crate::extract::JsonBody;
use crate::state::AppState;

async fn inbox_of(state: &AppState, user: &CurrentUser) -> Result<Json<Vec<MessageView>>, ApiError> {
    Ok(Json(state.messages.list_for_user(user.id()).await?))
}

async fn send_as(
    state: &AppState,
    user: &CurrentUser,
    outgoing: OutgoingMessage,
) -> Result<(StatusCode, &'static str), ApiError> {
    state.messages.send(user.id(), outgoing).await?;
    Ok((StatusCode::CREATED, "Message sent successfully"))
}

pub async fn seller_messages(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
) -> Result<Json<Vec<MessageView>>, ApiError> {
    inbox_of(&state, &seller).await
}

pub async fn seller_send(
    State(state): State<AppState>,
    SellerUser(seller): SellerUser,
    JsonBody(outgoing): JsonBody<OutgoingMessage>,
) -> Result<(StatusCode, &'static str), ApiError> {
    send_as(&state, &seller, outgoing).await
}

pub async fn buyer_messages(
    State(state): State<AppState>,
    BuyerUser(buyer): BuyerUser,
) -> Result<Json<Vec<MessageView>>, ApiError> {
    inbox_of(&state, &buyer).await
}

pub async fn buyer_send(
    State(state): State<AppState>,
    BuyerUser(buyer): BuyerUser,
    JsonBody(outgoing): JsonBody<OutgoingMessage>,
) -> Result<(StatusCode, &'static str), ApiError> {
    send_as(&state, &buyer, outgoing).await
}

pub async fn conversations(
    State(state): State<AppState>,
    user: CurrentUser,
) -> Result<Json<Vec<Conversation>>, ApiError> {
    Ok(Json(state.messages.conversations(user.id()).await?))
}
