//! Session extractors and role guards.
//!
//! A request is authenticated when it carries a correctly signed session
//! cookie whose session is still alive in the store. Missing or invalid
//! sessions are `401`; the wrong role is `403`.

use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::request::Parts;
use uuid::Uuid;

use domains::{Role, SessionUser, UserId};

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub session_id: Uuid,
    pub user: SessionUser,
}

impl CurrentUser {
    pub fn id(&self) -> UserId {
        self.user.id
    }
}

async fn current_session(parts: &Parts, state: &AppState) -> Result<Option<CurrentUser>, ApiError> {
    let session_id = parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|header| state.cookie.extract(header));

    let Some(session_id) = session_id else {
        return Ok(None);
    };
    Ok(state
        .accounts
        .session(session_id)
        .await?
        .map(|session| CurrentUser { session_id: session.id, user: session.user }))
}

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        current_session(parts, state)
            .await?
            .ok_or_else(|| ApiError::unauthorized("Unauthorized"))
    }
}

/// The caller if logged in; never rejects an anonymous request.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<CurrentUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(Self(current_session(parts, state).await?))
    }
}

macro_rules! role_guard {
    ($(#[$meta:meta])* $name:ident, $role:path, $denied:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone)]
        pub struct $name(pub CurrentUser);

        impl FromRequestParts<AppState> for $name {
            type Rejection = ApiError;

            async fn from_request_parts(
                parts: &mut Parts,
                state: &AppState,
            ) -> Result<Self, Self::Rejection> {
                let current = CurrentUser::from_request_parts(parts, state).await?;
                if current.user.role != $role {
                    return Err(ApiError::forbidden($denied));
                }
                Ok(Self(current))
            }
        }
    };
}

role_guard!(AdminUser, Role::Admin, "Forbidden: Not an admin");
role_guard!(SellerUser, Role::Seller, "Forbidden: Not a seller");
role_guard!(BuyerUser, Role::Buyer, "Forbidden: Not a buyer");
