//! Form posts and page navigation: register, login, logout, dashboard.

use axum::extract::State;
use axum::http::header::{CONTENT_TYPE, SET_COOKIE};
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};
use axum::{Form, Json};
use serde::{Deserialize, Serialize};
use tracing::warn;

use domains::{DomainError, Role, SessionUser};
use services::Registration;

use crate::auth::MaybeUser;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<Registration>,
) -> Result<Redirect, ApiError> {
    state.accounts.register(form).await?;
    Ok(Redirect::to("/login"))
}

fn login_error(message: &str) -> Result<Response, ApiError> {
    let query = serde_urlencoded::to_string([("error", message)])
        .map_err(|e| ApiError::internal("could not encode redirect").with_source(e))?;
    Ok(Redirect::to(&format!("/login?{query}")).into_response())
}

/// Failed logins bounce back to the login page with the reason in the query.
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, ApiError> {
    match state.accounts.login(&form.email, &form.password).await {
        Ok(session) => Ok((
            AppendHeaders([(SET_COOKIE, state.cookie.issue(session.id))]),
            Redirect::to("/dashboard"),
        )
            .into_response()),
        Err(DomainError::Unauthorized(message) | DomainError::Forbidden(message)) => {
            login_error(&message)
        }
        Err(DomainError::Validation(message)) => login_error(&message),
        Err(err) => Err(err.into()),
    }
}

pub async fn logout(State(state): State<AppState>, MaybeUser(user): MaybeUser) -> Result<Response, ApiError> {
    if let Some(user) = user {
        state.accounts.logout(user.session_id).await?;
    }
    Ok((
        AppendHeaders([(SET_COOKIE, state.cookie.clear())]),
        Redirect::to("/"),
    )
        .into_response())
}

fn dashboard_page(role: Role) -> &'static str {
    match role {
        Role::Admin => "admin.html",
        Role::Seller => "seller_dashboard.html",
        Role::Buyer => "buyer.html",
    }
}

pub async fn dashboard(State(state): State<AppState>, MaybeUser(user): MaybeUser) -> Result<Response, ApiError> {
    let Some(user) = user else {
        return Ok(Redirect::to("/login").into_response());
    };
    let page = dashboard_page(user.user.role);
    let path = state.web.static_dir.join(page);

    match tokio::fs::read(&path).await {
        Ok(html) => Ok(([(CONTENT_TYPE, "text/html; charset=utf-8")], html).into_response()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "dashboard page missing");
            Err(ApiError::not_found(format!("{page} not found")))
        }
        Err(err) => Err(ApiError::internal("could not read dashboard page").with_source(err)),
    }
}

#[derive(Debug, Serialize)]
pub struct SessionStatus {
    #[serde(rename = "loggedIn")]
    pub logged_in: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<SessionUser>,
}

pub async fn user_session(MaybeUser(user): MaybeUser) -> Json<SessionStatus> {
    Json(SessionStatus {
        logged_in: user.is_some(),
        user: user.map(|u| u.user),
    })
}
