//! # api-adapters
//!
//! The axum surface of the marketplace: pages, JSON endpoints, the live
//! notification stream, static files and uploads.

pub mod auth;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod multipart;
pub mod sse;
pub mod state;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, get_service, post, put};
use axum::Router;
use tower_http::services::{ServeDir, ServeFile};

use handlers::{admin, bookings, buyer, messages, ops, pages, properties, seller};

pub use error::ApiError;
pub use metrics::Metrics;
pub use state::{AppState, Backend, Store, WebConfig};

fn seller_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard-summary", get(seller::dashboard_summary))
        .route("/booking-requests", get(seller::booking_requests))
        .route("/booking-requests/{id}/approve", put(bookings::approve))
        .route("/booking-requests/{id}/decline", put(bookings::decline))
        .route(
            "/messages",
            get(messages::seller_messages).post(messages::seller_send),
        )
        .route("/profile", get(seller::profile).put(seller::update_profile))
        .route("/change-password", put(seller::change_password))
        .route("/notifications", get(seller::notifications))
        .route(
            "/notifications/mark-read/{id}",
            put(seller::mark_notification_read),
        )
        .route(
            "/notifications/mark-all-read",
            put(seller::mark_all_notifications_read),
        )
}

fn buyer_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard-summary", get(buyer::dashboard_summary))
        .route("/profile", get(buyer::profile).put(buyer::update_profile))
        .route("/change-password", put(buyer::change_password))
        .route("/bookings/upcoming", get(buyer::upcoming_bookings))
        .route("/bookings/past", get(buyer::past_bookings))
        .route(
            "/messages",
            get(messages::buyer_messages).post(messages::buyer_send),
        )
        .route(
            "/saved-properties",
            get(buyer::saved_properties).post(buyer::save_property),
        )
        .route(
            "/saved-properties/{property_id}",
            delete(buyer::remove_saved_property),
        )
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/pending-listings", get(admin::pending_count))
        .route("/approved-listings", get(admin::approved_count))
        .route("/total-users", get(admin::total_users))
        .route("/recent-activity", get(admin::recent_activity))
        .route("/listings/pending", get(admin::pending_listings))
        .route("/listings/approved", get(admin::approved_listings))
        .route("/listings/{id}/approve", put(admin::approve_listing))
        .route("/block-listing/{id}", put(admin::block_listing))
        .route(
            "/approve-next-pending-listing",
            put(admin::approve_next_pending),
        )
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/user-session", get(pages::user_session))
        .route("/notifications/subscribe", get(sse::subscribe))
        .route(
            "/properties",
            get(properties::list_for_admin).post(properties::create),
        )
        .route("/properties/featured", get(properties::featured))
        .route("/properties/filter", get(properties::filter))
        .route(
            "/properties/{id}",
            get(properties::get)
                .put(properties::update)
                .delete(properties::delete),
        )
        .route("/my-properties", get(properties::list_mine))
        .route("/all-properties", get(properties::list_all))
        .route("/bookings", post(bookings::create))
        .route("/messages/conversations", get(messages::conversations))
        .route("/users", get(admin::list_users))
        .route("/users/{id}", delete(admin::delete_user))
        .route("/users/{id}/block", put(admin::block_user))
        .route("/users/{id}/unblock", put(admin::unblock_user))
        .nest("/seller", seller_routes())
        .nest("/buyer", buyer_routes())
        .nest("/admin", admin_routes())
}

/// Builds the full application router.
pub fn router(state: AppState) -> Router {
    let web = state.web.clone();
    let page = |name: &str| ServeFile::new(web.static_dir.join(name));

    let app = Router::new()
        .route_service("/", page("index.html"))
        .route(
            "/register",
            get_service(page("register.html")).post(pages::register),
        )
        .route("/login", get_service(page("login.html")).post(pages::login))
        .route("/logout", get(pages::logout))
        .route("/dashboard", get(pages::dashboard))
        .route("/health", get(ops::health))
        .route("/metrics", get(ops::metrics))
        .nest("/api", api_routes())
        .nest_service(&web.upload_url_prefix, ServeDir::new(&web.upload_dir))
        .fallback_service(ServeDir::new(&web.static_dir))
        .layer(DefaultBodyLimit::max(web.max_upload_bytes))
        .with_state(state);

    middleware::standard_middleware(app)
}
