//! Admin moderation and account management, plus the seller inbox it feeds.

use axum::http::{Method, StatusCode};
use integration_tests::*;
use serde_json::json;

async fn submit_listing(app: &TestApp, seller: &str, title: &str) {
    let response = app
        .send_multipart(
            Method::POST,
            "/api/properties",
            Some(seller),
            Multipart::new().listing(title, "Khulna"),
        )
        .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
}

#[tokio::test]
async fn test_counters() {
    let app = TestApp::new();
    let admin = app.login(ADMIN_EMAIL).await;
    let seller = app.login(SELLER_EMAIL).await;
    submit_listing(&app, &seller, "River view").await;

    let pending = body_json(app.get("/api/admin/pending-listings", Some(&admin)).await).await;
    assert_eq!(pending, json!({ "count": 1 }));
    let approved = body_json(app.get("/api/admin/approved-listings", Some(&admin)).await).await;
    assert_eq!(approved, json!({ "count": 2 }));
    let users = body_json(app.get("/api/admin/total-users", Some(&admin)).await).await;
    assert_eq!(users, json!({ "count": 4 }));

    assert_eq!(
        app.get("/api/admin/total-users", Some(&seller)).await.status(),
        StatusCode::FORBIDDEN
    );
}

#[tokio::test]
async fn test_recent_activity_is_newest_first() {
    let app = TestApp::new();
    let admin = app.login(ADMIN_EMAIL).await;
    let seller = app.login(SELLER_EMAIL).await;
    submit_listing(&app, &seller, "River view").await;

    let activity = body_json(app.get("/api/admin/recent-activity", Some(&admin)).await).await;
    let activity = activity.as_array().unwrap();
    // 2 seeded + 1 new listing, 4 seeded users.
    assert_eq!(activity.len(), 7);
    assert_eq!(activity[0]["message"], "Listing \"River view\" was pending.");
    let stamps: Vec<&str> = activity.iter().map(|a| a["timestamp"].as_str().unwrap()).collect();
    let mut sorted = stamps.clone();
    sorted.sort_by(|a, b| b.cmp(a));
    assert_eq!(stamps, sorted);
}

#[tokio::test]
async fn test_moderation_notifies_seller() {
    let app = TestApp::new();
    let admin = app.login(ADMIN_EMAIL).await;
    let seller = app.login(SELLER_EMAIL).await;
    submit_listing(&app, &seller, "River view").await;

    let pending = body_json(app.get("/api/admin/listings/pending", Some(&admin)).await).await;
    let pending = pending.as_array().unwrap();
    assert_eq!(pending.len(), 1);
    let id = pending[0]["id"].as_i64().unwrap();

    let response = app
        .send_empty(Method::PUT, &format!("/api/admin/listings/{id}/approve"), Some(&admin))
        .await;
    assert_eq!(body_text(response).await, "Listing approved successfully");
    let approved = body_json(app.get("/api/admin/listings/approved", Some(&admin)).await).await;
    assert_eq!(approved.as_array().unwrap().len(), 3);

    let response = app
        .send_empty(Method::PUT, &format!("/api/admin/block-listing/{PROPERTY_ID}"), Some(&admin))
        .await;
    assert_eq!(body_text(response).await, "Listing blocked successfully");

    let inbox = body_json(app.get("/api/seller/notifications", Some(&seller)).await).await;
    let inbox = inbox.as_array().unwrap();
    assert_eq!(inbox.len(), 2);
    assert!(inbox.iter().all(|n| n["type"] == "listing_status" && n["is_read"] == false));
    assert!(inbox
        .iter()
        .any(|n| n["message"] == "Your listing \"Lakeside flat\" was blocked."));

    let first = inbox[0]["id"].as_i64().unwrap();
    let other_seller = app.login(OTHER_SELLER_EMAIL).await;
    let foreign = app
        .send_empty(
            Method::PUT,
            &format!("/api/seller/notifications/mark-read/{first}"),
            Some(&other_seller),
        )
        .await;
    assert_eq!(foreign.status(), StatusCode::NOT_FOUND);

    let response = app
        .send_empty(
            Method::PUT,
            &format!("/api/seller/notifications/mark-read/{first}"),
            Some(&seller),
        )
        .await;
    assert_eq!(body_text(response).await, "Notification marked as read");

    let response = app
        .send_empty(Method::PUT, "/api/seller/notifications/mark-all-read", Some(&seller))
        .await;
    assert_eq!(body_text(response).await, "All notifications marked as read");
    let inbox = body_json(app.get("/api/seller/notifications", Some(&seller)).await).await;
    assert!(inbox.as_array().unwrap().iter().all(|n| n["is_read"] == true));
}

#[tokio::test]
async fn test_approve_next_pending_takes_the_oldest() {
    let app = TestApp::new();
    let admin = app.login(ADMIN_EMAIL).await;
    let seller = app.login(SELLER_EMAIL).await;
    let next = "/api/admin/approve-next-pending-listing";

    assert_eq!(app.send_empty(Method::PUT, next, Some(&admin)).await.status(), StatusCode::NOT_FOUND);

    submit_listing(&app, &seller, "First in line").await;
    submit_listing(&app, &seller, "Second in line").await;
    let pending = body_json(app.get("/api/admin/listings/pending", Some(&admin)).await).await;
    let first_id = pending
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["title"] == "First in line")
        .map(|p| p["id"].as_i64().unwrap())
        .unwrap();

    let response = app.send_empty(Method::PUT, next, Some(&admin)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, format!("Listing {first_id} approved successfully."));

    let pending = body_json(app.get("/api/admin/listings/pending", Some(&admin)).await).await;
    let pending = pending.as_array().unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0]["title"], "Second in line");
}

#[tokio::test]
async fn test_blocking_a_user_ends_their_sessions() {
    let app = TestApp::new();
    let admin = app.login(ADMIN_EMAIL).await;
    let buyer = app.login(BUYER_EMAIL).await;

    let users = body_json(app.get("/api/users", Some(&admin)).await).await;
    let users = users.as_array().unwrap();
    assert_eq!(users.len(), 4);
    assert!(users.iter().all(|u| u.get("password_hash").is_none()));

    let response = app
        .send_empty(Method::PUT, &format!("/api/users/{BUYER_ID}/block"), Some(&admin))
        .await;
    assert_eq!(body_text(response).await, "User blocked successfully");

    let session = body_json(app.get("/api/user-session", Some(&buyer)).await).await;
    assert_eq!(session["loggedIn"], false);

    let login = app
        .send_form(Method::POST, "/login", None, &format!("email={BUYER_EMAIL}&password={PASSWORD}"))
        .await;
    assert_eq!(location(&login), "/login?error=Your+account+has+been+blocked.");

    let response = app
        .send_empty(Method::PUT, &format!("/api/users/{BUYER_ID}/unblock"), Some(&admin))
        .await;
    assert_eq!(body_text(response).await, "User unblocked successfully");
    app.login(BUYER_EMAIL).await;
}

#[tokio::test]
async fn test_deleting_a_seller_removes_their_listings() {
    let app = TestApp::new();
    let admin = app.login(ADMIN_EMAIL).await;

    let response = app
        .send_empty(Method::DELETE, &format!("/api/users/{OTHER_SELLER_ID}"), Some(&admin))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_text(response).await, "User deleted successfully");

    let all = body_json(app.get("/api/properties", Some(&admin)).await).await;
    let all = all.as_array().unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0]["id"], PROPERTY_ID);

    let again = app
        .send_empty(Method::DELETE, &format!("/api/users/{OTHER_SELLER_ID}"), Some(&admin))
        .await;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let health = body_json(app.get("/health", None).await).await;
    assert_eq!(health, json!({ "status": "ok" }));
}
