//! Buyer dashboard: saved listings, booking history, messages.

use axum::http::{Method, StatusCode};
use integration_tests::*;
use serde_json::json;

async fn book_on(app: &TestApp, buyer: &str, property_id: i64, date: &str) {
    let response = app
        .send_json(
            Method::POST,
            "/api/bookings",
            Some(buyer),
            json!({
                "property_id": property_id,
                "preferred_date": date,
                "preferred_time": "15:30",
                "message": "Weekend viewing?",
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_save_list_and_remove() {
    let app = TestApp::new();
    let buyer = app.login(BUYER_EMAIL).await;
    let save = |id: i64| json!({ "property_id": id });

    let response = app
        .send_json(Method::POST, "/api/buyer/saved-properties", Some(&buyer), save(PROPERTY_ID))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    assert_eq!(body_text(response).await, "Property saved successfully");

    let duplicate = app
        .send_json(Method::POST, "/api/buyer/saved-properties", Some(&buyer), save(PROPERTY_ID))
        .await;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let missing = app
        .send_json(Method::POST, "/api/buyer/saved-properties", Some(&buyer), save(999))
        .await;
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let saved = body_json(app.get("/api/buyer/saved-properties", Some(&buyer)).await).await;
    let saved = saved.as_array().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0]["id"], PROPERTY_ID);
    assert_eq!(saved[0]["title"], "Lakeside flat");
    assert!(saved[0]["saved_id"].is_i64());

    let summary = body_json(app.get("/api/buyer/dashboard-summary", Some(&buyer)).await).await;
    assert_eq!(summary["saved_properties"], 1);

    let uri = format!("/api/buyer/saved-properties/{PROPERTY_ID}");
    let removed = app.send_empty(Method::DELETE, &uri, Some(&buyer)).await;
    assert_eq!(removed.status(), StatusCode::OK);
    assert_eq!(body_text(removed).await, "Property removed from saved list");

    let again = app.send_empty(Method::DELETE, &uri, Some(&buyer)).await;
    assert_eq!(again.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_upcoming_and_past_bookings() {
    let app = TestApp::new();
    let buyer = app.login(BUYER_EMAIL).await;

    book_on(&app, &buyer, PROPERTY_ID, "2099-03-01").await;
    book_on(&app, &buyer, OTHER_PROPERTY_ID, "2099-02-01").await;
    book_on(&app, &buyer, PROPERTY_ID, "2020-01-10").await;

    let upcoming = body_json(app.get("/api/buyer/bookings/upcoming", Some(&buyer)).await).await;
    let upcoming = upcoming.as_array().unwrap();
    assert_eq!(upcoming.len(), 2);
    assert_eq!(upcoming[0]["booking_date"], "2099-02-01T15:30:00Z");
    assert_eq!(upcoming[0]["property_title"], "Hill cottage");
    assert_eq!(upcoming[0]["seller_email"], OTHER_SELLER_EMAIL);
    assert_eq!(upcoming[1]["booking_date"], "2099-03-01T15:30:00Z");

    let past = body_json(app.get("/api/buyer/bookings/past", Some(&buyer)).await).await;
    let past = past.as_array().unwrap();
    assert_eq!(past.len(), 1);
    assert_eq!(past[0]["location"], "Dhaka North");

    let summary = body_json(app.get("/api/buyer/dashboard-summary", Some(&buyer)).await).await;
    assert_eq!(summary["upcoming_bookings"], 3);
}

#[tokio::test]
async fn test_messages_and_conversations() {
    let app = TestApp::new();
    let buyer = app.login(BUYER_EMAIL).await;
    let seller = app.login(SELLER_EMAIL).await;

    let sent = app
        .send_json(
            Method::POST,
            "/api/buyer/messages",
            Some(&buyer),
            json!({ "receiver_id": SELLER_ID, "property_id": PROPERTY_ID, "message": "Is parking included?" }),
        )
        .await;
    assert_eq!(sent.status(), StatusCode::CREATED);
    assert_eq!(body_text(sent).await, "Message sent successfully");

    let reply = app
        .send_json(
            Method::POST,
            "/api/seller/messages",
            Some(&seller),
            json!({ "receiver_id": BUYER_ID, "message": "Yes, one spot." }),
        )
        .await;
    assert_eq!(reply.status(), StatusCode::CREATED);

    let to_self = app
        .send_json(
            Method::POST,
            "/api/buyer/messages",
            Some(&buyer),
            json!({ "receiver_id": BUYER_ID, "message": "note to self" }),
        )
        .await;
    assert_eq!(to_self.status(), StatusCode::BAD_REQUEST);

    let inbox = body_json(app.get("/api/buyer/messages", Some(&buyer)).await).await;
    let inbox = inbox.as_array().unwrap();
    assert_eq!(inbox.len(), 2);
    let question = inbox.iter().find(|m| m["message"] == "Is parking included?").unwrap();
    assert_eq!(question["sender_username"], "bea");
    assert_eq!(question["receiver_username"], "sam");
    assert_eq!(question["property_title"], "Lakeside flat");

    let conversations = body_json(app.get("/api/messages/conversations", Some(&seller)).await).await;
    let conversations = conversations.as_array().unwrap();
    assert_eq!(conversations.len(), 1);
    assert_eq!(conversations[0]["participant_id"], BUYER_ID);
    assert_eq!(conversations[0]["participant_username"], "bea");
    assert_eq!(conversations[0]["message_count"], 2);
    assert_eq!(conversations[0]["unread_count"], 1);

    assert_eq!(
        app.get("/api/messages/conversations", None).await.status(),
        StatusCode::UNAUTHORIZED
    );
}
