//! The seller's live stream receives booking events as they happen.

use std::time::Duration;

use axum::body::Body;
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, Response, StatusCode};
use bytes::Bytes;
use domains::NotificationHub;
use futures::{Stream, StreamExt};
use integration_tests::*;
use serde_json::{json, Value};
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(2);

async fn subscribe(app: &TestApp, cookie: Option<&str>) -> Response<Body> {
    app.get("/api/notifications/subscribe", cookie).await
}

/// Reads until the next `data:` frame; keep-alive comments are skipped.
async fn next_event<S>(stream: &mut S, wait: Duration) -> Option<Value>
where
    S: Stream<Item = Result<Bytes, axum::Error>> + Unpin,
{
    let mut buffer = String::new();
    loop {
        let chunk = timeout(wait, stream.next()).await.ok()??.unwrap();
        buffer.push_str(std::str::from_utf8(&chunk).unwrap());
        while let Some(end) = buffer.find("\n\n") {
            let frame: String = buffer.drain(..end + 2).collect();
            if let Some(data) = frame.lines().find_map(|line| line.strip_prefix("data: ")) {
                return Some(serde_json::from_str(data).unwrap());
            }
        }
    }
}

async fn book(app: &TestApp, buyer: &str, property_id: i64) {
    let response = app
        .send_json(
            Method::POST,
            "/api/bookings",
            Some(buyer),
            json!({
                "property_id": property_id,
                "preferred_date": "2025-01-10",
                "preferred_time": "10:00",
                "message": "Can I visit?",
            }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn test_subscribe_requires_a_session() {
    let app = TestApp::new();
    let response = subscribe(&app, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(app.hub.open_channels(SELLER_ID), 0);
}

#[tokio::test]
async fn test_seller_receives_booking_event() {
    let app = TestApp::new();
    let seller = app.login(SELLER_EMAIL).await;
    let buyer = app.login(BUYER_EMAIL).await;

    let response = subscribe(&app, Some(&seller)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));
    assert_eq!(app.hub.open_channels(SELLER_ID), 1);
    let mut stream = Box::pin(response.into_body().into_data_stream());

    book(&app, &buyer, PROPERTY_ID).await;

    let event = next_event(&mut stream, WAIT).await.expect("no live event");
    assert_eq!(
        event,
        json!({
            "type": "new_booking_request",
            "property_id": 42,
            "buyer_id": 7,
            "message": "Can I visit?",
            "booking_date": "2025-01-10T10:00:00Z",
        })
    );
    assert!(next_event(&mut stream, Duration::from_millis(200)).await.is_none());
}

#[tokio::test]
async fn test_every_open_tab_gets_one_copy() {
    let app = TestApp::new();
    let seller = app.login(SELLER_EMAIL).await;
    let buyer = app.login(BUYER_EMAIL).await;

    let mut first = Box::pin(subscribe(&app, Some(&seller)).await.into_body().into_data_stream());
    let mut second = Box::pin(subscribe(&app, Some(&seller)).await.into_body().into_data_stream());
    assert_eq!(app.hub.open_channels(SELLER_ID), 2);

    book(&app, &buyer, PROPERTY_ID).await;

    assert!(next_event(&mut first, WAIT).await.is_some());
    assert!(next_event(&mut second, WAIT).await.is_some());
}

#[tokio::test]
async fn test_events_only_reach_the_listing_owner() {
    let app = TestApp::new();
    let other_seller = app.login(OTHER_SELLER_EMAIL).await;
    let buyer = app.login(BUYER_EMAIL).await;

    let mut stream = Box::pin(
        subscribe(&app, Some(&other_seller))
            .await
            .into_body()
            .into_data_stream(),
    );

    book(&app, &buyer, PROPERTY_ID).await;

    assert!(next_event(&mut stream, Duration::from_millis(200)).await.is_none());
}

#[tokio::test]
async fn test_closing_the_stream_unsubscribes() {
    let app = TestApp::new();
    let seller = app.login(SELLER_EMAIL).await;
    let buyer = app.login(BUYER_EMAIL).await;

    let stream = subscribe(&app, Some(&seller)).await.into_body().into_data_stream();
    assert_eq!(app.hub.open_channels(SELLER_ID), 1);
    drop(stream);
    assert_eq!(app.hub.open_channels(SELLER_ID), 0);

    // Booking still succeeds with nobody listening.
    book(&app, &buyer, PROPERTY_ID).await;
    assert_eq!(app.store.bookings().unwrap().len(), 1);
}

#[tokio::test]
async fn test_metrics_track_subscriptions_and_deliveries() {
    let app = TestApp::new();
    let seller = app.login(SELLER_EMAIL).await;
    let buyer = app.login(BUYER_EMAIL).await;

    let mut stream = Box::pin(subscribe(&app, Some(&seller)).await.into_body().into_data_stream());
    book(&app, &buyer, PROPERTY_ID).await;
    assert!(next_event(&mut stream, WAIT).await.is_some());

    let metrics = body_text(app.get("/metrics", None).await).await;
    assert!(metrics.contains("estate_live_subscriptions 1"), "{metrics}");
    assert!(metrics.contains("estate_bookings_created_total 1"), "{metrics}");
    assert!(metrics.contains("estate_live_events_delivered_total 1"), "{metrics}");

    drop(stream);
    let metrics = body_text(app.get("/metrics", None).await).await;
    assert!(metrics.contains("estate_live_subscriptions 0"), "{metrics}");
}
