//! Shared fixtures for the end-to-end tests.
//!
//! [`TestApp`] wires the real router over the in-memory store, the in-process
//! hub and a throwaway upload/static directory, seeded with a fixed cast:
//! admin 1, sellers 3 and 5, buyer 7, listing 42 (seller 3) and listing 43
//! (seller 5).

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use api_adapters::{AppState, Backend, WebConfig};
use auth_adapters::{Argon2Hasher, MemorySessionStore, SessionCookie};
use axum::body::{to_bytes, Body};
use axum::http::header::{CONTENT_TYPE, COOKIE, LOCATION, SET_COOKIE};
use axum::http::{Method, Request, Response, StatusCode};
use axum::Router;
use chrono::{TimeZone, Utc};
use domains::{PasswordHasher, Property, PropertyId, PropertyStatus, Role, User, UserId, UserStatus};
use secrecy::SecretString;
use serde_json::Value;
use storage_adapters::{InMemoryNotificationHub, LocalMediaStore, MemoryStore};
use tower::ServiceExt;
use uuid::Uuid;

pub const ADMIN_ID: UserId = 1;
pub const SELLER_ID: UserId = 3;
pub const OTHER_SELLER_ID: UserId = 5;
pub const BUYER_ID: UserId = 7;
pub const PROPERTY_ID: PropertyId = 42;
pub const OTHER_PROPERTY_ID: PropertyId = 43;

pub const ADMIN_EMAIL: &str = "admin@example.com";
pub const SELLER_EMAIL: &str = "sam@example.com";
pub const OTHER_SELLER_EMAIL: &str = "sol@example.com";
pub const BUYER_EMAIL: &str = "bea@example.com";
pub const PASSWORD: &str = "correct-horse-battery";

pub const COOKIE_NAME: &str = "estate_session";
const SECRET: &str = "integration-test-secret-0123456789abcdef";

/// Smallest byte sequence `image::guess_format` recognises as PNG.
pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0];

/// Argon2 is slow in debug builds; hash the shared password once per binary.
fn password_hash() -> &'static str {
    static HASH: OnceLock<String> = OnceLock::new();
    HASH.get_or_init(|| Argon2Hasher::new().hash(PASSWORD).unwrap())
}

fn user(id: UserId, username: &str, email: &str, role: Role) -> User {
    User {
        id,
        username: username.into(),
        email: email.into(),
        password_hash: password_hash().into(),
        role,
        status: UserStatus::Active,
        first_name: None,
        last_name: None,
        phone_number: None,
        created_at: Utc.with_ymd_and_hms(2024, 6, 1, 9, 0, 0).unwrap() + chrono::Duration::minutes(id),
    }
}

pub fn listing(id: PropertyId, seller_id: UserId, title: &str, location: &str) -> Property {
    Property {
        id,
        seller_id,
        title: title.into(),
        description: "Bright rooms near the park".into(),
        price: 185_000.0,
        location: location.into(),
        property_type: "apartment".into(),
        bedrooms: 3,
        bathrooms: 2,
        square_feet: 1_250,
        status: PropertyStatus::Approved,
        created_at: Utc.with_ymd_and_hms(2024, 7, 1, 9, 0, 0).unwrap() + chrono::Duration::minutes(id),
        images: vec![],
    }
}

fn temp_dir(label: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("estate-it-{label}-{}", Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_pages(static_dir: &Path) {
    for (page, marker) in [
        ("index.html", "home page"),
        ("login.html", "login page"),
        ("register.html", "register page"),
        ("admin.html", "admin dashboard"),
        ("seller_dashboard.html", "seller dashboard"),
        ("buyer.html", "buyer dashboard"),
    ] {
        std::fs::write(static_dir.join(page), format!("<html><body>{marker}</body></html>")).unwrap();
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub hub: Arc<InMemoryNotificationHub>,
    pub sessions: Arc<MemorySessionStore>,
    pub static_dir: PathBuf,
    pub upload_dir: PathBuf,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_backend(|_| {})
    }

    /// Like [`TestApp::new`], but lets a test swap ports before the services
    /// are built.
    pub fn with_backend(customize: impl FnOnce(&mut Backend)) -> Self {
        let store = Arc::new(MemoryStore::new());
        store.seed_user(user(ADMIN_ID, "root", ADMIN_EMAIL, Role::Admin)).unwrap();
        store.seed_user(user(SELLER_ID, "sam", SELLER_EMAIL, Role::Seller)).unwrap();
        store.seed_user(user(OTHER_SELLER_ID, "sol", OTHER_SELLER_EMAIL, Role::Seller)).unwrap();
        store.seed_user(user(BUYER_ID, "bea", BUYER_EMAIL, Role::Buyer)).unwrap();
        store
            .seed_property(listing(PROPERTY_ID, SELLER_ID, "Lakeside flat", "Dhaka North"))
            .unwrap();
        store
            .seed_property(listing(OTHER_PROPERTY_ID, OTHER_SELLER_ID, "Hill cottage", "Sylhet"))
            .unwrap();

        let static_dir = temp_dir("static");
        write_pages(&static_dir);
        let upload_dir = temp_dir("uploads");

        let hub = Arc::new(InMemoryNotificationHub::new(16));
        let sessions = Arc::new(MemorySessionStore::new());
        let session_ttl = chrono::Duration::hours(1);

        let mut backend = Backend::from_store(
            store.clone(),
            sessions.clone(),
            Arc::new(Argon2Hasher::new()),
            Arc::new(LocalMediaStore::new(upload_dir.clone(), "/uploads")),
            hub.clone(),
        );
        customize(&mut backend);
        let cookie = SessionCookie::new(COOKIE_NAME, &SecretString::from(SECRET.to_string()), session_ttl, false).unwrap();
        let web = WebConfig {
            static_dir: static_dir.clone(),
            upload_dir: upload_dir.clone(),
            upload_url_prefix: "/uploads".into(),
            max_upload_bytes: 2 * 1024 * 1024,
            max_images: 3,
            keep_alive: Duration::from_secs(15),
            session_ttl,
        };

        let router = api_adapters::router(AppState::new(backend, cookie, web));
        Self { router, store, hub, sessions, static_dir, upload_dir }
    }

    pub async fn request(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Logs in through the form endpoint and returns the `Cookie` header value.
    pub async fn login(&self, email: &str) -> String {
        let response = self
            .send_form(Method::POST, "/login", None, &format!("email={email}&password={PASSWORD}"))
            .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER, "login as {email} failed");
        session_cookie(&response).unwrap_or_else(|| panic!("no session cookie for {email}"))
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
        self.send(Method::GET, uri, cookie, Body::empty(), None).await
    }

    pub async fn send_json(&self, method: Method, uri: &str, cookie: Option<&str>, body: Value) -> Response<Body> {
        self.send(method, uri, cookie, Body::from(body.to_string()), Some("application/json"))
            .await
    }

    pub async fn send_form(&self, method: Method, uri: &str, cookie: Option<&str>, body: &str) -> Response<Body> {
        self.send(
            method,
            uri,
            cookie,
            Body::from(body.to_string()),
            Some("application/x-www-form-urlencoded"),
        )
        .await
    }

    pub async fn send_empty(&self, method: Method, uri: &str, cookie: Option<&str>) -> Response<Body> {
        self.send(method, uri, cookie, Body::empty(), None).await
    }

    pub async fn send_multipart(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        form: Multipart,
    ) -> Response<Body> {
        let content_type = form.content_type();
        self.send(method, uri, cookie, Body::from(form.finish()), Some(content_type.as_str()))
            .await
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        cookie: Option<&str>,
        body: Body,
        content_type: Option<&str>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(COOKIE, cookie);
        }
        if let Some(content_type) = content_type {
            builder = builder.header(CONTENT_TYPE, content_type);
        }
        self.request(builder.body(body).unwrap()).await
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.static_dir);
        let _ = std::fs::remove_dir_all(&self.upload_dir);
    }
}

/// `name=value` of the session cookie set by a response, if any.
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter(|v| v.starts_with(&format!("{COOKIE_NAME}=")))
        .filter_map(|v| v.split(';').next())
        .map(str::to_string)
        .next()
}

pub fn location(response: &Response<Body>) -> &str {
    response.headers().get(LOCATION).unwrap().to_str().unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> bytes::Bytes {
    to_bytes(response.into_body(), usize::MAX).await.unwrap()
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Hand-built `multipart/form-data` body.
pub struct Multipart {
    boundary: String,
    body: Vec<u8>,
}

impl Multipart {
    pub fn new() -> Self {
        Self { boundary: format!("estate-{}", Uuid::new_v4().simple()), body: Vec::new() }
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, data: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n",
                self.boundary
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(data);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    /// The usual listing fields.
    pub fn listing(self, title: &str, location: &str) -> Self {
        self.text("title", title)
            .text("description", "Corner unit with balcony")
            .text("price", "240000")
            .text("location", location)
            .text("property_type", "apartment")
            .text("bedrooms", "2")
            .text("bathrooms", "1")
            .text("square_feet", "980")
    }

    pub fn content_type(&self) -> String {
        format!("multipart/form-data; boundary={}", self.boundary)
    }

    pub fn finish(mut self) -> Vec<u8> {
        self.body.extend_from_slice(format!("--{}--\r\n", self.boundary).as_bytes());
        self.body
    }
}

impl Default for Multipart {
    fn default() -> Self {
        Self::new()
    }
}
