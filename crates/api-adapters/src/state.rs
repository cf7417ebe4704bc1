//! Shared handler state.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use auth_adapters::SessionCookie;
use domains::{
    BookingRepository, MediaStore, MessageRepository, NotificationHub, NotificationRepository,
    PasswordHasher, PropertyRepository, SavedPropertyRepository, SessionStore, UserRepository,
};
use services::{
    AccountService, BookingService, DashboardService, InboxService, MessageService,
    PropertyService, SavedPropertyService,
};

use crate::metrics::Metrics;

/// Web-facing knobs, filled in from the runtime settings by the binary.
#[derive(Debug, Clone)]
pub struct WebConfig {
    /// Directory holding the HTML pages and client assets.
    pub static_dir: PathBuf,
    pub upload_dir: PathBuf,
    /// Public prefix the upload dir is served under, e.g. `/uploads`.
    pub upload_url_prefix: String,
    pub max_upload_bytes: usize,
    pub max_images: usize,
    pub keep_alive: Duration,
    pub session_ttl: chrono::Duration,
}

/// Every port implementation the services need.
pub struct Backend {
    pub users: Arc<dyn UserRepository>,
    pub properties: Arc<dyn PropertyRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub messages: Arc<dyn MessageRepository>,
    pub saved: Arc<dyn SavedPropertyRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub sessions: Arc<dyn SessionStore>,
    pub hasher: Arc<dyn PasswordHasher>,
    pub media: Arc<dyn MediaStore>,
    pub hub: Arc<dyn NotificationHub>,
}

/// The repository half of [`Backend`], when one store implements every table.
pub trait Store:
    UserRepository
    + PropertyRepository
    + BookingRepository
    + MessageRepository
    + SavedPropertyRepository
    + NotificationRepository
    + 'static
{
}

impl<T> Store for T where
    T: UserRepository
        + PropertyRepository
        + BookingRepository
        + MessageRepository
        + SavedPropertyRepository
        + NotificationRepository
        + 'static
{
}

impl Backend {
    pub fn from_store<S: Store>(
        store: Arc<S>,
        sessions: Arc<dyn SessionStore>,
        hasher: Arc<dyn PasswordHasher>,
        media: Arc<dyn MediaStore>,
        hub: Arc<dyn NotificationHub>,
    ) -> Self {
        Self {
            users: store.clone(),
            properties: store.clone(),
            bookings: store.clone(),
            messages: store.clone(),
            saved: store.clone(),
            notifications: store,
            sessions,
            hasher,
            media,
            hub,
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub properties: Arc<PropertyService>,
    pub bookings: Arc<BookingService>,
    pub messages: Arc<MessageService>,
    pub saved: Arc<SavedPropertyService>,
    pub inbox: Arc<InboxService>,
    pub dashboard: Arc<DashboardService>,
    pub hub: Arc<dyn NotificationHub>,
    pub cookie: Arc<SessionCookie>,
    pub metrics: Arc<Metrics>,
    pub web: Arc<WebConfig>,
}

impl AppState {
    pub fn new(backend: Backend, cookie: SessionCookie, web: WebConfig) -> Self {
        let Backend {
            users,
            properties,
            bookings,
            messages,
            saved,
            notifications,
            sessions,
            hasher,
            media,
            hub,
        } = backend;

        Self {
            accounts: Arc::new(AccountService::new(
                users.clone(),
                sessions,
                hasher,
                web.session_ttl,
            )),
            properties: Arc::new(PropertyService::new(
                properties.clone(),
                media,
                notifications.clone(),
            )),
            bookings: Arc::new(BookingService::new(
                properties.clone(),
                bookings.clone(),
                hub.clone(),
            )),
            messages: Arc::new(MessageService::new(messages.clone(), users.clone())),
            saved: Arc::new(SavedPropertyService::new(saved.clone(), properties.clone())),
            inbox: Arc::new(InboxService::new(notifications)),
            dashboard: Arc::new(DashboardService::new(users, properties, bookings, messages, saved)),
            hub,
            cookie: Arc::new(cookie),
            metrics: Arc::new(Metrics::new()),
            web: Arc::new(web),
        }
    }
}
