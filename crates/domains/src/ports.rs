//! # Ports
//!
//! Any adapter must implement these traits to be wired into the binary.
//! Services only ever see `Arc<dyn Trait>`.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use mime::Mime;
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;

/// Account persistence.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Fails with `Conflict` when the email is already registered.
    async fn create(&self, user: NewUser) -> Result<User>;
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>>;
    /// Returns `None` when no such user exists.
    async fn update_profile(&self, id: UserId, update: ProfileUpdate) -> Result<Option<User>>;
    async fn update_password_hash(&self, id: UserId, password_hash: &str) -> Result<bool>;
    async fn list(&self) -> Result<Vec<User>>;
    async fn delete(&self, id: UserId) -> Result<bool>;
    async fn set_status(&self, id: UserId, status: UserStatus) -> Result<bool>;
    async fn count(&self) -> Result<i64>;
    async fn recent(&self, limit: i64) -> Result<Vec<User>>;
}

/// Listing persistence, including image references.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait PropertyRepository: Send + Sync {
    /// Inserts a `pending` listing together with its image URLs.
    async fn create(&self, seller_id: UserId, draft: PropertyDraft, images: Vec<String>) -> Result<Property>;
    async fn find_by_id(&self, id: PropertyId) -> Result<Option<Property>>;
    async fn owner_of(&self, id: PropertyId) -> Result<Option<UserId>>;
    /// Updates a listing only if `seller_id` owns it; new images are appended.
    async fn update_owned(
        &self,
        id: PropertyId,
        seller_id: UserId,
        draft: PropertyDraft,
        new_images: Vec<String>,
    ) -> Result<Option<Property>>;
    /// Deletes a listing, restricted to `owner` when given.
    /// Returns the image URLs of the deleted row, or `None` if nothing matched.
    async fn delete(&self, id: PropertyId, owner: Option<UserId>) -> Result<Option<Vec<String>>>;
    async fn list_all(&self) -> Result<Vec<Property>>;
    async fn list_by_seller(&self, seller_id: UserId) -> Result<Vec<Property>>;
    async fn list_by_status(&self, status: PropertyStatus, limit: Option<i64>) -> Result<Vec<Property>>;
    async fn filter(&self, filter: PropertyFilter) -> Result<Vec<Property>>;
    async fn set_status(&self, id: PropertyId, status: PropertyStatus) -> Result<bool>;
    async fn count_by_status(&self, status: PropertyStatus, seller_id: Option<UserId>) -> Result<i64>;
    async fn oldest_pending(&self) -> Result<Option<PropertyId>>;
    async fn recent(&self, limit: i64) -> Result<Vec<Property>>;
}

/// Booking persistence.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Inserts the booking and its companion message in one transaction.
    async fn create_with_message(&self, booking: NewBooking, message: NewMessage) -> Result<Booking>;
    /// Returns the booking only if its property is owned by `seller_id`.
    async fn find_owned(&self, id: BookingId, seller_id: UserId) -> Result<Option<Booking>>;
    /// Moves a booking from `from` to `to`; `false` if it was not in `from`.
    async fn transition(&self, id: BookingId, from: BookingStatus, to: BookingStatus) -> Result<bool>;
    async fn list_for_seller(&self, seller_id: UserId) -> Result<Vec<BookingRequest>>;
    async fn list_for_buyer(
        &self,
        buyer_id: UserId,
        window: BookingWindow,
        now: DateTime<Utc>,
    ) -> Result<Vec<BuyerBooking>>;
    async fn count_pending_for_seller(&self, seller_id: UserId) -> Result<i64>;
    async fn count_pending_for_buyer(&self, buyer_id: UserId) -> Result<i64>;
}

/// Message persistence.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait MessageRepository: Send + Sync {
    async fn create(&self, message: NewMessage) -> Result<Message>;
    /// Every message sent or received by `user_id`, newest first.
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<MessageView>>;
    async fn count_unread(&self, receiver_id: UserId) -> Result<i64>;
}

/// Buyer bookmarks.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait SavedPropertyRepository: Send + Sync {
    async fn exists(&self, user_id: UserId, property_id: PropertyId) -> Result<bool>;
    /// Fails with `Conflict` if the pair is already saved.
    async fn save(&self, user_id: UserId, property_id: PropertyId) -> Result<()>;
    async fn remove(&self, user_id: UserId, property_id: PropertyId) -> Result<bool>;
    async fn list(&self, user_id: UserId) -> Result<Vec<SavedListing>>;
    async fn count(&self, user_id: UserId) -> Result<i64>;
}

/// The persisted notification inbox.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, user_id: UserId, kind: &str, message: &str) -> Result<StoredNotification>;
    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<StoredNotification>>;
    async fn mark_read(&self, id: NotificationId, user_id: UserId) -> Result<bool>;
    async fn mark_all_read(&self, user_id: UserId) -> Result<u64>;
}

/// In-process registry of live push channels.
///
/// Delivery is at-most-once and best-effort: `publish` never fails, and a user
/// with no open channels simply receives nothing.
#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait NotificationHub: Send + Sync {
    /// Opens a new channel for `user_id`.
    fn subscribe(&self, user_id: UserId) -> Subscription;
    /// Pushes `event` to every open channel of `user_id` and returns how many took it.
    fn publish(&self, user_id: UserId, event: &LiveEvent) -> usize;
    /// Closes the channel behind `handle`. Idempotent.
    fn unsubscribe(&self, handle: &SubscriptionHandle);
    fn open_channels(&self, user_id: UserId) -> usize;
}

/// Opaque-token session storage.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn create(&self, user: SessionUser, ttl: Duration) -> Result<Session>;
    /// Returns `None` for unknown or expired tokens.
    async fn get(&self, id: Uuid) -> Result<Option<Session>>;
    /// Replaces the identity stored in a live session (after a profile edit).
    async fn refresh_user(&self, id: Uuid, user: SessionUser) -> Result<()>;
    async fn destroy(&self, id: Uuid) -> Result<()>;
    /// Ends every session of `user_id`; returns how many were removed.
    async fn destroy_for_user(&self, user_id: UserId) -> Result<usize>;
}

/// Credential hashing primitive.
#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String>;
    /// Verifies if a provided password matches a stored hash.
    fn verify(&self, password: &str, hash: &str) -> bool;
}

/// Media storage contract for listing images.
#[cfg_attr(any(test, feature = "testing"), automock)]
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Saves raw bytes and returns the public URL for the listing.
    async fn save_image(&self, data: Bytes, content_type: &Mime) -> Result<String>;
    /// Removes the file behind a URL previously returned by `save_image`.
    async fn delete(&self, url: &str) -> Result<()>;
}
