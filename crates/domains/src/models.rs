//! # Domain Models
//!
//! These structs represent the core entities of the marketplace.
//! Identifiers are database-assigned integers; the only UUIDs in play are
//! session tokens and live subscription handles.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::DomainError;

pub type UserId = i64;
pub type PropertyId = i64;
pub type BookingId = i64;
pub type MessageId = i64;
pub type NotificationId = i64;

/// Declares a lowercase, text-backed enum stored as TEXT in the database.
macro_rules! text_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(DomainError::validation(format!(
                        "unknown {} '{}'",
                        stringify!($name),
                        other
                    ))),
                }
            }
        }
    };
}

text_enum! {
    /// Exactly one role per account.
    Role { Buyer => "buyer", Seller => "seller", Admin => "admin" }
}

text_enum! {
    /// Blocked users may not authenticate.
    UserStatus { Active => "active", Blocked => "blocked" }
}

text_enum! {
    /// Listing lifecycle: pending → approved | blocked.
    PropertyStatus { Pending => "pending", Approved => "approved", Blocked => "blocked" }
}

text_enum! {
    /// Booking lifecycle: pending → approved | declined (both terminal).
    BookingStatus { Pending => "pending", Approved => "approved", Declined => "declined" }
}

/// A registered account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    #[serde(rename = "user_type")]
    pub role: Role,
    pub status: UserStatus,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn is_blocked(&self) -> bool {
        self.status == UserStatus::Blocked
    }
}

/// Registration payload after the password has been hashed.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// Editable profile fields. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ProfileUpdate {
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
}

/// Public view of an account, as returned by the profile endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserProfile {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone_number: user.phone_number.clone(),
        }
    }
}

/// A seller's listing, with the public URLs of its images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub id: PropertyId,
    pub seller_id: UserId,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub location: String,
    pub property_type: String,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub square_feet: i32,
    pub status: PropertyStatus,
    pub created_at: DateTime<Utc>,
    pub images: Vec<String>,
}

/// Seller-supplied listing attributes, used for both create and edit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyDraft {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub location: String,
    pub property_type: String,
    pub bedrooms: i32,
    pub bathrooms: i32,
    pub square_feet: i32,
}

impl PropertyDraft {
    pub fn validate(&self) -> crate::Result<()> {
        if self.title.trim().is_empty() {
            return Err(DomainError::validation("title must not be empty"));
        }
        if self.location.trim().is_empty() {
            return Err(DomainError::validation("location must not be empty"));
        }
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(DomainError::validation("price must be a non-negative number"));
        }
        if self.bedrooms < 0 || self.bathrooms < 0 || self.square_feet < 0 {
            return Err(DomainError::validation("room counts and area must not be negative"));
        }
        Ok(())
    }
}

/// Search criteria for the buyer-facing filter endpoint.
/// `location` is a substring match; the rest are exact.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct PropertyFilter {
    pub location: Option<String>,
    pub property_type: Option<String>,
    pub bedrooms: Option<i32>,
    pub bathrooms: Option<i32>,
}

impl PropertyFilter {
    pub fn matches(&self, property: &Property) -> bool {
        let location_ok = self.location.as_deref().map_or(true, |needle| {
            property.location.to_lowercase().contains(&needle.to_lowercase())
        });
        location_ok
            && self.property_type.as_deref().map_or(true, |t| property.property_type == t)
            && self.bedrooms.map_or(true, |b| property.bedrooms == b)
            && self.bathrooms.map_or(true, |b| property.bathrooms == b)
    }
}

/// A buyer's viewing request against a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: BookingId,
    pub property_id: PropertyId,
    pub buyer_id: UserId,
    pub booking_date: DateTime<Utc>,
    pub message: String,
    pub status: BookingStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewBooking {
    pub property_id: PropertyId,
    pub buyer_id: UserId,
    pub booking_date: DateTime<Utc>,
    pub message: String,
}

/// Combines the form's separate date and time fields into one UTC instant.
pub fn booking_timestamp(date: &str, time: &str) -> crate::Result<DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d")
        .map_err(|_| DomainError::validation(format!("invalid preferred_date '{date}'")))?;
    let time = NaiveTime::parse_from_str(time.trim(), "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(time.trim(), "%H:%M:%S"))
        .map_err(|_| DomainError::validation(format!("invalid preferred_time '{time}'")))?;
    Ok(date.and_time(time).and_utc())
}

/// Seller-side view of a booking, joined with listing and buyer details.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingRequest {
    #[serde(flatten)]
    pub booking: Booking,
    pub property_title: String,
    pub location: String,
    pub buyer_username: String,
    pub buyer_email: String,
}

/// Buyer-side view of a booking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuyerBooking {
    #[serde(flatten)]
    pub booking: Booking,
    pub property_title: String,
    pub location: String,
    pub seller_email: String,
}

/// Which side of "now" a buyer's booking list covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingWindow {
    Upcoming,
    Past,
}

/// A directed message between two users.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub property_id: Option<PropertyId>,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewMessage {
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub property_id: Option<PropertyId>,
    pub message: String,
}

/// A message joined with participant names and the listing title.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageView {
    #[serde(flatten)]
    pub message: Message,
    pub sender_username: String,
    pub receiver_username: String,
    pub property_title: Option<String>,
}

/// All messages exchanged with one other participant, derived on read.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Conversation {
    pub participant_id: UserId,
    pub participant_username: String,
    pub last_message: MessageView,
    pub message_count: usize,
    pub unread_count: usize,
}

/// A bookmarked listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SavedListing {
    pub saved_id: i64,
    #[serde(flatten)]
    pub property: Property,
}

/// A persisted inbox entry. Unrelated to live pushes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredNotification {
    pub id: NotificationId,
    pub user_id: UserId,
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Ephemeral event pushed over a live channel. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LiveEvent {
    NewBookingRequest {
        property_id: PropertyId,
        buyer_id: UserId,
        message: String,
        booking_date: DateTime<Utc>,
    },
}

/// Identifies one open live channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    pub user_id: UserId,
    pub id: Uuid,
}

/// A registered live channel: the handle to deregister it and the receiving end.
#[derive(Debug)]
pub struct Subscription {
    pub handle: SubscriptionHandle,
    pub events: tokio::sync::mpsc::Receiver<LiveEvent>,
}

/// The identity carried by a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUser {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(rename = "user_type")]
    pub role: Role,
}

impl From<&User> for SessionUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// A login, keyed by an opaque token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub user: SessionUser,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SellerSummary {
    pub active_listings: i64,
    pub pending_approval: i64,
    pub new_booking_requests: i64,
    pub unread_messages: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BuyerSummary {
    pub upcoming_bookings: i64,
    pub unread_messages: i64,
    pub saved_properties: i64,
}

/// One line of the admin activity feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityEntry {
    pub message: String,
    pub timestamp: DateTime<Utc>,
}
