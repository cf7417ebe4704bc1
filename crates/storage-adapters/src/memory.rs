//! # In-memory repositories
//!
//! One table set behind a single mutex, implementing every repository port.
//! Deletes cascade the same way the PostgreSQL foreign keys do, so handlers
//! behave identically on either backend. Rows are returned newest first
//! unless a port says otherwise.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use domains::{
    Booking, BookingId, BookingRepository, BookingRequest, BookingStatus, BookingWindow,
    BuyerBooking, DomainError, Message, MessageRepository, MessageView, NewBooking, NewMessage,
    NewUser, NotificationId, NotificationRepository, ProfileUpdate, Property, PropertyDraft,
    PropertyFilter, PropertyId, PropertyRepository, PropertyStatus, Result, SavedListing,
    SavedPropertyRepository, StoredNotification, User, UserId, UserRepository, UserStatus,
};

#[derive(Debug, Clone)]
struct SavedRow {
    id: i64,
    user_id: UserId,
    property_id: PropertyId,
    created_at: DateTime<Utc>,
}

#[derive(Default)]
struct Sequences {
    users: i64,
    properties: i64,
    bookings: i64,
    messages: i64,
    saved: i64,
    notifications: i64,
}

fn next(seq: &mut i64) -> i64 {
    *seq += 1;
    *seq
}

#[derive(Default)]
struct Tables {
    seq: Sequences,
    users: BTreeMap<UserId, User>,
    properties: BTreeMap<PropertyId, Property>,
    bookings: BTreeMap<BookingId, Booking>,
    messages: BTreeMap<i64, Message>,
    saved: BTreeMap<i64, SavedRow>,
    notifications: BTreeMap<NotificationId, StoredNotification>,
}

impl Tables {
    fn username(&self, id: UserId) -> String {
        self.users.get(&id).map(|u| u.username.clone()).unwrap_or_default()
    }

    fn message_view(&self, message: &Message) -> MessageView {
        MessageView {
            sender_username: self.username(message.sender_id),
            receiver_username: self.username(message.receiver_id),
            property_title: message
                .property_id
                .and_then(|id| self.properties.get(&id))
                .map(|p| p.title.clone()),
            message: message.clone(),
        }
    }

    fn insert_message(&mut self, message: NewMessage) -> Message {
        let row = Message {
            id: next(&mut self.seq.messages),
            sender_id: message.sender_id,
            receiver_id: message.receiver_id,
            property_id: message.property_id,
            message: message.message,
            is_read: false,
            created_at: Utc::now(),
        };
        self.messages.insert(row.id, row.clone());
        row
    }

    fn delete_property(&mut self, id: PropertyId) -> Option<Property> {
        let removed = self.properties.remove(&id)?;
        self.bookings.retain(|_, b| b.property_id != id);
        self.saved.retain(|_, s| s.property_id != id);
        for message in self.messages.values_mut() {
            if message.property_id == Some(id) {
                message.property_id = None;
            }
        }
        Some(removed)
    }

    fn delete_user(&mut self, id: UserId) -> bool {
        if self.users.remove(&id).is_none() {
            return false;
        }
        let owned: Vec<PropertyId> = self
            .properties
            .values()
            .filter(|p| p.seller_id == id)
            .map(|p| p.id)
            .collect();
        for property_id in owned {
            self.delete_property(property_id);
        }
        self.bookings.retain(|_, b| b.buyer_id != id);
        self.messages.retain(|_, m| m.sender_id != id && m.receiver_id != id);
        self.saved.retain(|_, s| s.user_id != id);
        self.notifications.retain(|_, n| n.user_id != id);
        true
    }

    fn seller_of(&self, property_id: PropertyId) -> Option<UserId> {
        self.properties.get(&property_id).map(|p| p.seller_id)
    }
}

/// Newest first, ties broken by id.
fn newest_first<T>(rows: &mut [T], key: impl Fn(&T) -> (DateTime<Utc>, i64)) {
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
}

fn apply_draft(property: &mut Property, draft: PropertyDraft) {
    property.title = draft.title;
    property.description = draft.description;
    property.price = draft.price;
    property.location = draft.location;
    property.property_type = draft.property_type;
    property.bedrooms = draft.bedrooms;
    property.bathrooms = draft.bathrooms;
    property.square_feet = draft.square_feet;
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| DomainError::persistence("in-memory store lock poisoned"))
    }

    /// Inserts a user verbatim, keeping its id. Later inserts get higher ids.
    pub fn seed_user(&self, user: User) -> Result<User> {
        let mut tables = self.lock()?;
        tables.seq.users = tables.seq.users.max(user.id);
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    /// Inserts a listing verbatim, keeping its id and status.
    pub fn seed_property(&self, property: Property) -> Result<Property> {
        let mut tables = self.lock()?;
        if !tables.users.contains_key(&property.seller_id) {
            return Err(DomainError::persistence("seller does not exist"));
        }
        tables.seq.properties = tables.seq.properties.max(property.id);
        tables.properties.insert(property.id, property.clone());
        Ok(property)
    }

    pub fn bookings(&self) -> Result<Vec<Booking>> {
        Ok(self.lock()?.bookings.values().cloned().collect())
    }

    pub fn messages(&self) -> Result<Vec<Message>> {
        Ok(self.lock()?.messages.values().cloned().collect())
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create(&self, user: NewUser) -> Result<User> {
        let mut tables = self.lock()?;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(DomainError::Conflict("Email already registered".into()));
        }
        let row = User {
            id: next(&mut tables.seq.users),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            status: UserStatus::Active,
            first_name: None,
            last_name: None,
            phone_number: None,
            created_at: Utc::now(),
        };
        tables.users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self.lock()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn update_profile(&self, id: UserId, update: ProfileUpdate) -> Result<Option<User>> {
        let mut tables = self.lock()?;
        if tables.users.values().any(|u| u.id != id && u.email == update.email) {
            return Err(DomainError::Conflict("Email already registered".into()));
        }
        let Some(user) = tables.users.get_mut(&id) else {
            return Ok(None);
        };
        user.username = update.username;
        user.email = update.email;
        user.first_name = update.first_name;
        user.last_name = update.last_name;
        user.phone_number = update.phone_number;
        Ok(Some(user.clone()))
    }

    async fn update_password_hash(&self, id: UserId, password_hash: &str) -> Result<bool> {
        let mut tables = self.lock()?;
        Ok(match tables.users.get_mut(&id) {
            Some(user) => {
                user.password_hash = password_hash.to_string();
                true
            }
            None => false,
        })
    }

    async fn list(&self) -> Result<Vec<User>> {
        Ok(self.lock()?.users.values().cloned().collect())
    }

    async fn delete(&self, id: UserId) -> Result<bool> {
        Ok(self.lock()?.delete_user(id))
    }

    async fn set_status(&self, id: UserId, status: UserStatus) -> Result<bool> {
        let mut tables = self.lock()?;
        Ok(match tables.users.get_mut(&id) {
            Some(user) => {
                user.status = status;
                true
            }
            None => false,
        })
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.lock()?.users.len() as i64)
    }

    async fn recent(&self, limit: i64) -> Result<Vec<User>> {
        let mut users: Vec<User> = self.lock()?.users.values().cloned().collect();
        newest_first(&mut users, |u| (u.created_at, u.id));
        users.truncate(limit.max(0) as usize);
        Ok(users)
    }
}

#[async_trait]
impl PropertyRepository for MemoryStore {
    async fn create(&self, seller_id: UserId, draft: PropertyDraft, images: Vec<String>) -> Result<Property> {
        let mut tables = self.lock()?;
        if !tables.users.contains_key(&seller_id) {
            return Err(DomainError::persistence("seller does not exist"));
        }
        let mut row = Property {
            id: next(&mut tables.seq.properties),
            seller_id,
            title: String::new(),
            description: String::new(),
            price: 0.0,
            location: String::new(),
            property_type: String::new(),
            bedrooms: 0,
            bathrooms: 0,
            square_feet: 0,
            status: PropertyStatus::Pending,
            created_at: Utc::now(),
            images,
        };
        apply_draft(&mut row, draft);
        tables.properties.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_by_id(&self, id: PropertyId) -> Result<Option<Property>> {
        Ok(self.lock()?.properties.get(&id).cloned())
    }

    async fn owner_of(&self, id: PropertyId) -> Result<Option<UserId>> {
        Ok(self.lock()?.seller_of(id))
    }

    async fn update_owned(
        &self,
        id: PropertyId,
        seller_id: UserId,
        draft: PropertyDraft,
        new_images: Vec<String>,
    ) -> Result<Option<Property>> {
        let mut tables = self.lock()?;
        let Some(property) = tables.properties.get_mut(&id).filter(|p| p.seller_id == seller_id) else {
            return Ok(None);
        };
        apply_draft(property, draft);
        property.images.extend(new_images);
        Ok(Some(property.clone()))
    }

    async fn delete(&self, id: PropertyId, owner: Option<UserId>) -> Result<Option<Vec<String>>> {
        let mut tables = self.lock()?;
        match (tables.seller_of(id), owner) {
            (None, _) => return Ok(None),
            (Some(seller), Some(owner)) if seller != owner => return Ok(None),
            _ => {}
        }
        Ok(tables.delete_property(id).map(|p| p.images))
    }

    async fn list_all(&self) -> Result<Vec<Property>> {
        let mut rows: Vec<Property> = self.lock()?.properties.values().cloned().collect();
        newest_first(&mut rows, |p| (p.created_at, p.id));
        Ok(rows)
    }

    async fn list_by_seller(&self, seller_id: UserId) -> Result<Vec<Property>> {
        let mut rows: Vec<Property> = self
            .lock()?
            .properties
            .values()
            .filter(|p| p.seller_id == seller_id)
            .cloned()
            .collect();
        newest_first(&mut rows, |p| (p.created_at, p.id));
        Ok(rows)
    }

    async fn list_by_status(&self, status: PropertyStatus, limit: Option<i64>) -> Result<Vec<Property>> {
        let mut rows: Vec<Property> = self
            .lock()?
            .properties
            .values()
            .filter(|p| p.status == status)
            .cloned()
            .collect();
        newest_first(&mut rows, |p| (p.created_at, p.id));
        if let Some(limit) = limit {
            rows.truncate(limit.max(0) as usize);
        }
        Ok(rows)
    }

    async fn filter(&self, filter: PropertyFilter) -> Result<Vec<Property>> {
        let mut rows: Vec<Property> = self
            .lock()?
            .properties
            .values()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();
        newest_first(&mut rows, |p| (p.created_at, p.id));
        Ok(rows)
    }

    async fn set_status(&self, id: PropertyId, status: PropertyStatus) -> Result<bool> {
        let mut tables = self.lock()?;
        Ok(match tables.properties.get_mut(&id) {
            Some(property) => {
                property.status = status;
                true
            }
            None => false,
        })
    }

    async fn count_by_status(&self, status: PropertyStatus, seller_id: Option<UserId>) -> Result<i64> {
        Ok(self
            .lock()?
            .properties
            .values()
            .filter(|p| p.status == status && seller_id.map_or(true, |s| p.seller_id == s))
            .count() as i64)
    }

    async fn oldest_pending(&self) -> Result<Option<PropertyId>> {
        Ok(self
            .lock()?
            .properties
            .values()
            .filter(|p| p.status == PropertyStatus::Pending)
            .min_by_key(|p| (p.created_at, p.id))
            .map(|p| p.id))
    }

    async fn recent(&self, limit: i64) -> Result<Vec<Property>> {
        let mut rows = self.list_all().await?;
        rows.truncate(limit.max(0) as usize);
        Ok(rows)
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn create_with_message(&self, booking: NewBooking, message: NewMessage) -> Result<Booking> {
        let mut tables = self.lock()?;
        // The listing may have been deleted since the owner lookup.
        if !tables.properties.contains_key(&booking.property_id) {
            return Err(DomainError::not_found("Property", booking.property_id));
        }
        if !tables.users.contains_key(&booking.buyer_id)
            || !tables.users.contains_key(&message.receiver_id)
        {
            return Err(DomainError::persistence("booking references a missing row"));
        }
        let row = Booking {
            id: next(&mut tables.seq.bookings),
            property_id: booking.property_id,
            buyer_id: booking.buyer_id,
            booking_date: booking.booking_date,
            message: booking.message,
            status: BookingStatus::Pending,
            created_at: Utc::now(),
        };
        tables.bookings.insert(row.id, row.clone());
        tables.insert_message(message);
        Ok(row)
    }

    async fn find_owned(&self, id: BookingId, seller_id: UserId) -> Result<Option<Booking>> {
        let tables = self.lock()?;
        Ok(tables
            .bookings
            .get(&id)
            .filter(|b| tables.seller_of(b.property_id) == Some(seller_id))
            .cloned())
    }

    async fn transition(&self, id: BookingId, from: BookingStatus, to: BookingStatus) -> Result<bool> {
        let mut tables = self.lock()?;
        Ok(match tables.bookings.get_mut(&id) {
            Some(booking) if booking.status == from => {
                booking.status = to;
                true
            }
            _ => false,
        })
    }

    async fn list_for_seller(&self, seller_id: UserId) -> Result<Vec<BookingRequest>> {
        let tables = self.lock()?;
        let mut rows: Vec<BookingRequest> = tables
            .bookings
            .values()
            .filter_map(|b| {
                let property = tables.properties.get(&b.property_id)?;
                if property.seller_id != seller_id {
                    return None;
                }
                let buyer = tables.users.get(&b.buyer_id)?;
                Some(BookingRequest {
                    booking: b.clone(),
                    property_title: property.title.clone(),
                    location: property.location.clone(),
                    buyer_username: buyer.username.clone(),
                    buyer_email: buyer.email.clone(),
                })
            })
            .collect();
        newest_first(&mut rows, |r| (r.booking.created_at, r.booking.id));
        Ok(rows)
    }

    async fn list_for_buyer(
        &self,
        buyer_id: UserId,
        window: BookingWindow,
        now: DateTime<Utc>,
    ) -> Result<Vec<BuyerBooking>> {
        let tables = self.lock()?;
        let mut rows: Vec<BuyerBooking> = tables
            .bookings
            .values()
            .filter(|b| b.buyer_id == buyer_id)
            .filter(|b| match window {
                BookingWindow::Upcoming => b.booking_date >= now,
                BookingWindow::Past => b.booking_date < now,
            })
            .filter_map(|b| {
                let property = tables.properties.get(&b.property_id)?;
                let seller = tables.users.get(&property.seller_id)?;
                Some(BuyerBooking {
                    booking: b.clone(),
                    property_title: property.title.clone(),
                    location: property.location.clone(),
                    seller_email: seller.email.clone(),
                })
            })
            .collect();
        rows.sort_by_key(|r| (r.booking.booking_date, r.booking.id));
        if window == BookingWindow::Past {
            rows.reverse();
        }
        Ok(rows)
    }

    async fn count_pending_for_seller(&self, seller_id: UserId) -> Result<i64> {
        let tables = self.lock()?;
        Ok(tables
            .bookings
            .values()
            .filter(|b| b.status == BookingStatus::Pending)
            .filter(|b| tables.seller_of(b.property_id) == Some(seller_id))
            .count() as i64)
    }

    async fn count_pending_for_buyer(&self, buyer_id: UserId) -> Result<i64> {
        Ok(self
            .lock()?
            .bookings
            .values()
            .filter(|b| b.buyer_id == buyer_id && b.status == BookingStatus::Pending)
            .count() as i64)
    }
}

#[async_trait]
impl MessageRepository for MemoryStore {
    async fn create(&self, message: NewMessage) -> Result<Message> {
        let mut tables = self.lock()?;
        if !tables.users.contains_key(&message.sender_id) || !tables.users.contains_key(&message.receiver_id) {
            return Err(DomainError::persistence("message references a missing user"));
        }
        Ok(tables.insert_message(message))
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<MessageView>> {
        let tables = self.lock()?;
        let mut rows: Vec<MessageView> = tables
            .messages
            .values()
            .filter(|m| m.sender_id == user_id || m.receiver_id == user_id)
            .map(|m| tables.message_view(m))
            .collect();
        newest_first(&mut rows, |v| (v.message.created_at, v.message.id));
        Ok(rows)
    }

    async fn count_unread(&self, receiver_id: UserId) -> Result<i64> {
        Ok(self
            .lock()?
            .messages
            .values()
            .filter(|m| m.receiver_id == receiver_id && !m.is_read)
            .count() as i64)
    }
}

#[async_trait]
impl SavedPropertyRepository for MemoryStore {
    async fn exists(&self, user_id: UserId, property_id: PropertyId) -> Result<bool> {
        Ok(self
            .lock()?
            .saved
            .values()
            .any(|s| s.user_id == user_id && s.property_id == property_id))
    }

    async fn save(&self, user_id: UserId, property_id: PropertyId) -> Result<()> {
        let mut tables = self.lock()?;
        if tables.saved.values().any(|s| s.user_id == user_id && s.property_id == property_id) {
            return Err(DomainError::Conflict("Property already saved".into()));
        }
        if !tables.properties.contains_key(&property_id) {
            return Err(DomainError::persistence("saved property references a missing listing"));
        }
        let row = SavedRow {
            id: next(&mut tables.seq.saved),
            user_id,
            property_id,
            created_at: Utc::now(),
        };
        tables.saved.insert(row.id, row);
        Ok(())
    }

    async fn remove(&self, user_id: UserId, property_id: PropertyId) -> Result<bool> {
        let mut tables = self.lock()?;
        let before = tables.saved.len();
        tables
            .saved
            .retain(|_, s| !(s.user_id == user_id && s.property_id == property_id));
        Ok(tables.saved.len() < before)
    }

    async fn list(&self, user_id: UserId) -> Result<Vec<SavedListing>> {
        let tables = self.lock()?;
        let mut rows: Vec<(SavedRow, Property)> = tables
            .saved
            .values()
            .filter(|s| s.user_id == user_id)
            .filter_map(|s| Some((s.clone(), tables.properties.get(&s.property_id)?.clone())))
            .collect();
        newest_first(&mut rows, |(s, _)| (s.created_at, s.id));
        Ok(rows
            .into_iter()
            .map(|(s, property)| SavedListing { saved_id: s.id, property })
            .collect())
    }

    async fn count(&self, user_id: UserId) -> Result<i64> {
        Ok(self.lock()?.saved.values().filter(|s| s.user_id == user_id).count() as i64)
    }
}

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn create(&self, user_id: UserId, kind: &str, message: &str) -> Result<StoredNotification> {
        let mut tables = self.lock()?;
        let row = StoredNotification {
            id: next(&mut tables.seq.notifications),
            user_id,
            kind: kind.to_string(),
            message: message.to_string(),
            is_read: false,
            created_at: Utc::now(),
        };
        tables.notifications.insert(row.id, row.clone());
        Ok(row)
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<StoredNotification>> {
        let mut rows: Vec<StoredNotification> = self
            .lock()?
            .notifications
            .values()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        newest_first(&mut rows, |n| (n.created_at, n.id));
        Ok(rows)
    }

    async fn mark_read(&self, id: NotificationId, user_id: UserId) -> Result<bool> {
        let mut tables = self.lock()?;
        Ok(match tables.notifications.get_mut(&id) {
            Some(n) if n.user_id == user_id => {
                n.is_read = true;
                true
            }
            _ => false,
        })
    }

    async fn mark_all_read(&self, user_id: UserId) -> Result<u64> {
        let mut tables = self.lock()?;
        let mut changed = 0;
        for n in tables.notifications.values_mut() {
            if n.user_id == user_id && !n.is_read {
                n.is_read = true;
                changed += 1;
            }
        }
        Ok(changed)
    }
}
