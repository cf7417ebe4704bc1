//! # Dashboards
//!
//! Per-role summary counters and the admin activity feed.

use std::sync::Arc;

use domains::{
    ActivityEntry, BookingRepository, BuyerSummary, MessageRepository, PropertyRepository,
    PropertyStatus, Result, SavedPropertyRepository, SellerSummary, UserId, UserRepository,
};

const ACTIVITY_SOURCE_LIMIT: i64 = 5;
const ACTIVITY_FEED_LIMIT: usize = 10;

pub struct DashboardService {
    users: Arc<dyn UserRepository>,
    properties: Arc<dyn PropertyRepository>,
    bookings: Arc<dyn BookingRepository>,
    messages: Arc<dyn MessageRepository>,
    saved: Arc<dyn SavedPropertyRepository>,
}

impl DashboardService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        properties: Arc<dyn PropertyRepository>,
        bookings: Arc<dyn BookingRepository>,
        messages: Arc<dyn MessageRepository>,
        saved: Arc<dyn SavedPropertyRepository>,
    ) -> Self {
        Self { users, properties, bookings, messages, saved }
    }

    pub async fn seller_summary(&self, seller_id: UserId) -> Result<SellerSummary> {
        Ok(SellerSummary {
            active_listings: self
                .properties
                .count_by_status(PropertyStatus::Approved, Some(seller_id))
                .await?,
            pending_approval: self
                .properties
                .count_by_status(PropertyStatus::Pending, Some(seller_id))
                .await?,
            new_booking_requests: self.bookings.count_pending_for_seller(seller_id).await?,
            unread_messages: self.messages.count_unread(seller_id).await?,
        })
    }

    pub async fn buyer_summary(&self, buyer_id: UserId) -> Result<BuyerSummary> {
        Ok(BuyerSummary {
            upcoming_bookings: self.bookings.count_pending_for_buyer(buyer_id).await?,
            unread_messages: self.messages.count_unread(buyer_id).await?,
            saved_properties: self.saved.count(buyer_id).await?,
        })
    }

    pub async fn total_users(&self) -> Result<i64> {
        self.users.count().await
    }

    /// Newest listings and sign-ups merged into one feed, newest first.
    pub async fn recent_activity(&self) -> Result<Vec<ActivityEntry>> {
        let listings = self.properties.recent(ACTIVITY_SOURCE_LIMIT).await?;
        let users = self.users.recent(ACTIVITY_SOURCE_LIMIT).await?;

        let mut activity: Vec<ActivityEntry> = listings
            .into_iter()
            .map(|p| ActivityEntry {
                message: format!("Listing \"{}\" was {}.", p.title, p.status),
                timestamp: p.created_at,
            })
            .chain(users.into_iter().map(|u| ActivityEntry {
                message: format!("New user registered: \"{}\".", u.username),
                timestamp: u.created_at,
            }))
            .collect();

        activity.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        activity.truncate(ACTIVITY_FEED_LIMIT);
        Ok(activity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use domains::{
        MockBookingRepository, MockMessageRepository, MockPropertyRepository,
        MockSavedPropertyRepository, MockUserRepository, Property, Role, User, UserStatus,
    };

    #[tokio::test]
    async fn test_recent_activity_is_merged_newest_first() {
        let now = Utc::now();
        let mut properties = MockPropertyRepository::new();
        properties.expect_recent().returning(move |_| {
            Ok(vec![Property {
                id: 1,
                seller_id: 3,
                title: "Lake house".into(),
                description: String::new(),
                price: 1.0,
                location: "Rangamati".into(),
                property_type: "house".into(),
                bedrooms: 1,
                bathrooms: 1,
                square_feet: 1,
                status: PropertyStatus::Pending,
                created_at: now - Duration::hours(2),
                images: vec![],
            }])
        });
        let mut users = MockUserRepository::new();
        users.expect_recent().returning(move |_| {
            Ok(vec![User {
                id: 7,
                username: "bea".into(),
                email: "bea@example.com".into(),
                password_hash: String::new(),
                role: Role::Buyer,
                status: UserStatus::Active,
                first_name: None,
                last_name: None,
                phone_number: None,
                created_at: now - Duration::hours(1),
            }])
        });

        let service = DashboardService::new(
            Arc::new(users),
            Arc::new(properties),
            Arc::new(MockBookingRepository::new()),
            Arc::new(MockMessageRepository::new()),
            Arc::new(MockSavedPropertyRepository::new()),
        );
        let activity = service.recent_activity().await.unwrap();

        assert_eq!(activity.len(), 2);
        assert_eq!(activity[0].message, "New user registered: \"bea\".");
        assert_eq!(activity[1].message, "Listing \"Lake house\" was pending.");
    }
}
