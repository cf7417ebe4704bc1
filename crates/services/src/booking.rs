//! # Booking workflow
//!
//! A buyer's viewing request touches three collaborators in a fixed order:
//! the listing owner is resolved, the booking and its companion message are
//! written together, and only then is the seller's live channel poked.
//! The push is best-effort; the two rows are the durable record.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use domains::{
    booking_timestamp, Booking, BookingId, BookingRepository, BookingRequest, BookingStatus,
    BookingWindow, BuyerBooking, DomainError, LiveEvent, NewBooking, NewMessage,
    NotificationHub, PropertyId, PropertyRepository, Result, UserId,
};

/// Body of `POST /api/bookings`.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingCommand {
    pub property_id: PropertyId,
    pub preferred_date: String,
    pub preferred_time: String,
    #[serde(default)]
    pub message: String,
}

/// What a successful booking produced.
#[derive(Debug, Clone, PartialEq)]
pub struct CreatedBooking {
    pub booking: Booking,
    pub seller_id: UserId,
    /// Number of the seller's open channels that accepted the live event.
    pub live_deliveries: usize,
}

pub struct BookingService {
    properties: Arc<dyn PropertyRepository>,
    bookings: Arc<dyn BookingRepository>,
    hub: Arc<dyn NotificationHub>,
}

impl BookingService {
    pub fn new(
        properties: Arc<dyn PropertyRepository>,
        bookings: Arc<dyn BookingRepository>,
        hub: Arc<dyn NotificationHub>,
    ) -> Self {
        Self { properties, bookings, hub }
    }

    /// Creates a `pending` booking, messages the seller, and pushes a live event.
    ///
    /// Time conflicts with other bookings are not checked, nor is the date
    /// required to be in the future; the seller resolves overlaps by hand.
    #[instrument(skip(self, command), fields(property_id = command.property_id))]
    pub async fn create_booking(&self, buyer_id: UserId, command: BookingCommand) -> Result<CreatedBooking> {
        let seller_id = self
            .properties
            .owner_of(command.property_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Property", command.property_id))?;

        let booking_date = booking_timestamp(&command.preferred_date, &command.preferred_time)?;

        let booking = NewBooking {
            property_id: command.property_id,
            buyer_id,
            booking_date,
            message: command.message.clone(),
        };
        let companion = NewMessage {
            sender_id: buyer_id,
            receiver_id: seller_id,
            property_id: Some(command.property_id),
            message: format!(
                "New booking request for your property (ID: {}): {}",
                command.property_id, command.message
            ),
        };

        let booking = self.bookings.create_with_message(booking, companion).await?;

        let event = LiveEvent::NewBookingRequest {
            property_id: booking.property_id,
            buyer_id,
            message: booking.message.clone(),
            booking_date: booking.booking_date,
        };
        let live_deliveries = self.hub.publish(seller_id, &event);
        debug!(seller_id, live_deliveries, "booking event published");

        info!(booking_id = booking.id, seller_id, "booking request created");
        Ok(CreatedBooking { booking, seller_id, live_deliveries })
    }

    /// Approves or declines a booking on behalf of the listing owner.
    ///
    /// A booking that does not exist and one on somebody else's listing are
    /// indistinguishable to the caller: both are `NotFound`.
    #[instrument(skip(self))]
    pub async fn update_booking_status(
        &self,
        booking_id: BookingId,
        seller_id: UserId,
        decision: BookingStatus,
    ) -> Result<Booking> {
        if decision == BookingStatus::Pending {
            return Err(DomainError::validation("a booking can only be approved or declined"));
        }

        let mut booking = self
            .bookings
            .find_owned(booking_id, seller_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Booking request", booking_id))?;

        if booking.status != BookingStatus::Pending {
            return Err(DomainError::Conflict(format!(
                "booking {booking_id} is already {}",
                booking.status
            )));
        }

        if !self
            .bookings
            .transition(booking_id, BookingStatus::Pending, decision)
            .await?
        {
            return Err(DomainError::Conflict(format!(
                "booking {booking_id} was resolved concurrently"
            )));
        }

        info!(booking_id, status = %decision, "booking request resolved");
        booking.status = decision;
        Ok(booking)
    }

    pub async fn requests_for_seller(&self, seller_id: UserId) -> Result<Vec<BookingRequest>> {
        self.bookings.list_for_seller(seller_id).await
    }

    pub async fn upcoming_for_buyer(&self, buyer_id: UserId) -> Result<Vec<BuyerBooking>> {
        self.bookings
            .list_for_buyer(buyer_id, BookingWindow::Upcoming, Utc::now())
            .await
    }

    pub async fn past_for_buyer(&self, buyer_id: UserId) -> Result<Vec<BuyerBooking>> {
        self.bookings
            .list_for_buyer(buyer_id, BookingWindow::Past, Utc::now())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use domains::{MockBookingRepository, MockNotificationHub, MockPropertyRepository};
    use mockall::predicate::*;

    fn command(property_id: PropertyId) -> BookingCommand {
        BookingCommand {
            property_id,
            preferred_date: "2025-01-10".into(),
            preferred_time: "10:00".into(),
            message: "Can I visit?".into(),
        }
    }

    fn stored_booking(id: BookingId, status: BookingStatus) -> Booking {
        Booking {
            id,
            property_id: 42,
            buyer_id: 7,
            booking_date: Utc.with_ymd_and_hms(2025, 1, 10, 10, 0, 0).unwrap(),
            message: "Can I visit?".into(),
            status,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_create_booking_writes_booking_and_message_then_publishes() {
        let mut properties = MockPropertyRepository::new();
        properties
            .expect_owner_of()
            .with(eq(42))
            .times(1)
            .returning(|_| Ok(Some(3)));

        let mut bookings = MockBookingRepository::new();
        bookings
            .expect_create_with_message()
            .withf(|booking, message| {
                booking.property_id == 42
                    && booking.buyer_id == 7
                    && message.sender_id == 7
                    && message.receiver_id == 3
                    && message.property_id == Some(42)
                    && message.message
                        == "New booking request for your property (ID: 42): Can I visit?"
            })
            .times(1)
            .returning(|_, _| Ok(stored_booking(1, BookingStatus::Pending)));

        let mut hub = MockNotificationHub::new();
        hub.expect_publish()
            .withf(|user_id, event| {
                *user_id == 3
                    && matches!(
                        event,
                        LiveEvent::NewBookingRequest { property_id: 42, buyer_id: 7, .. }
                    )
            })
            .times(1)
            .returning(|_, _| 1);

        let service = BookingService::new(Arc::new(properties), Arc::new(bookings), Arc::new(hub));
        let created = service.create_booking(7, command(42)).await.unwrap();

        assert_eq!(created.seller_id, 3);
        assert_eq!(created.live_deliveries, 1);
        assert_eq!(created.booking.status, BookingStatus::Pending);
    }

    #[tokio::test]
    async fn test_create_booking_for_missing_property_writes_nothing() {
        let mut properties = MockPropertyRepository::new();
        properties.expect_owner_of().returning(|_| Ok(None));

        let mut bookings = MockBookingRepository::new();
        bookings.expect_create_with_message().never();
        let mut hub = MockNotificationHub::new();
        hub.expect_publish().never();

        let service = BookingService::new(Arc::new(properties), Arc::new(bookings), Arc::new(hub));
        let err = service.create_booking(7, command(999)).await.unwrap_err();

        assert_eq!(err, DomainError::not_found("Property", 999));
    }

    #[tokio::test]
    async fn test_persistence_failure_surfaces_and_skips_push() {
        let mut properties = MockPropertyRepository::new();
        properties.expect_owner_of().returning(|_| Ok(Some(3)));

        let mut bookings = MockBookingRepository::new();
        bookings
            .expect_create_with_message()
            .returning(|_, _| Err(DomainError::persistence("insert into messages failed")));
        let mut hub = MockNotificationHub::new();
        hub.expect_publish().never();

        let service = BookingService::new(Arc::new(properties), Arc::new(bookings), Arc::new(hub));
        let err = service.create_booking(7, command(42)).await.unwrap_err();

        assert!(matches!(err, DomainError::Persistence(_)));
    }

    #[tokio::test]
    async fn test_booking_without_listeners_still_succeeds() {
        let mut properties = MockPropertyRepository::new();
        properties.expect_owner_of().returning(|_| Ok(Some(3)));
        let mut bookings = MockBookingRepository::new();
        bookings
            .expect_create_with_message()
            .returning(|_, _| Ok(stored_booking(1, BookingStatus::Pending)));
        let mut hub = MockNotificationHub::new();
        hub.expect_publish().returning(|_, _| 0);

        let service = BookingService::new(Arc::new(properties), Arc::new(bookings), Arc::new(hub));
        let created = service.create_booking(7, command(42)).await.unwrap();

        assert_eq!(created.live_deliveries, 0);
    }

    #[tokio::test]
    async fn test_invalid_date_is_a_validation_error() {
        let mut properties = MockPropertyRepository::new();
        properties.expect_owner_of().returning(|_| Ok(Some(3)));
        let mut bookings = MockBookingRepository::new();
        bookings.expect_create_with_message().never();

        let service = BookingService::new(
            Arc::new(properties),
            Arc::new(bookings),
            Arc::new(MockNotificationHub::new()),
        );
        let mut bad = command(42);
        bad.preferred_date = "tomorrow".into();

        assert!(matches!(
            service.create_booking(7, bad).await,
            Err(DomainError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_non_owner_cannot_resolve_booking() {
        let mut bookings = MockBookingRepository::new();
        bookings
            .expect_find_owned()
            .with(eq(10), eq(3))
            .returning(|_, _| Ok(None));
        bookings.expect_transition().never();

        let service = BookingService::new(
            Arc::new(MockPropertyRepository::new()),
            Arc::new(bookings),
            Arc::new(MockNotificationHub::new()),
        );
        let err = service
            .update_booking_status(10, 3, BookingStatus::Approved)
            .await
            .unwrap_err();

        assert_eq!(err, DomainError::not_found("Booking request", 10));
    }

    #[tokio::test]
    async fn test_owner_approves_pending_booking() {
        let mut bookings = MockBookingRepository::new();
        bookings
            .expect_find_owned()
            .returning(|id, _| Ok(Some(stored_booking(id, BookingStatus::Pending))));
        bookings
            .expect_transition()
            .with(eq(10), eq(BookingStatus::Pending), eq(BookingStatus::Approved))
            .times(1)
            .returning(|_, _, _| Ok(true));

        let service = BookingService::new(
            Arc::new(MockPropertyRepository::new()),
            Arc::new(bookings),
            Arc::new(MockNotificationHub::new()),
        );
        let booking = service
            .update_booking_status(10, 3, BookingStatus::Approved)
            .await
            .unwrap();

        assert_eq!(booking.status, BookingStatus::Approved);
    }

    #[tokio::test]
    async fn test_resolved_booking_is_terminal() {
        let mut bookings = MockBookingRepository::new();
        bookings
            .expect_find_owned()
            .returning(|id, _| Ok(Some(stored_booking(id, BookingStatus::Declined))));
        bookings.expect_transition().never();

        let service = BookingService::new(
            Arc::new(MockPropertyRepository::new()),
            Arc::new(bookings),
            Arc::new(MockNotificationHub::new()),
        );

        assert!(matches!(
            service.update_booking_status(10, 3, BookingStatus::Approved).await,
            Err(DomainError::Conflict(_))
        ));
    }

    #[test]
    fn test_pending_is_not_a_decision() {
        let service = BookingService::new(
            Arc::new(MockPropertyRepository::new()),
            Arc::new(MockBookingRepository::new()),
            Arc::new(MockNotificationHub::new()),
        );
        let result = tokio_test::block_on(service.update_booking_status(
            10,
            3,
            BookingStatus::Pending,
        ));
        assert!(matches!(result, Err(DomainError::Validation(_))));
    }
}
