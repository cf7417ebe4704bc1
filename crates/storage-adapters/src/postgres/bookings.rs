use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;

use domains::{
    Booking, BookingId, BookingRepository, BookingRequest, BookingStatus, BookingWindow,
    BuyerBooking, NewBooking, NewMessage, Result, UserId,
};

use super::{booking_insert_err, col, db_err, PgStore};

const BOOKING_COLUMNS: &str = "b.id, b.property_id, b.buyer_id, b.booking_date, b.message, b.status, b.created_at";

fn booking_from_row(row: &PgRow) -> Result<Booking> {
    Ok(Booking {
        id: col(row, "id")?,
        property_id: col(row, "property_id")?,
        buyer_id: col(row, "buyer_id")?,
        booking_date: col(row, "booking_date")?,
        message: col(row, "message")?,
        status: col::<String>(row, "status")?.parse()?,
        created_at: col(row, "created_at")?,
    })
}

#[async_trait]
impl BookingRepository for PgStore {
    /// The booking and its companion message commit together or not at all.
    async fn create_with_message(&self, booking: NewBooking, message: NewMessage) -> Result<Booking> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        // 1. Insert Booking
        let row = sqlx::query(&format!(
            "INSERT INTO bookings AS b (property_id, buyer_id, booking_date, message, status) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {BOOKING_COLUMNS}"
        ))
        .bind(booking.property_id)
        .bind(booking.buyer_id)
        .bind(booking.booking_date)
        .bind(&booking.message)
        .bind(BookingStatus::Pending.as_str())
        .fetch_one(&mut *tx)
        .await
        .map_err(booking_insert_err(booking.property_id))?;
        let created = booking_from_row(&row)?;

        // 2. Insert companion message
        sqlx::query(
            "INSERT INTO messages (sender_id, receiver_id, property_id, message) VALUES ($1, $2, $3, $4)",
        )
        .bind(message.sender_id)
        .bind(message.receiver_id)
        .bind(message.property_id)
        .bind(&message.message)
        .execute(&mut *tx)
        .await
        .map_err(db_err)?;

        tx.commit().await.map_err(db_err)?;
        Ok(created)
    }

    async fn find_owned(&self, id: BookingId, seller_id: UserId) -> Result<Option<Booking>> {
        sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings b \
             JOIN properties p ON p.id = b.property_id \
             WHERE b.id = $1 AND p.seller_id = $2"
        ))
        .bind(id)
        .bind(seller_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?
        .as_ref()
        .map(booking_from_row)
        .transpose()
    }

    async fn transition(&self, id: BookingId, from: BookingStatus, to: BookingStatus) -> Result<bool> {
        let result = sqlx::query("UPDATE bookings SET status = $3 WHERE id = $1 AND status = $2")
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn list_for_seller(&self, seller_id: UserId) -> Result<Vec<BookingRequest>> {
        sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS}, p.title AS property_title, p.location, \
             u.username AS buyer_username, u.email AS buyer_email \
             FROM bookings b \
             JOIN properties p ON p.id = b.property_id \
             JOIN users u ON u.id = b.buyer_id \
             WHERE p.seller_id = $1 \
             ORDER BY b.created_at DESC, b.id DESC"
        ))
        .bind(seller_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?
        .iter()
        .map(|row| {
            Ok(BookingRequest {
                booking: booking_from_row(row)?,
                property_title: col(row, "property_title")?,
                location: col(row, "location")?,
                buyer_username: col(row, "buyer_username")?,
                buyer_email: col(row, "buyer_email")?,
            })
        })
        .collect()
    }

    async fn list_for_buyer(
        &self,
        buyer_id: UserId,
        window: BookingWindow,
        now: DateTime<Utc>,
    ) -> Result<Vec<BuyerBooking>> {
        let (condition, order) = match window {
            BookingWindow::Upcoming => ("b.booking_date >= $2", "ASC"),
            BookingWindow::Past => ("b.booking_date < $2", "DESC"),
        };
        sqlx::query(&format!(
            "SELECT {BOOKING_COLUMNS}, p.title AS property_title, p.location, s.email AS seller_email \
             FROM bookings b \
             JOIN properties p ON p.id = b.property_id \
             JOIN users s ON s.id = p.seller_id \
             WHERE b.buyer_id = $1 AND {condition} \
             ORDER BY b.booking_date {order}, b.id {order}"
        ))
        .bind(buyer_id)
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?
        .iter()
        .map(|row| {
            Ok(BuyerBooking {
                booking: booking_from_row(row)?,
                property_title: col(row, "property_title")?,
                location: col(row, "location")?,
                seller_email: col(row, "seller_email")?,
            })
        })
        .collect()
    }

    async fn count_pending_for_seller(&self, seller_id: UserId) -> Result<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM bookings b JOIN properties p ON p.id = b.property_id \
             WHERE p.seller_id = $1 AND b.status = $2",
        )
        .bind(seller_id)
        .bind(BookingStatus::Pending.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)
    }

    async fn count_pending_for_buyer(&self, buyer_id: UserId) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM bookings WHERE buyer_id = $1 AND status = $2")
            .bind(buyer_id)
            .bind(BookingStatus::Pending.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }
}
