use async_trait::async_trait;
use sqlx::postgres::PgRow;

use domains::{Message, MessageRepository, MessageView, NewMessage, Result, UserId};

use super::{col, db_err, PgStore};

const MESSAGE_COLUMNS: &str = "m.id, m.sender_id, m.receiver_id, m.property_id, m.message, m.is_read, m.created_at";

fn message_from_row(row: &PgRow) -> Result<Message> {
    Ok(Message {
        id: col(row, "id")?,
        sender_id: col(row, "sender_id")?,
        receiver_id: col(row, "receiver_id")?,
        property_id: col(row, "property_id")?,
        message: col(row, "message")?,
        is_read: col(row, "is_read")?,
        created_at: col(row, "created_at")?,
    })
}

#[async_trait]
impl MessageRepository for PgStore {
    async fn create(&self, message: NewMessage) -> Result<Message> {
        let row = sqlx::query(&format!(
            "INSERT INTO messages AS m (sender_id, receiver_id, property_id, message) \
             VALUES ($1, $2, $3, $4) RETURNING {MESSAGE_COLUMNS}"
        ))
        .bind(message.sender_id)
        .bind(message.receiver_id)
        .bind(message.property_id)
        .bind(&message.message)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        message_from_row(&row)
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<MessageView>> {
        sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS}, s.username AS sender_username, r.username AS receiver_username, \
             p.title AS property_title \
             FROM messages m \
             JOIN users s ON s.id = m.sender_id \
             JOIN users r ON r.id = m.receiver_id \
             LEFT JOIN properties p ON p.id = m.property_id \
             WHERE m.sender_id = $1 OR m.receiver_id = $1 \
             ORDER BY m.created_at DESC, m.id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?
        .iter()
        .map(|row| {
            Ok(MessageView {
                message: message_from_row(row)?,
                sender_username: col(row, "sender_username")?,
                receiver_username: col(row, "receiver_username")?,
                property_title: col(row, "property_title")?,
            })
        })
        .collect()
    }

    async fn count_unread(&self, receiver_id: UserId) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE receiver_id = $1 AND NOT is_read")
            .bind(receiver_id)
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)
    }
}
