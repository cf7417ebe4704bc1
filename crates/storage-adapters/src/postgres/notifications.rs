use async_trait::async_trait;
use sqlx::postgres::PgRow;

use domains::{NotificationId, NotificationRepository, Result, StoredNotification, UserId};

use super::{col, db_err, PgStore};

const NOTIFICATION_COLUMNS: &str = "id, user_id, type, message, is_read, created_at";

fn notification_from_row(row: &PgRow) -> Result<StoredNotification> {
    Ok(StoredNotification {
        id: col(row, "id")?,
        user_id: col(row, "user_id")?,
        kind: col(row, "type")?,
        message: col(row, "message")?,
        is_read: col(row, "is_read")?,
        created_at: col(row, "created_at")?,
    })
}

#[async_trait]
impl NotificationRepository for PgStore {
    async fn create(&self, user_id: UserId, kind: &str, message: &str) -> Result<StoredNotification> {
        let row = sqlx::query(&format!(
            "INSERT INTO notifications (user_id, type, message) VALUES ($1, $2, $3) \
             RETURNING {NOTIFICATION_COLUMNS}"
        ))
        .bind(user_id)
        .bind(kind)
        .bind(message)
        .fetch_one(&self.pool)
        .await
        .map_err(db_err)?;
        notification_from_row(&row)
    }

    async fn list_for_user(&self, user_id: UserId) -> Result<Vec<StoredNotification>> {
        sqlx::query(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE user_id = $1 \
             ORDER BY created_at DESC, id DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(db_err)?
        .iter()
        .map(notification_from_row)
        .collect()
    }

    async fn mark_read(&self, id: NotificationId, user_id: UserId) -> Result<bool> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn mark_all_read(&self, user_id: UserId) -> Result<u64> {
        let result = sqlx::query("UPDATE notifications SET is_read = TRUE WHERE user_id = $1 AND NOT is_read")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected())
    }
}
