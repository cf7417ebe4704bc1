//! # Notification inbox
//!
//! The persisted notifications a seller reads on their dashboard. Live pushes
//! never land here.

use std::sync::Arc;

use domains::{DomainError, NotificationId, NotificationRepository, Result, StoredNotification, UserId};

pub struct InboxService {
    notifications: Arc<dyn NotificationRepository>,
}

impl InboxService {
    pub fn new(notifications: Arc<dyn NotificationRepository>) -> Self {
        Self { notifications }
    }

    pub async fn list(&self, user_id: UserId) -> Result<Vec<StoredNotification>> {
        self.notifications.list_for_user(user_id).await
    }

    pub async fn mark_read(&self, id: NotificationId, user_id: UserId) -> Result<()> {
        if self.notifications.mark_read(id, user_id).await? {
            Ok(())
        } else {
            Err(DomainError::not_found("Notification", id))
        }
    }

    pub async fn mark_all_read(&self, user_id: UserId) -> Result<u64> {
        self.notifications.mark_all_read(user_id).await
    }
}
