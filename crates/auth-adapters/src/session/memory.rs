use async_trait::async_trait;
use chrono::{Duration, Utc};
use dashmap::DashMap;
use tracing::debug;
use uuid::Uuid;

use domains::{Result, Session, SessionStore, SessionUser, UserId};

/// Process-local sessions. Expired entries are dropped lazily on lookup.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: DashMap<Uuid, Session>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, user: SessionUser, ttl: Duration) -> Result<Session> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4(),
            user,
            created_at: now,
            expires_at: now + ttl,
        };
        self.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Session>> {
        let now = Utc::now();
        if self.sessions.remove_if(&id, |_, s| s.is_expired(now)).is_some() {
            debug!(session = %id, "expired session dropped");
            return Ok(None);
        }
        Ok(self.sessions.get(&id).map(|s| s.value().clone()))
    }

    async fn refresh_user(&self, id: Uuid, user: SessionUser) -> Result<()> {
        if let Some(mut session) = self.sessions.get_mut(&id) {
            session.user = user;
        }
        Ok(())
    }

    async fn destroy(&self, id: Uuid) -> Result<()> {
        self.sessions.remove(&id);
        Ok(())
    }

    async fn destroy_for_user(&self, user_id: UserId) -> Result<usize> {
        let before = self.sessions.len();
        self.sessions.retain(|_, s| s.user.id != user_id);
        Ok(before.saturating_sub(self.sessions.len()))
    }
}
