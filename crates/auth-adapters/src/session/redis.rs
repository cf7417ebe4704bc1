//! Redis-backed sessions, shared by every server process.
//!
//! `session:{id}` holds the JSON session with a TTL; `user-sessions:{user}`
//! is a set of that user's session ids so they can all be ended at once.

use async_trait::async_trait;
use chrono::{Duration, Utc};
use deadpool_redis::redis::cmd;
use deadpool_redis::{Config, Connection, Pool, Runtime};
use tracing::instrument;
use uuid::Uuid;

use domains::{DomainError, Result, Session, SessionStore, SessionUser, UserId};

pub struct RedisSessionStore {
    pool: Pool,
}

fn session_key(id: Uuid) -> String {
    format!("session:{id}")
}

fn user_key(user_id: UserId) -> String {
    format!("user-sessions:{user_id}")
}

impl RedisSessionStore {
    pub fn connect(url: &str) -> Result<Self> {
        let pool = Config::from_url(url)
            .create_pool(Some(Runtime::Tokio1))
            .map_err(DomainError::persistence)?;
        Ok(Self { pool })
    }

    async fn conn(&self) -> Result<Connection> {
        self.pool.get().await.map_err(DomainError::persistence)
    }

    async fn write(&self, conn: &mut Connection, session: &Session, ttl_secs: i64) -> Result<()> {
        let json = serde_json::to_string(session).map_err(DomainError::persistence)?;
        let _: () = cmd("SET")
            .arg(session_key(session.id))
            .arg(json)
            .arg("EX")
            .arg(ttl_secs.max(1))
            .query_async(conn)
            .await
            .map_err(DomainError::persistence)?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    #[instrument(skip(self, user), fields(user_id = user.id))]
    async fn create(&self, user: SessionUser, ttl: Duration) -> Result<Session> {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4(),
            user,
            created_at: now,
            expires_at: now + ttl,
        };
        let mut conn = self.conn().await?;
        self.write(&mut conn, &session, ttl.num_seconds()).await?;

        let key = user_key(session.user.id);
        let _: () = cmd("SADD")
            .arg(&key)
            .arg(session.id.to_string())
            .query_async(&mut conn)
            .await
            .map_err(DomainError::persistence)?;
        Ok(session)
    }

    async fn get(&self, id: Uuid) -> Result<Option<Session>> {
        let mut conn = self.conn().await?;
        let json: Option<String> = cmd("GET")
            .arg(session_key(id))
            .query_async(&mut conn)
            .await
            .map_err(DomainError::persistence)?;

        let Some(json) = json else { return Ok(None) };
        let session: Session = serde_json::from_str(&json).map_err(DomainError::persistence)?;
        Ok((!session.is_expired(Utc::now())).then_some(session))
    }

    async fn refresh_user(&self, id: Uuid, user: SessionUser) -> Result<()> {
        let Some(mut session) = self.get(id).await? else { return Ok(()) };
        session.user = user;
        let remaining = (session.expires_at - Utc::now()).num_seconds();
        let mut conn = self.conn().await?;
        self.write(&mut conn, &session, remaining).await
    }

    async fn destroy(&self, id: Uuid) -> Result<()> {
        let mut conn = self.conn().await?;
        let _: () = cmd("DEL")
            .arg(session_key(id))
            .query_async(&mut conn)
            .await
            .map_err(DomainError::persistence)?;
        Ok(())
    }

    async fn destroy_for_user(&self, user_id: UserId) -> Result<usize> {
        let mut conn = self.conn().await?;
        let key = user_key(user_id);
        let ids: Vec<String> = cmd("SMEMBERS")
            .arg(&key)
            .query_async(&mut conn)
            .await
            .map_err(DomainError::persistence)?;

        let mut removed = 0;
        for id in &ids {
            let deleted: usize = cmd("DEL")
                .arg(format!("session:{id}"))
                .query_async(&mut conn)
                .await
                .map_err(DomainError::persistence)?;
            removed += deleted;
        }
        let _: () = cmd("DEL")
            .arg(&key)
            .query_async(&mut conn)
            .await
            .map_err(DomainError::persistence)?;
        Ok(removed)
    }
}
