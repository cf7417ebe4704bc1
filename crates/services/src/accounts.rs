//! # Accounts
//!
//! Registration, login/logout, profile edits, and admin moderation of users.

use std::str::FromStr;
use std::sync::Arc;

use chrono::Duration;
use serde::Deserialize;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use domains::{
    DomainError, NewUser, PasswordHasher, ProfileUpdate, Result, Role, Session, SessionStore,
    SessionUser, User, UserId, UserProfile, UserRepository, UserStatus,
};

const MIN_PASSWORD_LEN: usize = 8;

/// Form body of `POST /register`.
#[derive(Debug, Clone, Deserialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
    pub user_type: String,
}

/// Body of the change-password endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

pub struct AccountService {
    users: Arc<dyn UserRepository>,
    sessions: Arc<dyn SessionStore>,
    hasher: Arc<dyn PasswordHasher>,
    session_ttl: Duration,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        sessions: Arc<dyn SessionStore>,
        hasher: Arc<dyn PasswordHasher>,
        session_ttl: Duration,
    ) -> Self {
        Self { users, sessions, hasher, session_ttl }
    }

    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn register(&self, form: Registration) -> Result<User> {
        let username = form.username.trim().to_string();
        let email = normalize_email(&form.email)?;
        if username.is_empty() {
            return Err(DomainError::validation("username must not be empty"));
        }
        validate_password(&form.password)?;

        let role = Role::from_str(form.user_type.trim())?;
        if role == Role::Admin {
            return Err(DomainError::validation("admin accounts cannot be self-registered"));
        }

        if self.users.find_by_email(&email).await?.is_some() {
            return Err(DomainError::Conflict(format!("email {email} is already registered")));
        }

        let password_hash = self.hasher.hash(&form.password)?;
        let user = self
            .users
            .create(NewUser { username, email, password_hash, role })
            .await?;

        info!(user_id = user.id, role = %user.role, "user registered");
        Ok(user)
    }

    /// Verifies credentials and opens a session.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let email = email.trim().to_lowercase();
        let Some(user) = self.users.find_by_email(&email).await? else {
            info!("login for unknown email");
            return Err(DomainError::Unauthorized("User not found".into()));
        };

        if !self.hasher.verify(password, &user.password_hash) {
            info!(user_id = user.id, "incorrect password");
            return Err(DomainError::Unauthorized("Incorrect password".into()));
        }

        if user.is_blocked() {
            warn!(user_id = user.id, "blocked user attempted to log in");
            return Err(DomainError::Forbidden("Your account has been blocked.".into()));
        }

        let session = self
            .sessions
            .create(SessionUser::from(&user), self.session_ttl)
            .await?;
        info!(user_id = user.id, role = %user.role, "user logged in");
        Ok(session)
    }

    pub async fn logout(&self, session_id: Uuid) -> Result<()> {
        self.sessions.destroy(session_id).await
    }

    pub async fn session(&self, session_id: Uuid) -> Result<Option<Session>> {
        self.sessions.get(session_id).await
    }

    pub async fn profile(&self, user_id: UserId) -> Result<UserProfile> {
        self.users
            .find_by_id(user_id)
            .await?
            .map(|user| UserProfile::from(&user))
            .ok_or_else(|| DomainError::not_found("User", user_id))
    }

    /// Applies a profile edit and refreshes the identity cached in the session.
    #[instrument(skip(self, update))]
    pub async fn update_profile(
        &self,
        session_id: Uuid,
        user_id: UserId,
        mut update: ProfileUpdate,
    ) -> Result<UserProfile> {
        update.username = update.username.trim().to_string();
        if update.username.is_empty() {
            return Err(DomainError::validation("username must not be empty"));
        }
        update.email = normalize_email(&update.email)?;

        if let Some(other) = self.users.find_by_email(&update.email).await? {
            if other.id != user_id {
                return Err(DomainError::Conflict(format!(
                    "email {} is already registered",
                    update.email
                )));
            }
        }

        let user = self
            .users
            .update_profile(user_id, update)
            .await?
            .ok_or_else(|| DomainError::not_found("User", user_id))?;

        self.sessions
            .refresh_user(session_id, SessionUser::from(&user))
            .await?;
        Ok(UserProfile::from(&user))
    }

    #[instrument(skip(self, change))]
    pub async fn change_password(&self, user_id: UserId, change: PasswordChange) -> Result<()> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", user_id))?;

        if !self.hasher.verify(&change.current_password, &user.password_hash) {
            return Err(DomainError::validation("Incorrect current password"));
        }
        validate_password(&change.new_password)?;

        let hash = self.hasher.hash(&change.new_password)?;
        self.users.update_password_hash(user_id, &hash).await?;
        info!(user_id, "password changed");
        Ok(())
    }

    pub async fn list_users(&self) -> Result<Vec<User>> {
        self.users.list().await
    }

    #[instrument(skip(self))]
    pub async fn delete_user(&self, user_id: UserId) -> Result<()> {
        if !self.users.delete(user_id).await? {
            return Err(DomainError::not_found("User", user_id));
        }
        self.sessions.destroy_for_user(user_id).await?;
        info!(user_id, "user deleted");
        Ok(())
    }

    /// Blocks an account and ends its live sessions.
    #[instrument(skip(self))]
    pub async fn block_user(&self, user_id: UserId) -> Result<()> {
        if !self.users.set_status(user_id, UserStatus::Blocked).await? {
            return Err(DomainError::not_found("User", user_id));
        }
        let ended = self.sessions.destroy_for_user(user_id).await?;
        info!(user_id, sessions_ended = ended, "user blocked");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn unblock_user(&self, user_id: UserId) -> Result<()> {
        if !self.users.set_status(user_id, UserStatus::Active).await? {
            return Err(DomainError::not_found("User", user_id));
        }
        info!(user_id, "user unblocked");
        Ok(())
    }
}

fn normalize_email(raw: &str) -> Result<String> {
    let email = raw.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(DomainError::validation(format!("invalid email '{raw}'"))),
    }
}

fn validate_password(password: &str) -> Result<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::validation(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use domains::{MockPasswordHasher, MockSessionStore, MockUserRepository};

    fn user(status: UserStatus) -> User {
        User {
            id: 7,
            username: "bea".into(),
            email: "bea@example.com".into(),
            password_hash: "hash".into(),
            role: Role::Buyer,
            status,
            first_name: None,
            last_name: None,
            phone_number: None,
            created_at: Utc::now(),
        }
    }

    fn service(
        users: MockUserRepository,
        sessions: MockSessionStore,
        hasher: MockPasswordHasher,
    ) -> AccountService {
        AccountService::new(
            Arc::new(users),
            Arc::new(sessions),
            Arc::new(hasher),
            Duration::hours(24),
        )
    }

    #[tokio::test]
    async fn test_blocked_user_cannot_log_in() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(|_| Ok(Some(user(UserStatus::Blocked))));
        let mut hasher = MockPasswordHasher::new();
        hasher.expect_verify().returning(|_, _| true);
        let mut sessions = MockSessionStore::new();
        sessions.expect_create().never();

        let err = service(users, sessions, hasher)
            .login("bea@example.com", "correct horse")
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_wrong_password_is_unauthorized() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(|_| Ok(Some(user(UserStatus::Active))));
        let mut hasher = MockPasswordHasher::new();
        hasher.expect_verify().returning(|_, _| false);

        let err = service(users, MockSessionStore::new(), hasher)
            .login("bea@example.com", "nope")
            .await
            .unwrap_err();

        assert_eq!(err, DomainError::Unauthorized("Incorrect password".into()));
    }

    #[tokio::test]
    async fn test_admin_cannot_self_register() {
        let err = service(
            MockUserRepository::new(),
            MockSessionStore::new(),
            MockPasswordHasher::new(),
        )
        .register(Registration {
            username: "root".into(),
            email: "root@example.com".into(),
            password: "long enough".into(),
            user_type: "admin".into(),
        })
        .await
        .unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn test_duplicate_email_conflicts() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(|_| Ok(Some(user(UserStatus::Active))));
        users.expect_create().never();

        let err = service(users, MockSessionStore::new(), MockPasswordHasher::new())
            .register(Registration {
                username: "bea2".into(),
                email: "Bea@Example.com".into(),
                password: "long enough".into(),
                user_type: "buyer".into(),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_block_user_ends_sessions() {
        let mut users = MockUserRepository::new();
        users
            .expect_set_status()
            .withf(|id, status| *id == 7 && *status == UserStatus::Blocked)
            .returning(|_, _| Ok(true));
        let mut sessions = MockSessionStore::new();
        sessions
            .expect_destroy_for_user()
            .withf(|id| *id == 7)
            .times(1)
            .returning(|_| Ok(2));

        service(users, sessions, MockPasswordHasher::new())
            .block_user(7)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_change_password_requires_current_password() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .returning(|_| Ok(Some(user(UserStatus::Active))));
        users.expect_update_password_hash().never();
        let mut hasher = MockPasswordHasher::new();
        hasher.expect_verify().returning(|_, _| false);

        let err = service(users, MockSessionStore::new(), hasher)
            .change_password(
                7,
                PasswordChange {
                    current_password: "wrong".into(),
                    new_password: "brand new password".into(),
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err, DomainError::validation("Incorrect current password"));
    }

    #[test]
    fn test_email_normalization() {
        assert_eq!(normalize_email("  Sam@Example.COM ").unwrap(), "sam@example.com");
        assert!(normalize_email("not-an-email").is_err());
        assert!(normalize_email("@example.com").is_err());
    }
}
