//! Creates the admin account, or resets its password if it already exists.
//!
//! Admins cannot register through the site, so this is how the first one
//! appears. Reads `ESTATE_ADMIN_EMAIL`, `ESTATE_ADMIN_PASSWORD` and optionally
//! `ESTATE_ADMIN_USERNAME` (default `admin`) next to the usual settings.

use anyhow::{bail, Context};
use auth_adapters::Argon2Hasher;
use configs::Settings;
use domains::{NewUser, PasswordHasher, Role, UserRepository, UserStatus};
use secrecy::ExposeSecret;
use storage_adapters::PgStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

const MIN_PASSWORD_LEN: usize = 8;

fn required(name: &str) -> anyhow::Result<String> {
    std::env::var(name).with_context(|| format!("{name} must be set"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&settings.log.filter))
        .init();

    let email = required("ESTATE_ADMIN_EMAIL")?.trim().to_lowercase();
    let password = required("ESTATE_ADMIN_PASSWORD")?;
    let username = std::env::var("ESTATE_ADMIN_USERNAME").unwrap_or_else(|_| "admin".into());
    if password.chars().count() < MIN_PASSWORD_LEN {
        bail!("ESTATE_ADMIN_PASSWORD must be at least {MIN_PASSWORD_LEN} characters");
    }

    let url = settings
        .database
        .url
        .as_ref()
        .context("database.url must be configured to seed")?;
    let store = PgStore::connect(url.expose_secret(), 1).await?;
    store.migrate().await?;

    let password_hash = Argon2Hasher::new().hash(&password)?;

    match store.find_by_email(&email).await? {
        Some(user) if user.role != Role::Admin => {
            bail!("{email} already belongs to a {} account", user.role);
        }
        Some(user) => {
            store.update_password_hash(user.id, &password_hash).await?;
            store.set_status(user.id, UserStatus::Active).await?;
            info!(user_id = user.id, %email, "admin password reset");
        }
        None => {
            let user = store
                .create(NewUser { username, email: email.clone(), password_hash, role: Role::Admin })
                .await?;
            info!(user_id = user.id, %email, "admin created");
        }
    }
    Ok(())
}
