//! # rusty-estate
//!
//! Assembles the server from the compiled-in adapters and the runtime settings.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use api_adapters::{AppState, Backend, WebConfig};
use auth_adapters::{Argon2Hasher, MemorySessionStore, SessionCookie};
use configs::{LogFormat, LogSettings, Settings};
use domains::{MediaStore, NotificationHub, PasswordHasher, SessionStore};
use storage_adapters::{InMemoryNotificationHub, LocalMediaStore, MemoryStore};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[cfg(any(feature = "db-postgres", feature = "session-redis"))]
use secrecy::ExposeSecret;
#[cfg(feature = "db-postgres")]
use storage_adapters::PgStore;

#[cfg(feature = "session-redis")]
use auth_adapters::RedisSessionStore;

/// How long open connections (live streams included) get to finish after Ctrl-C.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

fn init_tracing(log: &LogSettings) {
    // RUST_LOG wins over the configured filter.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

fn session_store(settings: &Settings) -> anyhow::Result<Arc<dyn SessionStore>> {
    match &settings.redis {
        #[cfg(feature = "session-redis")]
        Some(redis) => {
            let store = RedisSessionStore::connect(redis.url.expose_secret())
                .context("connecting to redis")?;
            info!("sessions stored in redis");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "session-redis"))]
        Some(_) => {
            warn!("redis is configured but this build lacks session-redis; sessions stay in memory");
            Ok(Arc::new(MemorySessionStore::new()))
        }
        None => Ok(Arc::new(MemorySessionStore::new())),
    }
}

async fn build_backend(
    settings: &Settings,
    sessions: Arc<dyn SessionStore>,
    hasher: Arc<dyn PasswordHasher>,
    media: Arc<dyn MediaStore>,
    hub: Arc<dyn NotificationHub>,
) -> anyhow::Result<Backend> {
    match &settings.database.url {
        #[cfg(feature = "db-postgres")]
        Some(url) => {
            let store = PgStore::connect(url.expose_secret(), settings.database.max_connections)
                .await
                .context("connecting to postgres")?;
            if settings.database.run_migrations {
                store.migrate().await.context("running migrations")?;
                info!("migrations applied");
            }
            Ok(Backend::from_store(Arc::new(store), sessions, hasher, media, hub))
        }
        _ => {
            warn!("no database configured; data lives in memory and is lost on exit");
            Ok(Backend::from_store(Arc::new(MemoryStore::new()), sessions, hasher, media, hub))
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "could not listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    info!("shutdown requested");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    init_tracing(&settings.log);

    // 1. Adapters
    tokio::fs::create_dir_all(&settings.media.upload_dir)
        .await
        .with_context(|| format!("creating {}", settings.media.upload_dir.display()))?;
    let media = Arc::new(LocalMediaStore::new(
        settings.media.upload_dir.clone(),
        settings.media.url_prefix.clone(),
    ));
    let hub = Arc::new(InMemoryNotificationHub::new(settings.notifications.channel_capacity));
    let sessions = session_store(&settings)?;
    let backend = build_backend(&settings, sessions, Arc::new(Argon2Hasher::new()), media, hub).await?;

    // 2. HTTP state
    let session_ttl = chrono::Duration::hours(settings.session.ttl_hours);
    let cookie = SessionCookie::new(
        settings.session.cookie_name.clone(),
        &settings.session.secret,
        session_ttl,
        settings.session.secure_cookie,
    )?;
    let web = WebConfig {
        static_dir: settings.server.static_dir.clone(),
        upload_dir: settings.media.upload_dir.clone(),
        upload_url_prefix: settings.media.url_prefix.trim_end_matches('/').to_string(),
        max_upload_bytes: settings.media.max_upload_bytes,
        max_images: settings.media.max_images,
        keep_alive: Duration::from_secs(settings.notifications.keep_alive_secs),
        session_ttl,
    };
    let app = api_adapters::router(AppState::new(backend, cookie, web));

    // 3. Serve until Ctrl-C
    let addr = settings.server.addr()?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    info!(%addr, "rusty-estate listening");

    let (stop, stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = stopped.await;
            })
            .await
    });

    shutdown_signal().await;
    let _ = stop.send(());
    match tokio::time::timeout(DRAIN_TIMEOUT, server).await {
        Ok(joined) => joined.context("server task panicked")??,
        Err(_) => warn!("connections still open after {DRAIN_TIMEOUT:?}; exiting anyway"),
    }
    info!("bye");
    Ok(())
}
