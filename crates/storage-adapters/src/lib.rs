//! # storage-adapters
//!
//! Persistence and media adapters behind the `domains` ports.
//!
//! - [`memory::MemoryStore`]: every repository over one in-process table set.
//!   Used by tests and by the binary when no database URL is configured.
//! - [`postgres::PgStore`]: the production backend (feature `db-postgres`).
//! - [`media::LocalMediaStore`]: listing images on the local filesystem.
//! - [`notify::InMemoryNotificationHub`]: live push channels.

pub mod media;
pub mod memory;
pub mod notify;

#[cfg(feature = "db-postgres")]
pub mod postgres;

pub use media::LocalMediaStore;
pub use memory::MemoryStore;
pub use notify::InMemoryNotificationHub;

#[cfg(feature = "db-postgres")]
pub use postgres::PgStore;
