//! # auth-adapters
//!
//! Credential hashing, session storage and the signed session cookie.

pub mod cookie;
pub mod password;
pub mod session;

pub use cookie::{CookieError, SessionCookie};
pub use password::Argon2Hasher;
pub use session::MemorySessionStore;

#[cfg(feature = "session-redis")]
pub use session::RedisSessionStore;
