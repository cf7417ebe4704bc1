//! Session stores.

mod memory;
#[cfg(feature = "session-redis")]
mod redis;

pub use memory::MemorySessionStore;
#[cfg(feature = "session-redis")]
pub use self::redis::RedisSessionStore;
