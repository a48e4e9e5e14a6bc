//! Key-value store backends for the session id and display preferences

pub mod file;
#[cfg(feature = "redis-store")]
pub mod redis;

pub use file::FileKeyValueStore;
#[cfg(feature = "redis-store")]
pub use self::redis::RedisKeyValueStore;
