//! Key-value store for small local state such as the session pointer and
//! display preferences.

use async_trait::async_trait;

use crate::errors::DomainResult;

/// Repository trait for durable string key-value pairs
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> DomainResult<Option<String>>;

    async fn set(&self, key: &str, value: &str) -> DomainResult<()>;

    /// Remove a key; removing an absent key is not an error
    async fn remove(&self, key: &str) -> DomainResult<()>;
}
