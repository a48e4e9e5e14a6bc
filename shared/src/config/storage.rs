//! Storage backend selection

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where a class of data is kept
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process memory, lost on restart
    Memory,
    /// A JSON file on local disk
    File,
    /// MySQL document table
    Mysql,
    /// Redis keys
    Redis,
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Backend holding the users/properties/bookings/inquiries collections
    pub documents: StorageBackend,

    /// Backend holding the session id and display preferences
    pub preferences: StorageBackend,

    /// Path of the preference file when `preferences = "file"`
    pub preferences_path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            documents: StorageBackend::Memory,
            preferences: StorageBackend::File,
            preferences_path: PathBuf::from("data/preferences.json"),
        }
    }
}

impl StorageConfig {
    /// Everything in memory
    pub fn memory() -> Self {
        Self {
            documents: StorageBackend::Memory,
            preferences: StorageBackend::Memory,
            ..Default::default()
        }
    }
}
