//! Display preferences (language and currency)

mod service;

pub use service::{SettingsService, PREFERENCES_KEY};
