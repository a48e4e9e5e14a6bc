//! Type definitions shared across crates
//!
//! - `preferences` - Interface language, display currency and their persisted pair

pub mod preferences;

pub use preferences::{Currency, Language, Preferences};
