use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use nest_shared::types::{Currency, Language, Preferences};

use crate::errors::{DomainError, DomainResult};
use crate::repositories::kv::KeyValueStore;

/// Key the preferences are persisted under
pub const PREFERENCES_KEY: &str = "staynest:preferences";

/// Process-wide language and currency preference
///
/// Read once from the key-value store at load; every change is written back
/// and published to subscribers.
pub struct SettingsService {
    kv: Arc<dyn KeyValueStore>,
    preferences: watch::Sender<Preferences>,
}

impl SettingsService {
    /// Load persisted preferences, falling back to defaults when absent or
    /// unreadable
    pub async fn load(kv: Arc<dyn KeyValueStore>) -> DomainResult<Self> {
        let preferences = match kv.get(PREFERENCES_KEY).await? {
            Some(raw) => match serde_json::from_str::<Preferences>(&raw) {
                Ok(preferences) => preferences,
                Err(err) => {
                    warn!(error = %err, "Ignoring unreadable preferences");
                    Preferences::default()
                }
            },
            None => Preferences::default(),
        };
        debug!(
            language = preferences.language.code(),
            currency = preferences.currency.code(),
            "Preferences loaded"
        );

        let (preferences, _) = watch::channel(preferences);
        Ok(Self { kv, preferences })
    }

    pub fn preferences(&self) -> Preferences {
        *self.preferences.borrow()
    }

    pub fn language(&self) -> Language {
        self.preferences.borrow().language
    }

    pub fn currency(&self) -> Currency {
        self.preferences.borrow().currency
    }

    pub fn subscribe(&self) -> watch::Receiver<Preferences> {
        self.preferences.subscribe()
    }

    pub async fn set_language(&self, language: Language) -> DomainResult<()> {
        let next = Preferences {
            language,
            ..self.preferences()
        };
        self.save(next).await
    }

    pub async fn set_currency(&self, currency: Currency) -> DomainResult<()> {
        let next = Preferences {
            currency,
            ..self.preferences()
        };
        self.save(next).await
    }

    /// Render a USD amount in the selected currency
    pub fn format_price(&self, amount_usd: f64) -> DomainResult<String> {
        self.currency()
            .format(amount_usd)
            .ok_or_else(|| DomainError::Validation {
                message: format!("cannot format amount {}", amount_usd),
            })
    }

    async fn save(&self, preferences: Preferences) -> DomainResult<()> {
        let raw = serde_json::to_string(&preferences)?;
        self.kv.set(PREFERENCES_KEY, &raw).await?;
        self.preferences.send_replace(preferences);
        info!(
            language = preferences.language.code(),
            currency = preferences.currency.code(),
            "Preferences saved"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repositories::kv::InMemoryKeyValueStore;

    #[tokio::test]
    async fn test_defaults_when_nothing_is_stored() {
        let settings = SettingsService::load(Arc::new(InMemoryKeyValueStore::new()))
            .await
            .unwrap();
        assert_eq!(settings.preferences(), Preferences::default());
        assert_eq!(settings.format_price(1100.0).unwrap(), "$1,100.00");
        assert!(matches!(
            settings.format_price(f64::NAN),
            Err(DomainError::Validation { .. })
        ));
    }

    #[tokio::test]
    async fn test_changes_are_persisted_and_published() {
        let kv = Arc::new(InMemoryKeyValueStore::new());
        let settings = SettingsService::load(kv.clone()).await.unwrap();
        let mut rx = settings.subscribe();

        settings.set_currency(Currency::Eur).await.unwrap();
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().currency, Currency::Eur);
        settings.set_language(Language::French).await.unwrap();

        let reloaded = SettingsService::load(kv).await.unwrap();
        assert_eq!(reloaded.language(), Language::French);
        assert_eq!(reloaded.currency(), Currency::Eur);
        assert_eq!(reloaded.format_price(1000.0).unwrap(), "€920.00");
    }

    #[tokio::test]
    async fn test_corrupt_preferences_fall_back_to_defaults() {
        let kv = Arc::new(InMemoryKeyValueStore::with_entries([(PREFERENCES_KEY, "{not json")]));
        let settings = SettingsService::load(kv).await.unwrap();
        assert_eq!(settings.preferences(), Preferences::default());
    }

    #[tokio::test]
    async fn test_partial_preferences_keep_defaults() {
        let kv = Arc::new(InMemoryKeyValueStore::with_entries([(
            PREFERENCES_KEY,
            r#"{"currency":"INR"}"#,
        )]));
        let settings = SettingsService::load(kv).await.unwrap();
        assert_eq!(settings.language(), Language::English);
        assert_eq!(settings.format_price(10.0).unwrap(), "₹830.00");
    }
}
