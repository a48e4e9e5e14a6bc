//! Application wiring
//!
//! Builds the document and key-value backends selected by
//! [`StorageConfig`](nest_shared::config::StorageConfig) and starts every
//! service on top of them.

use std::sync::Arc;

use tracing::{info, warn};

use nest_core::errors::DomainResult;
use nest_core::repositories::{
    DocumentStore, InMemoryDocumentStore, InMemoryKeyValueStore, KeyValueStore,
};
use nest_core::services::{AuthService, MarketplaceService, RecommendationService, SettingsService};
use nest_shared::config::{AppConfig, StorageBackend};

use crate::kv::FileKeyValueStore;
use crate::recommendation::HttpRecommendationClient;
use crate::InfrastructureError;

/// Open the document store named by `config.storage.documents`
pub async fn build_document_store(
    config: &AppConfig,
) -> Result<Arc<dyn DocumentStore>, InfrastructureError> {
    match config.storage.documents {
        StorageBackend::Memory => Ok(Arc::new(InMemoryDocumentStore::with_change_buffer(
            config.database.change_buffer,
        ))),
        #[cfg(feature = "mysql")]
        StorageBackend::Mysql => {
            let pool = crate::database::DatabasePool::new(config.database.clone()).await?;
            let store = crate::database::MySqlDocumentStore::new(
                pool.inner().clone(),
                config.database.change_buffer,
            );
            store.ensure_schema().await?;
            Ok(Arc::new(store))
        }
        other => Err(InfrastructureError::General(format!(
            "Backend {:?} cannot hold documents",
            other
        ))),
    }
}

/// Open the key-value store named by `config.storage.preferences`
pub async fn build_key_value_store(
    config: &AppConfig,
) -> Result<Arc<dyn KeyValueStore>, InfrastructureError> {
    match config.storage.preferences {
        StorageBackend::Memory => Ok(Arc::new(InMemoryKeyValueStore::new())),
        StorageBackend::File => Ok(Arc::new(
            FileKeyValueStore::open(&config.storage.preferences_path).await?,
        )),
        #[cfg(feature = "redis-store")]
        StorageBackend::Redis => Ok(Arc::new(
            crate::kv::RedisKeyValueStore::connect(config.cache.clone()).await?,
        )),
        other => Err(InfrastructureError::General(format!(
            "Backend {:?} cannot hold preferences",
            other
        ))),
    }
}

/// Every running service of one StayNest process
pub struct StayNest {
    pub config: AppConfig,
    pub auth: AuthService,
    pub marketplace: MarketplaceService,
    pub settings: SettingsService,
    /// Absent when recommendations are disabled
    pub recommendations: Option<RecommendationService>,
}

impl StayNest {
    /// Open the configured backends and start all services
    pub async fn start(config: AppConfig) -> Result<Self, InfrastructureError> {
        let store = build_document_store(&config).await?;
        let kv = build_key_value_store(&config).await?;
        info!(
            environment = %config.environment,
            documents = ?config.storage.documents,
            preferences = ?config.storage.preferences,
            "Storage backends ready"
        );
        Ok(Self::with_stores(config, store, kv).await?)
    }

    /// Start all services over already opened stores
    pub async fn with_stores(
        config: AppConfig,
        store: Arc<dyn DocumentStore>,
        kv: Arc<dyn KeyValueStore>,
    ) -> DomainResult<Self> {
        if config.auth.is_using_default_admin_password() {
            warn!("Super-admin uses the default password");
        }

        let auth = AuthService::start(store.clone(), kv.clone(), config.auth.clone()).await?;
        let marketplace = MarketplaceService::start(store, config.marketplace.clone()).await?;
        let settings = SettingsService::load(kv).await?;

        let recommendations = if config.recommendation.enabled {
            let client = HttpRecommendationClient::new(&config.recommendation)?;
            Some(RecommendationService::new(
                Arc::new(client),
                config.recommendation.max_results,
            ))
        } else {
            None
        };

        info!("StayNest services started");
        Ok(Self {
            config,
            auth,
            marketplace,
            settings,
            recommendations,
        })
    }

    /// Detach every realtime mirror
    pub fn stop(&self) {
        self.auth.stop();
        self.marketplace.stop();
        info!("StayNest services stopped");
    }
}
