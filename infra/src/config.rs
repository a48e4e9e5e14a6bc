//! Configuration loading
//!
//! Layers, lowest priority first:
//! 1. the environment preset from [`AppConfig::from_env`]
//! 2. `config.<environment>.toml` in the working directory, if present
//! 3. `NEST__<SECTION>__<KEY>` environment variables
//!
//! `.env` and `.env.<environment>` are read into the process environment
//! first; variables already set are not overwritten.

use std::path::Path;

use ::config::{Config, Environment as EnvSource, File};
use tracing::debug;

use nest_shared::config::{AppConfig, Environment};

use crate::InfrastructureError;

/// Prefix of configuration environment variables
pub const ENV_PREFIX: &str = "NEST";

/// Load the application configuration
pub fn load_config() -> Result<AppConfig, InfrastructureError> {
    dotenvy::dotenv().ok();
    let environment = Environment::from_env();
    dotenvy::from_filename(environment.env_file()).ok();

    build_config(AppConfig::from_env(), Some(Path::new(environment.config_file())))
}

/// Layer an optional TOML file and the environment over `preset`
pub fn build_config(preset: AppConfig, file: Option<&Path>) -> Result<AppConfig, InfrastructureError> {
    let mut builder = Config::builder().add_source(Config::try_from(&preset)?);
    if let Some(path) = file {
        debug!(path = %path.display(), "Reading configuration file");
        builder = builder.add_source(File::from(path).required(false));
    }
    let config = builder
        .add_source(
            EnvSource::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize::<AppConfig>()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use nest_shared::config::StorageBackend;

    use super::*;

    #[test]
    fn test_missing_file_keeps_preset() {
        let preset = AppConfig::production();
        let config = build_config(preset, Some(Path::new("does-not-exist.toml"))).unwrap();
        assert_eq!(config.database.max_connections, 50);
        assert_eq!(config.storage.documents, StorageBackend::Mysql);
    }

    #[test]
    fn test_file_overrides_preset() {
        let dir = std::env::temp_dir().join(format!("staynest-config-{}", uuid::Uuid::new_v4().simple()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.development.toml");
        std::fs::write(
            &path,
            r#"
[marketplace]
seed_on_empty = false

[storage]
documents = "memory"
preferences = "memory"
"#,
        )
        .unwrap();

        let config = build_config(AppConfig::production(), Some(&path)).unwrap();
        assert!(!config.marketplace.seed_on_empty);
        assert_eq!(config.storage.preferences, StorageBackend::Memory);
        // Untouched keys keep the preset value
        assert_eq!(config.auth.bcrypt_cost, 12);
    }
}
