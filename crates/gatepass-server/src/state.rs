//! Application state shared across handlers.

use std::sync::Arc;

use gatepass_core::{
    open_store, Config, PassIdGenerator, PassIssuer, PassStore, RandomPassIdGenerator,
    ScanProcessor,
};

/// Handle to the application state, cloned into every handler.
pub type SharedState = Arc<AppState>;

/// Shared application state.
///
/// Holds no mutable data of its own; every request works against the store.
pub struct AppState {
    /// Loaded configuration.
    pub config: Config,
    /// Record store shared by the issuer and the scanner.
    pub store: Arc<dyn PassStore>,
    /// Registration side.
    pub issuer: PassIssuer,
    /// Scan side.
    pub scanner: ScanProcessor,
}

impl AppState {
    /// Build state from configuration, opening the configured store.
    pub async fn from_config(config: Config) -> anyhow::Result<Self> {
        let store = open_store(&config.storage).await?;
        Ok(Self::with_store(
            config,
            store,
            Arc::new(RandomPassIdGenerator),
        ))
    }

    /// Build state around an existing store and id generator.
    pub fn with_store(
        config: Config,
        store: Arc<dyn PassStore>,
        ids: Arc<dyn PassIdGenerator>,
    ) -> Self {
        let issuer = PassIssuer::new(store.clone(), ids, config.expiry_policy())
            .with_id_attempts(config.passes.id_attempts);
        let scanner = ScanProcessor::new(store.clone());

        Self {
            config,
            store,
            issuer,
            scanner,
        }
    }

    /// Wrap in an [`Arc`] for the router.
    #[must_use]
    pub fn shared(self) -> SharedState {
        Arc::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gatepass_core::StorageBackend;
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_from_config_opens_memory_store() {
        let mut config = Config::default();
        config.storage.backend = StorageBackend::Memory;

        let state = assert_ok!(AppState::from_config(config).await);
        assert_eq!(state.store.backend_name(), "memory");
        assert!(state.store.list_newest_first().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_from_config_opens_json_store_in_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.data_dir = Some(dir.path().join("nested"));

        let state = assert_ok!(AppState::from_config(config).await);
        assert_eq!(state.store.backend_name(), "json");
        assert!(dir.path().join("nested").is_dir());
    }
}
