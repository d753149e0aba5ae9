use std::sync::Arc;

use crate::config::AppConfig;
use crate::fetch::{build_client, match_source_from_config, FetchError, MatchSource};
use crate::storage::{AccountStore, StorageConfig};

#[derive(Clone)]
pub struct AppState {
    pub storage: Arc<StorageConfig>,
    pub accounts: Arc<AccountStore>,
    pub config: Arc<AppConfig>,
    pub match_source: Arc<dyn MatchSource>,
    /// Shared outbound client (timeouts from `upstream`)
    pub http: reqwest::Client,
}

impl AppState {
    pub fn from_config(config: AppConfig) -> Result<Self, FetchError> {
        let storage = Arc::new(StorageConfig::new(config.data_dir.clone()));
        let http = build_client(&config.upstream)?;
        let match_source = match_source_from_config(&config, storage.clone(), http.clone())?;

        Ok(Self {
            accounts: Arc::new(AccountStore::new(storage.clone())),
            storage,
            config: Arc::new(config),
            match_source,
            http,
        })
    }
}
