//! Application state shared across handlers.

use spool_core::config::AppConfig;
use spool_lifecycle::{LifecycleManager, Sweeper, UploadService};
use spool_metadata::MetadataStore;
use spool_storage::FileStore;
use std::sync::Arc;
use std::time::Duration;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn FileStore>,
    pub metadata: Arc<dyn MetadataStore>,
    pub files: Arc<LifecycleManager>,
    pub uploads: Arc<UploadService>,
    pub sweeper: Arc<Sweeper>,
}

impl AppState {
    /// Wire the lifecycle services over the given backends.
    pub fn new(
        config: AppConfig,
        storage: Arc<dyn FileStore>,
        metadata: Arc<dyn MetadataStore>,
    ) -> Self {
        let files = Arc::new(LifecycleManager::new(
            metadata.clone(),
            storage.clone(),
            config.gc.temp_file_retention(),
        ));
        let uploads = Arc::new(UploadService::new(
            storage.clone(),
            files.clone(),
            config.upload.clone(),
            Duration::from_secs(config.gc.session_retention_secs),
        ));
        let sweeper = Arc::new(Sweeper::new(
            storage.clone(),
            config.gc.session_retention(),
        ));

        Self {
            config: Arc::new(config),
            storage,
            metadata,
            files,
            uploads,
            sweeper,
        }
    }
}
