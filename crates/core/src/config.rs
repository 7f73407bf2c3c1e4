//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use time::Duration;

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Enable the /metrics endpoint for Prometheus scraping (default: true).
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
    /// Maximum request body size in bytes (default: 64 MiB).
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_metrics_enabled() -> bool {
    true
}

fn default_max_request_bytes() -> usize {
    64 * 1024 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            metrics_enabled: default_metrics_enabled(),
            max_request_bytes: default_max_request_bytes(),
        }
    }
}

/// Storage configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Root directory for artifacts and in-progress sessions.
    #[serde(default = "default_storage_root")]
    pub root: PathBuf,
}

fn default_storage_root() -> PathBuf {
    PathBuf::from("./data/files")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
        }
    }
}

impl StorageConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.root.as_os_str().is_empty() {
            return Err("storage.root must not be empty".to_string());
        }
        Ok(())
    }
}

/// Metadata store configuration (SQLite).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// Database file path.
    #[serde(default = "default_metadata_path")]
    pub path: PathBuf,
    /// Table holding file records.
    #[serde(default = "default_table")]
    pub table: String,
    /// Query timeout in seconds (advisory only; SQLite cannot cancel queries).
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: Option<u64>,
}

fn default_metadata_path() -> PathBuf {
    PathBuf::from("./data/spool.db")
}

fn default_table() -> String {
    "files".to_string()
}

fn default_query_timeout_secs() -> Option<u64> {
    Some(30)
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            path: default_metadata_path(),
            table: default_table(),
            query_timeout_secs: default_query_timeout_secs(),
        }
    }
}

impl MetadataConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !is_sql_identifier(&self.table) {
            return Err(format!(
                "metadata.table {:?} must be an identifier of letters, digits and underscores",
                self.table
            ));
        }
        Ok(())
    }
}

/// Whether `name` can be spliced into SQL as a bare identifier.
pub fn is_sql_identifier(name: &str) -> bool {
    let mut bytes = name.bytes();
    matches!(bytes.next(), Some(b) if b.is_ascii_alphabetic() || b == b'_')
        && bytes.all(|b| b.is_ascii_alphanumeric() || b == b'_')
        && name.len() <= 64
}

/// Upload acceptance rules.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UploadConfig {
    /// Lowercase extensions accepted from clients.
    #[serde(default = "default_allowed_extensions")]
    pub allowed_extensions: Vec<String>,
    /// Maximum bytes per chunk; 0 means unlimited.
    #[serde(default)]
    pub max_chunk_size: u64,
    /// Maximum bytes per assembled file; 0 means unlimited.
    #[serde(default)]
    pub max_file_size: u64,
}

fn default_allowed_extensions() -> Vec<String> {
    ["jpg", "jpeg", "png", "gif", "bmp", "webp", "svg", "tiff"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            allowed_extensions: default_allowed_extensions(),
            max_chunk_size: 0,
            max_file_size: 0,
        }
    }
}

impl UploadConfig {
    pub fn allows(&self, extension: &str) -> bool {
        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(extension))
    }

    pub fn chunk_limit(&self) -> Option<u64> {
        (self.max_chunk_size > 0).then_some(self.max_chunk_size)
    }

    pub fn file_limit(&self) -> Option<u64> {
        (self.max_file_size > 0).then_some(self.max_file_size)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.allowed_extensions.is_empty() {
            return Err("upload.allowed_extensions must not be empty".to_string());
        }
        Ok(())
    }
}

/// Garbage collection configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GcConfig {
    /// Age in seconds after which unlinked file records are deleted (default: 12 hours).
    #[serde(default = "default_temp_file_retention_secs")]
    pub temp_file_retention_secs: u64,
    /// Age in seconds after which an idle chunk session is reclaimed (default: 24 hours).
    #[serde(default = "default_session_retention_secs")]
    pub session_retention_secs: u64,
    /// Run the sweeps periodically in the background.
    #[serde(default = "default_auto_schedule_enabled")]
    pub auto_schedule_enabled: bool,
    /// Interval in seconds between automatic runs (default: 1 hour).
    #[serde(default = "default_auto_schedule_interval_secs")]
    pub auto_schedule_interval_secs: u64,
    /// Run once immediately at startup.
    #[serde(default = "default_run_on_startup")]
    pub run_on_startup: bool,
}

fn default_temp_file_retention_secs() -> u64 {
    crate::DEFAULT_TEMP_FILE_RETENTION_SECS
}

fn default_session_retention_secs() -> u64 {
    crate::DEFAULT_SESSION_RETENTION_SECS
}

fn default_auto_schedule_enabled() -> bool {
    true
}

fn default_auto_schedule_interval_secs() -> u64 {
    3600
}

fn default_run_on_startup() -> bool {
    true
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            temp_file_retention_secs: default_temp_file_retention_secs(),
            session_retention_secs: default_session_retention_secs(),
            auto_schedule_enabled: default_auto_schedule_enabled(),
            auto_schedule_interval_secs: default_auto_schedule_interval_secs(),
            run_on_startup: default_run_on_startup(),
        }
    }
}

impl GcConfig {
    pub fn temp_file_retention(&self) -> Duration {
        // Saturate at i64::MAX to prevent overflow wrapping to negative
        Duration::seconds(i64::try_from(self.temp_file_retention_secs).unwrap_or(i64::MAX))
    }

    pub fn session_retention(&self) -> Duration {
        Duration::seconds(i64::try_from(self.session_retention_secs).unwrap_or(i64::MAX))
    }

    /// Get the auto schedule interval as a std::time::Duration.
    pub fn auto_schedule_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.auto_schedule_interval_secs)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.temp_file_retention_secs == 0 {
            return Err("gc.temp_file_retention_secs must be greater than zero".to_string());
        }
        if self.session_retention_secs == 0 {
            return Err("gc.session_retention_secs must be greater than zero".to_string());
        }
        if self.auto_schedule_enabled && self.auto_schedule_interval_secs == 0 {
            return Err(
                "gc.auto_schedule_interval_secs must be greater than zero when scheduling is enabled"
                    .to_string(),
            );
        }
        Ok(())
    }
}

/// Complete application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub upload: UploadConfig,
    #[serde(default)]
    pub gc: GcConfig,
}

impl AppConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), String> {
        self.storage.validate()?;
        self.metadata.validate()?;
        self.upload.validate()?;
        self.gc.validate()
    }

    /// Create a test configuration rooted at the given paths.
    ///
    /// **For testing only.** Background scheduling is disabled.
    pub fn for_testing(storage_root: impl AsRef<Path>, db_path: impl AsRef<Path>) -> Self {
        Self {
            server: ServerConfig {
                bind: "127.0.0.1:0".to_string(),
                ..ServerConfig::default()
            },
            storage: StorageConfig {
                root: storage_root.as_ref().to_path_buf(),
            },
            metadata: MetadataConfig {
                path: db_path.as_ref().to_path_buf(),
                ..MetadataConfig::default()
            },
            upload: UploadConfig::default(),
            gc: GcConfig {
                auto_schedule_enabled: false,
                run_on_startup: false,
                ..GcConfig::default()
            },
        }
    }
}
