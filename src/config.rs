use std::net::SocketAddr;
use std::path::PathBuf;

use crate::pipeline_config::PipelineConfig;

/// Application-level constants
pub const APP_NAME: &str = "ClinNotes";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";

/// Default application data directory: ~/ClinNotes/
pub fn app_data_dir() -> PathBuf {
    match dirs::home_dir() {
        Some(home) => home.join(APP_NAME),
        None => {
            tracing::warn!("Cannot determine home directory, using working directory");
            PathBuf::from(APP_NAME)
        }
    }
}

/// Log filter used when `RUST_LOG` is unset.
pub fn default_log_filter() -> String {
    let level = if cfg!(debug_assertions) { "debug" } else { "info" };
    format!("clinnotes={level},clinnotes_lib={level},tower_http=info")
}

/// Runtime settings for the notes service.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    /// Where original uploads are kept.
    pub upload_dir: PathBuf,
    pub db_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub pipeline: PipelineConfig,
}

impl AppConfig {
    /// Resolve from `CLINNOTES_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let data_dir = non_empty("CLINNOTES_DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(app_data_dir);
        let upload_dir = non_empty("CLINNOTES_UPLOAD_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("uploads"));
        let db_path = non_empty("CLINNOTES_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("notes.db"));

        let bind_addr = match non_empty("CLINNOTES_BIND") {
            Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
                tracing::warn!(value = %raw, default = DEFAULT_BIND_ADDR, "Invalid bind address, using default");
                default_bind_addr()
            }),
            None => default_bind_addr(),
        };

        Self {
            data_dir,
            upload_dir,
            db_path,
            bind_addr,
            pipeline: PipelineConfig::from_lookup(&lookup),
        }
    }
}

fn default_bind_addr() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8000))
}
