use super::schema::RetraceConfig;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Invalid config value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

/// Reject settings the pipeline cannot start with.
pub fn validate(config: &RetraceConfig) -> Result<(), ConfigError> {
    config
        .axtree
        .endpoint_url()
        .map_err(|e| ConfigError::Invalid {
            field: "axtree.endpoint",
            message: format!("{} ({:?})", e, config.axtree.endpoint),
        })?;
    config
        .store
        .blob_base_url()
        .map_err(|e| ConfigError::Invalid {
            field: "store.blob_base_url",
            message: e.to_string(),
        })?;
    if config.axtree.concurrency == 0 {
        return Err(ConfigError::Invalid {
            field: "axtree.concurrency",
            message: "must be at least 1".to_string(),
        });
    }
    if config.pipeline.concurrency == 0 {
        return Err(ConfigError::Invalid {
            field: "pipeline.concurrency",
            message: "must be at least 1".to_string(),
        });
    }
    Ok(())
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Config files tried in order by [`ConfigLoader::load_default`]:
    /// `./retrace.yaml`, then `~/.retrace/config.yaml`.
    pub fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("./retrace.yaml")];
        if let Some(home) = dirs::home_dir() {
            paths.push(home.join(".retrace").join("config.yaml"));
        }
        paths
    }

    /// First existing file of [`ConfigLoader::search_paths`], else the defaults.
    pub async fn load_default() -> Result<RetraceConfig, ConfigError> {
        for path in Self::search_paths() {
            if path.exists() {
                return Self::load_from(&path).await;
            }
        }
        debug!("No config file found, using defaults");
        Ok(RetraceConfig::default())
    }

    pub async fn load_from(path: &Path) -> Result<RetraceConfig, ConfigError> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let config: RetraceConfig =
            serde_yaml::from_str(&content).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;
        validate(&config)?;
        debug!("Loaded config from {:?}", path);
        Ok(config)
    }
}
