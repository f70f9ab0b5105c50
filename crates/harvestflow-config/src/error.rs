use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration directory not found")]
    ConfigDirNotFound,

    #[error(
        "Configuration file not found. Looked in:\n\
        - $HFLOW_CONFIG_PATH\n\
        - current directory: harvestflow.yaml, harvestflow.local.yaml\n\
        - ./.harvestflow/harvestflow.yaml\n\
        - ~/.config/harvestflow/harvestflow.yaml"
    )]
    ConfigFileNotFound,

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid configuration: {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConfigError>;
