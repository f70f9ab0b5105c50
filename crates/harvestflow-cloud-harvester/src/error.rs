//! Harvester client error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HarvesterError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Cloud error: {0}")]
    CloudError(#[from] harvestflow_cloud::CloudError),
}

pub type Result<T> = std::result::Result<T, HarvesterError>;
