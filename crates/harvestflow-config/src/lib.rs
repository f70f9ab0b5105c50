pub mod error;
pub mod model;

pub use error::*;
pub use model::{BuilderConfiguration, BuilderSource, BuilderTarget, Config, Timeouts};

use std::path::{Path, PathBuf};

const CONFIG_PATH_ENV: &str = "HFLOW_CONFIG_PATH";
const CANDIDATES: [&str; 2] = ["harvestflow.yaml", "harvestflow.local.yaml"];

/// Per-user configuration directory (`~/.config/harvestflow`)
pub fn get_config_dir() -> Result<PathBuf> {
    let config_dir = dirs::config_dir()
        .ok_or(ConfigError::ConfigDirNotFound)?
        .join("harvestflow");

    Ok(config_dir)
}

/// Locate the build configuration file
///
/// Search order:
/// 1. `HFLOW_CONFIG_PATH` (direct path)
/// 2. Current directory: `harvestflow.yaml`, `harvestflow.local.yaml`
/// 3. `./.harvestflow/harvestflow.yaml`
/// 4. `~/.config/harvestflow/harvestflow.yaml` (global)
pub fn find_config_file() -> Result<PathBuf> {
    if let Ok(config_path) = std::env::var(CONFIG_PATH_ENV) {
        let path = PathBuf::from(config_path);
        if path.exists() {
            return Ok(path);
        }
    }

    let current_dir = std::env::current_dir()?;

    for filename in &CANDIDATES {
        let path = current_dir.join(filename);
        if path.exists() {
            return Ok(path);
        }
    }

    let project_config = current_dir.join(".harvestflow").join(CANDIDATES[0]);
    if project_config.exists() {
        return Ok(project_config);
    }

    if let Ok(config_dir) = get_config_dir() {
        let global_config = config_dir.join(CANDIDATES[0]);
        if global_config.exists() {
            return Ok(global_config);
        }
    }

    Err(ConfigError::ConfigFileNotFound)
}

/// Read and parse a configuration file without resolving it
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)?;
    Config::from_yaml(&content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Load `explicit` or the discovered file, then resolve it
pub fn load_resolved(explicit: Option<&Path>) -> Result<(PathBuf, Config)> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => find_config_file()?,
    };
    tracing::debug!("Loading configuration from {}", path.display());

    let config = load_config(&path)?.resolve()?;
    Ok((path, config))
}
