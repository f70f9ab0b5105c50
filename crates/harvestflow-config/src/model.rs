//! Build configuration model
//!
//! Deserialized from YAML, then completed by [`Config::resolve`]: empty
//! connection fields fall back to `HARVESTER_*` environment variables,
//! unset values receive defaults, and the result is validated.

use crate::error::{ConfigError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_NAMESPACE: &str = "default";
pub const DEFAULT_NAME_PREFIX: &str = "packer-";
pub const DEFAULT_CPU: u32 = 1;
pub const DEFAULT_MEMORY: &str = "2Gi";
pub const DEFAULT_VOLUME_SIZE: &str = "100Gi";
pub const DEFAULT_NETWORK_NAMESPACE: &str = "harvester-public";
pub const DEFAULT_IMAGE_TYPE: &str = "raw_qcow2";

const ENV_URL: &str = "HARVESTER_URL";
const ENV_TOKEN: &str = "HARVESTER_TOKEN";
const ENV_NAMESPACE: &str = "HARVESTER_NAMESPACE";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub harvester_url: String,
    pub harvester_token: String,
    pub harvester_namespace: String,

    /// Skip TLS verification for clusters with self-signed certificates
    pub harvester_insecure: bool,

    pub builder_source: BuilderSource,
    pub builder_configuration: BuilderConfiguration,
    pub builder_target: BuilderTarget,
    pub timeouts: Timeouts,
}

/// Image the builder VM boots from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderSource {
    pub name: String,
    pub os_type: String,
    pub image_type: String,
    pub url: Option<String>,
    pub display_name: String,
    pub checksum: Option<String>,

    /// Delete the source image after the build if this run created it
    pub cleanup: bool,
}

/// Shape of the builder VM
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfiguration {
    pub namespace: String,
    pub name_prefix: String,
    pub cpu: u32,
    pub memory: String,
    pub network_namespace: String,
    pub network: String,

    /// Secret holding cloud-init user and network data
    pub cloud_init_secret: Option<String>,
}

/// Where the finished image is exported
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderTarget {
    pub namespace: String,
    pub display_name: String,
    pub volume_size: String,
}

/// Per-wait deadlines and poll intervals, in seconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Timeouts {
    pub image_download: u64,
    pub image_poll: u64,
    pub vm_ready: u64,
    pub vm_poll: u64,
    pub vm_grace: u64,
    pub teardown: u64,
    pub teardown_poll: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            image_download: 120,
            image_poll: 5,
            vm_ready: 120,
            vm_poll: 5,
            vm_grace: 3,
            teardown: 120,
            teardown_poll: 10,
        }
    }
}

impl Timeouts {
    pub fn image_download(&self) -> Duration {
        Duration::from_secs(self.image_download)
    }

    pub fn image_poll(&self) -> Duration {
        Duration::from_secs(self.image_poll)
    }

    pub fn vm_ready(&self) -> Duration {
        Duration::from_secs(self.vm_ready)
    }

    pub fn vm_poll(&self) -> Duration {
        Duration::from_secs(self.vm_poll)
    }

    pub fn vm_grace(&self) -> Duration {
        Duration::from_secs(self.vm_grace)
    }

    pub fn teardown(&self) -> Duration {
        Duration::from_secs(self.teardown)
    }

    pub fn teardown_poll(&self) -> Duration {
        Duration::from_secs(self.teardown_poll)
    }
}

fn fill(field: &mut String, value: &str) {
    if field.is_empty() {
        *field = value.to_string();
    }
}

fn env_fallback(field: &mut String, key: &str) {
    if field.is_empty() {
        if let Ok(value) = std::env::var(key) {
            *field = value;
        }
    }
}

impl Config {
    /// Parse a YAML document
    pub fn from_yaml(content: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Env fallback, defaults, then validation
    pub fn resolve(mut self) -> Result<Self> {
        self.apply_env();
        self.apply_defaults();
        self.validate()?;
        Ok(self)
    }

    /// Fill empty connection fields from `HARVESTER_*` variables
    pub fn apply_env(&mut self) {
        env_fallback(&mut self.harvester_url, ENV_URL);
        env_fallback(&mut self.harvester_token, ENV_TOKEN);
        env_fallback(&mut self.harvester_namespace, ENV_NAMESPACE);
    }

    pub fn apply_defaults(&mut self) {
        fill(&mut self.harvester_namespace, DEFAULT_NAMESPACE);
        let namespace = self.harvester_namespace.clone();

        let source = &mut self.builder_source;
        fill(&mut source.display_name, &source.name);
        fill(&mut source.image_type, DEFAULT_IMAGE_TYPE);

        let builder = &mut self.builder_configuration;
        fill(&mut builder.namespace, &namespace);
        fill(&mut builder.name_prefix, DEFAULT_NAME_PREFIX);
        fill(&mut builder.memory, DEFAULT_MEMORY);
        fill(&mut builder.network_namespace, DEFAULT_NETWORK_NAMESPACE);
        if builder.cpu == 0 {
            builder.cpu = DEFAULT_CPU;
        }

        let target = &mut self.builder_target;
        fill(&mut target.namespace, &namespace);
        fill(&mut target.volume_size, DEFAULT_VOLUME_SIZE);
    }

    pub fn validate(&self) -> Result<()> {
        if self.harvester_url.is_empty() {
            return Err(ConfigError::invalid(
                "harvester_url",
                "must be set (or HARVESTER_URL)",
            ));
        }
        if self.harvester_namespace.is_empty() {
            return Err(ConfigError::invalid("harvester_namespace", "must not be empty"));
        }

        let source = &self.builder_source;
        if source.name.is_empty() {
            return Err(ConfigError::invalid("builder_source.name", "must not be empty"));
        }
        let has_url = source.url.as_deref().is_some_and(|u| !u.is_empty());
        let has_checksum = source.checksum.as_deref().is_some_and(|c| !c.is_empty());
        if has_checksum && !has_url {
            return Err(ConfigError::invalid(
                "builder_source.checksum",
                "a checksum requires builder_source.url",
            ));
        }

        if self.builder_configuration.cpu == 0 {
            return Err(ConfigError::invalid("builder_configuration.cpu", "must be at least 1"));
        }
        if self.builder_configuration.network.is_empty() {
            return Err(ConfigError::invalid(
                "builder_configuration.network",
                "must not be empty",
            ));
        }

        let t = &self.timeouts;
        let durations = [
            ("timeouts.image_download", t.image_download),
            ("timeouts.image_poll", t.image_poll),
            ("timeouts.vm_ready", t.vm_ready),
            ("timeouts.vm_poll", t.vm_poll),
            ("timeouts.teardown", t.teardown),
            ("timeouts.teardown_poll", t.teardown_poll),
        ];
        for (field, secs) in durations {
            if secs == 0 {
                return Err(ConfigError::invalid(field, "must be greater than zero"));
            }
        }

        Ok(())
    }

    /// Multus network as `<namespace>/<name>`
    pub fn network_name(&self) -> String {
        format!(
            "{}/{}",
            self.builder_configuration.network_namespace, self.builder_configuration.network
        )
    }
}
