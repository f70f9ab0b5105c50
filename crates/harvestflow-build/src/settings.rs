//! Resolved inputs of one build

use crate::error::{BuildError, Result};
use harvestflow_cloud::{CloudInit, DesiredImage, VmSpec, VolumeSpec, WaitOptions};
use harvestflow_config::model::{
    DEFAULT_CPU, DEFAULT_MEMORY, DEFAULT_NAME_PREFIX, DEFAULT_VOLUME_SIZE,
};
use harvestflow_config::{Config, Timeouts};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Where the provisioning step exports the finished image
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportTarget {
    pub namespace: String,
    pub display_name: String,
}

/// Fully resolved settings the orchestrator runs with
///
/// Defaults are applied by whoever builds this value; the pipeline uses
/// every field as given.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildSettings {
    pub image: DesiredImage,

    /// Delete the source image at teardown when this run created it
    pub cleanup_image: bool,

    /// Namespace for the builder volume and VM
    pub namespace: String,
    pub name_prefix: String,
    pub cpu_cores: u32,
    pub memory: String,

    /// Multus network as `<namespace>/<name>`
    pub network: String,
    pub volume_size: String,
    pub cloud_init: CloudInit,
    pub labels: BTreeMap<String, String>,
    pub target: ExportTarget,

    pub image_wait: WaitOptions,
    pub vm_wait: WaitOptions,

    /// Delay before the first VM status read
    pub vm_grace: Duration,
    pub teardown_wait: WaitOptions,
}

impl BuildSettings {
    /// Settings with the configuration provider's defaults for everything
    /// but the image, builder namespace and network
    pub fn new(
        image: DesiredImage,
        namespace: impl Into<String>,
        network: impl Into<String>,
    ) -> Self {
        let namespace = namespace.into();
        let timeouts = Timeouts::default();
        Self {
            image,
            cleanup_image: false,
            target: ExportTarget {
                namespace: namespace.clone(),
                display_name: String::new(),
            },
            namespace,
            name_prefix: DEFAULT_NAME_PREFIX.to_string(),
            cpu_cores: DEFAULT_CPU,
            memory: DEFAULT_MEMORY.to_string(),
            network: network.into(),
            volume_size: DEFAULT_VOLUME_SIZE.to_string(),
            cloud_init: CloudInit::default(),
            labels: BTreeMap::new(),
            image_wait: WaitOptions::new(timeouts.image_poll(), timeouts.image_download()),
            vm_wait: WaitOptions::new(timeouts.vm_poll(), timeouts.vm_ready()),
            vm_grace: timeouts.vm_grace(),
            teardown_wait: WaitOptions::new(timeouts.teardown_poll(), timeouts.teardown()),
        }
    }

    /// Map a resolved configuration onto build settings
    pub fn from_config(config: &Config) -> Self {
        let source = &config.builder_source;
        let builder = &config.builder_configuration;
        let timeouts = &config.timeouts;

        let mut image = DesiredImage::new(&source.name, &config.harvester_namespace)
            .with_display_name(&source.display_name)
            .with_os_type(&source.os_type);
        image.url = source.url.clone();
        image.checksum = source.checksum.clone();

        let cloud_init = match &builder.cloud_init_secret {
            Some(secret) if !secret.is_empty() => CloudInit::SecretRef(secret.clone()),
            _ => CloudInit::default(),
        };

        Self {
            image,
            cleanup_image: source.cleanup,
            namespace: builder.namespace.clone(),
            name_prefix: builder.name_prefix.clone(),
            cpu_cores: builder.cpu,
            memory: builder.memory.clone(),
            network: config.network_name(),
            volume_size: config.builder_target.volume_size.clone(),
            cloud_init,
            labels: BTreeMap::new(),
            target: ExportTarget {
                namespace: config.builder_target.namespace.clone(),
                display_name: config.builder_target.display_name.clone(),
            },
            image_wait: WaitOptions::new(timeouts.image_poll(), timeouts.image_download()),
            vm_wait: WaitOptions::new(timeouts.vm_poll(), timeouts.vm_ready()),
            vm_grace: timeouts.vm_grace(),
            teardown_wait: WaitOptions::new(timeouts.teardown_poll(), timeouts.teardown()),
        }
    }

    /// Reject inputs that cannot produce a build, before any remote call
    pub fn validate(&self) -> Result<()> {
        if self.image.name.is_empty() {
            return Err(BuildError::InvalidInput("image name is empty".to_string()));
        }
        if self.image.expected_checksum().is_some() && self.image.source_url().is_none() {
            return Err(BuildError::InvalidInput(format!(
                "image {} has a checksum but no source URL",
                self.image.name
            )));
        }
        if self.image.namespace.is_empty() || self.namespace.is_empty() {
            return Err(BuildError::InvalidInput("namespace is empty".to_string()));
        }
        if self.name_prefix.is_empty() {
            return Err(BuildError::InvalidInput("name prefix is empty".to_string()));
        }
        if self.cpu_cores == 0 {
            return Err(BuildError::InvalidInput("cpu must be at least 1".to_string()));
        }
        Ok(())
    }

    pub(crate) fn volume_spec(&self, image_namespace: &str, image_name: &str) -> VolumeSpec {
        VolumeSpec::for_image(
            &self.name_prefix,
            &self.volume_size,
            image_namespace,
            image_name,
        )
    }

    pub(crate) fn vm_spec(&self, root_volume: &str) -> VmSpec {
        VmSpec {
            generate_name: self.name_prefix.clone(),
            cpu_cores: self.cpu_cores,
            memory: self.memory.clone(),
            network: self.network.clone(),
            root_volume: root_volume.to_string(),
            cloud_init: self.cloud_init.clone(),
            labels: self.labels.clone(),
        }
    }
}
