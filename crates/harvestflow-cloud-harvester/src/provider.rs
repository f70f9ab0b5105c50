//! Harvester implementation of [`ResourceClient`]

use crate::api::{HarvesterApi, HarvesterConfig};
use crate::catalog::ApiCatalog;
use crate::error::Result;
use crate::manifest;
use async_trait::async_trait;
use harvestflow_cloud::{
    AuthStatus, CloudError, ImageSpec, RemoteImage, ResourceClient, VmInstance, VmResource,
    VmSpec, VolumeResource, VolumeSpec,
};

/// Harvester HCI client
pub struct HarvesterClient {
    api: HarvesterApi,
    catalog: ApiCatalog,
    namespace: String,
}

impl HarvesterClient {
    pub fn new(config: HarvesterConfig) -> Result<Self> {
        Self::with_catalog(config, ApiCatalog::default())
    }

    pub fn with_catalog(config: HarvesterConfig, catalog: ApiCatalog) -> Result<Self> {
        Ok(Self {
            api: HarvesterApi::new(&config)?,
            catalog,
            namespace: config.namespace,
        })
    }

    /// Create a client from `HARVESTER_*` environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(HarvesterConfig::from_env()?)
    }

    /// Namespace from the connection settings
    pub fn default_namespace(&self) -> &str {
        &self.namespace
    }

    pub fn catalog(&self) -> &ApiCatalog {
        &self.catalog
    }

    fn image_path(&self, namespace: &str, name: &str) -> String {
        format!("{}/{}", self.catalog.images_path(namespace), name)
    }

    fn volume_path(&self, namespace: &str, name: &str) -> String {
        format!("{}/{}", self.catalog.volumes_path(namespace), name)
    }

    fn vm_path(&self, namespace: &str, name: &str) -> String {
        format!("{}/{}", self.catalog.vms_path(namespace), name)
    }
}

#[async_trait]
impl ResourceClient for HarvesterClient {
    fn name(&self) -> &str {
        "harvester"
    }

    async fn check_auth(&self) -> harvestflow_cloud::Result<AuthStatus> {
        let path = format!("{}?limit=1", self.catalog.images_path(&self.namespace));
        match self.api.get(&path).await {
            Ok(_) => Ok(AuthStatus::ok(format!(
                "{} (namespace {})",
                self.api.base_url(),
                self.namespace
            ))),
            Err(CloudError::AuthenticationFailed(message)) => Ok(AuthStatus::failed(message)),
            Err(CloudError::NotFound(_)) => Ok(AuthStatus::failed(format!(
                "image API not served by {}",
                self.api.base_url()
            ))),
            Err(e) => Err(e),
        }
    }

    async fn create_image(
        &self,
        namespace: &str,
        spec: &ImageSpec,
    ) -> harvestflow_cloud::Result<RemoteImage> {
        tracing::info!("Creating image {}/{} from {}", namespace, spec.name, spec.url);
        let body = manifest::render_image(&self.catalog, namespace, spec);
        let response = self
            .api
            .post(&self.catalog.images_path(namespace), &body)
            .await?;
        manifest::parse_image(response)
    }

    async fn read_image(
        &self,
        namespace: &str,
        name: &str,
    ) -> harvestflow_cloud::Result<RemoteImage> {
        let response = self.api.get(&self.image_path(namespace, name)).await?;
        manifest::parse_image(response)
    }

    async fn delete_image(&self, namespace: &str, name: &str) -> harvestflow_cloud::Result<()> {
        tracing::info!("Deleting image {}/{}", namespace, name);
        self.api.delete(&self.image_path(namespace, name)).await
    }

    async fn create_volume(
        &self,
        namespace: &str,
        spec: &VolumeSpec,
    ) -> harvestflow_cloud::Result<VolumeResource> {
        tracing::info!(
            "Creating volume {}* in {} from image {}",
            spec.generate_name,
            namespace,
            spec.image_id
        );
        let body = manifest::render_volume(&self.catalog, namespace, spec);
        let response = self
            .api
            .post(&self.catalog.volumes_path(namespace), &body)
            .await?;
        manifest::parse_volume(response)
    }

    async fn read_volume(
        &self,
        namespace: &str,
        name: &str,
    ) -> harvestflow_cloud::Result<VolumeResource> {
        let response = self.api.get(&self.volume_path(namespace, name)).await?;
        manifest::parse_volume(response)
    }

    async fn delete_volume(&self, namespace: &str, name: &str) -> harvestflow_cloud::Result<()> {
        tracing::info!("Deleting volume {}/{}", namespace, name);
        self.api.delete(&self.volume_path(namespace, name)).await
    }

    async fn create_vm(
        &self,
        namespace: &str,
        spec: &VmSpec,
    ) -> harvestflow_cloud::Result<VmResource> {
        tracing::info!(
            "Creating virtual machine {}* in {} on volume {}",
            spec.generate_name,
            namespace,
            spec.root_volume
        );
        let body = manifest::render_vm(&self.catalog, namespace, spec);
        let response = self
            .api
            .post(&self.catalog.vms_path(namespace), &body)
            .await?;
        manifest::parse_vm(response)
    }

    async fn read_vm(&self, namespace: &str, name: &str) -> harvestflow_cloud::Result<VmResource> {
        let response = self.api.get(&self.vm_path(namespace, name)).await?;
        manifest::parse_vm(response)
    }

    async fn read_vm_instance(
        &self,
        namespace: &str,
        name: &str,
    ) -> harvestflow_cloud::Result<VmInstance> {
        let path = format!("{}/{}", self.catalog.vm_instances_path(namespace), name);
        let response = self.api.get(&path).await?;
        manifest::parse_vm_instance(response)
    }

    async fn delete_vm(&self, namespace: &str, name: &str) -> harvestflow_cloud::Result<()> {
        tracing::info!("Deleting virtual machine {}/{}", namespace, name);
        self.api.delete(&self.vm_path(namespace, name)).await
    }
}
