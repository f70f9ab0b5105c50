//! Resource client trait definition

use crate::error::Result;
use crate::resource::{
    ImageSpec, RemoteImage, VmInstance, VmResource, VmSpec, VolumeResource, VolumeSpec,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Remote hypervisor-management API
///
/// Exposes create/read/delete per resource family. Reads of a missing object
/// must fail with [`CloudError::NotFound`](crate::CloudError::NotFound) so
/// callers can tell absence apart from transport failures. A client may be
/// shared across runs; it must not carry per-run state.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Returns the client name (e.g., "harvester")
    fn name(&self) -> &str;

    /// Check whether the configured credentials are accepted
    async fn check_auth(&self) -> Result<AuthStatus>;

    async fn create_image(&self, namespace: &str, spec: &ImageSpec) -> Result<RemoteImage>;

    async fn read_image(&self, namespace: &str, name: &str) -> Result<RemoteImage>;

    async fn delete_image(&self, namespace: &str, name: &str) -> Result<()>;

    async fn create_volume(&self, namespace: &str, spec: &VolumeSpec) -> Result<VolumeResource>;

    async fn read_volume(&self, namespace: &str, name: &str) -> Result<VolumeResource>;

    async fn delete_volume(&self, namespace: &str, name: &str) -> Result<()>;

    async fn create_vm(&self, namespace: &str, spec: &VmSpec) -> Result<VmResource>;

    async fn read_vm(&self, namespace: &str, name: &str) -> Result<VmResource>;

    /// Read the running instance behind a VM, which carries the boot phase
    async fn read_vm_instance(&self, namespace: &str, name: &str) -> Result<VmInstance>;

    async fn delete_vm(&self, namespace: &str, name: &str) -> Result<()>;
}

/// Authentication status
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthStatus {
    /// Whether authentication is valid
    pub authenticated: bool,

    /// Endpoint or account information if available
    pub account_info: Option<String>,

    /// Error message if not authenticated
    pub error: Option<String>,
}

impl AuthStatus {
    pub fn ok(account_info: impl Into<String>) -> Self {
        Self {
            authenticated: true,
            account_info: Some(account_info.into()),
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            authenticated: false,
            account_info: None,
            error: Some(error.into()),
        }
    }
}
