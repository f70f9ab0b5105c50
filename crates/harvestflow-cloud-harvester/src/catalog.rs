//! API versions, kinds and fixed manifest values
//!
//! Injected into the client rather than kept as globals, so tests and
//! alternative clusters can swap values without touching shared state.

/// Immutable catalog of API identifiers used when rendering manifests
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiCatalog {
    pub image_api_version: String,
    pub kubevirt_api_version: String,
    pub core_api_version: String,

    pub image_kind: String,
    pub vm_kind: String,
    pub volume_kind: String,

    /// Run strategy recorded on the builder VM
    pub run_strategy: String,

    /// Storage class that backs downloaded images
    pub image_storage_class: String,

    /// Value of the `harvesterhci.io/image-type` label
    pub image_type: String,

    /// Value of the `harvesterhci.io/creator` label
    pub creator: String,
}

impl Default for ApiCatalog {
    fn default() -> Self {
        Self {
            image_api_version: "harvesterhci.io/v1beta1".to_string(),
            kubevirt_api_version: "kubevirt.io/v1".to_string(),
            core_api_version: "v1".to_string(),
            image_kind: "VirtualMachineImage".to_string(),
            vm_kind: "VirtualMachine".to_string(),
            volume_kind: "PersistentVolumeClaim".to_string(),
            run_strategy: "RerunOnFailure".to_string(),
            image_storage_class: "harvester-longhorn".to_string(),
            image_type: "raw_qcow2".to_string(),
            creator: "harvestflow".to_string(),
        }
    }
}

impl ApiCatalog {
    pub fn images_path(&self, namespace: &str) -> String {
        format!(
            "/apis/{}/namespaces/{}/virtualmachineimages",
            self.image_api_version, namespace
        )
    }

    pub fn volumes_path(&self, namespace: &str) -> String {
        format!(
            "/api/{}/namespaces/{}/persistentvolumeclaims",
            self.core_api_version, namespace
        )
    }

    pub fn vms_path(&self, namespace: &str) -> String {
        format!(
            "/apis/{}/namespaces/{}/virtualmachines",
            self.kubevirt_api_version, namespace
        )
    }

    pub fn vm_instances_path(&self, namespace: &str) -> String {
        format!(
            "/apis/{}/namespaces/{}/virtualmachineinstances",
            self.kubevirt_api_version, namespace
        )
    }
}
