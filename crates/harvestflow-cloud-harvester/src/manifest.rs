//! Manifest rendering and response parsing
//!
//! Request bodies are rendered with `serde_json::json!`; responses are read
//! leniently through typed views that tolerate missing fields, since the
//! remote system fills in status only as objects progress.

use crate::catalog::ApiCatalog;
use harvestflow_cloud::{
    CloudError, CloudInit, ImageSpec, RemoteImage, VmInstance, VmResource, VmSpec,
    VolumeResource, VolumeSpec,
};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::BTreeMap;

const ROOT_DISK: &str = "rootdisk";
const CLOUD_INIT_DISK: &str = "cloudinitdisk";
const NIC: &str = "nic-1";

pub fn render_image(catalog: &ApiCatalog, namespace: &str, spec: &ImageSpec) -> Value {
    let mut body = json!({
        "apiVersion": catalog.image_api_version,
        "kind": catalog.image_kind,
        "metadata": {
            "name": spec.name,
            "namespace": namespace,
            "annotations": {
                "harvesterhci.io/storageClassName": catalog.image_storage_class,
            },
            "labels": {
                "harvesterhci.io/image-type": catalog.image_type,
                "harvesterhci.io/os-type": spec.os_type,
            },
        },
        "spec": {
            "displayName": spec.display_name,
            "sourceType": "download",
            "url": spec.url,
        },
    });

    if let Some(checksum) = &spec.checksum {
        body["spec"]["checksum"] = json!(checksum);
    }
    body
}

pub fn render_volume(catalog: &ApiCatalog, namespace: &str, spec: &VolumeSpec) -> Value {
    json!({
        "apiVersion": catalog.core_api_version,
        "kind": catalog.volume_kind,
        "metadata": {
            "generateName": spec.generate_name,
            "namespace": namespace,
            "annotations": {
                "harvesterhci.io/imageId": spec.image_id,
            },
        },
        "spec": {
            "accessModes": [spec.access_mode.as_str()],
            "resources": {
                "requests": { "storage": spec.size },
            },
            "storageClassName": spec.storage_class,
            "volumeMode": spec.volume_mode.as_str(),
        },
    })
}

fn render_cloud_init(cloud_init: &CloudInit) -> Value {
    match cloud_init {
        CloudInit::SecretRef(secret) => json!({
            "secretRef": { "name": secret },
            "networkDataSecretRef": { "name": secret },
        }),
        CloudInit::UserData(user_data) => json!({ "userData": user_data }),
    }
}

pub fn render_vm(catalog: &ApiCatalog, namespace: &str, spec: &VmSpec) -> Value {
    let mut labels = BTreeMap::new();
    labels.insert("harvesterhci.io/creator".to_string(), catalog.creator.clone());
    labels.extend(spec.labels.clone());

    json!({
        "apiVersion": catalog.kubevirt_api_version,
        "kind": catalog.vm_kind,
        "metadata": {
            "generateName": spec.generate_name,
            "namespace": namespace,
            "labels": labels,
            "annotations": {
                "harvesterhci.io/vmRunStrategy": catalog.run_strategy,
            },
        },
        "spec": {
            "runStrategy": catalog.run_strategy,
            "template": {
                "metadata": {
                    "labels": labels,
                    "annotations": {
                        "harvesterhci.io/waitForLeaseInterfaceNames": format!("[\"{}\"]", NIC),
                    },
                },
                "spec": {
                    "domain": {
                        "cpu": { "cores": spec.cpu_cores },
                        "devices": {
                            "disks": [
                                { "name": ROOT_DISK, "bootOrder": 1, "disk": { "bus": "virtio" } },
                                { "name": CLOUD_INIT_DISK, "disk": { "bus": "virtio" } },
                            ],
                            "interfaces": [
                                { "name": NIC, "model": "virtio", "bridge": {} },
                            ],
                        },
                        "features": { "acpi": {} },
                        "machine": { "type": "q35" },
                        "resources": {
                            "requests": { "memory": spec.memory },
                        },
                    },
                    "evictionStrategy": "LiveMigrate",
                    "networks": [
                        { "name": NIC, "multus": { "networkName": spec.network } },
                    ],
                    "terminationGracePeriodSeconds": 120,
                    "volumes": [
                        {
                            "name": ROOT_DISK,
                            "persistentVolumeClaim": { "claimName": spec.root_volume },
                        },
                        {
                            "name": CLOUD_INIT_DISK,
                            "cloudInitNoCloud": render_cloud_init(&spec.cloud_init),
                        },
                    ],
                },
            },
        },
    })
}

// ============ Response Views ============

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ObjectMeta {
    name: Option<String>,
    namespace: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ImageView {
    metadata: ObjectMeta,
    spec: ImageSpecView,
    status: ImageStatusView,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ImageSpecView {
    checksum: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ImageStatusView {
    progress: Option<i64>,
    conditions: Vec<ConditionView>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConditionView {
    #[serde(rename = "type")]
    kind: String,
    status: String,
    reason: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PhaseStatusView {
    phase: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PhaseView {
    metadata: ObjectMeta,
    status: PhaseStatusView,
}

fn decode<T: serde::de::DeserializeOwned>(body: Value, what: &str) -> Result<T, CloudError> {
    serde_json::from_value(body)
        .map_err(|e| CloudError::InvalidResponse(format!("malformed {}: {}", what, e)))
}

pub fn parse_image(body: Value) -> Result<RemoteImage, CloudError> {
    let view: ImageView = decode(body, "image")?;

    let failure = view
        .status
        .conditions
        .iter()
        .find(|c| c.kind == "Imported" && c.status == "False")
        .and_then(|c| c.message.clone().or_else(|| c.reason.clone()))
        .filter(|m| !m.is_empty());

    Ok(RemoteImage {
        name: view.metadata.name.unwrap_or_default(),
        namespace: view.metadata.namespace.unwrap_or_default(),
        checksum: view.spec.checksum,
        progress: view.status.progress.map(|p| p.clamp(0, 100) as u8),
        failure,
    })
}

pub fn parse_volume(body: Value) -> Result<VolumeResource, CloudError> {
    let view: PhaseView = decode(body, "volume")?;
    Ok(VolumeResource {
        name: view.metadata.name.unwrap_or_default(),
        namespace: view.metadata.namespace.unwrap_or_default(),
        phase: view.status.phase,
    })
}

pub fn parse_vm(body: Value) -> Result<VmResource, CloudError> {
    let view: PhaseView = decode(body, "virtual machine")?;
    Ok(VmResource {
        name: view.metadata.name.unwrap_or_default(),
        namespace: view.metadata.namespace.unwrap_or_default(),
    })
}

pub fn parse_vm_instance(body: Value) -> Result<VmInstance, CloudError> {
    let view: PhaseView = decode(body, "virtual machine instance")?;
    Ok(VmInstance {
        name: view.metadata.name.unwrap_or_default(),
        namespace: view.metadata.namespace.unwrap_or_default(),
        phase: view.status.phase.filter(|p| !p.is_empty()),
    })
}
