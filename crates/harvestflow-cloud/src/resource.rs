//! Resource model shared by the orchestrator and client implementations
//!
//! Identifiers are opaque strings assigned by the remote system. They are
//! stored and re-submitted, never parsed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Storage class prefix the hypervisor uses for image-backed volumes
const IMAGE_STORAGE_CLASS_PREFIX: &str = "longhorn-";

/// Kind of remote resource managed by a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Image,
    Volume,
    VirtualMachine,
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceKind::Image => write!(f, "image"),
            ResourceKind::Volume => write!(f, "volume"),
            ResourceKind::VirtualMachine => write!(f, "virtual machine"),
        }
    }
}

/// The image a build wants to boot from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DesiredImage {
    pub name: String,
    pub display_name: String,
    pub os_type: String,
    pub url: Option<String>,
    pub checksum: Option<String>,
    pub namespace: String,
}

impl DesiredImage {
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            os_type: String::new(),
            url: None,
            checksum: None,
            namespace: namespace.into(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn with_checksum(mut self, checksum: impl Into<String>) -> Self {
        self.checksum = Some(checksum.into());
        self
    }

    pub fn with_display_name(mut self, display_name: impl Into<String>) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn with_os_type(mut self, os_type: impl Into<String>) -> Self {
        self.os_type = os_type.into();
        self
    }

    /// Source URL, treating an empty string as absent
    pub fn source_url(&self) -> Option<&str> {
        self.url.as_deref().filter(|u| !u.is_empty())
    }

    /// Expected checksum, treating an empty string as absent
    pub fn expected_checksum(&self) -> Option<&str> {
        self.checksum.as_deref().filter(|c| !c.is_empty())
    }

    /// Render the create request for this image
    pub fn to_spec(&self) -> Option<ImageSpec> {
        let url = self.source_url()?;
        Some(ImageSpec {
            name: self.name.clone(),
            display_name: self.display_name.clone(),
            os_type: self.os_type.clone(),
            url: url.to_string(),
            checksum: self.expected_checksum().map(str::to_string),
        })
    }
}

/// Create request for an image downloaded from a URL
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSpec {
    pub name: String,
    pub display_name: String,
    pub os_type: String,
    pub url: String,
    pub checksum: Option<String>,
}

/// Image as reported by the remote catalog
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteImage {
    pub name: String,
    pub namespace: String,

    /// Set once the download begins
    pub checksum: Option<String>,

    /// 0-100, absent until the download starts
    pub progress: Option<u8>,

    /// Import failure reported by the remote system
    pub failure: Option<String>,
}

impl RemoteImage {
    /// Checksum, treating an empty string as unset
    pub fn recorded_checksum(&self) -> Option<&str> {
        self.checksum.as_deref().filter(|c| !c.is_empty())
    }

    /// Download progress, where a missing field counts as 0
    pub fn progress_percent(&self) -> u8 {
        self.progress.unwrap_or(0)
    }

    pub fn is_downloaded(&self) -> bool {
        self.progress_percent() >= 100
    }

    pub fn is_failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// Derive the storage class backing volumes created from `image_name`.
///
/// The same image always yields the same class, so volumes cloned from one
/// image share placement.
pub fn storage_class_for_image(image_name: &str) -> String {
    format!("{}{}", IMAGE_STORAGE_CLASS_PREFIX, image_name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessMode {
    ReadWriteOnce,
    ReadWriteMany,
}

impl AccessMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessMode::ReadWriteOnce => "ReadWriteOnce",
            AccessMode::ReadWriteMany => "ReadWriteMany",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VolumeMode {
    Block,
    Filesystem,
}

impl VolumeMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            VolumeMode::Block => "Block",
            VolumeMode::Filesystem => "Filesystem",
        }
    }
}

/// Create request for a block volume cloned from an image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeSpec {
    /// Prefix for the remote-generated name
    pub generate_name: String,
    pub size: String,
    pub storage_class: String,

    /// `<namespace>/<image name>` of the source image
    pub image_id: String,
    pub access_mode: AccessMode,
    pub volume_mode: VolumeMode,
}

impl VolumeSpec {
    pub fn for_image(
        generate_name: impl Into<String>,
        size: impl Into<String>,
        image_namespace: &str,
        image_name: &str,
    ) -> Self {
        Self {
            generate_name: generate_name.into(),
            size: size.into(),
            storage_class: storage_class_for_image(image_name),
            image_id: format!("{}/{}", image_namespace, image_name),
            access_mode: AccessMode::ReadWriteMany,
            volume_mode: VolumeMode::Block,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VolumeResource {
    /// Remote-generated name; empty when the response carried none
    pub name: String,
    pub namespace: String,
    pub phase: Option<String>,
}

/// Cloud-init source attached as the second disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CloudInit {
    /// Reference a pre-existing secret holding user and network data
    SecretRef(String),
    /// Inline user data
    UserData(String),
}

impl Default for CloudInit {
    fn default() -> Self {
        CloudInit::UserData("#cloud-config\n".to_string())
    }
}

/// Create request for the builder VM
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmSpec {
    pub generate_name: String,
    pub cpu_cores: u32,
    pub memory: String,

    /// Multus network as `<namespace>/<name>`
    pub network: String,

    /// Name of the volume mounted as root disk
    pub root_volume: String,
    pub cloud_init: CloudInit,
    pub labels: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmResource {
    /// Remote-generated name; empty when the response carried none
    pub name: String,
    pub namespace: String,
}

/// Phase a VM instance reports once booted
pub const VM_PHASE_RUNNING: &str = "Running";

/// Phase a VM instance reports when it can no longer boot
pub const VM_PHASE_FAILED: &str = "Failed";

/// Running instance backing a VM
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmInstance {
    pub name: String,
    pub namespace: String,

    /// Absent until the instance is scheduled
    pub phase: Option<String>,
}

impl VmInstance {
    pub fn phase(&self) -> &str {
        self.phase.as_deref().unwrap_or("")
    }

    pub fn is_running(&self) -> bool {
        self.phase() == VM_PHASE_RUNNING
    }

    pub fn is_failed(&self) -> bool {
        self.phase() == VM_PHASE_FAILED
    }
}
