use async_trait::async_trait;
use harvestflow_build::{BuildSettings, ProgressSink, Stage};
use harvestflow_cloud::{
    AuthStatus, CloudError, DesiredImage, ImageSpec, RemoteImage, ResourceClient, ResourceKind,
    VmInstance, VmResource, VmSpec, VolumeResource, VolumeSpec,
};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;

pub const URL: &str = "https://example.com/img1.qcow2";

/// In-memory remote system with scripted status progressions
pub struct FakeClient {
    state: Mutex<FakeState>,
}

pub struct FakeState {
    pub images: HashMap<String, RemoteImage>,
    pub volumes: HashMap<String, VolumeResource>,
    pub vms: HashMap<String, VmResource>,

    /// Progress reported by successive reads of a created image
    pub download: VecDeque<Option<u8>>,
    pub import_failure: Option<String>,

    /// Phases reported by successive instance reads; the last one repeats
    pub vm_phases: VecDeque<Option<String>>,

    /// Image creates are refused with a conflict although reads say absent
    pub conflict_on_create: bool,

    pub volume_name: String,
    pub vm_name: String,
    pub fail_delete: HashSet<ResourceKind>,

    /// Deletes of these kinds never complete
    pub hang_delete: HashSet<ResourceKind>,

    /// Every call, e.g. `create_volume build` or `delete_vm packer-vm01`
    pub calls: Vec<String>,
}

impl FakeClient {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                images: HashMap::new(),
                volumes: HashMap::new(),
                vms: HashMap::new(),
                download: VecDeque::from([None, Some(40), Some(100)]),
                import_failure: None,
                vm_phases: VecDeque::from([
                    Some("Scheduling".to_string()),
                    Some("Running".to_string()),
                ]),
                volume_name: "packer-vol01".to_string(),
                vm_name: "packer-vm01".to_string(),
                conflict_on_create: false,
                fail_delete: HashSet::new(),
                hang_delete: HashSet::new(),
                calls: Vec::new(),
            }),
        }
    }

    pub fn with_image(self, name: &str, checksum: Option<&str>) -> Self {
        self.state().images.insert(
            name.to_string(),
            RemoteImage {
                name: name.to_string(),
                namespace: "default".to_string(),
                checksum: checksum.map(str::to_string),
                progress: Some(100),
                failure: None,
            },
        );
        self
    }

    pub fn state(&self) -> std::sync::MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state().calls.clone()
    }

    /// Create and delete calls only, without arguments
    pub fn mutations(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|c| c.starts_with("create_") || c.starts_with("delete_"))
            .map(|c| c.split(' ').next().unwrap().to_string())
            .collect()
    }

    pub fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(call)).count()
    }

    fn log(&self, call: String) {
        self.state().calls.push(call);
    }

    /// Scripted delete behaviour for `kind`
    async fn delete_fault(&self, kind: ResourceKind) -> harvestflow_cloud::Result<()> {
        let (hang, refuse) = {
            let state = self.state();
            (state.hang_delete.contains(&kind), state.fail_delete.contains(&kind))
        };
        if hang {
            std::future::pending::<()>().await;
        }
        if refuse {
            return Err(CloudError::Api {
                status: 500,
                message: "delete refused".to_string(),
            });
        }
        Ok(())
    }
}

fn not_found(kind: &str, name: &str) -> CloudError {
    CloudError::NotFound(format!("{} {}", kind, name))
}

#[async_trait]
impl ResourceClient for FakeClient {
    fn name(&self) -> &str {
        "fake"
    }

    async fn check_auth(&self) -> harvestflow_cloud::Result<AuthStatus> {
        Ok(AuthStatus::ok("fake"))
    }

    async fn create_image(
        &self,
        namespace: &str,
        spec: &ImageSpec,
    ) -> harvestflow_cloud::Result<RemoteImage> {
        self.log(format!("create_image {}", spec.name));
        let mut state = self.state();
        if state.conflict_on_create || state.images.contains_key(&spec.name) {
            return Err(CloudError::AlreadyExists(spec.name.clone()));
        }
        let image = RemoteImage {
            name: spec.name.clone(),
            namespace: namespace.to_string(),
            checksum: spec.checksum.clone(),
            progress: None,
            failure: None,
        };
        state.images.insert(spec.name.clone(), image.clone());
        Ok(image)
    }

    async fn read_image(
        &self,
        _namespace: &str,
        name: &str,
    ) -> harvestflow_cloud::Result<RemoteImage> {
        self.log(format!("read_image {}", name));
        let mut state = self.state();
        let downloading = match state.images.get(name) {
            None => return Err(not_found("image", name)),
            Some(image) => image.progress != Some(100),
        };

        if downloading {
            let step = if state.download.len() > 1 {
                state.download.pop_front().flatten()
            } else {
                state.download.front().cloned().flatten()
            };
            let failure = state.import_failure.clone();
            if let Some(image) = state.images.get_mut(name) {
                image.progress = step;
                image.failure = failure;
            }
        }

        state
            .images
            .get(name)
            .cloned()
            .ok_or_else(|| not_found("image", name))
    }

    async fn delete_image(&self, _namespace: &str, name: &str) -> harvestflow_cloud::Result<()> {
        self.log(format!("delete_image {}", name));
        self.delete_fault(ResourceKind::Image).await?;
        let mut state = self.state();
        state
            .images
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| not_found("image", name))
    }

    async fn create_volume(
        &self,
        namespace: &str,
        spec: &VolumeSpec,
    ) -> harvestflow_cloud::Result<VolumeResource> {
        self.log(format!("create_volume {} {}", namespace, spec.storage_class));
        let mut state = self.state();
        let volume = VolumeResource {
            name: state.volume_name.clone(),
            namespace: namespace.to_string(),
            phase: Some("Pending".to_string()),
        };
        if !volume.name.is_empty() {
            state.volumes.insert(volume.name.clone(), volume.clone());
        }
        Ok(volume)
    }

    async fn read_volume(
        &self,
        _namespace: &str,
        name: &str,
    ) -> harvestflow_cloud::Result<VolumeResource> {
        self.log(format!("read_volume {}", name));
        self.state()
            .volumes
            .get(name)
            .cloned()
            .ok_or_else(|| not_found("volume", name))
    }

    async fn delete_volume(&self, _namespace: &str, name: &str) -> harvestflow_cloud::Result<()> {
        self.log(format!("delete_volume {}", name));
        self.delete_fault(ResourceKind::Volume).await?;
        let mut state = self.state();
        state
            .volumes
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| not_found("volume", name))
    }

    async fn create_vm(
        &self,
        namespace: &str,
        spec: &VmSpec,
    ) -> harvestflow_cloud::Result<VmResource> {
        self.log(format!("create_vm {} {}", namespace, spec.root_volume));
        let mut state = self.state();
        let vm = VmResource {
            name: state.vm_name.clone(),
            namespace: namespace.to_string(),
        };
        if !vm.name.is_empty() {
            state.vms.insert(vm.name.clone(), vm.clone());
        }
        Ok(vm)
    }

    async fn read_vm(&self, _namespace: &str, name: &str) -> harvestflow_cloud::Result<VmResource> {
        self.log(format!("read_vm {}", name));
        self.state()
            .vms
            .get(name)
            .cloned()
            .ok_or_else(|| not_found("vm", name))
    }

    async fn read_vm_instance(
        &self,
        namespace: &str,
        name: &str,
    ) -> harvestflow_cloud::Result<VmInstance> {
        self.log(format!("read_vm_instance {}", name));
        let mut state = self.state();
        if !state.vms.contains_key(name) {
            return Err(not_found("vmi", name));
        }
        let phase = if state.vm_phases.len() > 1 {
            state.vm_phases.pop_front().flatten()
        } else {
            state.vm_phases.front().cloned().flatten()
        };
        Ok(VmInstance {
            name: name.to_string(),
            namespace: namespace.to_string(),
            phase,
        })
    }

    async fn delete_vm(&self, _namespace: &str, name: &str) -> harvestflow_cloud::Result<()> {
        self.log(format!("delete_vm {}", name));
        self.delete_fault(ResourceKind::VirtualMachine).await?;
        let mut state = self.state();
        state
            .vms
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| not_found("vm", name))
    }
}

/// Sink that keeps every message for inspection
#[derive(Default)]
pub struct RecordingSink {
    pub said: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<String>>,
    pub progress: Mutex<Vec<(Stage, Option<u8>)>>,
}

impl RecordingSink {
    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().unwrap().clone()
    }

    pub fn said(&self) -> Vec<String> {
        self.said.lock().unwrap().clone()
    }
}

impl ProgressSink for RecordingSink {
    fn say(&self, message: &str) {
        self.said.lock().unwrap().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }

    fn progress(&self, stage: Stage, percent: Option<u8>, _message: &str) {
        self.progress.lock().unwrap().push((stage, percent));
    }
}

pub fn settings(url: Option<&str>, checksum: Option<&str>) -> BuildSettings {
    let mut image = DesiredImage::new("img1", "default");
    image.url = url.map(str::to_string);
    image.checksum = checksum.map(str::to_string);
    BuildSettings::new(image, "build", "harvester-public/lab")
}
