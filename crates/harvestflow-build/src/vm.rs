//! VM stage: boot the builder VM on the provisioned volume

use crate::context::{RunContext, Tracked};
use crate::error::{BuildError, Result, Stage};
use crate::volume::ProvisionedVolume;
use harvestflow_cloud::{ActionType, ResourceKind, VM_PHASE_RUNNING, VmInstance, wait_for};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunningVm {
    pub name: String,
    pub namespace: String,
}

pub async fn create_vm(ctx: &mut RunContext<'_>, volume: &ProvisionedVolume) -> Result<RunningVm> {
    let settings = ctx.settings;
    let options = settings.vm_wait;
    let client = ctx.client();
    let sink = ctx.sink();
    let namespace = settings.namespace.as_str();
    let spec = settings.vm_spec(&volume.name);

    sink.say(&format!(
        "Creating builder VM in {} ({} cpu, {}) on volume {}",
        namespace, spec.cpu_cores, spec.memory, volume.name
    ));
    let created = ctx
        .remote(Stage::VirtualMachine, client.create_vm(namespace, &spec))
        .await?;

    if created.name.is_empty() {
        ctx.vm = Tracked::Unidentified;
        return Err(BuildError::MissingIdentifier {
            stage: Stage::VirtualMachine,
            kind: ResourceKind::VirtualMachine,
        });
    }

    let name = created.name;
    ctx.vm = Tracked::Created(name.clone());
    ctx.record(ActionType::Create, ResourceKind::VirtualMachine, namespace, &name);

    sink.say(&format!(
        "Waiting for VM {}/{} to report as {}",
        namespace, name, VM_PHASE_RUNNING
    ));

    // The instance is not readable until the controller has indexed it
    ctx.sleep(Stage::VirtualMachine, settings.vm_grace).await?;

    wait_for(
        || client.read_vm_instance(namespace, &name),
        VmInstance::is_running,
        VmInstance::is_failed,
        |instance| {
            let phase = instance.phase.as_deref().unwrap_or("Pending");
            sink.progress(
                Stage::VirtualMachine,
                None,
                &format!("Waiting for VM to be ready ({})", phase),
            )
        },
        &options,
        ctx.cancel_token(),
    )
    .await
    .map_err(|e| {
        BuildError::from_wait(
            Stage::VirtualMachine,
            format!("VM {} to report as {}", name, VM_PHASE_RUNNING),
            options.timeout,
            e,
            |instance| format!("VM {} entered phase {}", name, instance.phase()),
        )
    })?;

    sink.say(&format!("VM {}/{} is running", namespace, name));
    Ok(RunningVm {
        name,
        namespace: namespace.to_string(),
    })
}
