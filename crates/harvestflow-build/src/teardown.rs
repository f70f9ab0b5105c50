//! Teardown: delete what the run created and confirm it is gone
//!
//! Runs for every build regardless of outcome. Deletion is best-effort and
//! exhaustive: a failure on one resource is reported and the next one is
//! still attempted. Waits use their own token so a cancelled build is
//! still cleaned up.

use crate::context::{RunContext, Tracked};
use harvestflow_cloud::{
    ActionType, CancelToken, ResourceKind, TeardownReport, WaitError, WaitOptions,
    wait_for_absence,
};
use std::future::Future;
use std::time::Instant;

/// Delete, then wait until reads report not-found
///
/// The delete call and the confirmation each get the full teardown timeout.
async fn remove<S, D, R, Fut>(delete: D, read: R, options: &WaitOptions) -> Result<String, String>
where
    D: Future<Output = harvestflow_cloud::Result<()>>,
    R: FnMut() -> Fut,
    Fut: Future<Output = harvestflow_cloud::Result<S>>,
{
    match tokio::time::timeout(options.timeout, delete).await {
        Err(_) => {
            return Err(format!("delete not acknowledged within {:?}", options.timeout));
        }
        Ok(Ok(())) => {}
        Ok(Err(e)) if e.is_not_found() => return Ok("already absent".to_string()),
        Ok(Err(e)) => return Err(format!("delete failed: {}", e)),
    }

    match wait_for_absence(read, |_| {}, options, &CancelToken::never()).await {
        Ok(()) => Ok("deleted".to_string()),
        Err(WaitError::Timeout(_)) => {
            Err(format!("deletion not observed within {:?}", options.timeout))
        }
        Err(WaitError::Read(e)) => Err(format!("confirming deletion failed: {}", e)),
        Err(WaitError::Cancelled) => Err("confirming deletion was cancelled".to_string()),
        Err(WaitError::Fatal(_)) => Err("resource reached an unexpected state".to_string()),
    }
}

fn settle(
    ctx: &mut RunContext<'_>,
    report: &mut TeardownReport,
    kind: ResourceKind,
    namespace: &str,
    name: &str,
    outcome: Result<String, String>,
) {
    let sink = ctx.sink();
    match outcome {
        Ok(message) => {
            ctx.record(ActionType::Delete, kind, namespace, name);
            sink.say(&format!("Deleted {} {}/{} ({})", kind, namespace, name, message));
            report.add_success(kind, name, message);
        }
        Err(error) => {
            tracing::warn!("Teardown of {} {}/{} failed: {}", kind, namespace, name, error);
            sink.error(&format!(
                "Failed to delete {} {}/{}: {}",
                kind, namespace, name, error
            ));
            report.add_failure(kind, name, error);
        }
    }
}

fn unidentified(ctx: &RunContext<'_>, report: &mut TeardownReport, kind: ResourceKind) {
    let error = format!(
        "no name was recorded for the created {}; it may need manual cleanup",
        kind
    );
    tracing::warn!("{}", error);
    ctx.sink().error(&error);
    report.add_failure(kind, "", error);
}

/// Tear down VM, then volume, then the source image when cleanup is on
pub async fn teardown(ctx: &mut RunContext<'_>) -> TeardownReport {
    let started = Instant::now();
    let settings = ctx.settings;
    let client = ctx.client();
    let options = settings.teardown_wait;
    let namespace = settings.namespace.as_str();
    let mut report = TeardownReport::new();

    let cleanup_image = settings.cleanup_image && matches!(ctx.image, Tracked::Created(_));
    if !ctx.vm.needs_teardown() && !ctx.volume.needs_teardown() && !cleanup_image {
        tracing::debug!("Nothing to tear down");
        return report;
    }
    ctx.sink().say("Tearing down build resources");

    match ctx.vm.clone() {
        Tracked::Untracked => {}
        Tracked::Unidentified => unidentified(ctx, &mut report, ResourceKind::VirtualMachine),
        Tracked::Created(name) => {
            let outcome = remove(
                client.delete_vm(namespace, &name),
                || client.read_vm(namespace, &name),
                &options,
            )
            .await;
            settle(ctx, &mut report, ResourceKind::VirtualMachine, namespace, &name, outcome);
        }
    }

    match ctx.volume.clone() {
        Tracked::Untracked => {}
        Tracked::Unidentified => unidentified(ctx, &mut report, ResourceKind::Volume),
        Tracked::Created(name) => {
            let outcome = remove(
                client.delete_volume(namespace, &name),
                || client.read_volume(namespace, &name),
                &options,
            )
            .await;
            settle(ctx, &mut report, ResourceKind::Volume, namespace, &name, outcome);
        }
    }

    if cleanup_image {
        if let Tracked::Created(name) = ctx.image.clone() {
            let image_namespace = settings.image.namespace.as_str();
            let outcome = remove(
                client.delete_image(image_namespace, &name),
                || client.read_image(image_namespace, &name),
                &options,
            )
            .await;
            settle(ctx, &mut report, ResourceKind::Image, image_namespace, &name, outcome);
        }
    }

    report.duration_ms = started.elapsed().as_millis() as u64;
    report
}

