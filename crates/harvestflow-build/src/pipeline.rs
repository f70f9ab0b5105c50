//! Build orchestrator
//!
//! Runs image → volume → VM → provision hook strictly in sequence, then
//! tears down whatever the run created, whether the stages succeeded or not.

use crate::context::RunContext;
use crate::error::{BuildError, Result, Stage};
use crate::image::{ReconciledImage, ensure_image};
use crate::progress::{ProgressSink, TracingSink};
use crate::settings::{BuildSettings, ExportTarget};
use crate::teardown::teardown;
use crate::vm::{RunningVm, create_vm};
use crate::volume::{ProvisionedVolume, create_volume};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use harvestflow_cloud::{Action, ActionSummary, CancelToken, ResourceClient, TeardownReport};
use serde::Serialize;
use std::sync::Arc;

/// What a provisioning step gets to work with
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionTarget {
    pub image: ReconciledImage,
    pub volume: ProvisionedVolume,
    pub vm: RunningVm,
    pub export: ExportTarget,
}

/// Step run against the booted builder VM before teardown
///
/// An error halts the build; teardown still runs.
#[async_trait]
pub trait ProvisionHook: Send + Sync {
    async fn provision(&self, target: &ProvisionTarget) -> anyhow::Result<()>;
}

/// Result of a successful build
#[derive(Debug, Clone, Serialize)]
pub struct BuildArtifact {
    /// Namespace holding the builder volume and VM
    pub namespace: String,
    pub image: ReconciledImage,
    pub volume: String,
    pub vm: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub actions: Vec<Action>,
    pub teardown: TeardownReport,
}

impl BuildArtifact {
    pub fn summary(&self) -> ActionSummary {
        ActionSummary::from_actions(&self.actions)
    }
}

pub struct Orchestrator {
    client: Arc<dyn ResourceClient>,
    sink: Arc<dyn ProgressSink>,
    hook: Option<Arc<dyn ProvisionHook>>,
}

impl Orchestrator {
    pub fn new(client: Arc<dyn ResourceClient>) -> Self {
        Self {
            client,
            sink: Arc::new(TracingSink),
            hook: None,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_hook(mut self, hook: Arc<dyn ProvisionHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Run one build.
    ///
    /// On failure the returned error is the first fatal condition; teardown
    /// problems are reported through the sink and never replace it.
    pub async fn run(
        &self,
        settings: &BuildSettings,
        cancel: CancelToken,
    ) -> Result<BuildArtifact> {
        let started_at = Utc::now();

        if let Err(e) = settings.validate() {
            self.sink.error(&e.to_string());
            return Err(e);
        }

        tracing::info!(
            "Starting build with {} in namespace {}",
            self.client.name(),
            settings.namespace
        );
        let mut ctx = RunContext::new(settings, self.client.as_ref(), self.sink.as_ref(), cancel);

        let outcome = self.stages(&mut ctx).await;
        if let Err(e) = &outcome {
            self.sink.error(&format!("Build failed: {}", e));
        }

        let report = teardown(&mut ctx).await;
        if !report.is_success() {
            tracing::warn!(
                "Teardown left {} resource(s) behind",
                report.failed.len()
            );
        }

        let (image, volume, vm) = outcome?;
        let artifact = BuildArtifact {
            namespace: settings.namespace.clone(),
            image,
            volume: volume.name,
            vm: vm.name,
            started_at,
            finished_at: Utc::now(),
            actions: ctx.actions().to_vec(),
            teardown: report,
        };
        self.sink
            .say(&format!("Build finished: {}", artifact.summary()));
        Ok(artifact)
    }

    async fn stages(
        &self,
        ctx: &mut RunContext<'_>,
    ) -> Result<(ReconciledImage, ProvisionedVolume, RunningVm)> {
        let image = ensure_image(ctx).await?;
        let volume = create_volume(ctx, &image).await?;
        let vm = create_vm(ctx, &volume).await?;

        if let Some(hook) = &self.hook {
            let target = ProvisionTarget {
                image: image.clone(),
                volume: volume.clone(),
                vm: vm.clone(),
                export: ctx.settings.target.clone(),
            };
            ctx.sink()
                .say(&format!("Provisioning VM {}/{}", vm.namespace, vm.name));
            tokio::select! {
                biased;
                _ = ctx.cancel_token().cancelled() => {
                    return Err(BuildError::Cancelled { stage: Stage::Provision });
                }
                result = hook.provision(&target) => result.map_err(BuildError::Provision)?,
            }
        }

        Ok((image, volume, vm))
    }
}
