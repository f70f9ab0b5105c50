//! Per-run state shared by the pipeline stages

use crate::error::{BuildError, Result, Stage};
use crate::progress::ProgressSink;
use crate::settings::BuildSettings;
use harvestflow_cloud::{Action, ActionType, CancelToken, ResourceClient, ResourceKind};
use std::future::Future;

/// What a run knows about a resource it may have created
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Tracked {
    /// No create call succeeded
    #[default]
    Untracked,
    /// Created, with the name the remote system assigned
    Created(String),
    /// The create call succeeded but returned no usable name
    Unidentified,
}

impl Tracked {
    pub fn name(&self) -> Option<&str> {
        match self {
            Tracked::Created(name) => Some(name),
            _ => None,
        }
    }

    pub fn needs_teardown(&self) -> bool {
        !matches!(self, Tracked::Untracked)
    }
}

/// Mutable state of one build, owned by a single orchestration run
pub struct RunContext<'a> {
    pub settings: &'a BuildSettings,
    client: &'a dyn ResourceClient,
    sink: &'a dyn ProgressSink,
    cancel: CancelToken,

    pub image: Tracked,
    pub volume: Tracked,
    pub vm: Tracked,

    actions: Vec<Action>,
}

impl<'a> RunContext<'a> {
    pub fn new(
        settings: &'a BuildSettings,
        client: &'a dyn ResourceClient,
        sink: &'a dyn ProgressSink,
        cancel: CancelToken,
    ) -> Self {
        Self {
            settings,
            client,
            sink,
            cancel,
            image: Tracked::Untracked,
            volume: Tracked::Untracked,
            vm: Tracked::Untracked,
            actions: Vec::new(),
        }
    }

    pub fn client(&self) -> &'a dyn ResourceClient {
        self.client
    }

    pub fn sink(&self) -> &'a dyn ProgressSink {
        self.sink
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Actions recorded so far, in order
    pub fn actions(&self) -> &[Action] {
        &self.actions
    }

    pub(crate) fn record(
        &mut self,
        action_type: ActionType,
        kind: ResourceKind,
        namespace: &str,
        name: &str,
    ) {
        tracing::debug!("{} {} {}/{}", action_type, kind, namespace, name);
        self.actions
            .push(Action::new(action_type, kind, namespace, name));
    }

    /// Run a client call unless the build is cancelled first
    pub(crate) async fn call<T, F>(
        &self,
        stage: Stage,
        call: F,
    ) -> Result<harvestflow_cloud::Result<T>>
    where
        F: Future<Output = harvestflow_cloud::Result<T>>,
    {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(BuildError::Cancelled { stage }),
            result = call => Ok(result),
        }
    }

    /// Like [`call`](Self::call), treating every client error as fatal
    pub(crate) async fn remote<T, F>(&self, stage: Stage, call: F) -> Result<T>
    where
        F: Future<Output = harvestflow_cloud::Result<T>>,
    {
        self.call(stage, call).await?.map_err(BuildError::remote(stage))
    }

    /// Sleep unless the build is cancelled first
    pub(crate) async fn sleep(&self, stage: Stage, duration: std::time::Duration) -> Result<()> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(BuildError::Cancelled { stage }),
            _ = tokio::time::sleep(duration) => Ok(()),
        }
    }
}
