use crate::reconcile::ReconcileFailure;
use harvestflow_cloud::{CloudError, ResourceKind, WaitError};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Pipeline stage a failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Image,
    Volume,
    VirtualMachine,
    Provision,
    Teardown,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Image => write!(f, "image"),
            Stage::Volume => write!(f, "volume"),
            Stage::VirtualMachine => write!(f, "virtual machine"),
            Stage::Provision => write!(f, "provision"),
            Stage::Teardown => write!(f, "teardown"),
        }
    }
}

#[derive(Debug, Error)]
pub enum BuildError {
    /// Rejected before any remote call
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("image stage failed: {0}")]
    Reconcile(#[from] ReconcileFailure),

    #[error("{stage} stage failed: remote error: {source}")]
    Remote {
        stage: Stage,
        #[source]
        source: CloudError,
    },

    #[error("{stage} stage failed: timed out after {timeout:?} waiting for {waiting_for}")]
    Timeout {
        stage: Stage,
        waiting_for: String,
        timeout: Duration,
    },

    #[error("{stage} stage failed: {detail}")]
    FatalStatus { stage: Stage, detail: String },

    #[error("{stage} stage failed: remote system returned no name for the created {kind}")]
    MissingIdentifier { stage: Stage, kind: ResourceKind },

    #[error("{stage} stage cancelled")]
    Cancelled { stage: Stage },

    #[error("provision stage failed: {0:#}")]
    Provision(anyhow::Error),
}

impl BuildError {
    pub fn stage(&self) -> Stage {
        match self {
            BuildError::InvalidInput(_) | BuildError::Reconcile(_) => Stage::Image,
            BuildError::Remote { stage, .. }
            | BuildError::Timeout { stage, .. }
            | BuildError::FatalStatus { stage, .. }
            | BuildError::MissingIdentifier { stage, .. }
            | BuildError::Cancelled { stage } => *stage,
            BuildError::Provision(_) => Stage::Provision,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, BuildError::Timeout { .. })
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, BuildError::Cancelled { .. })
    }

    pub(crate) fn remote(stage: Stage) -> impl FnOnce(CloudError) -> Self {
        move |source| BuildError::Remote { stage, source }
    }

    /// Translate a failed wait, rendering fatal statuses with `describe`
    pub(crate) fn from_wait<S>(
        stage: Stage,
        waiting_for: impl Into<String>,
        timeout: Duration,
        err: WaitError<S>,
        describe: impl FnOnce(S) -> String,
    ) -> Self {
        match err {
            WaitError::Fatal(status) => BuildError::FatalStatus {
                stage,
                detail: describe(status),
            },
            WaitError::Timeout(_) => BuildError::Timeout {
                stage,
                waiting_for: waiting_for.into(),
                timeout,
            },
            WaitError::Cancelled => BuildError::Cancelled { stage },
            WaitError::Read(source) => BuildError::Remote { stage, source },
        }
    }
}

pub type Result<T> = std::result::Result<T, BuildError>;
