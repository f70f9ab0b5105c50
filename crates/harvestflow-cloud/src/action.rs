//! Action bookkeeping for a provisioning run

use crate::resource::ResourceKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An action taken against a remote resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    /// Type of action performed
    pub action_type: ActionType,

    pub kind: ResourceKind,

    pub namespace: String,

    /// Remote name of the resource
    pub name: String,

    pub at: DateTime<Utc>,
}

impl Action {
    pub fn new(
        action_type: ActionType,
        kind: ResourceKind,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            action_type,
            kind,
            namespace: namespace.into(),
            name: name.into(),
            at: Utc::now(),
        }
    }

    /// `<namespace>/<name>`
    pub fn qualified_name(&self) -> String {
        format!("{}/{}", self.namespace, self.name)
    }
}

/// Type of action performed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// A new resource was created
    Create,
    /// An existing resource was reused as-is
    Reuse,
    /// A resource was deleted
    Delete,
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionType::Create => write!(f, "create"),
            ActionType::Reuse => write!(f, "reuse"),
            ActionType::Delete => write!(f, "delete"),
        }
    }
}

/// Result of a teardown pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TeardownReport {
    /// Resources deleted and confirmed absent
    pub succeeded: Vec<ActionResult>,

    /// Resources that could not be deleted or confirmed
    pub failed: Vec<ActionResult>,

    /// Total execution time in milliseconds
    pub duration_ms: u64,
}

impl TeardownReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn add_success(&mut self, kind: ResourceKind, name: impl Into<String>, message: String) {
        self.succeeded.push(ActionResult {
            kind,
            name: name.into(),
            success: true,
            message,
            error: None,
        });
    }

    pub fn add_failure(&mut self, kind: ResourceKind, name: impl Into<String>, error: String) {
        self.failed.push(ActionResult {
            kind,
            name: name.into(),
            success: false,
            message: String::new(),
            error: Some(error),
        });
    }
}

/// Result of a single teardown action
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub kind: ResourceKind,

    /// Remote name, empty when the resource never reported one
    pub name: String,

    /// Whether the action succeeded
    pub success: bool,

    /// Success message
    pub message: String,

    /// Error message if failed
    pub error: Option<String>,
}

/// Summary of actions taken in a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActionSummary {
    pub create: usize,
    pub reuse: usize,
    pub delete: usize,
}

impl ActionSummary {
    pub fn from_actions<'a>(actions: impl IntoIterator<Item = &'a Action>) -> Self {
        let mut summary = Self::default();
        for action in actions {
            match action.action_type {
                ActionType::Create => summary.create += 1,
                ActionType::Reuse => summary.reuse += 1,
                ActionType::Delete => summary.delete += 1,
            }
        }
        summary
    }
}

impl std::fmt::Display for ActionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} created, {} reused, {} deleted",
            self.create, self.reuse, self.delete
        )
    }
}
