//! HarvestFlow Cloud Resources
//!
//! This crate provides the remote resource model for HarvestFlow, the
//! client abstraction the orchestrator talks to, and the polling wait
//! engine used to observe state changes on the remote system.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                harvestflow-build                 │
//! │  image → volume → vm → (provision) → teardown   │
//! └─────────────────┬───────────────────────────────┘
//!                   │
//! ┌─────────────────▼───────────────────────────────┐
//! │               harvestflow-cloud                  │
//! │  ┌──────────────────────────────────────────┐   │
//! │  │          Client Abstraction               │   │
//! │  │  trait ResourceClient { ... }             │   │
//! │  └──────────────────────────────────────────┘   │
//! │  ┌──────────────┐  ┌──────────────┐            │
//! │  │ Wait Engine  │  │ Cancellation │            │
//! │  └──────────────┘  └──────────────┘            │
//! └───────┬─────────────────────────────────────────┘
//!         │
//! ┌───────▼─────────────────────┐
//! │ harvestflow-cloud-harvester │
//! │   Harvester REST client     │
//! └─────────────────────────────┘
//! ```

pub mod action;
pub mod cancel;
pub mod client;
pub mod error;
pub mod resource;
pub mod wait;

// Re-exports
pub use action::{Action, ActionResult, ActionSummary, ActionType, TeardownReport};
pub use cancel::{CancelHandle, CancelToken, cancel_pair};
pub use client::{AuthStatus, ResourceClient};
pub use error::{CloudError, Result, WaitError};
pub use resource::{
    AccessMode, CloudInit, DesiredImage, ImageSpec, RemoteImage, ResourceKind, VM_PHASE_FAILED,
    VM_PHASE_RUNNING, VmInstance, VmResource, VmSpec, VolumeMode, VolumeResource, VolumeSpec,
    storage_class_for_image,
};
pub use wait::{WaitOptions, wait_for, wait_for_absence};
