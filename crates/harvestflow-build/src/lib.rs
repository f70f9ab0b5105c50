//! HarvestFlow build orchestration
//!
//! This crate drives one image build against a `ResourceClient`: it
//! reconciles the source image, allocates the builder volume, boots the
//! builder VM, hands it to an optional provisioning hook, and tears down
//! everything the run created.

pub mod context;
pub mod error;
pub mod image;
pub mod pipeline;
pub mod progress;
pub mod reconcile;
pub mod settings;
pub mod teardown;
pub mod vm;
pub mod volume;

pub use context::{RunContext, Tracked};
pub use error::{BuildError, Result, Stage};
pub use image::{ReconciledImage, ensure_image};
pub use pipeline::{BuildArtifact, Orchestrator, ProvisionHook, ProvisionTarget};
pub use progress::{ProgressSink, TracingSink};
pub use reconcile::{ImageAction, ReconcileFailure, reconcile};
pub use settings::{BuildSettings, ExportTarget};
pub use teardown::teardown;
pub use vm::{RunningVm, create_vm};
pub use volume::{ProvisionedVolume, create_volume};
