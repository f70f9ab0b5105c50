//! Harvester client for HarvestFlow
//!
//! This crate implements the `ResourceClient` trait against the Harvester
//! HCI REST API, covering virtual machine images, persistent volume claims,
//! KubeVirt virtual machines and their running instances.
//!
//! # Requirements
//!
//! - `HARVESTER_URL` and `HARVESTER_TOKEN` when using [`HarvesterClient::from_env`]
//! - `HARVESTER_NAMESPACE` optionally overrides the `default` namespace
//!
//! # Example
//!
//! ```ignore
//! use harvestflow_cloud::ResourceClient;
//! use harvestflow_cloud_harvester::{HarvesterClient, HarvesterConfig};
//!
//! let config = HarvesterConfig::new("https://harvester.example.com", token)
//!     .with_namespace("packer");
//! let client = HarvesterClient::new(config)?;
//!
//! let auth = client.check_auth().await?;
//! if !auth.authenticated {
//!     panic!("Not authenticated: {:?}", auth.error);
//! }
//!
//! let image = client.read_image("default", "ubuntu-22.04").await?;
//! println!("download at {}%", image.progress_percent());
//! ```

pub mod api;
pub mod catalog;
pub mod error;
pub mod manifest;
pub mod provider;

pub use api::{HarvesterApi, HarvesterConfig};
pub use catalog::ApiCatalog;
pub use error::{HarvesterError, Result};
pub use provider::HarvesterClient;
