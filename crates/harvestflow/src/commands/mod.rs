pub mod build;
pub mod validate;

use harvestflow_cloud_harvester::{ApiCatalog, HarvesterClient, HarvesterConfig};
use harvestflow_config::Config;

/// Harvester client for a resolved configuration
pub fn connect(config: &Config) -> anyhow::Result<HarvesterClient> {
    let harvester = HarvesterConfig::new(&config.harvester_url, &config.harvester_token)
        .with_namespace(&config.harvester_namespace)
        .with_insecure(config.harvester_insecure);

    let catalog = ApiCatalog {
        image_type: config.builder_source.image_type.clone(),
        ..ApiCatalog::default()
    };

    Ok(HarvesterClient::with_catalog(harvester, catalog)?)
}
