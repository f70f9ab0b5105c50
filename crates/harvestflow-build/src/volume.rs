//! Volume stage: allocate the builder's root volume from the image

use crate::context::{RunContext, Tracked};
use crate::error::{BuildError, Result, Stage};
use crate::image::ReconciledImage;
use harvestflow_cloud::{ActionType, ResourceKind};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedVolume {
    pub name: String,
    pub namespace: String,
}

/// Submit the volume and record its generated name.
///
/// Binding is not awaited here; it is observed when the VM mounting the
/// volume starts.
pub async fn create_volume(
    ctx: &mut RunContext<'_>,
    image: &ReconciledImage,
) -> Result<ProvisionedVolume> {
    let settings = ctx.settings;
    let client = ctx.client();
    let sink = ctx.sink();
    let namespace = settings.namespace.as_str();
    let spec = settings.volume_spec(&image.namespace, &image.name);

    sink.say(&format!(
        "Creating {} volume in {} from image {}",
        spec.size, namespace, spec.image_id
    ));
    let created = ctx
        .remote(Stage::Volume, client.create_volume(namespace, &spec))
        .await?;

    if created.name.is_empty() {
        ctx.volume = Tracked::Unidentified;
        return Err(BuildError::MissingIdentifier {
            stage: Stage::Volume,
            kind: ResourceKind::Volume,
        });
    }

    ctx.volume = Tracked::Created(created.name.clone());
    ctx.record(ActionType::Create, ResourceKind::Volume, namespace, &created.name);
    tracing::info!(
        "Volume {}/{} uses storage class {}",
        namespace,
        created.name,
        spec.storage_class
    );

    Ok(ProvisionedVolume {
        name: created.name,
        namespace: namespace.to_string(),
    })
}
