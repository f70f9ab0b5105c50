//! Image stage: reconcile the source image and download it when needed

use crate::context::{RunContext, Tracked};
use crate::error::{BuildError, Result, Stage};
use crate::reconcile::{ImageAction, reconcile};
use harvestflow_cloud::{ActionType, RemoteImage, ResourceKind, wait_for};
use serde::{Deserialize, Serialize};

/// The image the builder volume is cloned from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciledImage {
    pub name: String,
    pub namespace: String,

    /// Existing catalog entry rather than one created by this run
    pub reused: bool,
}

pub async fn ensure_image(ctx: &mut RunContext<'_>) -> Result<ReconciledImage> {
    let settings = ctx.settings;
    let desired = &settings.image;
    let client = ctx.client();
    let sink = ctx.sink();
    let namespace = desired.namespace.as_str();

    sink.say(&format!("Reconciling image {}/{}", namespace, desired.name));

    let existing = match ctx
        .call(Stage::Image, client.read_image(namespace, &desired.name))
        .await?
    {
        Ok(image) => Some(image),
        Err(e) if e.is_not_found() => None,
        Err(source) => {
            return Err(BuildError::Remote {
                stage: Stage::Image,
                source,
            });
        }
    };

    match reconcile(desired, existing.as_ref()) {
        ImageAction::Fail(failure) => Err(failure.into()),
        ImageAction::Skip => {
            if let Some(image) = existing.as_ref().filter(|i| !i.is_downloaded()) {
                tracing::warn!(
                    "Reusing image {}/{} at {}% download progress",
                    namespace,
                    desired.name,
                    image.progress_percent()
                );
            }
            ctx.record(ActionType::Reuse, ResourceKind::Image, namespace, &desired.name);
            sink.say(&format!("Reusing existing image {}/{}", namespace, desired.name));
            Ok(ReconciledImage {
                name: desired.name.clone(),
                namespace: namespace.to_string(),
                reused: true,
            })
        }
        ImageAction::Create => create_image(ctx).await,
    }
}

async fn create_image(ctx: &mut RunContext<'_>) -> Result<ReconciledImage> {
    let settings = ctx.settings;
    let desired = &settings.image;
    let options = settings.image_wait;
    let client = ctx.client();
    let sink = ctx.sink();
    let namespace = desired.namespace.as_str();

    let spec = desired.to_spec().ok_or_else(|| {
        BuildError::InvalidInput(format!("image {} has no source URL", desired.name))
    })?;

    sink.say(&format!("Creating image {}/{} from {}", namespace, spec.name, spec.url));
    let created = ctx
        .remote(Stage::Image, client.create_image(namespace, &spec))
        .await?;

    // The name is chosen by us, so an echo without one is still trackable
    let name = if created.name.is_empty() {
        spec.name.clone()
    } else {
        created.name
    };
    ctx.image = Tracked::Created(name.clone());
    ctx.record(ActionType::Create, ResourceKind::Image, namespace, &name);

    sink.say(&format!("Waiting for image {}/{} to download", namespace, name));
    let image = wait_for(
        || client.read_image(namespace, &name),
        RemoteImage::is_downloaded,
        RemoteImage::is_failed,
        |image| {
            sink.progress(
                Stage::Image,
                Some(image.progress_percent()),
                "Downloading image",
            )
        },
        &options,
        ctx.cancel_token(),
    )
    .await
    .map_err(|e| {
        BuildError::from_wait(Stage::Image, "image download", options.timeout, e, |image| {
            format!(
                "image {} failed to import: {}",
                image.name,
                image.failure.unwrap_or_default()
            )
        })
    })?;

    sink.say(&format!("Image {}/{} downloaded", namespace, image.name));
    Ok(ReconciledImage {
        name,
        namespace: namespace.to_string(),
        reused: false,
    })
}
