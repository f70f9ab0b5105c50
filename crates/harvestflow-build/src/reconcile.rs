//! Image reconciliation policy
//!
//! Decides from the desired image and the catalog's current entry whether
//! the build may reuse the entry, must create a new image, or has to stop.
//! A checksum is the only accepted proof that an existing image is the one
//! the build asked for.
//!
//! | URL | Checksum | Remote image              | Action  |
//! |-----|----------|---------------------------|---------|
//! | -   | -        | absent                    | fail    |
//! | -   | -        | present                   | reuse   |
//! | -   | set      | any                       | fail    |
//! | set | -        | absent                    | create  |
//! | set | -        | present                   | fail    |
//! | set | set      | absent                    | create  |
//! | set | set      | present, checksum unset   | fail    |
//! | set | set      | present, checksum matches | reuse   |
//! | set | set      | present, checksum differs | fail    |

use harvestflow_cloud::{DesiredImage, RemoteImage};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageAction {
    /// Reuse the existing image
    Skip,
    /// Download a new image from the source URL
    Create,
    Fail(ReconcileFailure),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconcileFailure {
    #[error("image {name} does not exist and no source URL was given")]
    NothingToCreate { name: String },

    #[error("image {name} has a checksum but no source URL")]
    ChecksumWithoutUrl { name: String },

    #[error("image {name} already exists and cannot be verified without a checksum")]
    UnverifiableExisting { name: String },

    #[error("existing image {name} has no checksum to compare against")]
    ExistingWithoutChecksum { name: String },

    #[error("image {name} already exists with checksum {found}, expected {expected}")]
    ChecksumMismatch {
        name: String,
        expected: String,
        found: String,
    },
}

/// Choose what to do about `desired` given the catalog entry `remote`
pub fn reconcile(desired: &DesiredImage, remote: Option<&RemoteImage>) -> ImageAction {
    let name = desired.name.clone();

    match (desired.source_url(), desired.expected_checksum(), remote) {
        (None, Some(_), _) => ImageAction::Fail(ReconcileFailure::ChecksumWithoutUrl { name }),
        (None, None, None) => ImageAction::Fail(ReconcileFailure::NothingToCreate { name }),
        (None, None, Some(_)) => ImageAction::Skip,
        (Some(_), None, None) => ImageAction::Create,
        (Some(_), None, Some(_)) => {
            ImageAction::Fail(ReconcileFailure::UnverifiableExisting { name })
        }
        (Some(_), Some(_), None) => ImageAction::Create,
        (Some(_), Some(expected), Some(existing)) => match existing.recorded_checksum() {
            None => ImageAction::Fail(ReconcileFailure::ExistingWithoutChecksum { name }),
            Some(found) if found == expected => ImageAction::Skip,
            Some(found) => ImageAction::Fail(ReconcileFailure::ChecksumMismatch {
                name,
                expected: expected.to_string(),
                found: found.to_string(),
            }),
        },
    }
}
