// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Data structures and related facilities for representing resources in the
//! external API of the anvil update plane
//!
//! These types are transport-agnostic: the HTTP layer that embeds this stack
//! converts them to and from its own representations at the edge.

mod error;

pub use error::Error;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

/// Result of a create operation for the specified type
pub type CreateResult<T> = Result<T, Error>;
/// Result of a delete operation for the specified type
pub type DeleteResult = Result<(), Error>;
/// Result of a lookup operation for the specified type
pub type LookupResult<T> = Result<T, Error>;

/// Maximum accepted length for user-supplied metadata strings (artifact
/// names, descriptions, device type selectors)
pub const MAX_META_STRING_LEN: usize = 4096;

fn validate_meta_string(label: &str, value: &str) -> Result<(), Error> {
    if value.is_empty() {
        return Err(Error::malformed_request(&format!("{} is required", label)));
    }
    if value.len() > MAX_META_STRING_LEN {
        return Err(Error::malformed_request(&format!(
            "{} must be at most {} characters",
            label, MAX_META_STRING_LEN
        )));
    }
    Ok(())
}

/// Time-bounded, pre-authorized URL granting one specific operation against
/// one object-storage key
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct SignedLink {
    pub uri: String,
    pub expire: DateTime<Utc>,
}

/// Release metadata provided directly by the user
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub struct ReleaseMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ReleaseMeta {
    pub fn validate(&self) -> Result<(), Error> {
        if let Some(description) = &self.description {
            validate_meta_string("description", description)?;
        }
        Ok(())
    }
}

/// Artifact format version information, read from the artifact header
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ArtifactInfo {
    pub format: String,
    pub version: u32,
}

/// Metadata carried by the artifact itself, as opposed to user input
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ArtifactMeta {
    /// Release name embedded in the artifact
    pub name: String,
    /// Device types the artifact is installable on
    pub device_types_compatible: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<ArtifactInfo>,
    /// Whether the artifact carries a signature
    #[serde(default)]
    pub signed: bool,
}

impl ArtifactMeta {
    pub fn validate(&self) -> Result<(), Error> {
        validate_meta_string("name", &self.name)?;
        if self.device_types_compatible.is_empty() {
            return Err(Error::malformed_request(
                "device_types_compatible must not be empty",
            ));
        }
        for device_type in &self.device_types_compatible {
            validate_meta_string("device type", device_type)?;
        }
        Ok(())
    }
}

/// A versioned update package known to the metadata store
///
/// A record of this shape is persisted out-of-band once the build engine
/// finishes materializing the artifact; the generation saga only allocates
/// its id.  The uniqueness contract enforced at generation time is defined
/// against these records: no two artifacts may share a name and overlap in
/// compatible device types.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Artifact {
    pub id: String,
    #[serde(flatten)]
    pub meta: ReleaseMeta,
    #[serde(flatten)]
    pub meta_artifact: ArtifactMeta,
    /// Total size of the artifact in bytes
    pub size: i64,
    /// Last modification time, including the upload time
    pub modified: DateTime<Utc>,
}

impl Artifact {
    pub fn new(
        id: uuid::Uuid,
        meta: ReleaseMeta,
        meta_artifact: ArtifactMeta,
        size: i64,
    ) -> Artifact {
        Artifact {
            id: id.to_string(),
            meta,
            meta_artifact,
            size,
            modified: Utc::now(),
        }
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.meta.validate()?;
        self.meta_artifact.validate()
    }
}

/// Parameters for generating an artifact from a raw uploaded payload
///
/// This is the declared metadata of one generation request.  The payload
/// itself travels separately as a byte stream; `size` is its declared
/// length and is used as an upload ceiling, not trusted beyond that.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct ArtifactGenerateParams {
    /// Human label for the release
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Device types the resulting artifact targets
    pub device_types_compatible: Vec<String>,
    /// Declared byte length of the raw payload
    pub size: i64,
    /// Build strategy the workflow engine should apply
    #[serde(rename = "type")]
    pub artifact_type: String,
    /// Opaque pass-through arguments for the build strategy
    #[serde(default)]
    pub args: String,
    /// Forwarded opaquely to the workflow engine for its own downstream
    /// authorization
    #[serde(default)]
    pub token: String,
}

impl ArtifactGenerateParams {
    pub fn validate(&self) -> Result<(), Error> {
        validate_meta_string("name", &self.name)?;
        if let Some(description) = &self.description {
            validate_meta_string("description", description)?;
        }
        if self.device_types_compatible.is_empty() {
            return Err(Error::malformed_request(
                "device_types_compatible must not be empty",
            ));
        }
        for device_type in &self.device_types_compatible {
            validate_meta_string("device type", device_type)?;
        }
        if self.size < 0 {
            return Err(Error::malformed_request("size must not be negative"));
        }
        Ok(())
    }
}
