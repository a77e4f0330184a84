// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interface to the object storage backend holding raw payloads

pub mod s3;

use crate::context::OpContext;
use anvil_common::api::external::SignedLink;
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::AsyncRead;

/// Byte stream of a raw payload being uploaded
///
/// The stream is of unknown trustworthiness; callers cap it at the declared
/// request size before it reaches a storage backend.
pub type PayloadReader = Box<dyn AsyncRead + Send + Unpin>;

/// Capability interface over the object storage backend
///
/// Objects are keyed by artifact id.  All four calls are independent network
/// operations; none is assumed idempotent except [`ObjectStorage::delete`],
/// which implementations must make safe to call on an already-deleted or
/// never-created key ("not found" is success, not a compensation failure).
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Store the raw payload under `artifact_id`, reading at most `size`
    /// bytes from `artifact`
    async fn upload_artifact(
        &self,
        opctx: &OpContext,
        artifact_id: &str,
        size: i64,
        artifact: PayloadReader,
        content_type: &str,
    ) -> Result<(), anyhow::Error>;

    /// Issue a time-bounded signed URL for a GET of `artifact_id`
    async fn get_request(
        &self,
        opctx: &OpContext,
        artifact_id: &str,
        expire: Duration,
    ) -> Result<SignedLink, anyhow::Error>;

    /// Issue a time-bounded signed URL for a DELETE of `artifact_id`
    async fn delete_request(
        &self,
        opctx: &OpContext,
        artifact_id: &str,
        expire: Duration,
    ) -> Result<SignedLink, anyhow::Error>;

    /// Remove the object stored under `artifact_id`
    async fn delete(
        &self,
        opctx: &OpContext,
        artifact_id: &str,
    ) -> Result<(), anyhow::Error>;
}
