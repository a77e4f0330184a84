// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Object storage backed by an S3-compatible service

use crate::context::OpContext;
use crate::storage::ObjectStorage;
use crate::storage::PayloadReader;
use anvil_common::api::external::SignedLink;
use async_trait::async_trait;
use chrono::Utc;
use http::Method;
use object_store::aws::AmazonS3;
use object_store::aws::AmazonS3Builder;
use object_store::path::Path;
use object_store::signer::Signer;
use object_store::Attribute;
use object_store::Attributes;
use object_store::ObjectStore;
use object_store::PutMultipartOpts;
use object_store::WriteMultipart;
use slog::Logger;
use std::time::Duration;
use tokio::io::AsyncReadExt;

// Upload buffer chunk size; also bounds how many chunks may be in flight.
const UPLOAD_CHUNK_SIZE: usize = 1024 * 1024;
const UPLOAD_MAX_CONCURRENCY: usize = 8;

/// [`ObjectStorage`] implementation on top of an S3-compatible backend
///
/// Raw payloads are stored one object per artifact id.  Uploads stream
/// through a multipart upload; an upload that fails partway leaves at most
/// an uncommitted multipart upload behind, which the backend's own lifecycle
/// configuration is responsible for expiring.
pub struct S3ObjectStorage<T> {
    store: T,
    log: Logger,
}

impl S3ObjectStorage<AmazonS3> {
    /// Build a client for `bucket` from the standard AWS environment
    /// variables
    pub fn from_env(
        bucket: &str,
        log: &Logger,
    ) -> Result<S3ObjectStorage<AmazonS3>, object_store::Error> {
        let store =
            AmazonS3Builder::from_env().with_bucket_name(bucket).build()?;
        Ok(S3ObjectStorage {
            store,
            log: log.new(o!("component" => "S3ObjectStorage")),
        })
    }
}

impl<T> S3ObjectStorage<T> {
    pub fn new(store: T, log: &Logger) -> S3ObjectStorage<T> {
        S3ObjectStorage {
            store,
            log: log.new(o!("component" => "S3ObjectStorage")),
        }
    }
}

#[async_trait]
impl<T: ObjectStore + Signer> ObjectStorage for S3ObjectStorage<T> {
    async fn upload_artifact(
        &self,
        opctx: &OpContext,
        artifact_id: &str,
        size: i64,
        artifact: PayloadReader,
        content_type: &str,
    ) -> Result<(), anyhow::Error> {
        let path = Path::from(artifact_id);
        let mut attributes = Attributes::new();
        attributes
            .insert(Attribute::ContentType, content_type.to_string().into());
        let upload = self
            .store
            .put_multipart_opts(
                &path,
                PutMultipartOpts { attributes, ..Default::default() },
            )
            .await?;
        let mut write = WriteMultipart::new_with_chunk_size(
            upload,
            UPLOAD_CHUNK_SIZE,
        );

        // The declared size is a ceiling, not a promise; stop reading there
        // no matter how much more the stream offers.
        let mut reader =
            artifact.take(u64::try_from(size).unwrap_or(0));
        let mut buf = vec![0; UPLOAD_CHUNK_SIZE];
        let mut uploaded: u64 = 0;
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            write.wait_for_capacity(UPLOAD_MAX_CONCURRENCY).await?;
            write.write(&buf[..n]);
            uploaded += n as u64;
        }
        write.finish().await?;

        debug!(opctx.log, "uploaded raw artifact";
            "artifact_id" => artifact_id,
            "bytes" => uploaded,
        );
        Ok(())
    }

    async fn get_request(
        &self,
        _opctx: &OpContext,
        artifact_id: &str,
        expire: Duration,
    ) -> Result<SignedLink, anyhow::Error> {
        let path = Path::from(artifact_id);
        let url = self.store.signed_url(Method::GET, &path, expire).await?;
        Ok(SignedLink {
            uri: url.into(),
            expire: Utc::now() + chrono::Duration::from_std(expire)?,
        })
    }

    async fn delete_request(
        &self,
        _opctx: &OpContext,
        artifact_id: &str,
        expire: Duration,
    ) -> Result<SignedLink, anyhow::Error> {
        let path = Path::from(artifact_id);
        let url = self.store.signed_url(Method::DELETE, &path, expire).await?;
        Ok(SignedLink {
            uri: url.into(),
            expire: Utc::now() + chrono::Duration::from_std(expire)?,
        })
    }

    async fn delete(
        &self,
        opctx: &OpContext,
        artifact_id: &str,
    ) -> Result<(), anyhow::Error> {
        let path = Path::from(artifact_id);
        match self.store.delete(&path).await {
            Ok(()) => Ok(()),
            // Deletes must be idempotent: a key that was never written (or
            // was already removed) is not a failure.
            Err(object_store::Error::NotFound { .. }) => {
                debug!(self.log, "delete of absent object";
                    "artifact_id" => artifact_id,
                );
                Ok(())
            }
            Err(error) => Err(error.into()),
        }
    }
}
