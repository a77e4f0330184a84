// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interface to the external workflow engine

use crate::context::OpContext;
use async_trait::async_trait;
use workflows_client::GenerateArtifactMessage;

/// Capability interface over the workflow engine's trigger API
///
/// The engine builds artifacts asynchronously; submitting a build request is
/// the only interaction deployd has with it.  Submission succeeds only on an
/// explicit accepted response from the remote engine.
#[async_trait]
pub trait WorkflowsClient: Send + Sync {
    async fn start_generate_artifact(
        &self,
        opctx: &OpContext,
        message: &GenerateArtifactMessage,
    ) -> Result<(), workflows_client::Error>;
}

#[async_trait]
impl WorkflowsClient for workflows_client::Client {
    async fn start_generate_artifact(
        &self,
        _opctx: &OpContext,
        message: &GenerateArtifactMessage,
    ) -> Result<(), workflows_client::Error> {
        workflows_client::Client::start_generate_artifact(self, message).await
    }
}
