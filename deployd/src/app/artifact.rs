// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Artifact operations

use super::sagas;
use crate::context::OpContext;
use crate::storage::PayloadReader;
use anvil_common::api::external::ArtifactGenerateParams;
use anvil_common::api::external::CreateResult;
use anvil_common::api::external::Error;
use std::sync::Arc;
use uuid::Uuid;

impl super::Deployd {
    /// Generate a deployable artifact from a raw uploaded payload
    ///
    /// Validates the declared metadata, stores the raw payload, and hands a
    /// build request to the external workflow engine.  On success the
    /// returned id identifies the artifact whose build is now in progress
    /// out-of-band; this call does not wait for the build.
    ///
    /// The call is deliberately not idempotent: invoking it twice with
    /// identical input produces two distinct artifacts (unless the second
    /// call loses the uniqueness check).  Retries, if desired, are the
    /// caller's responsibility at this granularity — a failed call never
    /// leaves partial progress behind except in the explicitly-reported
    /// case of a failed compensation.
    pub async fn artifact_generate(
        self: &Arc<Self>,
        opctx: &OpContext,
        params: ArtifactGenerateParams,
        payload: PayloadReader,
    ) -> CreateResult<Uuid> {
        params.validate()?;
        if params.size > self.max_artifact_size() {
            return Err(Error::PayloadTooLarge);
        }

        info!(opctx.log, "generating artifact";
            "name" => %params.name,
            "size" => params.size,
        );

        let saga_params = sagas::artifact_generate::Params {
            identity: opctx.identity.clone(),
            request: params,
        };
        let saga_outputs = self
            .execute_saga::<sagas::artifact_generate::SagaArtifactGenerate>(
                saga_params,
                Some(payload),
            )
            .await?;

        saga_outputs
            .lookup_node_output::<Uuid>("artifact_id")
            .map_err(|e| {
                Error::internal_error(&format!(
                    "looking up artifact id from generate saga: {:#}",
                    e
                ))
            })
    }
}
