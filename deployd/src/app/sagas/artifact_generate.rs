// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Turn a raw uploaded payload into a build request for the workflow engine
//!
//! This saga coordinates the three collaborators involved in artifact
//! generation: the metadata store (uniqueness check), object storage (raw
//! payload plus signed links), and the workflow engine (the asynchronous
//! build).  The saga's responsibility ends at a successful hand-off to the
//! engine; materializing the artifact and persisting its metadata record
//! happen out-of-band afterwards.
//!
//! Once the raw payload has been uploaded, the upload's undo action is the
//! saga's single compensation: any later failure unwinds into exactly one
//! delete of the uploaded object.  Stages before the upload fail without
//! compensation since nothing durable exists yet.

use super::ActionRegistry;
use super::DeploydAction;
use super::DeploydActionContext;
use super::DeploydSaga;
use super::SagaInitError;
use super::ACTION_GENERATE_ID;
use crate::authn::Identity;
use crate::context::op_context_for_saga_action;
use anvil_common::api::external::ArtifactGenerateParams;
use anvil_common::api::external::Error;
use anvil_common::api::external::SignedLink;
use serde::Deserialize;
use serde::Serialize;
use std::sync::Arc;
use std::sync::LazyLock;
use steno::new_action_noop_undo;
use steno::ActionError;
use steno::ActionFunc;
use steno::Node;
use tokio::io::AsyncReadExt;
use uuid::Uuid;
use workflows_client::GenerateArtifactMessage;

// artifact generate saga: input parameters

#[derive(Debug, Deserialize, Serialize)]
pub(crate) struct Params {
    /// Identity of the caller, stamped into the build request so the engine
    /// operates within the right tenant
    pub identity: Option<Identity>,
    pub request: ArtifactGenerateParams,
}

// artifact generate saga: actions

static CHECK_ARTIFACT_UNIQUE: LazyLock<DeploydAction> = LazyLock::new(|| {
    new_action_noop_undo(
        "artifact-generate.check-artifact-unique",
        sag_check_artifact_unique,
    )
});
static UPLOAD_ARTIFACT: LazyLock<DeploydAction> = LazyLock::new(|| {
    ActionFunc::new_action(
        "artifact-generate.upload-artifact",
        sag_upload_artifact,
        sag_upload_artifact_undo,
    )
});
static GET_ARTIFACT_LINK: LazyLock<DeploydAction> = LazyLock::new(|| {
    new_action_noop_undo(
        "artifact-generate.get-artifact-link",
        sag_get_artifact_link,
    )
});
static DELETE_ARTIFACT_LINK: LazyLock<DeploydAction> = LazyLock::new(|| {
    new_action_noop_undo(
        "artifact-generate.delete-artifact-link",
        sag_delete_artifact_link,
    )
});
static START_GENERATE_WORKFLOW: LazyLock<DeploydAction> = LazyLock::new(|| {
    new_action_noop_undo(
        "artifact-generate.start-generate-workflow",
        sag_start_generate_workflow,
    )
});

// artifact generate saga: definition

#[derive(Debug)]
pub(crate) struct SagaArtifactGenerate;
impl DeploydSaga for SagaArtifactGenerate {
    const NAME: &'static str = "artifact-generate";
    type Params = Params;

    fn register_actions(registry: &mut ActionRegistry) {
        registry.register(Arc::clone(&*CHECK_ARTIFACT_UNIQUE));
        registry.register(Arc::clone(&*UPLOAD_ARTIFACT));
        registry.register(Arc::clone(&*GET_ARTIFACT_LINK));
        registry.register(Arc::clone(&*DELETE_ARTIFACT_LINK));
        registry.register(Arc::clone(&*START_GENERATE_WORKFLOW));
    }

    fn make_saga_dag(
        _params: &Self::Params,
        mut builder: steno::DagBuilder,
    ) -> Result<steno::Dag, SagaInitError> {
        builder.append(Node::action(
            "unique",
            "CheckArtifactUnique",
            CHECK_ARTIFACT_UNIQUE.as_ref(),
        ));
        builder.append(Node::action(
            "artifact_id",
            "GenerateArtifactId",
            ACTION_GENERATE_ID.as_ref(),
        ));
        builder.append(Node::action(
            "uploaded",
            "UploadArtifact",
            UPLOAD_ARTIFACT.as_ref(),
        ));
        builder.append(Node::action(
            "get_link",
            "GetArtifactLink",
            GET_ARTIFACT_LINK.as_ref(),
        ));
        builder.append(Node::action(
            "delete_link",
            "DeleteArtifactLink",
            DELETE_ARTIFACT_LINK.as_ref(),
        ));
        builder.append(Node::action(
            "submitted",
            "StartGenerateWorkflow",
            START_GENERATE_WORKFLOW.as_ref(),
        ));
        Ok(builder.build()?)
    }
}

// artifact generate saga: action implementations

async fn sag_check_artifact_unique(
    sagactx: DeploydActionContext,
) -> Result<(), ActionError> {
    let osagactx = sagactx.user_data();
    let params = sagactx.saga_params::<Params>()?;
    let opctx = op_context_for_saga_action(&sagactx, &params.identity);

    let unique = osagactx
        .datastore()
        .is_artifact_unique(
            &opctx,
            &params.request.name,
            &params.request.device_types_compatible,
        )
        .await
        .map_err(|e| {
            ActionError::action_failed(Error::UniquenessCheckFailed {
                message: format!("{:#}", e),
            })
        })?;
    if !unique {
        return Err(ActionError::action_failed(Error::NotUnique));
    }
    Ok(())
}

async fn sag_upload_artifact(
    sagactx: DeploydActionContext,
) -> Result<(), ActionError> {
    let log = sagactx.user_data().log();
    let osagactx = sagactx.user_data();
    let params = sagactx.saga_params::<Params>()?;
    let opctx = op_context_for_saga_action(&sagactx, &params.identity);
    let artifact_id = sagactx.lookup::<Uuid>("artifact_id")?;

    let payload = osagactx.take_payload().ok_or_else(|| {
        ActionError::action_failed(Error::internal_error(
            "artifact payload stream already consumed",
        ))
    })?;
    // Read no more than the declared size, no matter how much the stream
    // offers.
    let payload =
        payload.take(u64::try_from(params.request.size).unwrap_or(0));

    info!(log, "uploading raw artifact";
        "artifact_id" => %artifact_id,
        "size" => params.request.size,
    );
    osagactx
        .storage()
        .upload_artifact(
            &opctx,
            &artifact_id.to_string(),
            params.request.size,
            Box::new(payload),
            osagactx.deployd().artifact_content_type(),
        )
        .await
        .map_err(|e| {
            ActionError::action_failed(Error::UploadFailed {
                message: format!("{:#}", e),
            })
        })?;
    Ok(())
}

async fn sag_upload_artifact_undo(
    sagactx: DeploydActionContext,
) -> Result<(), anyhow::Error> {
    let log = sagactx.user_data().log();
    let osagactx = sagactx.user_data();
    let params = sagactx.saga_params::<Params>()?;
    let opctx = op_context_for_saga_action(&sagactx, &params.identity);
    let artifact_id = sagactx.lookup::<Uuid>("artifact_id")?;

    warn!(log, "undo: removing uploaded artifact";
        "artifact_id" => %artifact_id,
    );
    osagactx.storage().delete(&opctx, &artifact_id.to_string()).await?;
    Ok(())
}

async fn sag_get_artifact_link(
    sagactx: DeploydActionContext,
) -> Result<SignedLink, ActionError> {
    let osagactx = sagactx.user_data();
    let params = sagactx.saga_params::<Params>()?;
    let opctx = op_context_for_saga_action(&sagactx, &params.identity);
    let artifact_id = sagactx.lookup::<Uuid>("artifact_id")?;

    osagactx
        .storage()
        .get_request(
            &opctx,
            &artifact_id.to_string(),
            osagactx.deployd().link_expire(),
        )
        .await
        .map_err(|e| {
            ActionError::action_failed(Error::GetLinkFailed {
                message: format!("{:#}", e),
            })
        })
}

async fn sag_delete_artifact_link(
    sagactx: DeploydActionContext,
) -> Result<SignedLink, ActionError> {
    let osagactx = sagactx.user_data();
    let params = sagactx.saga_params::<Params>()?;
    let opctx = op_context_for_saga_action(&sagactx, &params.identity);
    let artifact_id = sagactx.lookup::<Uuid>("artifact_id")?;

    osagactx
        .storage()
        .delete_request(
            &opctx,
            &artifact_id.to_string(),
            osagactx.deployd().link_expire(),
        )
        .await
        .map_err(|e| {
            ActionError::action_failed(Error::DeleteLinkFailed {
                message: format!("{:#}", e),
            })
        })
}

async fn sag_start_generate_workflow(
    sagactx: DeploydActionContext,
) -> Result<(), ActionError> {
    let log = sagactx.user_data().log();
    let osagactx = sagactx.user_data();
    let params = sagactx.saga_params::<Params>()?;
    let opctx = op_context_for_saga_action(&sagactx, &params.identity);
    let artifact_id = sagactx.lookup::<Uuid>("artifact_id")?;
    let get_link = sagactx.lookup::<SignedLink>("get_link")?;
    let delete_link = sagactx.lookup::<SignedLink>("delete_link")?;

    let message = GenerateArtifactMessage {
        name: params.request.name.clone(),
        description: params.request.description.clone().unwrap_or_default(),
        size: params.request.size,
        device_types_compatible: params.request.device_types_compatible.clone(),
        artifact_type: params.request.artifact_type.clone(),
        args: params.request.args.clone(),
        artifact_id: artifact_id.to_string(),
        get_artifact_uri: get_link.uri,
        delete_artifact_uri: delete_link.uri,
        tenant_id: opctx.tenant_id().unwrap_or_default().to_string(),
        token: params.request.token.clone(),
    };

    osagactx
        .workflows()
        .start_generate_artifact(&opctx, &message)
        .await
        .map_err(|e| {
            ActionError::action_failed(Error::WorkflowSubmissionFailed {
                message: e.to_string(),
            })
        })?;

    info!(log, "submitted generate_artifact workflow";
        "artifact_id" => %artifact_id,
    );
    Ok(())
}
