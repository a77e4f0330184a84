// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Saga actions, undo actions, and saga constructors used in deployd

use crate::saga_interface::SagaContext;
use std::sync::Arc;
use std::sync::LazyLock;
use steno::new_action_noop_undo;
use steno::ActionContext;
use steno::ActionError;
use steno::SagaType;
use thiserror::Error;
use uuid::Uuid;

pub(crate) mod artifact_generate;

#[cfg(test)]
pub(crate) mod test_helpers;

#[derive(Debug)]
pub(crate) struct DeploydSagaType;
impl SagaType for DeploydSagaType {
    type ExecContextType = Arc<SagaContext>;
}

pub(crate) type DeploydAction = Arc<dyn steno::Action<DeploydSagaType>>;
pub(crate) type DeploydActionContext = ActionContext<DeploydSagaType>;
pub(crate) type ActionRegistry = steno::ActionRegistry<DeploydSagaType>;

pub(crate) trait DeploydSaga {
    const NAME: &'static str;

    type Params: serde::Serialize
        + serde::de::DeserializeOwned
        + std::fmt::Debug;

    fn register_actions(registry: &mut ActionRegistry);

    fn make_saga_dag(
        params: &Self::Params,
        builder: steno::DagBuilder,
    ) -> Result<steno::Dag, SagaInitError>;
}

#[derive(Debug, Error)]
pub(crate) enum SagaInitError {
    #[error("internal error building saga graph: {0:#}")]
    DagBuildError(#[from] steno::DagBuilderError),
    #[error("failed to serialize {0:?}: {1:#}")]
    SerializeError(String, serde_json::Error),
}

impl From<SagaInitError> for anvil_common::api::external::Error {
    fn from(error: SagaInitError) -> Self {
        // All of these errors reflect things that shouldn't be possible.
        // They're basically bugs.
        anvil_common::api::external::Error::internal_error(&format!(
            "creating saga: {:#}",
            error
        ))
    }
}

pub(super) static ACTION_GENERATE_ID: LazyLock<DeploydAction> =
    LazyLock::new(|| {
        new_action_noop_undo("common.uuid_generate", saga_generate_uuid)
    });

pub(crate) static ACTION_REGISTRY: LazyLock<Arc<ActionRegistry>> =
    LazyLock::new(|| Arc::new(make_action_registry()));

fn make_action_registry() -> ActionRegistry {
    let mut registry = steno::ActionRegistry::new();
    registry.register(Arc::clone(&*ACTION_GENERATE_ID));

    <artifact_generate::SagaArtifactGenerate as DeploydSaga>::register_actions(
        &mut registry,
    );

    registry
}

pub(super) async fn saga_generate_uuid<UserType: SagaType>(
    _: ActionContext<UserType>,
) -> Result<Uuid, ActionError> {
    Ok(Uuid::new_v4())
}
