// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Deployd-level saga management and execution
//!
//! Steno provides its own interfaces for managing sagas.  The interface here
//! is a thin wrapper that layers deployd-specific behavior on top: building
//! the per-saga context (which carries the payload stream), and converting
//! saga failures into the error the caller of the operation sees.
//!
//! The basic lifecycle:
//!
//!       input: saga type (impls [`DeploydSaga`][super::sagas::DeploydSaga])
//!              parameters (specific to the saga's type)
//!           |
//!           |  [`create_saga_dag()`]
//!           v
//!        SagaDag
//!           |
//!           |  [`SagaExecutor::saga_prepare()`]
//!           v
//!      RunnableSaga
//!           |
//!           |  [`RunnableSaga::start()`]
//!           v
//!      RunningSaga
//!           |
//!           |  [`RunningSaga::wait_until_stopped()`]
//!           v
//!      StoppedSaga
//!
//! Sagas execute under the SEC, detached from the awaiting caller: once a
//! saga has started, compensation runs to completion even if the caller
//! stops waiting (a cancelled request must not strand an uploaded payload).

use super::sagas::DeploydSaga;
use super::sagas::SagaInitError;
use super::sagas::ACTION_REGISTRY;
use crate::app::Deployd;
use crate::saga_interface::SagaContext;
use crate::storage::PayloadReader;
use anvil_common::api::external::Error;
use anyhow::Context;
use futures::future::BoxFuture;
use slog::Logger;
use std::sync::Arc;
use steno::DagBuilder;
use steno::SagaDag;
use steno::SagaId;
use steno::SagaName;
use steno::SagaResult;
use steno::SagaResultOk;
use uuid::Uuid;

/// Given a particular kind of deployd saga (the type parameter `S`) and
/// parameters for that saga, construct a [`SagaDag`] for it
pub(crate) fn create_saga_dag<S: DeploydSaga>(
    params: S::Params,
) -> Result<SagaDag, Error> {
    let builder = DagBuilder::new(SagaName::new(S::NAME));
    let dag = S::make_saga_dag(&params, builder)?;
    let params = serde_json::to_value(&params).map_err(|e| {
        SagaInitError::SerializeError(String::from("saga params"), e)
    })?;
    Ok(SagaDag::new(dag, params))
}

/// Handle to a self-contained subsystem for kicking off sagas
pub(crate) struct SagaExecutor {
    sec_client: Arc<steno::SecClient>,
    log: Logger,
}

impl SagaExecutor {
    pub(crate) fn new(
        sec_client: Arc<steno::SecClient>,
        log: Logger,
    ) -> SagaExecutor {
        SagaExecutor { sec_client, log }
    }

    /// Given a DAG (generally created for a specific saga, parameters
    /// included), prepare to start running the saga
    ///
    /// `payload` is the raw byte stream for sagas that consume one; it rides
    /// on the saga's context because it cannot be serialized with the
    /// parameters.  This does not start the saga running.
    pub(crate) async fn saga_prepare(
        &self,
        deployd: Arc<Deployd>,
        dag: SagaDag,
        payload: Option<PayloadReader>,
    ) -> Result<RunnableSaga, Error> {
        let saga_id = SagaId(Uuid::new_v4());
        let saga_logger = self.log.new(o!(
            "saga_name" => dag.saga_name().to_string(),
            "saga_id" => saga_id.to_string()
        ));
        let saga_context = Arc::new(Arc::new(SagaContext::new(
            deployd,
            saga_logger.clone(),
            payload,
        )));

        // Tell Steno about it.  This does not start it running yet.
        info!(saga_logger, "preparing saga");
        let saga_completion_future = self
            .sec_client
            .saga_create(
                saga_id,
                saga_context,
                Arc::new(dag),
                ACTION_REGISTRY.clone(),
            )
            .await
            .context("creating saga")
            .map_err(|error| Error::internal_error(&format!("{:#}", error)))?;
        Ok(RunnableSaga {
            id: saga_id,
            saga_completion_future,
            log: saga_logger,
            sec_client: self.sec_client.clone(),
        })
    }
}

/// Encapsulates a saga that has been prepared but not yet started
pub(crate) struct RunnableSaga {
    id: SagaId,
    saga_completion_future: BoxFuture<'static, SagaResult>,
    log: Logger,
    sec_client: Arc<steno::SecClient>,
}

impl RunnableSaga {
    pub(crate) async fn start(self) -> Result<RunningSaga, Error> {
        info!(self.log, "starting saga");
        self.sec_client
            .saga_start(self.id)
            .await
            .context("starting saga")
            .map_err(|error| Error::internal_error(&format!("{:#}", error)))?;

        Ok(RunningSaga {
            saga_completion_future: self.saga_completion_future,
            log: self.log,
        })
    }
}

/// Describes a saga that has been started running
pub(crate) struct RunningSaga {
    saga_completion_future: BoxFuture<'static, SagaResult>,
    log: Logger,
}

impl RunningSaga {
    pub(crate) async fn wait_until_stopped(self) -> StoppedSaga {
        let result = self.saga_completion_future.await;
        info!(self.log, "saga finished"; "saga_result" => ?result);
        StoppedSaga { result, log: self.log }
    }
}

/// Describes a saga that has finished
pub(crate) struct StoppedSaga {
    result: SagaResult,
    log: Logger,
}

impl StoppedSaga {
    /// Fetches the success output of the saga or converts its failure into
    /// the error the caller of the operation sees
    ///
    /// A failed saga surfaces the error of the action that failed.  If the
    /// unwind itself also failed, the compensating delete did not happen:
    /// the result is a compensation error presenting the cleanup failure
    /// first with the triggering cause wrapped inside, so that neither is
    /// lost.
    pub(crate) fn into_result(self) -> Result<SagaResultOk, Error> {
        self.result.kind.map_err(|saga_error| {
            let error = saga_error
                .error_source
                .convert::<Error>()
                .unwrap_or_else(|e| Error::internal_error(&e.to_string()));
            match saga_error.undo_failure {
                None => error,
                Some((undo_node, undo_error)) => {
                    error!(self.log, "saga compensation failed";
                        "undo_node" => ?undo_node,
                        "error" => %error,
                        "undo_error" => #%undo_error,
                    );
                    Error::compensation_failed(
                        format!("{:#}", undo_error),
                        error,
                    )
                }
            }
        })
    }
}

impl Deployd {
    /// Given a saga type and parameters, create a new saga and execute it to
    /// completion
    pub(crate) async fn execute_saga<S: DeploydSaga>(
        self: &Arc<Self>,
        params: S::Params,
        payload: Option<PayloadReader>,
    ) -> Result<SagaResultOk, Error> {
        let dag = create_saga_dag::<S>(params)?;
        let runnable_saga =
            self.sagas.saga_prepare(self.clone(), dag, payload).await?;
        let running_saga = runnable_saga.start().await?;
        let stopped_saga = running_saga.wait_until_stopped().await;
        stopped_saga.into_result()
    }
}
