// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Deployd, the artifact plane of the anvil update service

use crate::config::Config;
use crate::db::DataStore;
use crate::storage::ObjectStorage;
use crate::workflows::WorkflowsClient;
use slog::Logger;
use std::sync::Arc;
use std::time::Duration;

mod artifact;
pub(crate) mod saga;
pub(crate) mod sagas;

/// Application-level state of one deployd instance
///
/// Owns the handles to the three external collaborators and the saga
/// execution coordinator.  One `Deployd` serves any number of concurrent
/// requests; per-request state lives entirely in each saga's own context.
pub struct Deployd {
    /// General server log
    log: Logger,
    /// Ceiling on the declared size of a raw payload, in bytes
    max_artifact_size: i64,
    /// Lifetime of the signed links handed to the build engine
    link_expire: Duration,
    /// Content type attached to raw payload uploads
    artifact_content_type: String,
    /// Artifact metadata store
    datastore: Arc<dyn DataStore>,
    /// Object storage holding raw payloads
    storage: Arc<dyn ObjectStorage>,
    /// Trigger client for the external build engine
    workflows: Arc<dyn WorkflowsClient>,
    /// Saga execution coordinator
    sagas: saga::SagaExecutor,
}

impl Deployd {
    /// Create a new deployd instance
    ///
    /// The workflow engine client is built from `config`; tests substitute a
    /// deterministic fake via [`Deployd::set_workflows_client`] before
    /// wrapping the instance in an `Arc`.
    pub fn new(
        log: &Logger,
        config: &Config,
        datastore: Arc<dyn DataStore>,
        storage: Arc<dyn ObjectStorage>,
    ) -> Deployd {
        let workflows = Arc::new(workflows_client::Client::new(
            &config.deployd.workflows_url,
            log.new(o!("component" => "WorkflowsClient")),
        ));
        let sec_client = Arc::new(steno::sec(
            log.new(o!("component" => "SEC")),
            Arc::new(steno::InMemorySecStore::new()),
        ));
        Deployd {
            log: log.new(o!("component" => "deployd")),
            max_artifact_size: config.deployd.max_artifact_size,
            link_expire: config.deployd.link_expire(),
            artifact_content_type: config.deployd.artifact_content_type.clone(),
            datastore,
            storage,
            workflows,
            sagas: saga::SagaExecutor::new(
                sec_client,
                log.new(o!("component" => "SagaExecutor")),
            ),
        }
    }

    /// Replace the workflow engine client (test use)
    pub fn set_workflows_client(&mut self, workflows: Arc<dyn WorkflowsClient>) {
        self.workflows = workflows;
    }

    pub(crate) fn log(&self) -> &Logger {
        &self.log
    }

    pub(crate) fn max_artifact_size(&self) -> i64 {
        self.max_artifact_size
    }

    pub(crate) fn link_expire(&self) -> Duration {
        self.link_expire
    }

    pub(crate) fn artifact_content_type(&self) -> &str {
        &self.artifact_content_type
    }

    pub(crate) fn datastore(&self) -> &dyn DataStore {
        &*self.datastore
    }

    pub(crate) fn storage(&self) -> &dyn ObjectStorage {
        &*self.storage
    }

    pub(crate) fn workflows(&self) -> &dyn WorkflowsClient {
        &*self.workflows
    }
}
