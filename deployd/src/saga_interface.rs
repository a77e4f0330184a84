// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interfaces available to saga actions

use crate::app::Deployd;
use crate::db::DataStore;
use crate::storage::ObjectStorage;
use crate::storage::PayloadReader;
use crate::workflows::WorkflowsClient;
use slog::Logger;
use std::fmt;
use std::sync::Arc;
use std::sync::Mutex;

// We want to be careful about what interfaces we expose to saga actions:
// the more constrained this interface is, the easier it is to substitute
// every collaborator with a deterministic fake in tests.
pub(crate) struct SagaContext {
    deployd: Arc<Deployd>,
    log: Logger,
    // Saga parameters must serialize into the saga log, which a raw byte
    // stream cannot; the payload therefore rides on the per-saga context
    // and is handed over to the one action that consumes it.
    payload: Mutex<Option<PayloadReader>>,
}

impl fmt::Debug for SagaContext {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("SagaContext { (deployd) ... }")
    }
}

impl SagaContext {
    pub(crate) fn new(
        deployd: Arc<Deployd>,
        log: Logger,
        payload: Option<PayloadReader>,
    ) -> SagaContext {
        SagaContext { deployd, log, payload: Mutex::new(payload) }
    }

    pub(crate) fn log(&self) -> &Logger {
        &self.log
    }

    pub(crate) fn deployd(&self) -> &Arc<Deployd> {
        &self.deployd
    }

    pub(crate) fn datastore(&self) -> &dyn DataStore {
        self.deployd.datastore()
    }

    pub(crate) fn storage(&self) -> &dyn ObjectStorage {
        self.deployd.storage()
    }

    pub(crate) fn workflows(&self) -> &dyn WorkflowsClient {
        self.deployd.workflows()
    }

    /// Takes the payload stream out of the context
    ///
    /// The stream can be consumed exactly once; a second call returns
    /// `None`.
    pub(crate) fn take_payload(&self) -> Option<PayloadReader> {
        self.payload.lock().unwrap().take()
    }
}
