// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Helper functions and deterministic collaborator fakes for saga tests

use crate::app::Deployd;
use crate::config::Config;
use crate::config::DeploydConfig;
use crate::context::OpContext;
use crate::db::DataStore;
use crate::storage::ObjectStorage;
use crate::storage::PayloadReader;
use crate::workflows::WorkflowsClient;
use anvil_common::api::external::SignedLink;
use anyhow::anyhow;
use async_trait::async_trait;
use chrono::Utc;
use dropshot::test_util::LogContext;
use dropshot::ConfigLogging;
use dropshot::ConfigLoggingIfExists;
use dropshot::ConfigLoggingLevel;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use workflows_client::GenerateArtifactMessage;
use workflows_client::WORKFLOW_GENERATE_ARTIFACT;

/// Set up a [`dropshot::test_util::LogContext`] appropriate for a test named
/// `test_name`
pub(crate) fn test_setup_log(test_name: &str) -> LogContext {
    let log_config = ConfigLogging::File {
        level: ConfigLoggingLevel::Trace,
        path: "UNUSED".into(),
        if_exists: ConfigLoggingIfExists::Fail,
    };

    LogContext::new(test_name, &log_config)
}

/// Build a `Deployd` wired to the given fakes
pub(crate) fn test_deployd(
    logctx: &LogContext,
    datastore: Arc<dyn DataStore>,
    storage: Arc<dyn ObjectStorage>,
    workflows: Arc<dyn WorkflowsClient>,
) -> Arc<Deployd> {
    let config = Config {
        deployd: DeploydConfig {
            workflows_url: "http://workflows.test".to_string(),
            max_artifact_size: crate::config::DEFAULT_MAX_ARTIFACT_SIZE,
            link_expire_secs: crate::config::DEFAULT_LINK_EXPIRE_SECS,
            artifact_content_type: crate::config::DEFAULT_ARTIFACT_CONTENT_TYPE
                .to_string(),
        },
        log: ConfigLogging::StderrTerminal {
            level: ConfigLoggingLevel::Info,
        },
    };
    let mut deployd = Deployd::new(&logctx.log, &config, datastore, storage);
    deployd.set_workflows_client(workflows);
    Arc::new(deployd)
}

pub(crate) fn test_opctx(logctx: &LogContext) -> OpContext {
    OpContext::for_external_request(&logctx.log, None)
}

/// Metadata store fake answering the uniqueness query from a canned result
pub(crate) struct FakeDataStore {
    result: Result<bool, String>,
    calls: AtomicUsize,
}

impl FakeDataStore {
    pub(crate) fn unique() -> Arc<FakeDataStore> {
        Arc::new(FakeDataStore { result: Ok(true), calls: AtomicUsize::new(0) })
    }

    pub(crate) fn not_unique() -> Arc<FakeDataStore> {
        Arc::new(FakeDataStore {
            result: Ok(false),
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn failing(message: &str) -> Arc<FakeDataStore> {
        Arc::new(FakeDataStore {
            result: Err(message.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub(crate) fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataStore for FakeDataStore {
    async fn is_artifact_unique(
        &self,
        _opctx: &OpContext,
        _name: &str,
        _device_types_compatible: &[String],
    ) -> Result<bool, anyhow::Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match &self.result {
            Ok(unique) => Ok(*unique),
            Err(message) => Err(anyhow!("{}", message)),
        }
    }
}

/// One recorded upload: object key and the number of payload bytes read
pub(crate) struct RecordedUpload {
    pub(crate) artifact_id: String,
    pub(crate) bytes_read: u64,
}

/// Object storage fake recording every call and failing on demand
#[derive(Default)]
pub(crate) struct FakeObjectStorage {
    pub(crate) upload_error: Option<String>,
    pub(crate) get_request_error: Option<String>,
    pub(crate) delete_request_error: Option<String>,
    pub(crate) delete_error: Option<String>,
    pub(crate) uploads: Mutex<Vec<RecordedUpload>>,
    pub(crate) deletes: Mutex<Vec<String>>,
    pub(crate) link_requests: AtomicUsize,
}

impl FakeObjectStorage {
    pub(crate) fn working() -> Arc<FakeObjectStorage> {
        Arc::new(FakeObjectStorage::default())
    }

    pub(crate) fn uploaded_keys(&self) -> Vec<String> {
        self.uploads
            .lock()
            .unwrap()
            .iter()
            .map(|upload| upload.artifact_id.clone())
            .collect()
    }

    pub(crate) fn deleted_keys(&self) -> Vec<String> {
        self.deletes.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
            + self.deletes.lock().unwrap().len()
            + self.link_requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectStorage for FakeObjectStorage {
    async fn upload_artifact(
        &self,
        _opctx: &OpContext,
        artifact_id: &str,
        _size: i64,
        mut artifact: PayloadReader,
        _content_type: &str,
    ) -> Result<(), anyhow::Error> {
        if let Some(message) = &self.upload_error {
            return Err(anyhow!("{}", message));
        }
        let mut sink = tokio::io::sink();
        let bytes_read = tokio::io::copy(&mut artifact, &mut sink).await?;
        self.uploads.lock().unwrap().push(RecordedUpload {
            artifact_id: artifact_id.to_string(),
            bytes_read,
        });
        Ok(())
    }

    async fn get_request(
        &self,
        _opctx: &OpContext,
        _artifact_id: &str,
        _expire: Duration,
    ) -> Result<SignedLink, anyhow::Error> {
        self.link_requests.fetch_add(1, Ordering::SeqCst);
        match &self.get_request_error {
            Some(message) => Err(anyhow!("{}", message)),
            None => {
                Ok(SignedLink { uri: "GET".to_string(), expire: Utc::now() })
            }
        }
    }

    async fn delete_request(
        &self,
        _opctx: &OpContext,
        _artifact_id: &str,
        _expire: Duration,
    ) -> Result<SignedLink, anyhow::Error> {
        self.link_requests.fetch_add(1, Ordering::SeqCst);
        match &self.delete_request_error {
            Some(message) => Err(anyhow!("{}", message)),
            None => {
                Ok(SignedLink { uri: "DELETE".to_string(), expire: Utc::now() })
            }
        }
    }

    async fn delete(
        &self,
        _opctx: &OpContext,
        artifact_id: &str,
    ) -> Result<(), anyhow::Error> {
        self.deletes.lock().unwrap().push(artifact_id.to_string());
        match &self.delete_error {
            Some(message) => Err(anyhow!("{}", message)),
            None => Ok(()),
        }
    }
}

/// Workflow engine fake recording every submitted build request
#[derive(Default)]
pub(crate) struct FakeWorkflows {
    pub(crate) reject: bool,
    pub(crate) submissions: Mutex<Vec<GenerateArtifactMessage>>,
}

impl FakeWorkflows {
    pub(crate) fn accepting() -> Arc<FakeWorkflows> {
        Arc::new(FakeWorkflows::default())
    }

    pub(crate) fn rejecting() -> Arc<FakeWorkflows> {
        Arc::new(FakeWorkflows { reject: true, ..Default::default() })
    }

    pub(crate) fn submitted(&self) -> Vec<GenerateArtifactMessage> {
        self.submissions.lock().unwrap().clone()
    }

    pub(crate) fn call_count(&self) -> usize {
        self.submissions.lock().unwrap().len()
    }
}

#[async_trait]
impl WorkflowsClient for FakeWorkflows {
    async fn start_generate_artifact(
        &self,
        _opctx: &OpContext,
        message: &GenerateArtifactMessage,
    ) -> Result<(), workflows_client::Error> {
        self.submissions.lock().unwrap().push(message.clone());
        if self.reject {
            return Err(workflows_client::Error::StartFailed {
                workflow: WORKFLOW_GENERATE_ARTIFACT,
            });
        }
        Ok(())
    }
}
