// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Client for the external workflow engine
//!
//! The engine converts a raw uploaded payload into a deployable artifact.
//! This client only submits build requests; it reports submission success or
//! failure, never build completion, which happens out-of-band.

use serde::Deserialize;
use serde::Serialize;
use slog::debug;
use slog::Logger;

/// Name of the workflow that builds an artifact from a raw payload
pub const WORKFLOW_GENERATE_ARTIFACT: &str = "generate_artifact";

/// Wire shape of one artifact build request
///
/// Field names are part of the engine's JSON contract and must not change.
/// The signed URIs grant the engine one-shot access to fetch the raw payload
/// and to remove it once consumed.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct GenerateArtifactMessage {
    pub name: String,
    pub description: String,
    pub size: i64,
    pub device_types_compatible: Vec<String>,
    #[serde(rename = "type")]
    pub artifact_type: String,
    pub args: String,
    pub artifact_id: String,
    pub get_artifact_uri: String,
    pub delete_artifact_uri: String,
    pub tenant_id: String,
    pub token: String,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The engine did not accept the submission (any response other than
    /// 201 Created).
    #[error("failed to start workflow: {workflow}")]
    StartFailed { workflow: &'static str },
    /// The engine could not be reached at all.
    #[error("error communicating with workflows service: {0}")]
    Request(#[from] reqwest::Error),
}

pub struct Client {
    baseurl: String,
    client: reqwest::Client,
    log: Logger,
}

impl Client {
    pub fn new(baseurl: &str, log: Logger) -> Client {
        Client::new_with_client(baseurl, reqwest::Client::new(), log)
    }

    /// Construct a new client with an existing `reqwest::Client`, allowing
    /// more control over its configuration (timeouts, proxies, etc.)
    pub fn new_with_client(
        baseurl: &str,
        client: reqwest::Client,
        log: Logger,
    ) -> Client {
        Client {
            baseurl: baseurl.trim_end_matches('/').to_string(),
            client,
            log,
        }
    }

    pub fn baseurl(&self) -> &str {
        &self.baseurl
    }

    /// Submit one artifact build request to the engine
    ///
    /// Succeeds only on an explicit 201 Created from the engine; any other
    /// status or transport failure is a submission failure.
    pub async fn start_generate_artifact(
        &self,
        body: &GenerateArtifactMessage,
    ) -> Result<(), Error> {
        let url = format!(
            "{}/api/v1/workflow/{}",
            self.baseurl, WORKFLOW_GENERATE_ARTIFACT
        );
        debug!(self.log, "submitting generate_artifact workflow";
            "url" => %url,
            "artifact_id" => %body.artifact_id,
        );
        let response = self.client.post(&url).json(body).send().await?;
        if response.status() != reqwest::StatusCode::CREATED {
            debug!(self.log, "workflow submission rejected";
                "status" => %response.status(),
                "artifact_id" => %body.artifact_id,
            );
            return Err(Error::StartFailed {
                workflow: WORKFLOW_GENERATE_ARTIFACT,
            });
        }
        Ok(())
    }
}
