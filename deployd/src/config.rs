// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interfaces for parsing configuration files and working with a deployd
//! configuration

use camino::Utf8Path;
use camino::Utf8PathBuf;
use dropshot::ConfigLogging;
use serde::Deserialize;
use serde::Serialize;
use slog_error_chain::SlogInlineError;
use std::time::Duration;
use thiserror::Error;

/// Default ceiling on the declared size of a raw payload (10 GiB)
pub const DEFAULT_MAX_ARTIFACT_SIZE: i64 = 10 * 1024 * 1024 * 1024;

/// Default lifetime of the signed GET/DELETE links handed to the build
/// engine
pub const DEFAULT_LINK_EXPIRE_SECS: u64 = 900;

/// Content type attached to raw payload uploads
pub const DEFAULT_ARTIFACT_CONTENT_TYPE: &str = "application/vnd.anvil-artifact";

fn default_max_artifact_size() -> i64 {
    DEFAULT_MAX_ARTIFACT_SIZE
}

fn default_link_expire_secs() -> u64 {
    DEFAULT_LINK_EXPIRE_SECS
}

fn default_artifact_content_type() -> String {
    DEFAULT_ARTIFACT_CONTENT_TYPE.to_string()
}

/// Configuration for a deployd instance
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct Config {
    /// Artifact plane configuration.
    pub deployd: DeploydConfig,
    /// Server-wide logging configuration.
    pub log: ConfigLogging,
}

/// Configuration of the artifact plane itself
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct DeploydConfig {
    /// Base URL of the external workflow engine.
    pub workflows_url: String,
    /// Ceiling on the declared size of a raw payload, in bytes.
    #[serde(default = "default_max_artifact_size")]
    pub max_artifact_size: i64,
    /// Lifetime of the signed GET/DELETE links handed to the build engine,
    /// in seconds.
    #[serde(default = "default_link_expire_secs")]
    pub link_expire_secs: u64,
    /// Content type attached to raw payload uploads.
    #[serde(default = "default_artifact_content_type")]
    pub artifact_content_type: String,
}

impl DeploydConfig {
    pub fn link_expire(&self) -> Duration {
        Duration::from_secs(self.link_expire_secs)
    }
}

impl Config {
    /// Load a `Config` from the given TOML file
    pub fn from_file(path: &Utf8Path) -> Result<Config, LoadError> {
        let file_contents = std::fs::read_to_string(path)
            .map_err(|err| LoadError::Io { path: path.into(), err })?;
        let config_parsed: Config = toml::from_str(&file_contents)
            .map_err(|err| LoadError::Parse { path: path.into(), err })?;
        Ok(config_parsed)
    }
}

#[derive(Debug, Error, SlogInlineError)]
pub enum LoadError {
    #[error("error reading \"{path}\": {err}")]
    Io {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("error parsing \"{path}\": {err}")]
    Parse {
        path: Utf8PathBuf,
        #[source]
        err: toml::de::Error,
    },
}
