// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Error handling facilities for the anvil update plane

use serde::Deserialize;
use serde::Serialize;

/// An error that can be generated within the update plane
///
/// Each variant identifies the stage of artifact generation that produced
/// the error, which is why several variants display their underlying message
/// verbatim: the caller distinguishes stages by the error's kind (and the
/// logs carry the stage), while the message chain stays identical to what
/// the failing collaborator reported.
///
/// These errors cross the saga boundary, where they are serialized into the
/// saga log and deserialized on the way back out, so every variant must
/// round-trip through serde.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize, thiserror::Error)]
pub enum Error {
    /// The request was structurally invalid; nothing was done.
    #[error("malformed request: {message}")]
    MalformedRequest { message: String },
    /// The declared payload size exceeds the configured ceiling; nothing was
    /// done.
    #[error("artifact file too large")]
    PayloadTooLarge,
    /// An artifact with the same name and an overlapping device type already
    /// exists.
    #[error("artifact not unique")]
    NotUnique,
    /// The metadata store could not answer the uniqueness query.
    #[error("failed to check if artifact is unique: {message}")]
    UniquenessCheckFailed { message: String },
    /// Writing the raw payload to object storage failed.  Nothing durable
    /// was written, so there is nothing to compensate.
    #[error("{message}")]
    UploadFailed { message: String },
    /// Generating the signed GET link failed after the payload was uploaded.
    #[error("{message}")]
    GetLinkFailed { message: String },
    /// Generating the signed DELETE link failed after the payload was
    /// uploaded.
    #[error("{message}")]
    DeleteLinkFailed { message: String },
    /// The workflow engine rejected the build request or was unreachable.
    #[error("{message}")]
    WorkflowSubmissionFailed { message: String },
    /// The compensating delete of the uploaded payload failed.  The raw
    /// object may be orphaned in storage.  `cleanup` describes the failed
    /// delete and `cause` is the error that triggered compensation in the
    /// first place; both must stay visible to the caller.
    #[error("{cleanup}: {cause}")]
    CompensationFailed { cleanup: String, cause: Box<Error> },

    /// The system encountered an unhandled operational error.
    #[error("internal error: {internal_message}")]
    InternalError { internal_message: String },
}

impl Error {
    /// Returns whether the error left an orphaned object behind in storage
    pub fn leaves_orphaned_object(&self) -> bool {
        matches!(self, Error::CompensationFailed { .. })
    }

    /// Returns whether the error reflects a problem with the request rather
    /// than a failure of the system
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            Error::MalformedRequest { .. }
                | Error::PayloadTooLarge
                | Error::NotUnique
        )
    }

    /// Generates an [`Error::MalformedRequest`] with the specific message
    pub fn malformed_request(message: &str) -> Error {
        Error::MalformedRequest { message: message.to_owned() }
    }

    /// Generates an [`Error::InternalError`] with the specific message
    ///
    /// InternalError should be used for operational conditions that should
    /// not happen but that we cannot reasonably handle at runtime.
    pub fn internal_error(internal_message: &str) -> Error {
        Error::InternalError { internal_message: internal_message.to_owned() }
    }

    /// Folds a failed compensation into the error that triggered it
    ///
    /// The compensation failure is presented first and the triggering cause
    /// becomes the wrapped error, so callers and logs can see both that
    /// cleanup did not happen and why the operation failed to begin with.
    pub fn compensation_failed(cleanup: String, cause: Error) -> Error {
        Error::CompensationFailed { cleanup, cause: Box::new(cause) }
    }
}
