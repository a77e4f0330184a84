// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Interface to the artifact metadata store

use crate::context::OpContext;
use async_trait::async_trait;

/// Capability interface over the metadata store
///
/// The store holds the persisted [`anvil_common::api::external::Artifact`]
/// records and is the authority on the uniqueness invariant: no two
/// artifacts may share a name while overlapping in compatible device types.
/// The store's query internals (and its consistency guarantees) are its
/// own; deployd treats its answers as authoritative and does not attempt to
/// serialize concurrent checks itself.  The resulting window between a
/// uniqueness check and the eventual metadata write is a documented property
/// of the system, not something this interface closes.
#[async_trait]
pub trait DataStore: Send + Sync {
    /// Returns whether no existing artifact matches `name` with any overlap
    /// in `device_types_compatible`
    ///
    /// A store or transport error is surfaced as an error, never interpreted
    /// as "not unique".
    async fn is_artifact_unique(
        &self,
        opctx: &OpContext,
        name: &str,
        device_types_compatible: &[String],
    ) -> Result<bool, anyhow::Error>;
}
