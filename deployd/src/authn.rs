// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Caller identity as established by the (external) authentication layer
//!
//! Token verification and claim extraction happen in middleware outside this
//! crate.  What arrives here is the already-decoded result, carried on the
//! operation context so the tenant can be stamped into outbound requests.

use serde::Deserialize;
use serde::Serialize;

/// The identity a request was authenticated as
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct Identity {
    /// Subject claim of the presented token
    pub subject: String,
    /// Tenant the caller belongs to; absent outside multi-tenant
    /// deployments
    pub tenant: Option<String>,
}

impl Identity {
    pub fn for_user(subject: &str) -> Identity {
        Identity { subject: subject.to_string(), tenant: None }
    }

    pub fn for_tenant_user(subject: &str, tenant: &str) -> Identity {
        Identity {
            subject: subject.to_string(),
            tenant: Some(tenant.to_string()),
        }
    }
}
