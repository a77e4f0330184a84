// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Shared operation context threaded through every external call

use crate::app::sagas::DeploydActionContext;
use crate::authn::Identity;
use slog::Logger;

/// Context for one operation on the artifact plane
///
/// An `OpContext` is created at the boundary where a request enters the
/// system and is passed to every collaborator call made on that request's
/// behalf.  It carries the request-scoped logger (with identity key-value
/// pairs attached) and the caller's identity, if any.  Collaborators own
/// their transport deadlines; dropping the operation's future cancels
/// whatever call is in flight, while compensation still completes because
/// sagas execute detached from the caller (see `app::saga`).
pub struct OpContext {
    pub log: Logger,
    pub identity: Option<Identity>,
}

impl OpContext {
    /// Creates an `OpContext` for an external request authenticated as
    /// `identity` (or anonymous, outside multi-tenant deployments)
    pub fn for_external_request(
        log: &Logger,
        identity: Option<Identity>,
    ) -> OpContext {
        let log = match &identity {
            Some(identity) => {
                let log = log.new(o!("user_id" => identity.subject.clone()));
                match &identity.tenant {
                    Some(tenant) => log.new(o!("tenant_id" => tenant.clone())),
                    None => log,
                }
            }
            None => log.new(o!()),
        };
        OpContext { log, identity }
    }

    /// Creates an `OpContext` for internal background work
    pub fn for_background(log: &Logger) -> OpContext {
        OpContext { log: log.new(o!()), identity: None }
    }

    /// Tenant of the authenticated caller, if any
    pub fn tenant_id(&self) -> Option<&str> {
        self.identity.as_ref().and_then(|identity| identity.tenant.as_deref())
    }
}

/// Reconstructs an `OpContext` inside a saga action
///
/// Saga parameters only carry serializable data, so the identity travels in
/// the saga's params and the logger comes from the saga's execution context.
pub(crate) fn op_context_for_saga_action(
    sagactx: &DeploydActionContext,
    identity: &Option<Identity>,
) -> OpContext {
    OpContext::for_external_request(sagactx.user_data().log(), identity.clone())
}
