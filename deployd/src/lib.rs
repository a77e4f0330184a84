// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Library interface to deployd, the artifact plane of the anvil update
//! service
//!
//! deployd turns a raw uploaded update payload into a deployable, versioned
//! artifact for a fleet of managed devices.  The hard part lives in
//! `app::sagas`: a multi-stage saga that coordinates the metadata store,
//! object storage, and the external build engine, compensating for partial
//! failure since no two-phase commit is available across them.
//!
//! HTTP routing, identity-extraction middleware, and process bootstrap are
//! deliberately not part of this crate; an embedding server provides them
//! and calls [`Deployd::artifact_generate`].

#[macro_use]
extern crate slog;

pub mod app;
pub mod authn;
pub mod config;
pub mod context;
pub mod db;
mod saga_interface;
pub mod storage;
pub mod workflows;

pub use app::Deployd;
pub use config::Config;
