// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Job Status Client Library
//!
//! Used by batch jobs ("pods") to talk to the supervisor that schedules them.
//! A job can:
//!
//! - Report its progress (`PATCH {STATUS_URL}/{JOB_ID}`)
//! - Fetch the results of the upstream modules it depends on
//! - Upload its own result (`POST {STATUS_URL}/{JOB_ID}/result`)
//!
//! Everything the client needs is injected by the orchestrator through
//! environment variables, see [`environment`].
//!
//! # Example
//!
//! ```ignore
//! use job_status_client::JobStatusClient;
//!
//! let mut client = JobStatusClient::from_env().await?;
//!
//! let input = client.dependency("tokenizer").and_then(|r| r.as_path());
//! let threshold = client.get("threshold");
//!
//! client.status(50, "halfway there").await?;
//! client.done("/tmp/result.json").await?;
//! client.cleanup().await?;
//! ```
//!
//! # Debug mode
//!
//! With `DEBUG_MODE=true` the client performs no network access at all.
//! Status reports and uploads become no-ops and dependencies resolve to
//! their raw result references, so a job can run on a workstation without
//! a supervisor.

pub mod client;
pub mod environment;
pub mod error;
pub mod module;

pub use client::{JobPhase, JobStatusClient};
pub use environment::JobEnvironment;
pub use error::{ComError, Result};
pub use module::{DependencyResult, ModuleInfo, ModuleStatus};
