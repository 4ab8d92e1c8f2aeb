// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Upstream module metadata and resolved dependency results

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Execution state of an upstream module as reported by the orchestrator
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ModuleStatus {
    Pending,
    Running,
    Completed,
    Failed,
    /// Any state this client does not know about, kept verbatim. Never ready.
    Other(String),
}

impl From<String> for ModuleStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "PENDING" => ModuleStatus::Pending,
            "RUNNING" => ModuleStatus::Running,
            "COMPLETED" => ModuleStatus::Completed,
            "FAILED" => ModuleStatus::Failed,
            _ => ModuleStatus::Other(s),
        }
    }
}

impl From<ModuleStatus> for String {
    fn from(status: ModuleStatus) -> Self {
        status.to_string()
    }
}

impl fmt::Display for ModuleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ModuleStatus::Pending => "PENDING",
            ModuleStatus::Running => "RUNNING",
            ModuleStatus::Completed => "COMPLETED",
            ModuleStatus::Failed => "FAILED",
            ModuleStatus::Other(s) => s.as_str(),
        };
        f.write_str(s)
    }
}

/// One entry of MODULE_RESULTS
///
/// This is a snapshot taken when the job was scheduled. It is never
/// refreshed while the job runs.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleInfo {
    pub status: ModuleStatus,
    /// URL of the module's result, or an arbitrary reference in debug mode.
    /// Unfinished modules usually have none.
    #[serde(default)]
    pub result: Option<String>,
}

impl ModuleInfo {
    pub fn is_completed(&self) -> bool {
        self.status == ModuleStatus::Completed
    }
}

/// A dependency result as seen by the running job
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DependencyResult {
    /// Downloaded into a local file owned by the job
    Downloaded(PathBuf),
    /// Raw result reference, passed through untouched in debug mode
    Reference(String),
}

impl DependencyResult {
    /// Local path of a downloaded result
    pub fn as_path(&self) -> Option<&Path> {
        match self {
            DependencyResult::Downloaded(path) => Some(path),
            DependencyResult::Reference(_) => None,
        }
    }

    /// Path or reference as a string, whichever this result holds
    pub fn as_str(&self) -> std::borrow::Cow<'_, str> {
        match self {
            DependencyResult::Downloaded(path) => path.to_string_lossy(),
            DependencyResult::Reference(reference) => reference.as_str().into(),
        }
    }
}
